//! Error types for chain construction.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

use crate::alter::Direction;

/// Errors that can occur while scanning alters or building a chain.
#[derive(Debug, thiserror::Error)]
pub enum ChainError {
    /// Every group has a parent or a child, so there is no free end.
    #[error("Chain is cyclic and has no head or tail")]
    CyclicChain,

    /// Two alters share the same ref and direction.
    #[error("Duplicate '{direction}' alter for ref '{reference}'")]
    DuplicateRef {
        /// The repeated ref.
        reference: String,
        /// The direction supplied twice.
        direction: Direction,
    },

    /// Malformed or inconsistent alter meta-data.
    #[error("{0}")]
    InvalidMetaData(String),

    /// An up alter without a down alter (or vice versa).
    #[error("Missing {missing} alter for '{reference}'")]
    MissingAlterPair {
        /// Ref of the incomplete group.
        reference: String,
        /// The direction that was never found.
        missing: Direction,
    },

    /// The path to scan does not exist or is not a directory.
    #[error("Path '{}' is not a directory", .path.display())]
    NonexistentDirectory {
        /// The path that was given.
        path: PathBuf,
        /// Underlying I/O error, if any.
        #[source]
        source: Option<std::io::Error>,
    },

    /// A file that looked like an alter could not be read.
    #[error("Unable to read file '{}'", .path.display())]
    UnreadableAlter {
        /// Path to the alter file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The directory contains no files named like alters.
    #[error("Directory '{}' does not contain any alters", .path.display())]
    EmptyDirectory {
        /// The scanned directory.
        path: PathBuf,
    },
}

impl ChainError {
    /// Returns the kind of this error, without its payload.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::CyclicChain => ErrorKind::CyclicChain,
            Self::DuplicateRef { .. } => ErrorKind::DuplicateRef,
            Self::InvalidMetaData(_) => ErrorKind::InvalidMetaData,
            Self::MissingAlterPair { .. } => ErrorKind::MissingAlterPair,
            Self::NonexistentDirectory { .. } => ErrorKind::NonexistentDirectory,
            Self::UnreadableAlter { .. } => ErrorKind::UnreadableAlter,
            Self::EmptyDirectory { .. } => ErrorKind::EmptyDirectory,
        }
    }

    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidMetaData(message.into())
    }
}

/// The seven kinds of [`ChainError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorKind {
    CyclicChain,
    DuplicateRef,
    InvalidMetaData,
    MissingAlterPair,
    NonexistentDirectory,
    UnreadableAlter,
    EmptyDirectory,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::CyclicChain => "cyclic-chain",
            Self::DuplicateRef => "duplicate-ref",
            Self::InvalidMetaData => "invalid-meta-data",
            Self::MissingAlterPair => "missing-alter-pair",
            Self::NonexistentDirectory => "nonexistent-directory",
            Self::UnreadableAlter => "unreadable-alter",
            Self::EmptyDirectory => "empty-directory",
        };
        f.write_str(name)
    }
}

/// Result type for chain operations.
pub type Result<T> = std::result::Result<T, ChainError>;
