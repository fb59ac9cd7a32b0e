#![allow(dead_code)]

use std::fs;
use std::path::Path;

use tempfile::TempDir;

use schema_chain::prelude::*;

/// A temporary schema directory that alters can be written into.
pub struct SchemaDir {
    dir: TempDir,
}

impl SchemaDir {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("Failed to create temp dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Writes a file with the given contents.
    pub fn file(&self, name: &str, contents: &str) -> &Self {
        fs::write(self.path().join(name), contents)
            .unwrap_or_else(|e| panic!("Failed to write {name}: {e}"));
        self
    }

    /// Writes a file with raw, possibly non UTF-8, contents.
    pub fn raw_file(&self, name: &str, contents: &[u8]) -> &Self {
        fs::write(self.path().join(name), contents)
            .unwrap_or_else(|e| panic!("Failed to write {name}: {e}"));
        self
    }

    /// Writes an up/down pair named `<ref>-<name>-{up,down}.sql`.
    ///
    /// `extra` header lines are added to both files.
    pub fn pair(
        &self,
        reference: &str,
        back_ref: Option<&str>,
        name: &str,
        extra: &[&str],
    ) -> &Self {
        for direction in ["up", "down"] {
            let mut header = format!("-- ref: {reference}\n");
            if let Some(parent) = back_ref {
                header.push_str(&format!("-- backref: {parent}\n"));
            }
            header.push_str(&format!("-- direction: {direction}\n"));
            for line in extra {
                header.push_str(line);
                header.push('\n');
            }
            header.push_str("\nSELECT 1;\n");
            self.file(&format!("{reference}-{name}-{direction}.sql"), &header);
        }
        self
    }

    pub fn load(&self) -> Result<Chain> {
        load_chain(self.path())
    }

    pub fn load_err(&self) -> ChainError {
        self.load().expect_err("Expected the chain to be rejected")
    }
}

/// Refs in head-to-tail order.
pub fn order(chain: &Chain) -> Vec<String> {
    chain.iter().map(|(reference, _)| reference.to_string()).collect()
}
