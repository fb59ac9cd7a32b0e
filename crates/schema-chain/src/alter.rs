//! Alter files and their parsed meta-data.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;

/// Whether an alter moves the schema forward or undoes a forward change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Progresses the schema with a new change.
    Up,
    /// Reverts the matching up alter.
    Down,
}

impl Direction {
    /// Parses a direction value, ignoring case.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        if value.eq_ignore_ascii_case("up") {
            Some(Self::Up)
        } else if value.eq_ignore_ascii_case("down") {
            Some(Self::Down)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Up => "up",
            Self::Down => "down",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single alter file along with the meta-data parsed from its header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Alter {
    /// Path of the source file.
    pub file_name: PathBuf,
    /// Up or down.
    pub direction: Direction,
    /// Unique identifier shared by the up and down files of one step.
    #[serde(rename = "ref")]
    pub reference: String,
    /// Ref of the preceding step. `None` marks the root alter.
    #[serde(rename = "backref")]
    pub back_ref: Option<String>,
    /// Environments this alter must run in. Empty means unrestricted.
    pub require_env: Vec<String>,
    /// Environments this alter must be skipped in.
    pub skip_env: Vec<String>,
}

impl Alter {
    /// Creates an alter with no back-ref and no environment gating.
    #[must_use]
    pub fn new(
        file_name: impl Into<PathBuf>,
        reference: impl Into<String>,
        direction: Direction,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            direction,
            reference: reference.into(),
            back_ref: None,
            require_env: Vec::new(),
            skip_env: Vec::new(),
        }
    }

    /// Sets the back-ref.
    #[must_use]
    pub fn back_ref(mut self, back_ref: impl Into<String>) -> Self {
        self.back_ref = Some(back_ref.into());
        self
    }

    /// Adds a required environment.
    #[must_use]
    pub fn require_env(mut self, env: impl Into<String>) -> Self {
        self.require_env.push(env.into());
        self
    }

    /// Adds a skipped environment.
    #[must_use]
    pub fn skip_env(mut self, env: impl Into<String>) -> Self {
        self.skip_env.push(env.into());
        self
    }

    /// Returns true if this alter has no predecessor.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.back_ref.is_none()
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.file_name
    }

    /// Returns whether this alter should run in `env`.
    #[must_use]
    pub fn runs_in(&self, env: &str) -> bool {
        env_allows(&self.require_env, &self.skip_env, env)
    }
}

/// Applies require-env / skip-env gating to an environment name.
pub(crate) fn env_allows(require_env: &[String], skip_env: &[String], env: &str) -> bool {
    if skip_env.iter().any(|e| e == env) {
        return false;
    }
    require_env.is_empty() || require_env.iter().any(|e| e == env)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_parse() {
        assert_eq!(Direction::parse("up"), Some(Direction::Up));
        assert_eq!(Direction::parse("DOWN"), Some(Direction::Down));
        assert_eq!(Direction::parse("Up"), Some(Direction::Up));
        assert_eq!(Direction::parse("sideways"), None);
        assert_eq!(Direction::parse(""), None);
    }

    #[test]
    fn test_alter_builder() {
        let alter = Alter::new("002-add-col-up.sql", "002", Direction::Up)
            .back_ref("001")
            .skip_env("dev");

        assert_eq!(alter.reference, "002");
        assert_eq!(alter.back_ref.as_deref(), Some("001"));
        assert!(!alter.is_root());
        assert_eq!(alter.skip_env, vec!["dev".to_string()]);
        assert_eq!(alter.path(), Path::new("002-add-col-up.sql"));
    }

    #[test]
    fn test_runs_in() {
        let plain = Alter::new("a", "1", Direction::Up);
        assert!(plain.runs_in("prod"));

        let skipped = Alter::new("a", "1", Direction::Up).skip_env("prod");
        assert!(!skipped.runs_in("prod"));
        assert!(skipped.runs_in("dev"));

        let required = Alter::new("a", "1", Direction::Up)
            .require_env("staging")
            .require_env("prod");
        assert!(required.runs_in("prod"));
        assert!(!required.runs_in("dev"));
    }

    #[test]
    fn test_serialize_uses_ref_names() {
        let alter = Alter::new("x.sql", "001", Direction::Down).back_ref("000");
        let json = serde_json::to_value(&alter).unwrap();
        assert_eq!(json["ref"], "001");
        assert_eq!(json["backref"], "000");
        assert_eq!(json["direction"], "down");
    }
}
