//! Parsing alter meta-data from header lines.
//!
//! Meta-data lines look like `-- key: value`. Recognised keys are `ref`,
//! `backref`, `direction`, `require-env` and `skip-env`; keys are matched
//! without regard to case. Lines that do not have the `key: value` shape are
//! free-form comments and are ignored. Unknown keys are logged and ignored so
//! that older tools keep working with newer headers.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use tracing::warn;

use crate::alter::{Alter, Direction};
use crate::error::{ChainError, Result};

#[allow(clippy::expect_used)]
static META_ENTRY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^--\s*([^\s]+)\s*:(.+)\s*$").expect("constant regex pattern is valid")
});

#[allow(clippy::expect_used)]
static VALID_REF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9a-zA-Z]+$").expect("constant regex pattern is valid"));

/// Returns true if `reference` is a non-empty alphanumeric identifier.
#[must_use]
pub fn is_valid_ref(reference: &str) -> bool {
    VALID_REF.is_match(reference)
}

/// Fields collected while walking the header, before required ones are checked.
#[derive(Debug, Default)]
struct PartialAlter {
    reference: Option<String>,
    back_ref: Option<String>,
    direction: Option<Direction>,
    require_env: Vec<String>,
    skip_env: Vec<String>,
}

/// Parses header lines taken from `path` into an [`Alter`].
///
/// # Errors
///
/// Returns [`ChainError::InvalidMetaData`] if a recognised key has an invalid
/// value, if `ref` or `direction` is missing, or if both `require-env` and
/// `skip-env` are given.
pub fn parse_meta<S: AsRef<str>>(lines: &[S], path: &Path) -> Result<Alter> {
    let mut partial = PartialAlter::default();

    for line in lines {
        let Some(caps) = META_ENTRY.captures(line.as_ref()) else {
            continue;
        };
        let key = caps[1].trim().to_lowercase();
        let value = caps[2].trim();

        match key.as_str() {
            "ref" => {
                if !is_valid_ref(value) {
                    return Err(ChainError::invalid(format!(
                        "Invalid 'ref' value found in '{}'",
                        path.display()
                    )));
                }
                partial.reference = Some(value.to_string());
            }
            "backref" => {
                if value.is_empty() {
                    return Err(ChainError::invalid(format!(
                        "Invalid 'backref' value found in '{}'",
                        path.display()
                    )));
                }
                partial.back_ref = Some(value.to_string());
            }
            "direction" => {
                let direction = Direction::parse(value).ok_or_else(|| {
                    ChainError::invalid(format!(
                        "Invalid direction '{}' found in '{}'",
                        value.to_lowercase(),
                        path.display()
                    ))
                })?;
                partial.direction = Some(direction);
            }
            "require-env" => partial.require_env.extend(split_env_list(value)),
            "skip-env" => partial.skip_env.extend(split_env_list(value)),
            _ => warn!(key = %key, file = %path.display(), "Unknown property found in alter header"),
        }
    }

    let reference = partial.reference.ok_or_else(|| {
        ChainError::invalid(format!(
            "Missing required field 'ref' in '{}'",
            path.display()
        ))
    })?;
    let direction = partial.direction.ok_or_else(|| {
        ChainError::invalid(format!(
            "Missing required field 'direction' in '{}'",
            path.display()
        ))
    })?;
    if !partial.require_env.is_empty() && !partial.skip_env.is_empty() {
        return Err(ChainError::invalid(format!(
            "Mutually exclusive fields 'require-env' and 'skip-env' cannot be used together in '{}'",
            path.display()
        )));
    }

    Ok(Alter {
        file_name: path.to_path_buf(),
        direction,
        reference,
        back_ref: partial.back_ref,
        require_env: partial.require_env,
        skip_env: partial.skip_env,
    })
}

/// Splits a comma separated environment list, dropping empty entries.
fn split_env_list(value: &str) -> impl Iterator<Item = String> + '_ {
    value
        .split(',')
        .map(str::trim)
        .filter(|env| !env.is_empty())
        .map(str::to_string)
}
