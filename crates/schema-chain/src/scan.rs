//! Directory scanning.
//!
//! Discovers alter files in a directory, parses their headers and pairs the
//! up/down files of each ref into an [`AlterGroup`].

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::alter::Direction;
use crate::chain::AlterGroup;
use crate::error::{ChainError, Result};
use crate::header::read_header;
use crate::meta::parse_meta;

/// Alter groups keyed by ref, in ref order.
pub type AlterGroups = BTreeMap<String, AlterGroup>;

#[allow(clippy::expect_used)]
static ALTER_FILE_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([0-9]+)-([^-]+-)+(up|down)\.sql$").expect("constant regex pattern is valid")
});

/// Returns true if `name` looks like an alter file, e.g. `001-create-users-up.sql`.
#[must_use]
pub fn is_alter_file(name: &str) -> bool {
    ALTER_FILE_NAME.is_match(name)
}

/// Scans the top level of `dir` and groups every alter found by ref.
///
/// Files are visited in name order. The returned groups are not yet
/// validated beyond their meta-data; see
/// [`build_and_validate_chain`](crate::chain::build_and_validate_chain).
///
/// # Errors
///
/// - [`ChainError::NonexistentDirectory`] if `dir` is not a readable directory.
/// - [`ChainError::UnreadableAlter`] / [`ChainError::InvalidMetaData`] from
///   reading or parsing any alter.
/// - [`ChainError::DuplicateRef`] if a ref has two alters for one direction.
/// - [`ChainError::EmptyDirectory`] if no file is named like an alter.
pub fn scan_directory(dir: &Path) -> Result<AlterGroups> {
    let not_a_directory = |source| ChainError::NonexistentDirectory {
        path: dir.to_path_buf(),
        source,
    };
    match fs::metadata(dir) {
        Ok(meta) if meta.is_dir() => {}
        Ok(_) => return Err(not_a_directory(None)),
        Err(err) => return Err(not_a_directory(Some(err))),
    }

    let mut entries = Vec::new();
    for entry in fs::read_dir(dir).map_err(|err| not_a_directory(Some(err)))? {
        let entry = entry.map_err(|err| not_a_directory(Some(err)))?;
        let is_dir = entry
            .file_type()
            .map_err(|err| not_a_directory(Some(err)))?
            .is_dir();
        if is_dir {
            continue;
        }
        match entry.file_name().into_string() {
            Ok(name) => entries.push(name),
            Err(name) => debug!(name = ?name, "Skipping non UTF-8 file name"),
        }
    }
    entries.sort();

    let mut groups = AlterGroups::new();
    for name in entries {
        if !is_alter_file(&name) {
            debug!(file = %name, "Skipping file that is not an alter");
            continue;
        }
        let path = dir.join(&name);
        let header = read_header(&path)?;
        let alter = parse_meta(&header, &path)?;
        debug!(
            file = %name,
            reference = %alter.reference,
            direction = %alter.direction,
            "Scanned alter"
        );

        let group = groups.entry(alter.reference.clone()).or_default();
        let slot = match alter.direction {
            Direction::Up => &mut group.up,
            Direction::Down => &mut group.down,
        };
        if slot.is_some() {
            return Err(ChainError::DuplicateRef {
                reference: alter.reference,
                direction: alter.direction,
            });
        }
        *slot = Some(alter);
    }

    if groups.is_empty() {
        return Err(ChainError::EmptyDirectory {
            path: dir.to_path_buf(),
        });
    }

    Ok(groups)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn write(dir: &Path, name: &str, body: &str) {
        fs::write(dir.join(name), body).unwrap();
    }

    #[test]
    fn test_is_alter_file() {
        assert!(is_alter_file("001-init-up.sql"));
        assert!(is_alter_file("001-create-users-table-down.sql"));
        assert!(is_alter_file("12345-x-up.sql"));

        assert!(!is_alter_file("001-up.sql"));
        assert!(!is_alter_file("init-up.sql"));
        assert!(!is_alter_file("001-init-sideways.sql"));
        assert!(!is_alter_file("001-init-up.sqlx"));
        assert!(!is_alter_file("001-init-upxsql"));
        assert!(!is_alter_file("001--up.sql"));
        assert!(!is_alter_file("README.md"));
    }

    #[test]
    fn test_ordering_prefix_is_ascii_digits() {
        assert!(!is_alter_file("\u{661}-init-up.sql"));
        assert!(!is_alter_file("\u{661}\u{662}-init-down.sql"));
        assert!(is_alter_file("1-init-\u{e9}t\u{e9}-up.sql"));
    }

    #[test]
    fn test_groups_up_and_down() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "001-init-up.sql", "-- ref: 001\n-- direction: up\n\nCREATE TABLE t();\n");
        write(dir.path(), "001-init-down.sql", "-- ref: 001\n-- direction: down\n\nDROP TABLE t;\n");
        write(dir.path(), "notes.txt", "-- ref: 999\n-- direction: up\n");

        let groups = scan_directory(dir.path()).unwrap();
        assert_eq!(groups.len(), 1);
        let group = &groups["001"];
        assert_eq!(group.up.as_ref().unwrap().direction, Direction::Up);
        assert_eq!(group.down.as_ref().unwrap().direction, Direction::Down);
        assert!(group.back_ref.is_none());
        assert!(group.forward_ref.is_none());
    }

    #[test]
    fn test_keeps_incomplete_groups() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "001-init-up.sql", "-- ref: 001\n-- direction: up\n");

        let groups = scan_directory(dir.path()).unwrap();
        assert!(groups["001"].up.is_some());
        assert!(groups["001"].down.is_none());
    }

    #[test]
    fn test_ignores_subdirectories() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("002-nested-up.sql");
        fs::create_dir(&nested).unwrap();
        write(&nested, "003-deep-up.sql", "-- ref: 003\n-- direction: up\n");
        write(dir.path(), "001-init-up.sql", "-- ref: 001\n-- direction: up\n");

        let groups = scan_directory(dir.path()).unwrap();
        assert_eq!(groups.keys().collect::<Vec<_>>(), vec!["001"]);
    }

    #[test]
    fn test_duplicate_direction() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "001-init-up.sql", "-- ref: 001\n-- direction: up\n");
        write(dir.path(), "002-again-up.sql", "-- ref: 001\n-- direction: up\n");

        let err = scan_directory(dir.path()).unwrap_err();
        assert!(matches!(
            err,
            ChainError::DuplicateRef { ref reference, direction: Direction::Up } if reference == "001"
        ));
    }

    #[test]
    fn test_parse_error_aborts_scan() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "001-init-up.sql", "-- ref: 001\n");

        let err = scan_directory(dir.path()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidMetaData);
    }

    #[test]
    fn test_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let err = scan_directory(&dir.path().join("nope")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NonexistentDirectory);
    }

    #[test]
    fn test_file_is_not_a_directory() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "001-init-up.sql", "-- ref: 001\n-- direction: up\n");

        let err = scan_directory(&dir.path().join("001-init-up.sql")).unwrap_err();
        assert!(matches!(err, ChainError::NonexistentDirectory { source: None, .. }));
    }

    #[test]
    fn test_empty_directory() {
        let dir = tempfile::tempdir().unwrap();
        let err = scan_directory(dir.path()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::EmptyDirectory);

        write(dir.path(), "README.md", "# alters\n");
        write(dir.path(), "001-init.sql", "-- ref: 001\n-- direction: up\n");
        let err = scan_directory(dir.path()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::EmptyDirectory);
    }
}
