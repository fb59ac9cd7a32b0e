//! Reading the meta-data header of an alter file.
//!
//! The header is the leading block of lines that start with `--`. It ends at
//! the first line that does not, so meta-data must be separated from any
//! trailing free-form comments by a blank line.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::error::{ChainError, Result};

/// Marker that starts every header line.
pub const HEADER_PREFIX: &str = "--";

/// Longest header block accepted before the file is rejected.
pub const MAX_HEADER_LINES: usize = 256;

/// Reads the header lines of the file at `path`.
///
/// # Errors
///
/// Returns [`ChainError::UnreadableAlter`] if the file cannot be opened or
/// read, and [`ChainError::InvalidMetaData`] if the header exceeds
/// [`MAX_HEADER_LINES`].
pub fn read_header(path: &Path) -> Result<Vec<String>> {
    let file = File::open(path).map_err(|source| unreadable(path, source))?;
    read_header_from(BufReader::new(file), path)
}

/// Reads header lines from any buffered reader; `path` is only used in errors.
///
/// Lines are compared as bytes and decoded lossily, so header comments and
/// SQL in other encodings do not make the file unreadable.
fn read_header_from<R: BufRead>(mut reader: R, path: &Path) -> Result<Vec<String>> {
    let mut lines = Vec::new();
    let mut buf = Vec::new();
    loop {
        buf.clear();
        let read = reader
            .read_until(b'\n', &mut buf)
            .map_err(|source| unreadable(path, source))?;
        if read == 0 || !buf.starts_with(HEADER_PREFIX.as_bytes()) {
            break;
        }
        if lines.len() == MAX_HEADER_LINES {
            return Err(ChainError::invalid(format!(
                "Header lines (continuous block of lines starting with '{HEADER_PREFIX}') \
                 exceeds {MAX_HEADER_LINES} in '{}'. Please add a blank line in-between the \
                 meta-data and any comment lines that may follow.",
                path.display()
            )));
        }
        lines.push(String::from_utf8_lossy(trim_line_ending(&buf)).into_owned());
    }
    Ok(lines)
}

fn trim_line_ending(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

fn unreadable(path: &Path, source: std::io::Error) -> ChainError {
    ChainError::UnreadableAlter {
        path: path.to_path_buf(),
        source,
    }
}
