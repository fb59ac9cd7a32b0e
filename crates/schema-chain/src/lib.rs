//! Ordered chains of SQL schema alters.
//!
//! A schema directory holds pairs of alter files, one applying a change
//! (`up`) and one reverting it (`down`). Each file starts with a meta-data
//! header:
//!
//! ```sql
//! -- ref: 002
//! -- backref: 001
//! -- direction: up
//! -- skip-env: dev
//!
//! ALTER TABLE users ADD COLUMN email TEXT;
//! ```
//!
//! `schema-chain` reads those headers, pairs the files of every ref and links
//! the pairs through their back-refs into a single linear chain. Missing
//! pairs, dangling back-refs, forks, duplicate roots and cycles are all
//! rejected before anything is applied.
//!
//! # Architecture
//!
//! - **Header** - Reads the leading `--` block of a file
//! - **Meta** - Turns header lines into an [`Alter`](alter::Alter)
//! - **Scan** - Finds alter files in a directory and groups them by ref
//! - **Chain** - Validates the groups and links them head to tail
//!
//! # Example
//!
//! ```rust,no_run
//! use schema_chain::prelude::*;
//!
//! let chain = load_chain(std::path::Path::new("schema"))?;
//! for alter in chain.plan(Direction::Up, Some("prod")) {
//!     println!("{}", alter.file_name.display());
//! }
//! # Ok::<(), ChainError>(())
//! ```

pub mod alter;
pub mod chain;
pub mod error;
pub mod header;
pub mod meta;
pub mod scan;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::alter::{Alter, Direction};
    pub use crate::chain::{build_and_validate_chain, load_chain, AlterGroup, Chain, ChainIter};
    pub use crate::error::{ChainError, ErrorKind, Result};
    pub use crate::header::{read_header, MAX_HEADER_LINES};
    pub use crate::meta::parse_meta;
    pub use crate::scan::{is_alter_file, scan_directory, AlterGroups};
}
