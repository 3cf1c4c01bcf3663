//! Metadata snapshots and directory enumeration for fsweave.
//!
//! # Overview
//!
//! `fsweave-scan` turns raw backend attributes into normalized
//! [`FileRecord`]s and walks a directory's immediate children:
//!
//! - **Snapshot builder**: [`build_record`] never invents values; missing
//!   attributes stay unset
//! - **Lazy enumeration**: [`Enumerator`] pulls entries from the backend
//!   one at a time and stops at the first failing entry
//! - **Partial results**: [`Listing`] keeps the records gathered before a
//!   mid-stream failure together with that failure
//!
//! # Example
//!
//! ```rust,no_run
//! use fsweave_local::LocalBackend;
//! use fsweave_scan::enumerate;
//!
//! let backend = LocalBackend::default();
//! for record in enumerate(&backend, "/tmp", false).unwrap() {
//!     let record = record.unwrap();
//!     println!("{} ({})", record.name, record.kind);
//! }
//! ```

mod enumerate;
mod snapshot;

pub use enumerate::{Enumerator, Listing, count_children, enumerate, enumerate_location};
pub use snapshot::build_record;

// Re-export core types for convenience
pub use fsweave_core::{FileKind, FileRecord, FsError, Location, RawInfo};
