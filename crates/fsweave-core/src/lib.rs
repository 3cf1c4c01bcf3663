//! Core types and traits for fsweave.
//!
//! This crate provides the data model shared by every fsweave crate: file
//! records, transfer progress, watch events, mount entries, the error
//! taxonomy, engine configuration, and the [`Backend`] trait that concrete
//! filesystem implementations plug into.

mod backend;
mod cancel;
mod config;
mod error;
mod location;
mod mount;
mod record;
mod transfer;
mod watch;

pub use backend::{
    Backend, NativeEvent, NativeEventSink, NativeMonitor, ProgressSink, RawEntries, RawFileType,
    RawInfo, RawMount, RawVolume,
};
pub use cancel::CancelToken;
pub use config::{ConfigError, EngineConfig, EngineConfigBuilder};
pub use error::{ErrorKind, FsError, FsResult};
pub use location::Location;
pub use mount::{AppDescriptor, FilesystemUsage, MountEntry, MountKind};
pub use record::{FileKind, FileRecord};
pub use transfer::{
    CopyFlags, OverwritePolicy, TransferMode, TransferOutcome, TransferProgress, TransferResult,
};
pub use watch::{WatchEvent, WatchEventKind};
