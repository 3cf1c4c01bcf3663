//! The filesystem backend seam.
//!
//! The orchestration layer never touches the filesystem directly: every
//! query and mutation goes through a [`Backend`]. A backend resolves
//! locations to live objects and performs the blocking I/O; fsweave
//! supplies threading, progress accounting, cancellation, watch
//! bookkeeping and failure aggregation on top.

use std::path::Path;
use std::sync::Arc;

use crate::cancel::CancelToken;
use crate::error::{FsError, FsResult};
use crate::location::Location;
use crate::mount::{AppDescriptor, FilesystemUsage};
use crate::transfer::CopyFlags;
use crate::watch::WatchEventKind;

/// Receives cumulative progress `(bytes_so_far, total_bytes)` from a
/// backend copy or move. `total_bytes` is 0 while unknown.
pub type ProgressSink<'a> = &'a mut dyn FnMut(u64, u64);

/// Lazily produced directory entries. The iterator ends after the first
/// `Err` it yields.
pub type RawEntries<'a> = Box<dyn Iterator<Item = FsResult<RawInfo>> + Send + 'a>;

/// Callback a backend invokes, on its own dispatch context, for every
/// native change event of one monitor.
pub type NativeEventSink = Arc<dyn Fn(NativeEvent) + Send + Sync>;

/// File type as reported by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawFileType {
    Regular,
    Directory,
    Symlink,
    /// Sockets, fifos, block and character devices.
    Special,
    Unknown,
}

/// Raw attributes of one entry. Every attribute the backend could not
/// report stays unset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawInfo {
    pub name: String,
    pub display_name: Option<String>,
    pub file_type: RawFileType,
    pub is_symlink: bool,
    pub is_hidden: Option<bool>,
    pub content_type: Option<String>,
    /// Size in bytes, -1 when unknown.
    pub size: i64,
    pub mtime: Option<i64>,
    pub atime: Option<i64>,
    pub ctime: Option<i64>,
    pub can_read: Option<bool>,
    pub can_write: Option<bool>,
    pub can_execute: Option<bool>,
    pub filesystem_type: Option<String>,
    pub symlink_target: Option<String>,
    pub owner: Option<String>,
    pub group: Option<String>,
    pub unix_mode: Option<u32>,
}

impl RawInfo {
    /// Create an entry with only a name and a type; everything else unset.
    pub fn new(name: impl Into<String>, file_type: RawFileType) -> Self {
        Self {
            name: name.into(),
            display_name: None,
            file_type,
            is_symlink: file_type == RawFileType::Symlink,
            is_hidden: None,
            content_type: None,
            size: -1,
            mtime: None,
            atime: None,
            ctime: None,
            can_read: None,
            can_write: None,
            can_execute: None,
            filesystem_type: None,
            symlink_target: None,
            owner: None,
            group: None,
            unix_mode: None,
        }
    }

    /// Set the size.
    pub fn with_size(mut self, size: i64) -> Self {
        self.size = size;
        self
    }
}

/// A volume as reported by the backend's volume monitor.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RawVolume {
    /// Display name, used to correlate with mounts.
    pub name: String,
    /// Stable identifier such as a filesystem UUID.
    pub identifier: Option<String>,
    /// Identifier class (`"device"`, `"network"`, ...).
    pub class: Option<String>,
    pub removable: bool,
    /// Location the volume activates to, when known.
    pub activation_root: Option<String>,
    /// Root of the volume's current mount, when mounted.
    pub mount_root: Option<String>,
    pub filesystem_type: Option<String>,
}

/// A mount as reported by the backend's volume monitor.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RawMount {
    /// Display name, used to correlate with volumes.
    pub name: String,
    /// Local root path, when the mount has one.
    pub root: Option<String>,
    /// Default location URI.
    pub default_location: String,
    /// Backend-internal bookkeeping mount that should not be shown.
    pub is_shadowed: bool,
    pub filesystem_type: Option<String>,
}

/// One native change notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeEvent {
    pub kind: WatchEventKind,
    pub path: String,
    pub other_path: Option<String>,
}

impl NativeEvent {
    /// Create an event without a second path.
    pub fn new(kind: WatchEventKind, path: impl Into<String>) -> Self {
        Self {
            kind,
            path: path.into(),
            other_path: None,
        }
    }
}

/// A live native directory monitor.
///
/// Dropping a monitor must stop event delivery just like [`cancel`](Self::cancel).
pub trait NativeMonitor: Send {
    /// Stop delivering events. Idempotent.
    fn cancel(&mut self);
}

/// Filesystem abstraction the orchestration layer is built on.
///
/// All methods may block; callers run them on worker threads.
pub trait Backend: Send + Sync + 'static {
    /// Query attributes of a single location. Symlinks are reported as
    /// symlinks; `follow_symlinks` selects whether size and times describe
    /// the link or its target.
    fn query_info(&self, location: &Location, follow_symlinks: bool) -> FsResult<RawInfo>;

    /// Whether `location` exists, without following a final symlink.
    ///
    /// Backends with a cheaper check than a full [`query_info`](Self::query_info)
    /// should override this.
    fn exists(&self, location: &Location) -> FsResult<bool> {
        match self.query_info(location, false) {
            Ok(_) => Ok(true),
            Err(FsError::NotFound { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Open a directory and lazily enumerate its immediate children.
    ///
    /// Failing to open the directory is an `Err` from this call; failures on
    /// individual entries are yielded by the iterator.
    fn enumerate_children(
        &self,
        location: &Location,
        follow_symlinks: bool,
    ) -> FsResult<RawEntries<'_>>;

    /// Copy a regular file, reporting progress and checking `cancel` at
    /// every chunk boundary.
    fn copy(
        &self,
        source: &Location,
        dest: &Location,
        flags: CopyFlags,
        cancel: &CancelToken,
        progress: ProgressSink<'_>,
    ) -> FsResult<()>;

    /// Move an entry, reporting progress when the move degrades to a copy.
    fn move_to(
        &self,
        source: &Location,
        dest: &Location,
        flags: CopyFlags,
        cancel: &CancelToken,
        progress: ProgressSink<'_>,
    ) -> FsResult<()>;

    /// Create a directory and any missing parents. Fails with
    /// `AlreadyExists` if the directory itself exists.
    fn make_directory_with_parents(&self, location: &Location) -> FsResult<()>;

    /// Create a symlink at `location` pointing at `target`.
    fn make_symlink(&self, location: &Location, target: &Path) -> FsResult<()>;

    /// Delete a file, symlink or empty directory.
    fn delete(&self, location: &Location) -> FsResult<()>;

    /// Start monitoring a directory; events go to `sink` until the returned
    /// monitor is cancelled or dropped.
    fn watch_directory(
        &self,
        location: &Location,
        sink: NativeEventSink,
    ) -> FsResult<Box<dyn NativeMonitor>>;

    /// Snapshot the known volumes.
    fn list_volumes(&self) -> FsResult<Vec<RawVolume>>;

    /// Snapshot the current mounts.
    fn list_mounts(&self) -> FsResult<Vec<RawMount>>;

    /// Resolve the default application for a content type.
    fn default_handler(&self, content_type: &str) -> FsResult<Option<AppDescriptor>>;

    /// Move an entry to the trash.
    fn trash(&self, location: &Location) -> FsResult<()> {
        Err(FsError::backend(format!(
            "{location}: trash is not supported by this backend"
        )))
    }

    /// Set or clear the executable bits.
    fn set_executable(&self, location: &Location, executable: bool) -> FsResult<()> {
        let _ = executable;
        Err(FsError::backend(format!(
            "{location}: permissions are not supported by this backend"
        )))
    }

    /// Capacity figures of the filesystem containing `location`.
    fn filesystem_usage(&self, location: &Location) -> FsResult<FilesystemUsage> {
        Err(FsError::backend(format!(
            "{location}: filesystem usage is not supported by this backend"
        )))
    }
}
