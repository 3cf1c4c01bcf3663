//! Normalized file records.

use chrono::{DateTime, Utc};
use compact_str::CompactString;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Type of filesystem entry.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum FileKind {
    /// Regular file.
    File,
    /// Directory.
    Directory,
    /// Symbolic link (never followed).
    Symlink,
    /// Sockets, fifos, devices and anything the backend cannot classify.
    Other,
}

/// Immutable snapshot of one filesystem entry at query time.
///
/// Paths are strings: local paths for local locations, URI strings for
/// URI locations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Entry name (last path component).
    pub name: CompactString,

    /// Name suitable for display.
    pub display_name: CompactString,

    /// Full path or URI of the entry.
    pub absolute_path: String,

    /// Full path or URI of the containing directory.
    pub parent_path: String,

    /// Entry type.
    pub kind: FileKind,

    /// Whether the entry is hidden.
    pub is_hidden: bool,

    /// Content type, when the backend could determine one.
    pub content_type: Option<String>,

    /// Size in bytes. Negative means unknown.
    pub size_bytes: i64,

    /// Modification time in epoch seconds.
    pub mtime: Option<i64>,

    /// Access time in epoch seconds.
    pub atime: Option<i64>,

    /// Creation time in epoch seconds.
    pub ctime: Option<i64>,

    pub can_read: bool,
    pub can_write: bool,
    pub can_execute: bool,

    /// Filesystem type name, `"unknown"` when not reported.
    pub filesystem_type: CompactString,

    /// Link target for symlinks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symlink_target: Option<String>,

    /// Owning user name (single-entry queries only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,

    /// Owning group name (single-entry queries only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,

    /// Unix mode bits (single-entry queries only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unix_mode: Option<u32>,
}

impl FileRecord {
    /// Size in bytes, or `None` when the backend reported it as unknown.
    pub fn size(&self) -> Option<u64> {
        u64::try_from(self.size_bytes).ok()
    }

    /// Check if this entry is a directory.
    pub fn is_dir(&self) -> bool {
        self.kind == FileKind::Directory
    }

    /// Check if this entry is a regular file.
    pub fn is_file(&self) -> bool {
        self.kind == FileKind::File
    }

    /// Check if this entry is a symlink.
    pub fn is_symlink(&self) -> bool {
        self.kind == FileKind::Symlink
    }

    /// Modification time as a UTC timestamp.
    pub fn modified_at(&self) -> Option<DateTime<Utc>> {
        self.mtime.and_then(|secs| DateTime::from_timestamp(secs, 0))
    }

    /// Access time as a UTC timestamp.
    pub fn accessed_at(&self) -> Option<DateTime<Utc>> {
        self.atime.and_then(|secs| DateTime::from_timestamp(secs, 0))
    }

    /// Creation time as a UTC timestamp.
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.ctime.and_then(|secs| DateTime::from_timestamp(secs, 0))
    }
}
