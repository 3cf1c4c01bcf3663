//! Volume, mount and application descriptors.

use serde::{Deserialize, Serialize};
use strum::Display;

/// Classification of a mount entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum MountKind {
    Local,
    Removable,
    Network,
    Unknown,
}

/// One mounted volume or drive, snapshotted at query time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MountEntry {
    /// Display name.
    pub name: String,
    /// Mount point path or location URI. Empty when the volume is unmounted.
    pub uri_or_path: String,
    pub kind: MountKind,
    /// Volume identifier (typically a filesystem UUID).
    pub volume_identifier: Option<String>,
    /// Filesystem type, when known.
    pub filesystem_type: Option<String>,
}

/// Capacity figures of the filesystem containing a location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FilesystemUsage {
    pub total: u64,
    pub used: u64,
    pub free: u64,
}

/// An application registered to open a content type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppDescriptor {
    /// Desktop entry id, e.g. `org.gnome.TextEditor.desktop`.
    pub id: String,
    pub name: String,
    /// Command line template.
    pub exec: String,
    pub content_type: String,
}
