//! Directory change events.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

/// Kind of change reported by a directory watch.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum WatchEventKind {
    Changed,
    AttributesChanged,
    Created,
    Deleted,
    Renamed,
    MovedIn,
    MovedOut,
    PreUnmount,
    Unmounted,
    ChangesDoneHint,
    Unknown,
}

/// One change event delivered to a watch handler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchEvent {
    /// What happened.
    pub event_kind: WatchEventKind,
    /// The entry the event is about.
    pub affected_path: String,
    /// The second entry of a rename (the new name), if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub other_path: Option<String>,
    /// The registry key of the watch that produced this event.
    pub watched_path: String,
}
