//! Transfer request and progress types.

use serde::{Deserialize, Serialize};

use crate::error::FsError;

/// What to do when a transfer destination already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OverwritePolicy {
    /// Fail with `AlreadyExists`.
    #[default]
    FailIfExists,
    /// Replace the existing destination.
    Overwrite,
}

impl OverwritePolicy {
    /// Check if existing destinations may be replaced.
    pub fn allows_overwrite(self) -> bool {
        self == Self::Overwrite
    }
}

impl From<bool> for OverwritePolicy {
    /// `true` means overwrite, matching the host's boolean overwrite flag.
    fn from(overwrite: bool) -> Self {
        if overwrite {
            Self::Overwrite
        } else {
            Self::FailIfExists
        }
    }
}

/// The kind of transfer being performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransferMode {
    Copy,
    Move,
    /// One item of a batch copy.
    BatchItem,
}

impl std::fmt::Display for TransferMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Copy => write!(f, "Copy"),
            Self::Move => write!(f, "Move"),
            Self::BatchItem => write!(f, "Batch copy"),
        }
    }
}

/// Flags passed to the backend's copy and move primitives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CopyFlags {
    /// Replace an existing destination.
    pub overwrite: bool,
    /// Carry permissions and timestamps over.
    pub preserve_metadata: bool,
}

impl CopyFlags {
    /// Build flags from a policy and the metadata setting.
    pub fn new(policy: OverwritePolicy, preserve_metadata: bool) -> Self {
        Self {
            overwrite: policy.allows_overwrite(),
            preserve_metadata,
        }
    }
}

/// One progress tick of a transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TransferProgress {
    /// Bytes transferred since the previous tick.
    pub delta: u64,
    /// Bytes transferred so far.
    pub cumulative: u64,
    /// Total bytes, 0 when not yet known.
    pub total: u64,
}

impl TransferProgress {
    /// Progress as a percentage (0.0 to 100.0), 0.0 when the total is unknown.
    pub fn percentage(&self) -> f64 {
        if self.total > 0 {
            (self.cumulative as f64 / self.total as f64) * 100.0
        } else {
            0.0
        }
    }
}

/// Successful terminal payload of a transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferOutcome {
    pub source: String,
    pub dest: String,
    pub mode: TransferMode,
    /// Final cumulative byte count.
    pub bytes_transferred: u64,
    /// Total bytes, when the backend reported one.
    pub bytes_total: Option<u64>,
}

/// Terminal result of a transfer.
pub type TransferResult = Result<TransferOutcome, FsError>;
