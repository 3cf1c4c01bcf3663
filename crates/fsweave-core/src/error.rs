//! Error taxonomy shared by every fsweave operation.

use std::fmt::Display;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result alias used throughout fsweave.
pub type FsResult<T> = Result<T, FsError>;

/// Errors surfaced by enumeration, transfers, watches and mount queries.
///
/// Paths are carried as strings because a location may be a URI rather
/// than a local path.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum FsError {
    /// The location does not exist.
    #[error("Not found: {path}")]
    NotFound { path: String },

    /// The caller lacks permission for the location.
    #[error("Permission denied: {path}")]
    PermissionDenied { path: String },

    /// The destination exists and overwriting was not allowed.
    #[error("Already exists: {path}")]
    AlreadyExists { path: String },

    /// The operation observed a cancellation request.
    #[error("Operation was cancelled")]
    Cancelled,

    /// Malformed path, URI or request.
    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    /// A backend subsystem (monitor, mount table, runtime) could not start.
    #[error("Backend unavailable: {message}")]
    BackendUnavailable { message: String },

    /// Opaque backend failure, message passed through verbatim.
    #[error("{message}")]
    Backend { message: String },
}

/// Payload-free discriminant of [`FsError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    NotFound,
    PermissionDenied,
    AlreadyExists,
    Cancelled,
    InvalidArgument,
    BackendUnavailable,
    Backend,
}

impl FsError {
    /// Create an error from an I/O error with path context.
    pub fn io(path: impl Display, source: std::io::Error) -> Self {
        let path = path.to_string();
        match source.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound { path },
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied { path },
            std::io::ErrorKind::AlreadyExists => Self::AlreadyExists { path },
            _ => Self::Backend {
                message: format!("{path}: {source}"),
            },
        }
    }

    /// Create a not-found error.
    pub fn not_found(path: impl Display) -> Self {
        Self::NotFound {
            path: path.to_string(),
        }
    }

    /// Create an already-exists error.
    pub fn already_exists(path: impl Display) -> Self {
        Self::AlreadyExists {
            path: path.to_string(),
        }
    }

    /// Create an invalid-argument error.
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Create an opaque backend error.
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
        }
    }

    /// Create a backend-unavailable error.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::BackendUnavailable {
            message: message.into(),
        }
    }

    /// Get the payload-free kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::PermissionDenied { .. } => ErrorKind::PermissionDenied,
            Self::AlreadyExists { .. } => ErrorKind::AlreadyExists,
            Self::Cancelled => ErrorKind::Cancelled,
            Self::InvalidArgument { .. } => ErrorKind::InvalidArgument,
            Self::BackendUnavailable { .. } => ErrorKind::BackendUnavailable,
            Self::Backend { .. } => ErrorKind::Backend,
        }
    }

    /// Check if this error reports a cancellation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_mapping() {
        let err = FsError::io(
            "/test/path",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert_eq!(
            err,
            FsError::PermissionDenied {
                path: "/test/path".into()
            }
        );

        let err = FsError::io(
            "/test/path",
            std::io::Error::new(std::io::ErrorKind::AlreadyExists, "exists"),
        );
        assert_eq!(err.kind(), ErrorKind::AlreadyExists);
    }

    #[test]
    fn test_io_error_passthrough_keeps_message() {
        let err = FsError::io("/dev/full", std::io::Error::other("No space left on device"));
        assert_eq!(err.kind(), ErrorKind::Backend);
        assert!(err.to_string().contains("/dev/full"));
        assert!(err.to_string().contains("No space left"));
    }

    #[test]
    fn test_cancelled_is_distinct() {
        assert!(FsError::Cancelled.is_cancelled());
        assert!(!FsError::backend("Operation was cancelled").is_cancelled());
    }
}
