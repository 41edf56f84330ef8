//! Error types for publishing

use std::path::PathBuf;
use thiserror::Error;

/// Per-file failure during reconciliation
///
/// Logged and counted; never aborts the tick.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReconciliationError {
    /// Writing a desired file failed
    #[error("Write error at {path}: {reason}")]
    Write {
        /// File being written
        path: PathBuf,
        /// I/O message
        reason: String,
    },

    /// Removing a stale file or empty directory failed
    #[error("Delete error at {path}: {reason}")]
    Delete {
        /// Entry being removed
        path: PathBuf,
        /// I/O message
        reason: String,
    },

    /// Listing the destination tree failed
    #[error("Walk error at {path}: {reason}")]
    Walk {
        /// Directory being listed
        path: PathBuf,
        /// I/O message
        reason: String,
    },
}

impl ReconciliationError {
    pub(crate) fn write(path: impl Into<PathBuf>, e: impl std::fmt::Display) -> Self {
        ReconciliationError::Write {
            path: path.into(),
            reason: e.to_string(),
        }
    }

    pub(crate) fn delete(path: impl Into<PathBuf>, e: impl std::fmt::Display) -> Self {
        ReconciliationError::Delete {
            path: path.into(),
            reason: e.to_string(),
        }
    }

    pub(crate) fn walk(path: impl Into<PathBuf>, e: impl std::fmt::Display) -> Self {
        ReconciliationError::Walk {
            path: path.into(),
            reason: e.to_string(),
        }
    }
}

/// Errors while deriving the timetable or running a tick
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchedulingError {
    /// An instant or delay cannot be represented
    #[error("Instant out of range: {0}")]
    InstantOutOfRange(String),

    /// Artifact store error
    #[error("Store error: {0}")]
    Store(String),

    /// Destination registry error
    #[error("Destination error: {0}")]
    Destinations(String),

    /// A reconciliation task panicked or was cancelled
    #[error("Worker error: {0}")]
    Worker(String),
}
