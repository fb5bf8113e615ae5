//! Snapshot file error types.

use std::path::PathBuf;

use evalua_core::StoreError;
use thiserror::Error;

/// Errors that can occur while reading or writing a snapshot file.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// The file could not be read or written.
    #[error("snapshot I/O failed for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file exists but does not hold a valid snapshot.
    #[error("snapshot {path} is corrupt: {message}")]
    Corrupt { path: PathBuf, message: String },

    /// The background writer task died.
    #[error("snapshot writer failed: {0}")]
    Writer(String),
}

impl SnapshotError {
    /// Returns `true` if retrying the write may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            SnapshotError::Io { source, .. } => matches!(
                source.kind(),
                std::io::ErrorKind::Interrupted
                    | std::io::ErrorKind::WouldBlock
                    | std::io::ErrorKind::TimedOut
            ),
            SnapshotError::Corrupt { .. } => false,
            SnapshotError::Writer(_) => true,
        }
    }
}

impl From<SnapshotError> for StoreError {
    fn from(e: SnapshotError) -> Self {
        if e.is_transient() {
            StoreError::Unavailable(e.to_string())
        } else {
            StoreError::Backend(e.to_string())
        }
    }
}
