//! Session error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Session not found: {0}")]
    NotFound(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Session already exists: {0}")]
    Duplicate(String),

    #[error("Snapshot error: {0}")]
    Snapshot(#[from] SnapshotError),
}

/// Violations of the snapshot invariants.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SnapshotError {
    #[error("Snapshot must not be empty")]
    Empty,

    #[error("Selected index {index} out of bounds for {len} sessions")]
    SelectedOutOfBounds { index: usize, len: usize },

    #[error("Private session cannot be persisted: {0}")]
    PrivateSession(String),
}

/// Failure raised by an [`crate::Engine`] while reading or writing its state blob.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Unsupported engine state: {0}")]
    Unsupported(String),

    #[error("Malformed engine state: {0}")]
    Malformed(#[from] serde_json::Error),
}
