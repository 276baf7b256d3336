//! Storage error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Engine state error: {0}")]
    Engine(#[from] harbor_session::EngineError),

    #[error("Invalid snapshot: {0}")]
    InvalidSnapshot(#[from] harbor_session::SnapshotError),

    #[error("Unsupported snapshot version: {0}")]
    UnsupportedVersion(u32),

    #[error("No async runtime for auto-save: {0}")]
    Runtime(#[from] tokio::runtime::TryCurrentError),
}
