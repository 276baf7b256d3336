//! Harbor Core
//!
//! Wires the session manager, its on-disk storage and auto-save together for
//! the application start and shutdown paths.

mod config;
mod error;
mod host;

pub use config::Config;
pub use error::CoreError;
pub use host::SessionHost;

// Re-export core components
pub use harbor_session::{
    BasicEngine, Engine, EngineError, EngineSessionState, Session, SessionError, SessionEvent,
    SessionManager, SessionSource, Snapshot, SnapshotError, SnapshotItem,
};
pub use harbor_storage::{
    file_name_for_engine, AtomicFile, AutoSave, SessionStorage, SnapshotSerializer,
    SnapshotSource, SnapshotStore, StorageError,
};

pub type Result<T> = std::result::Result<T, CoreError>;

/// Initialize logging
pub fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    // A subscriber may already be installed (tests, embedding applications)
    let _ = fmt().with_env_filter(filter).with_target(true).try_init();
}
