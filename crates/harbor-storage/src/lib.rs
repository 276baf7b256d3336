//! Harbor Storage Layer
//!
//! Crash-safe persistence of session snapshots:
//! - One JSON file per engine, replaced atomically (temp file + rename)
//! - One lock per file: reads, writes and deletes never overlap
//! - Unreadable files restore as "nothing saved"
//! - Optional auto-save on a background task

mod atomic;
mod autosave;
mod codec;
mod error;
mod lock;
mod storage;

pub use atomic::AtomicFile;
pub use autosave::{AutoSave, SnapshotSource, SnapshotStore};
pub use codec::{SnapshotSerializer, SNAPSHOT_VERSION};
pub use error::StorageError;
pub use storage::{file_name_for_engine, SessionStorage};

pub type Result<T> = std::result::Result<T, StorageError>;
