//! Harbor Session Model
//!
//! - A Session is one tracked browsing context (tab) with an opaque engine state
//! - A Snapshot is the ordered list of sessions plus the selected index
//! - The SessionManager owns live sessions and announces every mutation
//! - Private sessions are never part of a snapshot

mod engine;
mod error;
mod manager;
mod session;
mod snapshot;

pub use engine::{BasicEngine, Engine, EngineSessionState};
pub use error::{EngineError, SessionError, SnapshotError};
pub use manager::{SessionEvent, SessionManager};
pub use session::{Session, SessionSource};
pub use snapshot::{Snapshot, SnapshotItem};

pub type Result<T> = std::result::Result<T, SessionError>;
