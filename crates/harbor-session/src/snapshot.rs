//! Session snapshots
//!
//! A snapshot is a transient copy of the manager's persistable state. An empty
//! snapshot is the "nothing to keep" value and is never written to disk.

use crate::engine::EngineSessionState;
use crate::error::SnapshotError;
use crate::session::Session;

#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotItem {
    pub session: Session,
    pub engine_state: Option<EngineSessionState>,
}

impl SnapshotItem {
    pub fn new(session: Session) -> Self {
        Self {
            session,
            engine_state: None,
        }
    }

    pub fn with_engine_state(mut self, state: EngineSessionState) -> Self {
        self.engine_state = Some(state);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Snapshot {
    pub sessions: Vec<SnapshotItem>,
    pub selected_index: usize,
}

impl Snapshot {
    pub fn new(sessions: Vec<SnapshotItem>, selected_index: usize) -> Self {
        Self {
            sessions,
            selected_index,
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Check that the snapshot can be persisted: non-empty, selected index in
    /// bounds and no private sessions
    pub fn validate(&self) -> Result<(), SnapshotError> {
        if self.sessions.is_empty() {
            return Err(SnapshotError::Empty);
        }

        if self.selected_index >= self.sessions.len() {
            return Err(SnapshotError::SelectedOutOfBounds {
                index: self.selected_index,
                len: self.sessions.len(),
            });
        }

        if let Some(item) = self.sessions.iter().find(|item| item.session.private) {
            return Err(SnapshotError::PrivateSession(item.session.id.clone()));
        }

        Ok(())
    }

    pub fn selected(&self) -> Option<&SnapshotItem> {
        self.sessions.get(self.selected_index)
    }
}
