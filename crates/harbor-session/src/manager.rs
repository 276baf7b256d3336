//! Session Manager
//!
//! Keeps the live, ordered list of sessions and the current selection.
//! Every mutation is announced on a broadcast channel so observers (auto-save)
//! can react without the manager knowing about them.

use parking_lot::RwLock;
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::engine::EngineSessionState;
use crate::error::SessionError;
use crate::session::Session;
use crate::snapshot::{Snapshot, SnapshotItem};
use crate::Result;

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Change notification emitted by [`SessionManager`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Added { id: String },
    Removed { id: String },
    AllRemoved,
    Selected { id: String },
    Updated { id: String },
    Restored { count: usize },
}

#[derive(Debug, Clone)]
struct Entry {
    session: Session,
    engine_state: Option<EngineSessionState>,
}

#[derive(Debug, Default)]
struct State {
    entries: Vec<Entry>,
    selected_id: Option<String>,
}

impl State {
    fn position(&self, id: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.session.id == id)
    }

    fn entry_mut(&mut self, id: &str) -> Result<&mut Entry> {
        self.entries
            .iter_mut()
            .find(|e| e.session.id == id)
            .ok_or_else(|| SessionError::NotFound(id.to_string()))
    }
}

pub struct SessionManager {
    state: Arc<RwLock<State>>,
    events: broadcast::Sender<SessionEvent>,
}

impl SessionManager {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Self {
            state: Arc::new(RwLock::new(State::default())),
            events,
        }
    }

    /// Subscribe to change notifications
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    fn notify(&self, event: SessionEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    /// Add a session. The first session added is always selected.
    pub fn add(
        &self,
        session: Session,
        selected: bool,
        engine_state: Option<EngineSessionState>,
    ) -> Result<()> {
        let id = session.id.clone();
        let select = {
            let mut state = self.state.write();
            if state.position(&id).is_some() {
                return Err(SessionError::Duplicate(id));
            }

            state.entries.push(Entry {
                session,
                engine_state,
            });

            let select = selected || state.selected_id.is_none();
            if select {
                state.selected_id = Some(id.clone());
            }
            select
        };

        tracing::debug!(session_id = %id, selected = select, "Added session");

        self.notify(SessionEvent::Added { id: id.clone() });
        if select {
            self.notify(SessionEvent::Selected { id });
        }

        Ok(())
    }

    /// Remove a session; if it was selected, its nearest neighbour takes over
    pub fn remove(&self, id: &str) -> Result<()> {
        let new_selection = {
            let mut state = self.state.write();
            let index = state
                .position(id)
                .ok_or_else(|| SessionError::NotFound(id.to_string()))?;
            state.entries.remove(index);

            if state.selected_id.as_deref() == Some(id) {
                let next = state
                    .entries
                    .get(index.min(state.entries.len().saturating_sub(1)))
                    .map(|e| e.session.id.clone());
                state.selected_id = next.clone();
                next
            } else {
                None
            }
        };

        tracing::debug!(session_id = %id, "Removed session");

        self.notify(SessionEvent::Removed { id: id.to_string() });
        if let Some(next) = new_selection {
            self.notify(SessionEvent::Selected { id: next });
        }

        Ok(())
    }

    pub fn remove_all(&self) {
        {
            let mut state = self.state.write();
            state.entries.clear();
            state.selected_id = None;
        }

        self.notify(SessionEvent::AllRemoved);
    }

    pub fn select(&self, id: &str) -> Result<()> {
        {
            let mut state = self.state.write();
            if state.position(id).is_none() {
                return Err(SessionError::NotFound(id.to_string()));
            }
            state.selected_id = Some(id.to_string());
        }

        self.notify(SessionEvent::Selected { id: id.to_string() });
        Ok(())
    }

    pub fn set_url(&self, id: &str, url: String) -> Result<()> {
        self.state.write().entry_mut(id)?.session.navigate(url)?;
        self.notify(SessionEvent::Updated { id: id.to_string() });
        Ok(())
    }

    pub fn set_title(&self, id: &str, title: String) -> Result<()> {
        self.state.write().entry_mut(id)?.session.set_title(title);
        self.notify(SessionEvent::Updated { id: id.to_string() });
        Ok(())
    }

    pub fn set_engine_state(&self, id: &str, engine_state: EngineSessionState) -> Result<()> {
        self.state.write().entry_mut(id)?.engine_state = Some(engine_state);
        self.notify(SessionEvent::Updated { id: id.to_string() });
        Ok(())
    }

    pub fn get(&self, id: &str) -> Result<Session> {
        let state = self.state.read();
        state
            .position(id)
            .map(|i| state.entries[i].session.clone())
            .ok_or_else(|| SessionError::NotFound(id.to_string()))
    }

    /// All sessions, in display order
    pub fn sessions(&self) -> Vec<Session> {
        self.state
            .read()
            .entries
            .iter()
            .map(|e| e.session.clone())
            .collect()
    }

    pub fn selected_session(&self) -> Option<Session> {
        let state = self.state.read();
        let id = state.selected_id.as_deref()?;
        state
            .position(id)
            .map(|i| state.entries[i].session.clone())
    }

    pub fn len(&self) -> usize {
        self.state.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.read().entries.is_empty()
    }

    /// Capture the persistable state. Private sessions are left out; if the
    /// selected session is private the first persisted session is selected.
    pub fn create_snapshot(&self) -> Snapshot {
        let state = self.state.read();

        let mut selected_index = 0;
        let mut items = Vec::with_capacity(state.entries.len());
        for entry in state.entries.iter().filter(|e| !e.session.private) {
            if state.selected_id.as_deref() == Some(entry.session.id.as_str()) {
                selected_index = items.len();
            }
            items.push(SnapshotItem {
                session: entry.session.clone(),
                engine_state: entry.engine_state.clone(),
            });
        }

        if items.is_empty() {
            return Snapshot::empty();
        }

        Snapshot::new(items, selected_index)
    }

    /// Load the sessions of a snapshot, appending them to the current ones.
    /// Returns how many sessions were added.
    pub fn restore(&self, snapshot: Snapshot, update_selection: bool) -> usize {
        if snapshot.is_empty() {
            return 0;
        }

        let selected_id = snapshot
            .selected()
            .map(|item| item.session.id.clone())
            .filter(|_| update_selection);

        let count = {
            let mut state = self.state.write();
            let mut count = 0;
            for item in snapshot.sessions {
                if state.position(&item.session.id).is_some() {
                    tracing::warn!(session_id = %item.session.id, "Skipping duplicate restored session");
                    continue;
                }
                state.entries.push(Entry {
                    session: item.session,
                    engine_state: item.engine_state,
                });
                count += 1;
            }

            if let Some(id) = selected_id.as_ref() {
                if state.position(id).is_some() {
                    state.selected_id = Some(id.clone());
                }
            } else if state.selected_id.is_none() {
                state.selected_id = state.entries.first().map(|e| e.session.id.clone());
            }
            count
        };

        tracing::info!(restored = count, "Restored sessions from snapshot");

        self.notify(SessionEvent::Restored { count });
        count
    }
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for SessionManager {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            events: self.events.clone(),
        }
    }
}
