//! Snapshot serialization
//!
//! Document layout:
//! ```text
//! {
//!   "version": 1,
//!   "selected_session_index": 0,
//!   "session_state_tuples": [
//!     { "session": { "id", "url", "title", "parent_id", "source" }, "engine_session": {..} | null }
//!   ]
//! }
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

use harbor_session::{Engine, Session, SessionSource, Snapshot, SnapshotItem};

use crate::error::StorageError;
use crate::Result;

pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct SnapshotDocument {
    version: u32,
    selected_session_index: usize,
    session_state_tuples: Vec<SessionStateTuple>,
}

#[derive(Debug, Serialize, Deserialize)]
struct SessionStateTuple {
    session: SessionRecord,
    #[serde(default)]
    engine_session: Option<Value>,
}

#[derive(Debug, Serialize, Deserialize)]
struct SessionRecord {
    id: String,
    url: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    parent_id: Option<String>,
    #[serde(default)]
    source: SessionSource,
}

impl From<&Session> for SessionRecord {
    fn from(session: &Session) -> Self {
        Self {
            id: session.id.clone(),
            url: session.url.clone(),
            title: session.title.clone(),
            parent_id: session.parent_id.clone(),
            source: session.source,
        }
    }
}

impl From<SessionRecord> for Session {
    fn from(record: SessionRecord) -> Self {
        Session {
            id: record.id,
            url: record.url,
            title: record.title,
            parent_id: record.parent_id,
            source: record.source,
            private: false,
        }
    }
}

/// Converts snapshots to and from their persisted JSON form.
///
/// Engine state blobs are handed to the [`Engine`]; a failure there fails the
/// whole conversion.
pub struct SnapshotSerializer<'a> {
    engine: &'a dyn Engine,
}

impl<'a> SnapshotSerializer<'a> {
    pub fn new(engine: &'a dyn Engine) -> Self {
        Self { engine }
    }

    pub fn to_json(&self, snapshot: &Snapshot) -> Result<String> {
        let document = self.to_document(snapshot)?;
        Ok(serde_json::to_string(&document)?)
    }

    pub fn to_bytes(&self, snapshot: &Snapshot) -> Result<Vec<u8>> {
        let document = self.to_document(snapshot)?;
        Ok(serde_json::to_vec(&document)?)
    }

    pub fn from_json(&self, json: &str) -> Result<Snapshot> {
        self.from_bytes(json.as_bytes())
    }

    /// Decode a stored snapshot. A document without sessions decodes to
    /// [`Snapshot::empty`].
    pub fn from_bytes(&self, bytes: &[u8]) -> Result<Snapshot> {
        let document: SnapshotDocument = serde_json::from_slice(bytes)?;

        if document.version != SNAPSHOT_VERSION {
            return Err(StorageError::UnsupportedVersion(document.version));
        }

        if document.session_state_tuples.is_empty() {
            return Ok(Snapshot::empty());
        }

        let sessions = document
            .session_state_tuples
            .into_iter()
            .map(|tuple| -> Result<SnapshotItem> {
                let engine_state = match tuple.engine_session {
                    None | Some(Value::Null) => None,
                    Some(json) => Some(self.engine.read_session_state(json)?),
                };
                Ok(SnapshotItem {
                    session: tuple.session.into(),
                    engine_state,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let snapshot = Snapshot::new(sessions, document.selected_session_index);
        snapshot.validate()?;

        Ok(snapshot)
    }

    fn to_document(&self, snapshot: &Snapshot) -> Result<SnapshotDocument> {
        let session_state_tuples = snapshot
            .sessions
            .iter()
            .map(|item| -> Result<SessionStateTuple> {
                let engine_session = item
                    .engine_state
                    .as_ref()
                    .map(|state| self.engine.write_session_state(state))
                    .transpose()?;
                Ok(SessionStateTuple {
                    session: SessionRecord::from(&item.session),
                    engine_session,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(SnapshotDocument {
            version: SNAPSHOT_VERSION,
            selected_session_index: snapshot.selected_index,
            session_state_tuples,
        })
    }
}
