//! Session storage
//!
//! Persists the snapshot of a session manager to one file per engine.
//! Every operation holds the file's lock for its whole duration.

use std::fs;
use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;

use harbor_session::{Engine, Snapshot};

use crate::atomic::AtomicFile;
use crate::autosave::{AutoSave, SnapshotSource, SnapshotStore};
use crate::codec::SnapshotSerializer;
use crate::error::StorageError;
use crate::lock::{lock_for, FileLock};
use crate::Result;

const STORE_FILE_PREFIX: &str = "harbor_session_storage_";

/// Storage file name for an engine, always lower-case
pub fn file_name_for_engine(engine_name: &str) -> String {
    format!("{}{}.json", STORE_FILE_PREFIX, engine_name).to_lowercase()
}

pub struct SessionStorage {
    engine: Arc<dyn Engine>,
    file: AtomicFile,
    lock: FileLock,
}

impl SessionStorage {
    /// Open the storage for `engine` inside `dir`, creating the directory if needed
    pub fn open<P: AsRef<Path>>(dir: P, engine: Arc<dyn Engine>) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;

        // Canonical path so every handle to this file finds the same lock
        let path = dir.canonicalize()?.join(file_name_for_engine(engine.name()));
        let lock = lock_for(&path);

        tracing::debug!(path = %path.display(), engine = engine.name(), "Opened session storage");

        Ok(Self {
            engine,
            file: AtomicFile::new(path),
            lock,
        })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Read the saved snapshot.
    ///
    /// Returns `None` when nothing was saved, when the file cannot be read or
    /// decoded, and when the stored snapshot is empty. Callers cannot tell these
    /// apart; a corrupt file is left in place until the next save replaces it.
    pub fn restore(&self) -> Option<Snapshot> {
        let _guard = self.lock.lock();

        let bytes = match self.file.read() {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(path = %self.path().display(), "No stored snapshot");
                return None;
            }
            Err(e) => {
                tracing::warn!(path = %self.path().display(), error = %e, "Failed to read snapshot");
                return None;
            }
        };

        match SnapshotSerializer::new(self.engine.as_ref()).from_bytes(&bytes) {
            Ok(snapshot) if snapshot.is_empty() => None,
            Ok(snapshot) => {
                tracing::info!(
                    path = %self.path().display(),
                    sessions = snapshot.len(),
                    selected_index = snapshot.selected_index,
                    "Restored snapshot"
                );
                Some(snapshot)
            }
            Err(e) => {
                tracing::warn!(path = %self.path().display(), error = %e, "Discarding unreadable snapshot");
                None
            }
        }
    }

    /// Save a snapshot, returning whether it reached disk.
    ///
    /// An empty snapshot clears the stored state and counts as success.
    ///
    /// # Panics
    ///
    /// Panics if a non-empty snapshot fails validation: the selected index is
    /// out of bounds or a session is private. Nothing is written in that case.
    pub fn save(&self, snapshot: &Snapshot) -> bool {
        if !snapshot.is_empty() {
            if let Err(e) = snapshot.validate() {
                panic!("Refusing to save invalid snapshot: {}", e);
            }
        }

        match self.try_save(snapshot) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(path = %self.path().display(), error = %e, "Failed to save snapshot");
                false
            }
        }
    }

    /// Save a snapshot, reporting why it failed.
    ///
    /// Invariant violations are rejected with [`StorageError::InvalidSnapshot`]
    /// before the file is touched. Any other failure leaves the previous content intact.
    pub fn try_save(&self, snapshot: &Snapshot) -> Result<()> {
        if snapshot.is_empty() {
            self.clear();
            return Ok(());
        }

        snapshot.validate()?;

        let _guard = self.lock.lock();

        let bytes = SnapshotSerializer::new(self.engine.as_ref()).to_bytes(snapshot)?;

        let mut file = self.file.start_write()?;
        if let Err(e) = file.write_all(&bytes) {
            self.file.fail_write(Some(file));
            return Err(StorageError::Io(e));
        }
        self.file.finish_write(file)?;

        tracing::debug!(
            path = %self.path().display(),
            sessions = snapshot.len(),
            bytes = bytes.len(),
            "Saved snapshot"
        );

        Ok(())
    }

    /// Delete the stored state. Missing files are not an error.
    pub fn clear(&self) {
        let _guard = self.lock.lock();

        match self.file.delete() {
            Ok(()) => tracing::debug!(path = %self.path().display(), "Cleared stored snapshot"),
            Err(e) => {
                tracing::warn!(path = %self.path().display(), error = %e, "Failed to clear snapshot")
            }
        }
    }

    /// Build an auto-save scheduler that persists `source` into this storage
    pub fn auto_save<S>(self: &Arc<Self>, source: S) -> AutoSave
    where
        S: SnapshotSource + 'static,
    {
        AutoSave::new(Arc::new(source), Arc::clone(self) as Arc<dyn SnapshotStore>)
    }
}

impl SnapshotStore for SessionStorage {
    fn save(&self, snapshot: &Snapshot) -> bool {
        SessionStorage::save(self, snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use harbor_session::{BasicEngine, EngineSessionState, Session, SnapshotError, SnapshotItem};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use tempfile::TempDir;

    fn engine() -> Arc<dyn Engine> {
        Arc::new(BasicEngine::new("Gecko"))
    }

    fn snapshot(ids: &[&str], selected_index: usize) -> Snapshot {
        let sessions = ids
            .iter()
            .map(|id| {
                SnapshotItem::new(Session::with_id(*id, format!("https://{}.example", id)).unwrap())
                    .with_engine_state(EngineSessionState::new(json!({ "id": id })))
            })
            .collect();
        Snapshot::new(sessions, selected_index)
    }

    #[test]
    fn test_file_name_for_engine() {
        assert_eq!(
            file_name_for_engine("GeckoView"),
            "harbor_session_storage_geckoview.json"
        );
    }

    #[test]
    fn test_save_restore_clear_scenario() {
        let dir = TempDir::new().unwrap();
        let storage = SessionStorage::open(dir.path(), engine()).unwrap();

        assert!(storage.save(&snapshot(&["a", "b"], 1)));
        let restored = storage.restore().unwrap();
        let ids: Vec<_> = restored.sessions.iter().map(|i| i.session.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(restored.selected_index, 1);

        storage.clear();
        assert!(storage.restore().is_none());

        // Empty snapshot on an absent file
        assert!(storage.save(&Snapshot::empty()));
        assert!(storage.restore().is_none());
        assert!(!storage.path().exists());
    }

    #[test]
    fn test_round_trip() {
        let dir = TempDir::new().unwrap();
        let storage = SessionStorage::open(dir.path(), engine()).unwrap();

        let original = snapshot(&["a", "b", "c"], 2);
        assert!(storage.save(&original));
        assert_eq!(storage.restore().unwrap(), original);

        let replacement = snapshot(&["d"], 0);
        assert!(storage.save(&replacement));
        assert_eq!(storage.restore().unwrap(), replacement);
    }

    #[test]
    fn test_empty_save_clears() {
        let dir = TempDir::new().unwrap();
        let storage = SessionStorage::open(dir.path(), engine()).unwrap();

        assert!(storage.save(&snapshot(&["a"], 0)));
        assert!(storage.path().exists());

        assert!(storage.save(&Snapshot::empty()));
        assert!(!storage.path().exists());
        assert!(storage.restore().is_none());
    }

    #[test]
    fn test_invalid_snapshot_rejected_before_io() {
        let dir = TempDir::new().unwrap();
        let storage = SessionStorage::open(dir.path(), engine()).unwrap();

        // Absent stays absent
        let result = storage.try_save(&snapshot(&["a", "b"], 2));
        assert!(matches!(result, Err(StorageError::InvalidSnapshot(_))));
        assert!(!storage.path().exists());

        // Existing content stays untouched
        let original = snapshot(&["a"], 0);
        assert!(storage.save(&original));
        let before = fs::read(storage.path()).unwrap();
        assert!(storage.try_save(&snapshot(&["x", "y"], 5)).is_err());
        assert_eq!(fs::read(storage.path()).unwrap(), before);
        assert_eq!(storage.restore().unwrap(), original);
    }

    #[test]
    fn test_private_sessions_never_written() {
        let dir = TempDir::new().unwrap();
        let storage = SessionStorage::open(dir.path(), engine()).unwrap();

        let private = Snapshot::new(
            vec![SnapshotItem::new(
                Session::with_id("p", "https://secret.example")
                    .unwrap()
                    .private(),
            )],
            0,
        );
        let result = storage.try_save(&private);
        assert!(matches!(
            result,
            Err(StorageError::InvalidSnapshot(SnapshotError::PrivateSession(ref id))) if id == "p"
        ));
        assert!(!storage.path().exists());
        assert!(!storage.file.new_path().exists());
    }

    #[test]
    #[should_panic(expected = "Refusing to save invalid snapshot")]
    fn test_save_panics_on_invalid_snapshot() {
        let dir = TempDir::new().unwrap();
        let storage = SessionStorage::open(dir.path(), engine()).unwrap();
        storage.save(&snapshot(&["a"], 1));
    }

    #[test]
    fn test_interrupted_write_restores_previous() {
        let dir = TempDir::new().unwrap();
        let storage = SessionStorage::open(dir.path(), engine()).unwrap();

        // Nothing saved yet, crash mid-write
        let file = AtomicFile::new(storage.path());
        let mut partial = file.start_write().unwrap();
        partial.write_all(b"{\"version\":1,\"selected_").unwrap();
        drop(partial);
        assert!(storage.restore().is_none());

        let original = snapshot(&["a", "b"], 0);
        assert!(storage.save(&original));

        let mut partial = file.start_write().unwrap();
        partial.write_all(b"{\"version\":1,\"selected_").unwrap();
        drop(partial);
        assert_eq!(storage.restore().unwrap(), original);
    }

    #[test]
    fn test_encode_failure_keeps_previous_content() {
        let dir = TempDir::new().unwrap();
        let storage = SessionStorage::open(dir.path(), engine()).unwrap();

        let original = snapshot(&["a"], 0);
        assert!(storage.save(&original));

        // BasicEngine refuses non-object blobs
        let bad = Snapshot::new(
            vec![SnapshotItem::new(Session::with_id("z", "https://z.example").unwrap())
                .with_engine_state(EngineSessionState::new(json!("opaque")))],
            0,
        );
        assert!(!storage.save(&bad));
        assert_eq!(storage.restore().unwrap(), original);
        assert!(!AtomicFile::new(storage.path()).new_path().exists());
    }

    #[test]
    fn test_corrupt_file_restores_as_absent() {
        let dir = TempDir::new().unwrap();
        let storage = SessionStorage::open(dir.path(), engine()).unwrap();

        fs::write(storage.path(), b"not json at all").unwrap();
        assert!(storage.restore().is_none());
        // Left for the next save to overwrite
        assert!(storage.path().exists());

        assert!(storage.save(&snapshot(&["a"], 0)));
        assert!(storage.restore().is_some());
    }

    #[test]
    fn test_engines_use_separate_files() {
        let dir = TempDir::new().unwrap();
        let gecko = SessionStorage::open(dir.path(), engine()).unwrap();
        let system = SessionStorage::open(dir.path(), Arc::new(BasicEngine::new("System"))).unwrap();
        assert_ne!(gecko.path(), system.path());

        assert!(gecko.save(&snapshot(&["a"], 0)));
        assert!(system.restore().is_none());

        assert!(system.save(&snapshot(&["b", "c"], 1)));
        gecko.clear();
        assert_eq!(system.restore().unwrap().len(), 2);
    }

    #[test]
    fn test_handles_for_same_file_share_lock() {
        let dir = TempDir::new().unwrap();
        let first = SessionStorage::open(dir.path(), engine()).unwrap();
        let second = SessionStorage::open(dir.path(), Arc::new(BasicEngine::new("GECKO"))).unwrap();

        assert_eq!(first.path(), second.path());
        assert!(Arc::ptr_eq(&first.lock, &second.lock));
    }

    #[test]
    fn test_concurrent_save_and_restore_never_interleave() {
        let dir = TempDir::new().unwrap();
        let storage = SessionStorage::open(dir.path(), engine()).unwrap();

        let old = snapshot(&["a", "b"], 1);
        let new = snapshot(&["c", "d", "e", "f"], 3);
        assert!(storage.save(&old));

        std::thread::scope(|scope| {
            scope.spawn(|| {
                for i in 0..100 {
                    let next = if i % 2 == 0 { &new } else { &old };
                    assert!(storage.save(next));
                }
            });

            for _ in 0..2 {
                scope.spawn(|| {
                    for _ in 0..100 {
                        let seen = storage.restore().expect("a full snapshot is always visible");
                        assert!(seen == old || seen == new);
                    }
                });
            }
        });
    }
}
