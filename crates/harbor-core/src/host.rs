//! Session host
//!
//! Owns the live session manager and its storage. On start the caller restores
//! the last saved state, then optionally hands persistence to auto-save.

use parking_lot::Mutex;
use std::sync::Arc;

use harbor_session::{BasicEngine, Engine, SessionManager};
use harbor_storage::{AutoSave, SessionStorage};

use crate::config::Config;
use crate::Result;

pub struct SessionHost {
    config: Config,
    manager: SessionManager,
    storage: Arc<SessionStorage>,
    auto_save: Mutex<Option<AutoSave>>,
}

impl SessionHost {
    /// Open with a [`BasicEngine`] named after `config.engine_name`
    pub fn from_config(config: Config) -> Result<Self> {
        let engine = Arc::new(BasicEngine::new(config.engine_name.clone()));
        Self::open(config, engine)
    }

    pub fn open(config: Config, engine: Arc<dyn Engine>) -> Result<Self> {
        let storage = SessionStorage::open(config.session_dir(), engine)?;

        tracing::info!(path = %storage.path().display(), "Session host ready");

        Ok(Self {
            config,
            manager: SessionManager::new(),
            storage: Arc::new(storage),
            auto_save: Mutex::new(None),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn session_manager(&self) -> &SessionManager {
        &self.manager
    }

    pub fn storage(&self) -> &Arc<SessionStorage> {
        &self.storage
    }

    /// Load the saved sessions into the manager. Returns how many were restored.
    ///
    /// Blocks on disk I/O.
    pub fn restore(&self) -> usize {
        match self.storage.restore() {
            Some(snapshot) => self.manager.restore(snapshot, true),
            None => {
                tracing::info!("No saved sessions to restore");
                0
            }
        }
    }

    /// Start background saving if enabled in the config.
    /// Returns whether auto-save is running afterwards.
    pub fn start_auto_save(&self) -> Result<bool> {
        if !self.config.auto_save {
            tracing::debug!("Auto-save disabled by config");
            return Ok(false);
        }

        let mut slot = self.auto_save.lock();
        let auto_save = slot.get_or_insert_with(|| {
            self.storage
                .auto_save(self.manager.clone())
                .with_interval(self.config.auto_save_interval())
        });
        auto_save.start()?;

        Ok(true)
    }

    pub fn stop_auto_save(&self) {
        if let Some(auto_save) = self.auto_save.lock().as_ref() {
            auto_save.stop();
        }
    }

    pub fn is_auto_saving(&self) -> bool {
        self.auto_save
            .lock()
            .as_ref()
            .map(AutoSave::is_running)
            .unwrap_or(false)
    }

    /// Save the current state now. Blocks on disk I/O.
    pub fn flush(&self) -> bool {
        self.storage.save(&self.manager.create_snapshot())
    }

    /// Forget the saved state
    pub fn clear(&self) {
        self.storage.clear();
    }
}
