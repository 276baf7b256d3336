//! Harbor configuration

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::CoreError;
use crate::Result;

const DEFAULT_AUTO_SAVE_INTERVAL_MS: u64 = 2000;
const DEFAULT_ENGINE_NAME: &str = "Gecko";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory holding the session storage files
    pub data_dir: PathBuf,
    /// Engine whose sessions are stored; also picks the storage file name
    pub engine_name: String,
    /// Persist session changes in the background
    pub auto_save: bool,
    /// How often auto-save checks for changes
    pub auto_save_interval_ms: u64,
}

impl Config {
    pub fn new(data_dir: PathBuf) -> Self {
        Self {
            data_dir,
            engine_name: DEFAULT_ENGINE_NAME.to_string(),
            auto_save: true,
            auto_save_interval_ms: DEFAULT_AUTO_SAVE_INTERVAL_MS,
        }
    }

    pub fn data_dir() -> PathBuf {
        dirs::data_local_dir()
            .map(|d| d.join("Harbor"))
            .unwrap_or_else(|| PathBuf::from(".harbor"))
    }

    /// Load a TOML config file; missing keys keep their defaults
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;

        toml::from_str(&contents)
            .map_err(|e| CoreError::Config(format!("Failed to parse {}: {}", path.display(), e)))
    }

    /// Directory the session files live in
    pub fn session_dir(&self) -> PathBuf {
        self.data_dir.join("sessions")
    }

    pub fn auto_save_interval(&self) -> Duration {
        Duration::from_millis(self.auto_save_interval_ms)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(Self::data_dir())
    }
}
