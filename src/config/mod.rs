//! Configuration management for persist

pub mod inputs;
pub mod schema;

pub use inputs::{Flags, Inputs, LinkMode, Mode, ModeInputs};
pub use schema::{Config, LogFormat};

use crate::error::{PersistError, PersistResult};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// Configuration manager
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// Create a new config manager with default path
    pub fn new() -> Self {
        Self {
            config_path: Self::default_config_path(),
        }
    }

    /// Create a config manager with a custom path
    pub fn with_path(path: PathBuf) -> Self {
        Self { config_path: path }
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("persist")
            .join("config.toml")
    }

    /// Load configuration, falling back to defaults if the file is absent
    pub async fn load(&self) -> PersistResult<Config> {
        if !self.config_path.exists() {
            debug!("Config file not found, using defaults");
            return Ok(Config::default());
        }

        self.load_from_file(&self.config_path).await
    }

    /// Load configuration from a specific file
    pub async fn load_from_file(&self, path: &Path) -> PersistResult<Config> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| PersistError::io(format!("reading config from {}", path.display()), e))?;

        toml::from_str(&content).map_err(|e| PersistError::ConfigInvalid {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}
