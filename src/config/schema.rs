//! Configuration schema for persist
//!
//! An optional defaults file, normally `~/.config/persist/config.toml`,
//! lets a runner image pick a different store or scope without touching
//! every workflow. Action inputs always win over it.

use crate::cache::Scope;
use crate::config::inputs::LinkMode;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Fallbacks for omitted action inputs
    pub defaults: DefaultsConfig,

    /// Logging settings
    pub log: LogConfig,
}

/// Fallback values for action inputs
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultsConfig {
    /// Store mount point
    pub store: PathBuf,

    /// Scope used when the `scope` input is omitted
    pub scope: Scope,

    /// Restore strategy used when the `link` input is omitted
    pub link: LinkMode,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            store: PathBuf::from("/store"),
            scope: Scope::Run,
            link: LinkMode::Soft,
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Logging configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Log format: "text" or "json"
    pub format: LogFormat,
}
