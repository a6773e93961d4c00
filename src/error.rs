//! Error types for persist
//!
//! All modules use `PersistResult<T>` as their return type.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for persist operations
pub type PersistResult<T> = Result<T, PersistError>;

/// All errors that can occur in persist
#[derive(Error, Debug)]
pub enum PersistError {
    // Configuration errors
    #[error("{0}")]
    Configuration(String),

    #[error("Invalid {name} '{value}' (use {expected})")]
    InvalidInput {
        name: &'static str,
        value: String,
        expected: &'static str,
    },

    #[error("Input required and not supplied: {0}")]
    MissingInput(&'static str),

    #[error("{0} is not set")]
    MissingEnv(&'static str),

    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    // Store errors
    #[error("Store must be an absolute path; got \"{}\"", .0.display())]
    StoreNotAbsolute(PathBuf),

    #[error("Store not mounted: {}", .0.display())]
    StoreNotMounted(PathBuf),

    #[error("Store not mounted or not writable: {}", .path.display())]
    StoreUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // Pattern errors
    #[error("Invalid pattern (absolute or contains '..'): {0}")]
    InvalidPattern(String),

    #[error("Invalid glob pattern '{pattern}': {reason}")]
    GlobSyntax { pattern: String, reason: String },

    #[error("Refusing to write outside dest root: {}", .0.display())]
    PathEscape(PathBuf),

    // Host channel errors
    #[error("Failed to write {channel} for '{key}'")]
    HostChannel {
        channel: &'static str,
        key: String,
        #[source]
        source: std::io::Error,
    },

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PersistError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Whether the error stems from bad inputs rather than the filesystem
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::Configuration(_)
                | Self::InvalidInput { .. }
                | Self::MissingInput(_)
                | Self::MissingEnv(_)
                | Self::ConfigInvalid { .. }
                | Self::StoreNotAbsolute(_)
                | Self::InvalidPattern(_)
                | Self::GlobSyntax { .. }
        )
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::StoreNotMounted(_) | Self::StoreUnavailable { .. } => Some(
                "mount with container.options: -v /data/act_runner/store:/store:rw,z",
            ),
            Self::InvalidPattern(_) => {
                Some("patterns are relative to the workspace and may not leave it")
            }
            Self::MissingEnv(_) => Some("run inside a GitHub or Gitea Actions job"),
            _ => None,
        }
    }
}
