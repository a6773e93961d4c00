//! Host CI platform channel
//!
//! Inputs, per-run state, step outputs and environment values all come from
//! the platform running the job. Phases only see them through [`Host`].

mod actions;
mod memory;

pub use actions::ActionsHost;
pub use memory::MemoryHost;

use crate::error::{PersistError, PersistResult};
use std::path::PathBuf;
use tracing::warn;

/// Environment variables supplied by the platform
pub mod vars {
    pub const REPOSITORY: &str = "GITHUB_REPOSITORY";
    pub const REF_NAME: &str = "GITHUB_REF_NAME";
    pub const RUN_ID: &str = "GITHUB_RUN_ID";
    pub const WORKSPACE: &str = "GITHUB_WORKSPACE";
}

/// Key-value channel to the platform running the job
pub trait Host: Send + Sync {
    /// Action input, trimmed; `None` when unset or blank
    fn input(&self, name: &str) -> Option<String>;

    /// State saved by an earlier phase of the same step
    fn state(&self, key: &str) -> Option<String>;

    /// Save state for later phases of the same step
    fn save_state(&self, key: &str, value: &str) -> PersistResult<()>;

    /// Publish a step output
    fn set_output(&self, key: &str, value: &str) -> PersistResult<()>;

    /// Read a platform environment value
    fn var(&self, name: &str) -> Option<String>;

    /// Report a problem that does not fail the step.
    ///
    /// Platforms that support it surface the message as a job annotation.
    fn warning(&self, message: &str) {
        warn!("{}", message);
    }

    /// Open a collapsible log group
    fn start_group(&self, _title: &str) {}

    fn end_group(&self) {}
}

/// Identity of the running job, read once per phase
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunContext {
    pub repository: String,
    pub ref_name: String,
    pub run_id: String,
    pub workspace: PathBuf,
}

impl RunContext {
    /// Read the run identity from the host.
    ///
    /// The repository is required; the workspace falls back to the current
    /// directory.
    pub fn from_host(host: &dyn Host) -> PersistResult<Self> {
        let repository = host
            .var(vars::REPOSITORY)
            .filter(|v| !v.is_empty())
            .ok_or(PersistError::MissingEnv(vars::REPOSITORY))?;

        let workspace = match host.var(vars::WORKSPACE).filter(|v| !v.is_empty()) {
            Some(ws) => PathBuf::from(ws),
            None => std::env::current_dir()
                .map_err(|e| PersistError::io("getting current directory", e))?,
        };

        Ok(Self {
            repository,
            ref_name: host.var(vars::REF_NAME).unwrap_or_default(),
            run_id: host.var(vars::RUN_ID).unwrap_or_default(),
            workspace,
        })
    }
}
