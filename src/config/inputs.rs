//! Action inputs
//!
//! Inputs are parsed once per phase into a tagged union with one variant per
//! mode. Each variant carries only what that mode uses.

use crate::cache::{parse_patterns, Scope};
use crate::config::schema::DefaultsConfig;
use crate::error::{PersistError, PersistResult};
use crate::host::Host;
use crate::state::truthy;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Input names understood by the action
pub mod names {
    pub const MODE: &str = "mode";
    pub const FILES: &str = "files";
    pub const STORE: &str = "store";
    pub const SCOPE: &str = "scope";
    pub const LINK: &str = "link";
    pub const VERBOSE: &str = "verbose";
    pub const TRACE: &str = "trace";
    pub const DRY_RUN: &str = "dry-run";
}

/// Restore strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkMode {
    /// Symbolic links into the store
    #[serde(alias = "symlink")]
    Soft,
    /// Hard links, copying where linking fails
    Hard,
}

impl fmt::Display for LinkMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Soft => write!(f, "soft"),
            Self::Hard => write!(f, "hard"),
        }
    }
}

impl FromStr for LinkMode {
    type Err = PersistError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "soft" | "symlink" => Ok(Self::Soft),
            "hard" => Ok(Self::Hard),
            _ => Err(PersistError::InvalidInput {
                name: names::LINK,
                value: s.to_string(),
                expected: "'soft', 'symlink', or 'hard'",
            }),
        }
    }
}

/// Operating mode without its payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Save,
    Restore,
    Cleanup,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Save => write!(f, "save"),
            Self::Restore => write!(f, "restore"),
            Self::Cleanup => write!(f, "cleanup"),
        }
    }
}

impl FromStr for Mode {
    type Err = PersistError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "save" => Ok(Self::Save),
            "restore" => Ok(Self::Restore),
            "cleanup" => Ok(Self::Cleanup),
            _ => Err(PersistError::InvalidInput {
                name: names::MODE,
                value: s.to_string(),
                expected: "'save', 'restore', or 'cleanup'",
            }),
        }
    }
}

/// Mode-specific inputs
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModeInputs {
    /// Copy workspace paths into the store
    Save { patterns: Vec<String> },
    /// Bring stored paths back into the workspace
    Restore {
        patterns: Vec<String>,
        link: LinkMode,
    },
    /// Delete the run-scoped subtree after the job
    Cleanup,
}

impl ModeInputs {
    pub fn mode(&self) -> Mode {
        match self {
            Self::Save { .. } => Mode::Save,
            Self::Restore { .. } => Mode::Restore,
            Self::Cleanup => Mode::Cleanup,
        }
    }

    /// Patterns to materialize; empty for cleanup
    pub fn patterns(&self) -> &[String] {
        match self {
            Self::Save { patterns } | Self::Restore { patterns, .. } => patterns,
            Self::Cleanup => &[],
        }
    }
}

/// Logging and safety switches shared by every mode
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Flags {
    pub verbose: bool,
    pub trace: bool,
    pub dry_run: bool,
}

impl Flags {
    /// Read the switches without validating anything else
    pub fn from_host(host: &dyn Host) -> Self {
        Self {
            verbose: truthy(host.input(names::VERBOSE).as_deref()),
            trace: truthy(host.input(names::TRACE).as_deref()),
            dry_run: truthy(host.input(names::DRY_RUN).as_deref()),
        }
    }
}

/// Fully validated inputs for one phase
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inputs {
    pub mode: ModeInputs,
    pub store: PathBuf,
    pub scope: Scope,
    pub flags: Flags,
}

impl Inputs {
    /// Parse and validate inputs, filling omissions from `defaults`
    pub fn from_host(host: &dyn Host, defaults: &DefaultsConfig) -> PersistResult<Self> {
        let mode: Mode = host
            .input(names::MODE)
            .ok_or(PersistError::MissingInput(names::MODE))?
            .parse()?;

        let store = host
            .input(names::STORE)
            .map(PathBuf::from)
            .unwrap_or_else(|| defaults.store.clone());
        let scope = match host.input(names::SCOPE) {
            Some(raw) => raw.parse()?,
            None => defaults.scope,
        };
        let link = match host.input(names::LINK) {
            Some(raw) => raw.parse()?,
            None => defaults.link,
        };
        let patterns = host
            .input(names::FILES)
            .map(|raw| parse_patterns(&raw))
            .unwrap_or_default();

        let mode = match mode {
            Mode::Save => ModeInputs::Save { patterns },
            Mode::Restore => ModeInputs::Restore { patterns, link },
            Mode::Cleanup => {
                if scope != Scope::Run {
                    return Err(PersistError::config(format!(
                        "scope '{scope}' cannot be used with mode 'cleanup'; \
                         cleanup only removes the run-scoped directory (use scope 'run')"
                    )));
                }
                ModeInputs::Cleanup
            }
        };

        Ok(Self {
            mode,
            store,
            scope,
            flags: Flags::from_host(host),
        })
    }
}
