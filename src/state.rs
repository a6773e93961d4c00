//! Cross-phase state persistence
//!
//! The pre, main and post phases run as separate processes. Everything the
//! post phase needs is written to the host state channel at two checkpoints
//! and read back as one [`PersistedState`].

use crate::cache::{Scope, StoreRoots};
use crate::error::PersistResult;
use crate::host::Host;
use std::path::PathBuf;
use tracing::debug;

/// State channel keys
pub mod keys {
    pub const PRE_CHECKED: &str = "preChecked";
    pub const DEST_ROOT: &str = "destRoot";
    pub const RUN_ROOT: &str = "runRoot";
    pub const SCOPE: &str = "scope";
    pub const DRY_RUN: &str = "dryRun";
    pub const VERBOSE: &str = "verbose";
    pub const TRACE: &str = "trace";
    pub const CLEANUP: &str = "cleanup";
}

/// Parse a channel boolean; only a case-insensitive `true` is true
pub fn truthy(value: Option<&str>) -> bool {
    value.is_some_and(|v| v.trim().eq_ignore_ascii_case("true"))
}

fn flag(value: bool) -> &'static str {
    if value {
        "true"
    } else {
        "false"
    }
}

/// Record written at the end of the pre phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreCheckpoint {
    pub verbose: bool,
    pub trace: bool,
    pub dry_run: bool,
}

impl PreCheckpoint {
    pub fn save(&self, host: &dyn Host) -> PersistResult<()> {
        host.save_state(keys::PRE_CHECKED, "true")?;
        host.save_state(keys::VERBOSE, flag(self.verbose))?;
        host.save_state(keys::TRACE, flag(self.trace))?;
        host.save_state(keys::DRY_RUN, flag(self.dry_run))?;
        Ok(())
    }
}

/// Record written by the main phase before any filesystem work
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MainCheckpoint {
    pub roots: StoreRoots,
    pub scope: Scope,
    pub dry_run: bool,
    pub cleanup: bool,
}

impl MainCheckpoint {
    pub fn save(&self, host: &dyn Host) -> PersistResult<()> {
        host.save_state(keys::DEST_ROOT, &self.roots.dest_root.to_string_lossy())?;
        host.save_state(keys::RUN_ROOT, &self.roots.run_root.to_string_lossy())?;
        host.save_state(keys::SCOPE, self.scope.as_str())?;
        host.save_state(keys::DRY_RUN, flag(self.dry_run))?;
        if self.cleanup {
            host.save_state(keys::CLEANUP, "true")?;
        }
        Ok(())
    }
}

/// Everything the post phase knows about earlier phases
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersistedState {
    pub pre_checked: bool,
    pub dest_root: Option<PathBuf>,
    pub run_root: Option<PathBuf>,
    pub scope: Option<Scope>,
    pub dry_run: bool,
    pub verbose: bool,
    pub trace: bool,
    pub cleanup: bool,
}

impl PersistedState {
    /// Read the state channel; missing or malformed values fall back to defaults
    pub fn load(host: &dyn Host) -> Self {
        let get = |key: &str| host.state(key);
        let scope = get(keys::SCOPE).and_then(|s| match s.parse::<Scope>() {
            Ok(scope) => Some(scope),
            Err(_) => {
                debug!("Ignoring unknown persisted scope '{}'", s);
                None
            }
        });

        Self {
            pre_checked: truthy(get(keys::PRE_CHECKED).as_deref()),
            dest_root: get(keys::DEST_ROOT).map(PathBuf::from),
            run_root: get(keys::RUN_ROOT).map(PathBuf::from),
            scope,
            dry_run: truthy(get(keys::DRY_RUN).as_deref()),
            verbose: truthy(get(keys::VERBOSE).as_deref()),
            trace: truthy(get(keys::TRACE).as_deref()),
            cleanup: truthy(get(keys::CLEANUP).as_deref()),
        }
    }
}
