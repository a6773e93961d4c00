//! Post phase: report on and delete the run-scoped directory
//!
//! Runs after every other step of the job, including failed ones. Nothing
//! here may fail the job; errors are logged as warnings.

use crate::cache::{report_dir, Scope, StoreFs};
use crate::config::inputs::names;
use crate::config::Flags;
use crate::error::{PersistError, PersistResult};
use crate::host::Host;
use crate::phase::LogGroup;
use crate::state::PersistedState;
use std::path::{Path, PathBuf};
use tracing::info;

const RUN_SCOPE_LABEL: &str = "run-scope directory";

/// How the post phase ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostOutcome {
    /// Neither cleanup mode nor run scope was active
    NotRequested,
    /// Cleanup was requested but no root was recorded
    NoTarget,
    AlreadyAbsent(PathBuf),
    WouldRemove(PathBuf),
    Removed(PathBuf),
    /// Cleanup failed and was downgraded to a warning
    Failed(String),
}

/// Run the post phase; never returns an error
pub async fn execute(host: &dyn Host, fs: &dyn StoreFs) -> PostOutcome {
    match run(host, fs).await {
        Ok(outcome) => outcome,
        Err(e) => {
            host.warning(&format!("Cleanup failed: {e}"));
            PostOutcome::Failed(e.to_string())
        }
    }
}

async fn run(host: &dyn Host, fs: &dyn StoreFs) -> PersistResult<PostOutcome> {
    let state = PersistedState::load(host);

    // Inputs are visible again in post and may raise the detail level
    let flags = Flags::from_host(host);
    let verbose = flags.verbose || state.verbose;
    let trace = flags.trace || state.trace;
    let cleanup_mode = host
        .input(names::MODE)
        .is_some_and(|mode| mode.eq_ignore_ascii_case("cleanup"));

    let (target, title) = if state.cleanup || cleanup_mode {
        (
            state.run_root.as_deref(),
            "persist: cleanup (remove run-scope directory)",
        )
    } else if state.scope == Some(Scope::Run) && state.dest_root.is_some() {
        (
            state.dest_root.as_deref(),
            "persist: post-cleanup (remove run scope)",
        )
    } else {
        let scope = state.scope.map_or("<none>", |s| s.as_str());
        info!("No cleanup requested; scope={}; leaving files in place.", scope);
        return Ok(PostOutcome::NotRequested);
    };

    let label = format!("{RUN_SCOPE_LABEL} (pre-cleanup)");
    let Some(target) = target else {
        info!("{}: <empty path>", label);
        return Ok(PostOutcome::NoTarget);
    };

    {
        let _group = LogGroup::open(
            host,
            &format!("persist: sanity report for {label} ({})", target.display()),
            true,
        );
        report_dir(fs, &label, target, verbose, trace).await;
    }

    let _group = LogGroup::open(host, title, true);
    remove_dir(fs, target, state.dry_run).await
}

async fn remove_dir(fs: &dyn StoreFs, path: &Path, dry_run: bool) -> PersistResult<PostOutcome> {
    let present = fs
        .exists(path)
        .await
        .map_err(|e| PersistError::io(format!("checking {}", path.display()), e))?;
    if !present {
        info!(
            "{} already removed or never created: {}",
            RUN_SCOPE_LABEL,
            path.display()
        );
        return Ok(PostOutcome::AlreadyAbsent(path.to_path_buf()));
    }

    if dry_run {
        info!("(dry-run) would remove {}: {}", RUN_SCOPE_LABEL, path.display());
        return Ok(PostOutcome::WouldRemove(path.to_path_buf()));
    }

    info!("Removing {}: {}", RUN_SCOPE_LABEL, path.display());
    fs.remove_all(path)
        .await
        .map_err(|e| PersistError::io(format!("removing {}", path.display()), e))?;
    Ok(PostOutcome::Removed(path.to_path_buf()))
}
