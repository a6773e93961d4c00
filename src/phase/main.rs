//! Main phase: resolve roots, then save, restore, or schedule cleanup

use crate::cache::{
    ensure_writable, join_within, list_dir, sanitize_repository, validate_patterns, Action,
    GlobResolver, MatchMode, Materializer, PatternMatches, StoreFs, StoreRoots,
};
use crate::config::{Config, Inputs, LinkMode, Mode, ModeInputs};
use crate::error::{PersistError, PersistResult};
use crate::host::{Host, RunContext};
use crate::phase::LogGroup;
use crate::state::MainCheckpoint;
use std::path::Path;
use tracing::{debug, info};

/// Output carrying the resolved destination
pub const DEST_ROOT_OUTPUT: &str = "dest_root";

/// What the main phase did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MainOutcome {
    pub mode: Mode,
    pub roots: StoreRoots,
    /// Materializer journal, in execution order
    pub actions: Vec<Action>,
}

/// Run the main phase against `host` and `fs`
pub async fn execute(
    host: &dyn Host,
    fs: &dyn StoreFs,
    config: &Config,
) -> PersistResult<MainOutcome> {
    let inputs = Inputs::from_host(host, &config.defaults)?;
    if inputs.flags.trace {
        debug!("Trace enabled");
    }

    let ctx = RunContext::from_host(host)?;
    let roots = StoreRoots::resolve(
        inputs.scope,
        &inputs.store,
        &ctx.repository,
        &ctx.ref_name,
        &ctx.run_id,
    );
    let mode = inputs.mode.mode();
    let cleanup = mode == Mode::Cleanup;

    let published = if cleanup {
        &roots.run_root
    } else {
        &roots.dest_root
    };
    host.set_output(DEST_ROOT_OUTPUT, &published.to_string_lossy())?;
    MainCheckpoint {
        roots: roots.clone(),
        scope: inputs.scope,
        dry_run: inputs.flags.dry_run,
        cleanup,
    }
    .save(host)?;

    let mut outcome = MainOutcome {
        mode,
        roots,
        actions: Vec::new(),
    };

    let patterns = match &inputs.mode {
        ModeInputs::Cleanup => {
            info!("cleanup mode: nothing to do in main (deletion happens in post).");
            return Ok(outcome);
        }
        other if other.patterns().is_empty() => {
            info!("No files specified, nothing to do.");
            return Ok(outcome);
        }
        other => other.patterns(),
    };

    // Bad patterns abort before the store is touched
    validate_patterns(patterns)?;
    ensure_writable(fs, &inputs.store).await?;

    let verbose = inputs.flags.verbose;
    if verbose {
        log_context(host, &inputs, &ctx, &outcome.roots);
    }

    let mut materializer = Materializer::new(fs, inputs.flags.dry_run);
    match &inputs.mode {
        ModeInputs::Save { patterns } => {
            let _group = LogGroup::open(host, "persist: resolve & copy (save)", verbose);
            let matches = GlobResolver::new(fs, &ctx.workspace)
                .expand(patterns, MatchMode::Entries)
                .await?;
            let targets = Targets {
                workspace: &ctx.workspace,
                roots: &outcome.roots,
                store: &inputs.store,
            };
            save(host, fs, &mut materializer, &matches, &targets, verbose).await?;
        }
        ModeInputs::Restore { patterns, link } => {
            let title = match link {
                LinkMode::Soft => "persist: restore (soft links / symlinks)",
                LinkMode::Hard => "persist: restore (hard links; copy fallback if cross-device)",
            };
            let _group = LogGroup::open(host, title, verbose);
            let matches = GlobResolver::new(fs, &outcome.roots.dest_root)
                .expand(patterns, MatchMode::Entries)
                .await?;
            let targets = Targets {
                workspace: &ctx.workspace,
                roots: &outcome.roots,
                store: &inputs.store,
            };
            restore(host, fs, &mut materializer, &matches, &targets, *link, verbose).await?;
        }
        ModeInputs::Cleanup => {}
    }

    for action in materializer.actions() {
        if let Action::LinkFallback { src, dst, reason } = action {
            host.warning(&format!(
                "Hardlink failed ({}); copied {} -> {}",
                reason,
                src.display(),
                dst.display()
            ));
        }
    }
    let fallbacks = materializer.fallback_count();
    if fallbacks > 0 {
        info!("{} file(s) copied instead of hard-linked", fallbacks);
    }
    outcome.actions = materializer.into_actions();
    Ok(outcome)
}

/// Roots a match is resolved against
struct Targets<'a> {
    workspace: &'a Path,
    roots: &'a StoreRoots,
    store: &'a Path,
}

fn log_context(host: &dyn Host, inputs: &Inputs, ctx: &RunContext, roots: &StoreRoots) {
    let _group = LogGroup::open(host, "persist: context", true);
    let link = match &inputs.mode {
        ModeInputs::Restore { link, .. } => link.to_string(),
        _ => "-".to_string(),
    };
    info!(
        "mode={} repo={} scope={} link={}",
        inputs.mode.mode(),
        sanitize_repository(&ctx.repository),
        inputs.scope,
        link
    );
    info!("store={}", inputs.store.display());
    info!("dest_root={}", roots.dest_root.display());
    info!("run_root={}", roots.run_root.display());
    info!("workspace={}", ctx.workspace.display());
}

async fn save(
    host: &dyn Host,
    fs: &dyn StoreFs,
    materializer: &mut Materializer<'_>,
    matches: &[PatternMatches],
    targets: &Targets<'_>,
    verbose: bool,
) -> PersistResult<()> {
    for found in matches {
        if found.is_empty() {
            host.warning(&format!("No matches for pattern: {}", found.pattern));
            continue;
        }

        for rel in &found.paths {
            let rel = rel.trim_end_matches('/');
            let src = targets.workspace.join(rel);
            let dst = join_within(&targets.roots.dest_root, rel)?;
            let shown = dst.strip_prefix(targets.store).unwrap_or(&dst);

            let meta = fs
                .metadata(&src)
                .await
                .map_err(|e| PersistError::io(format!("inspecting {}", src.display()), e))?;
            if meta.is_dir() {
                info!("save dir: {} -> {}/", rel, shown.display());
                materializer.copy_with_wipe(&src, &dst).await?;
            } else {
                info!("save file: {} -> {}", rel, shown.display());
                materializer.copy_file(&src, &dst).await?;
            }

            if verbose && !materializer.is_dry_run() {
                list_dir(fs, &dst).await;
            }
        }
    }
    Ok(())
}

/// Restore every match into the workspace.
///
/// A match below an entry already restored in this call is skipped: with
/// soft links its workspace path resolves into the store, and replacing it
/// would delete the stored original.
async fn restore(
    host: &dyn Host,
    fs: &dyn StoreFs,
    materializer: &mut Materializer<'_>,
    matches: &[PatternMatches],
    targets: &Targets<'_>,
    link: LinkMode,
    verbose: bool,
) -> PersistResult<()> {
    let mut restored: Vec<&Path> = Vec::new();
    for found in matches {
        if found.is_empty() {
            host.warning(&format!("Nothing saved for {}", found.pattern));
            continue;
        }

        for rel in &found.paths {
            let rel = rel.trim_end_matches('/');
            if let Some(parent) = restored.iter().find(|done| Path::new(rel).starts_with(done)) {
                debug!("Skipping {}: covered by {}", rel, parent.display());
                continue;
            }
            restored.push(Path::new(rel));

            let src = targets.roots.dest_root.join(rel);
            let dst = join_within(targets.workspace, rel)?;

            match link {
                LinkMode::Soft => materializer.symlink_restore(&src, &dst).await?,
                LinkMode::Hard => materializer.link_or_copy(&src, &dst).await?,
            }

            if verbose && !materializer.is_dry_run() {
                list_dir(fs, &dst).await;
            }
        }
    }
    Ok(())
}
