//! Phase commands - the entry points invoked by the action runner

use crate::cache::LocalFs;
use crate::config::Config;
use crate::error::PersistResult;
use crate::host::ActionsHost;
use crate::phase::{self, Phase, PostOutcome};
use tracing::debug;

/// Execute one phase against the runner environment
pub async fn execute(which: Phase, config: &Config) -> PersistResult<()> {
    let host = ActionsHost::new();
    let fs = LocalFs::new();
    debug!("Running {} phase", which);

    match which {
        Phase::Pre => phase::pre::execute(&host, &fs, config).await,
        Phase::Main => {
            let outcome = phase::main::execute(&host, &fs, config).await?;
            debug!(
                "{} finished with {} action(s); dest_root={}",
                outcome.mode,
                outcome.actions.len(),
                outcome.roots.dest_root.display()
            );
            Ok(())
        }
        Phase::Post => {
            match phase::post::execute(&host, &fs).await {
                PostOutcome::Failed(reason) => debug!("Post phase degraded: {}", reason),
                outcome => debug!("Post phase outcome: {:?}", outcome),
            }
            Ok(())
        }
    }
}
