//! Pre phase: fail fast on a missing or read-only store

use crate::cache::{validate_store, StoreFs};
use crate::config::{Config, Inputs};
use crate::error::PersistResult;
use crate::host::Host;
use crate::state::PreCheckpoint;
use tracing::{debug, info};

/// Validate inputs and the store, then record the flags for post
pub async fn execute(host: &dyn Host, fs: &dyn StoreFs, config: &Config) -> PersistResult<()> {
    let inputs = Inputs::from_host(host, &config.defaults)?;
    if inputs.flags.trace {
        debug!("Trace enabled");
    }

    validate_store(fs, &inputs.store).await?;
    info!("Store OK: {}", inputs.store.display());

    PreCheckpoint {
        verbose: inputs.flags.verbose,
        trace: inputs.flags.trace,
        dry_run: inputs.flags.dry_run,
    }
    .save(host)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::testing::RecordingFs;
    use crate::error::PersistError;
    use crate::host::MemoryHost;
    use crate::state::keys;
    use tempfile::TempDir;

    #[tokio::test]
    async fn records_flags_for_valid_store() {
        let temp = TempDir::new().unwrap();
        let host = MemoryHost::new()
            .with_input("mode", "save")
            .with_input("store", temp.path().to_str().unwrap())
            .with_input("verbose", "true");
        let fs = RecordingFs::new();

        execute(&host, &fs, &Config::default()).await.unwrap();

        let saved = host.saved_state();
        assert_eq!(saved[keys::PRE_CHECKED], "true");
        assert_eq!(saved[keys::VERBOSE], "true");
        assert_eq!(saved[keys::TRACE], "false");
        assert_eq!(saved[keys::DRY_RUN], "false");
        // probe removed again
        assert_eq!(std::fs::read_dir(temp.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn relative_store_rejected() {
        let host = MemoryHost::new()
            .with_input("mode", "save")
            .with_input("store", "store");
        let fs = RecordingFs::new();

        let err = execute(&host, &fs, &Config::default()).await.unwrap_err();
        assert!(matches!(err, PersistError::StoreNotAbsolute(_)));
        assert!(fs.calls().is_empty());
        assert!(host.saved_state().is_empty());
    }

    #[tokio::test]
    async fn missing_store_rejected_with_hint() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("not-mounted");
        let host = MemoryHost::new()
            .with_input("mode", "restore")
            .with_input("store", missing.to_str().unwrap());

        let err = execute(&host, &RecordingFs::new(), &Config::default())
            .await
            .unwrap_err();
        assert!(matches!(err, PersistError::StoreNotMounted(_)));
        assert!(err.hint().is_some());
        assert!(!missing.exists());
        assert!(host.saved_state().is_empty());
    }

    #[tokio::test]
    async fn invalid_inputs_fail_before_store_check() {
        let host = MemoryHost::new()
            .with_input("mode", "cleanup")
            .with_input("scope", "global");
        let fs = RecordingFs::new();

        let err = execute(&host, &fs, &Config::default()).await.unwrap_err();
        assert!(err.is_configuration());
        assert!(fs.calls().is_empty());
    }
}
