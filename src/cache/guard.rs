//! Store availability checks

use crate::cache::fs::StoreFs;
use crate::error::{PersistError, PersistResult};
use std::path::Path;
use tracing::debug;

/// Name of the transient probe written into the store
const PROBE_FILE: &str = ".write_test";

/// Verify the store accepts writes.
///
/// Creates the store directory if needed, then writes and deletes a probe
/// file. Safe to call repeatedly.
pub async fn ensure_writable(fs: &dyn StoreFs, store: &Path) -> PersistResult<()> {
    let probe = store.join(PROBE_FILE);
    let unavailable = |source| PersistError::StoreUnavailable {
        path: store.to_path_buf(),
        source,
    };

    fs.create_dir_all(store).await.map_err(unavailable)?;
    fs.write(&probe, b"ok").await.map_err(unavailable)?;
    fs.remove_all(&probe).await.map_err(unavailable)?;

    debug!("Store writable: {}", store.display());
    Ok(())
}

/// Validation performed before any job work: absolute, present, writable
pub async fn validate_store(fs: &dyn StoreFs, store: &Path) -> PersistResult<()> {
    if !store.is_absolute() {
        return Err(PersistError::StoreNotAbsolute(store.to_path_buf()));
    }
    let present = fs
        .exists(store)
        .await
        .map_err(|e| PersistError::io(format!("checking store {}", store.display()), e))?;
    if !present {
        return Err(PersistError::StoreNotMounted(store.to_path_buf()));
    }
    ensure_writable(fs, store).await
}
