use std::sync::Arc;

use tracing::info;

use crate::application::{SnapshotStore, StoreFactory};
use crate::domain::DomainError;

/// Drops a repository's chunk store, vector index, and merkle cache, and
/// removes its entry from the snapshot registry (§6 `clear_index`).
pub struct ClearIndexUseCase {
    store_factory: Arc<dyn StoreFactory>,
    snapshot_store: Arc<dyn SnapshotStore>,
}

impl ClearIndexUseCase {
    pub fn new(store_factory: Arc<dyn StoreFactory>, snapshot_store: Arc<dyn SnapshotStore>) -> Self {
        Self {
            store_factory,
            snapshot_store,
        }
    }

    pub fn execute(&self, repo_path: &str) -> Result<(), DomainError> {
        let root = std::path::Path::new(repo_path);
        let canonical = std::fs::canonicalize(root).map_err(DomainError::Io)?;

        self.store_factory.clear(&canonical)?;
        self.snapshot_store.remove(&canonical.to_string_lossy())?;

        info!("cleared index for {}", repo_path);
        Ok(())
    }
}
