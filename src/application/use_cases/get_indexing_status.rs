use std::sync::Arc;

use crate::application::SnapshotStore;
use crate::domain::{CodebaseStatus, DomainError};

/// Reads the current (possibly in-progress) status for a repository (§6).
pub struct GetIndexingStatusUseCase {
    snapshot_store: Arc<dyn SnapshotStore>,
}

impl GetIndexingStatusUseCase {
    pub fn new(snapshot_store: Arc<dyn SnapshotStore>) -> Self {
        Self { snapshot_store }
    }

    pub fn execute(&self, repo_path: &str) -> Result<CodebaseStatus, DomainError> {
        let canonical = std::fs::canonicalize(repo_path)
            .map(|p| p.to_string_lossy().to_string())
            .unwrap_or_else(|_| repo_path.to_string());

        match self.snapshot_store.get(&canonical)? {
            Some(status) => Ok(status),
            None => Ok(CodebaseStatus::not_found(canonical)),
        }
    }

    pub fn list(&self) -> Result<Vec<CodebaseStatus>, DomainError> {
        self.snapshot_store.list()
    }
}
