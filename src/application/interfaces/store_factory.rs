use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::domain::{CodiiConfig, DomainError};

use super::{ChunkStore, VectorIndex};

/// Everything an indexing or search operation needs for one repository:
/// its own chunk store and vector index (§3, "Ownership" — each repository
/// exclusively owns these), its merkle cache path, its repo id, and its
/// merged configuration.
pub struct RepositoryHandle {
    pub chunk_store: Arc<dyn ChunkStore>,
    pub vector_index: Arc<dyn VectorIndex>,
    pub vectors_path: PathBuf,
    pub merkle_path: PathBuf,
    pub repo_id: String,
    pub config: CodiiConfig,
}

/// Resolves a repository path to its on-disk stores, creating them on first
/// use (§6, "Persisted layout"). Implementations own the long-lived, cached
/// handles — `open` may be called once per operation.
pub trait StoreFactory: Send + Sync {
    fn open(&self, repo_root: &Path) -> Result<Arc<RepositoryHandle>, DomainError>;

    /// Deletes the on-disk chunk store, vector index, and merkle cache for a
    /// repository (used by `clear_index` and `force` reindexing). Not an
    /// error if nothing was indexed.
    fn clear(&self, repo_root: &Path) -> Result<(), DomainError>;
}
