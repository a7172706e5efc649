use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tracing::info;

use crate::application::{ChunkStore, RepositoryHandle, StoreFactory, VectorIndex};
use crate::domain::{repository_id, CodiiConfig, CodiiConfigOverride, DomainError};

use super::{HnswVectorIndex, SqliteChunkStore};

/// Name of the per-project override file merged over `CodiiConfig::default()` (§6).
const PROJECT_CONFIG_FILE: &str = ".codii.yaml";

/// Initial vector index capacity floor (§4.6: `max(initial_file_chunks * 2, 1024)`);
/// the factory has no file count at `open` time, so every repository starts here
/// and grows by doubling as chunks accumulate.
const DEFAULT_INITIAL_CAPACITY: usize = 1024;

/// Resolves `CODII_BASE_DIR`, falling back to `~/.codii` (§6, "Environment variables").
pub fn resolve_base_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("CODII_BASE_DIR") {
        if !dir.is_empty() {
            return PathBuf::from(dir);
        }
    }
    let home = std::env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));
    home.join(".codii")
}

/// Resolves a repository root to its on-disk stores under the persisted layout
/// (§6): `indexes/<hash>/{chunks.db,vectors.hnsw}`, `merkle/<hash>.json`. Opened
/// handles are cached per repository id for the process lifetime so a background
/// indexing run's mutations are immediately visible to a subsequent search in the
/// same process, without a reload from disk (§5).
pub struct FilesystemStoreFactory {
    base_dir: PathBuf,
    dimensions: usize,
    handles: Mutex<HashMap<String, Arc<RepositoryHandle>>>,
}

impl FilesystemStoreFactory {
    pub fn new(base_dir: impl Into<PathBuf>, dimensions: usize) -> Self {
        Self {
            base_dir: base_dir.into(),
            dimensions,
            handles: Mutex::new(HashMap::new()),
        }
    }

    pub fn from_env(dimensions: usize) -> Self {
        Self::new(resolve_base_dir(), dimensions)
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn snapshot_path(&self) -> PathBuf {
        self.base_dir.join("snapshots").join("snapshot.json")
    }

    fn indexes_dir(&self, repo_id: &str) -> PathBuf {
        self.base_dir.join("indexes").join(repo_id)
    }

    fn merkle_path(&self, repo_id: &str) -> PathBuf {
        self.base_dir.join("merkle").join(format!("{repo_id}.json"))
    }

    /// Loads `.codii.yaml` from the repo root, if present, and merges it over
    /// the built-in defaults (§6; list fields additive, everything else overrides).
    fn load_config(repo_root: &Path) -> Result<CodiiConfig, DomainError> {
        let config_path = repo_root.join(PROJECT_CONFIG_FILE);
        if !config_path.exists() {
            return Ok(CodiiConfig::default());
        }
        let raw = fs::read_to_string(&config_path).map_err(DomainError::Io)?;
        let overrides: CodiiConfigOverride = serde_yaml::from_str(&raw)
            .map_err(|e| DomainError::configuration(format!("malformed {PROJECT_CONFIG_FILE}: {e}")))?;
        Ok(CodiiConfig::default().merge(overrides))
    }

    fn build_handle(&self, repo_root: &Path) -> Result<RepositoryHandle, DomainError> {
        let canonical = repo_root.to_string_lossy().to_string();
        let repo_id = repository_id(&canonical);
        let config = Self::load_config(repo_root)?;

        let index_dir = self.indexes_dir(&repo_id);
        fs::create_dir_all(&index_dir).map_err(DomainError::Io)?;

        let chunk_store: Arc<dyn ChunkStore> = Arc::new(SqliteChunkStore::open(&index_dir.join("chunks.db"))?);

        let vector_index: Arc<dyn VectorIndex> = Arc::new(HnswVectorIndex::open(
            &index_dir.join("vectors.hnsw"),
            self.dimensions,
            config.hnsw_m,
            config.hnsw_ef_construction,
            config.hnsw_ef_search,
            DEFAULT_INITIAL_CAPACITY,
        )?);

        Ok(RepositoryHandle {
            chunk_store,
            vector_index,
            vectors_path: index_dir.join("vectors.hnsw"),
            merkle_path: self.merkle_path(&repo_id),
            repo_id,
            config,
        })
    }
}

impl StoreFactory for FilesystemStoreFactory {
    fn open(&self, repo_root: &Path) -> Result<Arc<RepositoryHandle>, DomainError> {
        let canonical = repo_root.to_string_lossy().to_string();
        let repo_id = repository_id(&canonical);

        let mut handles = self.handles.lock().unwrap();
        if let Some(handle) = handles.get(&repo_id) {
            return Ok(handle.clone());
        }

        let handle = Arc::new(self.build_handle(repo_root)?);
        handles.insert(repo_id, handle.clone());
        Ok(handle)
    }

    fn clear(&self, repo_root: &Path) -> Result<(), DomainError> {
        let canonical = repo_root.to_string_lossy().to_string();
        let repo_id = repository_id(&canonical);

        self.handles.lock().unwrap().remove(&repo_id);

        let index_dir = self.indexes_dir(&repo_id);
        if index_dir.exists() {
            fs::remove_dir_all(&index_dir).map_err(DomainError::Io)?;
        }
        let merkle_path = self.merkle_path(&repo_id);
        if merkle_path.exists() {
            fs::remove_file(&merkle_path).map_err(DomainError::Io)?;
        }

        info!("cleared stores for repository {}", repo_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn repo(dir: &Path) -> PathBuf {
        fs::create_dir_all(dir).unwrap();
        dir.canonicalize().unwrap()
    }

    #[test]
    fn open_creates_the_persisted_layout() {
        let base = tempdir().unwrap();
        let repo_dir = tempdir().unwrap();
        let factory = FilesystemStoreFactory::new(base.path(), 4);

        let handle = factory.open(&repo(repo_dir.path())).unwrap();
        assert_eq!(handle.config, CodiiConfig::default());

        let index_dir = base.path().join("indexes").join(&handle.repo_id);
        assert!(index_dir.join("chunks.db").exists());
    }

    #[test]
    fn open_is_cached_across_calls() {
        let base = tempdir().unwrap();
        let repo_dir = tempdir().unwrap();
        let factory = FilesystemStoreFactory::new(base.path(), 4);

        let root = repo(repo_dir.path());
        let first = factory.open(&root).unwrap();
        first.chunk_store.insert_chunks(vec![]).unwrap();
        let second = factory.open(&root).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn project_yaml_overrides_merge_over_defaults() {
        let base = tempdir().unwrap();
        let repo_dir = tempdir().unwrap();
        let root = repo(repo_dir.path());
        fs::write(root.join(".codii.yaml"), "max_chunk_size: 4000\nignore_patterns:\n  - vendor/\n").unwrap();

        let factory = FilesystemStoreFactory::new(base.path(), 4);
        let handle = factory.open(&root).unwrap();

        assert_eq!(handle.config.max_chunk_size, 4000);
        assert!(handle.config.ignore_patterns.contains(&"vendor/".to_string()));
        assert!(handle.config.ignore_patterns.contains(&".git/".to_string()));
    }

    #[test]
    fn clear_removes_the_index_directory_and_evicts_the_cache() {
        let base = tempdir().unwrap();
        let repo_dir = tempdir().unwrap();
        let root = repo(repo_dir.path());
        let factory = FilesystemStoreFactory::new(base.path(), 4);

        let handle = factory.open(&root).unwrap();
        let index_dir = base.path().join("indexes").join(&handle.repo_id);
        assert!(index_dir.exists());

        factory.clear(&root).unwrap();
        assert!(!index_dir.exists());
    }

    #[test]
    fn resolve_base_dir_honors_the_env_override() {
        std::env::set_var("CODII_BASE_DIR", "/tmp/codii-test-override");
        assert_eq!(resolve_base_dir(), PathBuf::from("/tmp/codii-test-override"));
        std::env::remove_var("CODII_BASE_DIR");
    }
}
