use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use fs2::FileExt;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::application::SnapshotStore;
use crate::domain::{CodebaseStatus, DomainError};

/// On-disk shape of `snapshot.json`: repository path → status, sorted so the
/// file stays diff-friendly across runs (§4.8).
#[derive(Debug, Default, Serialize, Deserialize)]
struct Registry {
    #[serde(flatten)]
    entries: BTreeMap<String, CodebaseStatus>,
}

/// File-locked registry of per-repository indexing status, read-modify-write
/// under an exclusive advisory lock with atomic rename-over-target writes.
pub struct JsonSnapshotStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonSnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    fn read_registry(&self) -> Result<Registry, DomainError> {
        if !self.path.exists() {
            return Ok(Registry::default());
        }

        let mut file = File::open(&self.path).map_err(DomainError::Io)?;
        file.lock_shared().map_err(DomainError::Io)?;
        let mut contents = String::new();
        file.read_to_string(&mut contents).map_err(DomainError::Io)?;
        file.unlock().map_err(DomainError::Io)?;

        if contents.trim().is_empty() {
            return Ok(Registry::default());
        }
        serde_json::from_str(&contents)
            .map_err(|e| DomainError::index_integrity(format!("malformed snapshot.json: {e}")))
    }

    fn write_registry(&self, registry: &Registry) -> Result<(), DomainError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(DomainError::Io)?;
        }

        let lock_file = OpenOptions::new()
            .create(true)
            .write(true)
            .open(&self.path)
            .map_err(DomainError::Io)?;
        lock_file.lock_exclusive().map_err(DomainError::Io)?;

        let json = serde_json::to_string_pretty(registry)
            .map_err(|e| DomainError::internal(format!("failed to serialize snapshot.json: {e}")))?;

        let tmp_path = self.path.with_extension("json.tmp");
        {
            let mut tmp = File::create(&tmp_path).map_err(DomainError::Io)?;
            tmp.write_all(json.as_bytes()).map_err(DomainError::Io)?;
            tmp.sync_all().map_err(DomainError::Io)?;
        }
        std::fs::rename(&tmp_path, &self.path).map_err(DomainError::Io)?;

        lock_file.unlock().map_err(DomainError::Io)?;
        Ok(())
    }

    fn with_registry<F>(&self, f: F) -> Result<(), DomainError>
    where
        F: FnOnce(&mut Registry),
    {
        let _guard = self.write_lock.lock().unwrap();
        let mut registry = self.read_registry()?;
        f(&mut registry);
        self.write_registry(&registry)
    }
}

fn canonical_key(path: &str) -> String {
    Path::new(path)
        .canonicalize()
        .map(|p| p.to_string_lossy().to_string())
        .unwrap_or_else(|_| path.to_string())
}

impl SnapshotStore for JsonSnapshotStore {
    fn get(&self, path: &str) -> Result<Option<CodebaseStatus>, DomainError> {
        let registry = self.read_registry()?;
        Ok(registry.entries.get(&canonical_key(path)).cloned())
    }

    fn upsert(&self, status: CodebaseStatus) -> Result<(), DomainError> {
        let key = canonical_key(&status.path);
        self.with_registry(|registry| {
            registry.entries.insert(key, status);
        })?;
        debug!("upserted snapshot entry");
        Ok(())
    }

    fn remove(&self, path: &str) -> Result<(), DomainError> {
        let key = canonical_key(path);
        self.with_registry(|registry| {
            registry.entries.remove(&key);
        })
    }

    fn list(&self) -> Result<Vec<CodebaseStatus>, DomainError> {
        let registry = self.read_registry()?;
        Ok(registry.entries.into_values().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn status(path: &str) -> CodebaseStatus {
        CodebaseStatus::starting(path, 1)
    }

    #[test]
    fn missing_file_yields_empty_registry() {
        let dir = tempdir().unwrap();
        let store = JsonSnapshotStore::new(dir.path().join("snapshot.json"));
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn upsert_then_get_round_trips() {
        let dir = tempdir().unwrap();
        let snapshot_path = dir.path().join("snapshot.json");
        let store = JsonSnapshotStore::new(&snapshot_path);

        let repo = dir.path().join("repo");
        std::fs::create_dir_all(&repo).unwrap();
        let repo_path = repo.to_string_lossy().to_string();

        store.upsert(status(&repo_path)).unwrap();
        let fetched = store.get(&repo_path).unwrap();
        assert!(fetched.is_some());
        assert_eq!(fetched.unwrap().path, canonical_key(&repo_path));
    }

    #[test]
    fn remove_drops_the_entry() {
        let dir = tempdir().unwrap();
        let store = JsonSnapshotStore::new(dir.path().join("snapshot.json"));
        let repo = dir.path().join("repo");
        std::fs::create_dir_all(&repo).unwrap();
        let repo_path = repo.to_string_lossy().to_string();

        store.upsert(status(&repo_path)).unwrap();
        store.remove(&repo_path).unwrap();
        assert!(store.get(&repo_path).unwrap().is_none());
    }

    #[test]
    fn writes_are_atomic_and_survive_concurrent_upserts() {
        let dir = tempdir().unwrap();
        let store = JsonSnapshotStore::new(dir.path().join("snapshot.json"));

        for i in 0..5 {
            let repo = dir.path().join(format!("repo{i}"));
            std::fs::create_dir_all(&repo).unwrap();
            store.upsert(status(&repo.to_string_lossy())).unwrap();
        }

        assert_eq!(store.list().unwrap().len(), 5);
    }
}
