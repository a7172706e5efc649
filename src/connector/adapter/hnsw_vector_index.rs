use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use hnsw_rs::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::application::VectorIndex;
use crate::domain::DomainError;

/// Sidecar file recording what the raw HNSW dump alone cannot: dimension,
/// the ids that are present (for a rebuild-on-load fallback), and the
/// soft-deleted set, so a deleted id stays hidden across restarts (§4.6).
#[derive(Debug, Serialize, Deserialize)]
struct IndexMeta {
    dimensions: usize,
    ef_search: usize,
    deleted: Vec<i64>,
}

/// Approximate nearest-neighbor index backed by `hnsw_rs`. Deletion is
/// logical only — `hnsw_rs` has no node-removal primitive, so `mark_deleted`
/// just hides the id from `search` until the index is rebuilt.
///
/// `hnsw_rs` fixes its element capacity at construction, so growth (§4.6:
/// "on overflow the underlying structure is resized (doubling)") and
/// compaction (§4.6, §9: rebuild once over half the entries are
/// soft-deleted) both work the same way — rebuild a fresh `Hnsw` at the new
/// capacity and reinsert. Capacity doubling keeps all entries, including
/// soft-deleted ones; compaction drops the soft-deleted entries instead.
pub struct HnswVectorIndex {
    inner: RwLock<Hnsw<'static, f32, DistCosine>>,
    vectors: RwLock<HashMap<i64, Vec<f32>>>,
    deleted: RwLock<HashSet<i64>>,
    dimensions: usize,
    m: usize,
    ef_construction: usize,
    ef_search: usize,
    capacity: RwLock<usize>,
}

/// Fraction of soft-deleted entries at which a compaction rebuild triggers
/// (§4.6: "a rebuild is triggered only when more than 50% of entries are
/// deleted").
const COMPACTION_THRESHOLD: f64 = 0.5;

impl HnswVectorIndex {
    pub fn new(dimensions: usize, m: usize, ef_construction: usize, ef_search: usize, max_elements: usize) -> Self {
        let hnsw = Hnsw::new(m, max_elements, 16, ef_construction, DistCosine {});
        Self {
            inner: RwLock::new(hnsw),
            vectors: RwLock::new(HashMap::new()),
            deleted: RwLock::new(HashSet::new()),
            dimensions,
            m,
            ef_construction,
            ef_search,
            capacity: RwLock::new(max_elements),
        }
    }

    fn rebuild_locked(&self, capacity: usize, vectors: &HashMap<i64, Vec<f32>>) {
        let hnsw = Hnsw::new(self.m, capacity, 16, self.ef_construction, DistCosine {});
        for (id, vector) in vectors {
            hnsw.insert((vector, *id as usize));
        }
        *self.inner.write().unwrap() = hnsw;
        *self.capacity.write().unwrap() = capacity;
    }

    /// Doubles capacity (repeatedly, if needed) until `needed` fits, then
    /// rebuilds with every existing vector reinserted, soft-deleted ones
    /// included — capacity growth must not disturb the soft-delete state.
    fn grow_if_needed_locked(&self, needed: usize, vectors: &HashMap<i64, Vec<f32>>) {
        let mut capacity = *self.capacity.read().unwrap();
        if needed <= capacity {
            return;
        }
        while needed > capacity {
            capacity *= 2;
        }
        self.rebuild_locked(capacity, vectors);
    }

    /// Internal compaction: once soft-deleted entries pass
    /// `COMPACTION_THRESHOLD`, physically drop them and rebuild at the same
    /// capacity. Not exposed to callers (§9).
    fn compact_if_needed_locked(&self) {
        let deleted_ids: Vec<i64> = {
            let deleted = self.deleted.read().unwrap();
            let total = self.vectors.read().unwrap().len();
            if total == 0 || (deleted.len() as f64 / total as f64) <= COMPACTION_THRESHOLD {
                return;
            }
            deleted.iter().copied().collect()
        };

        let mut vectors = self.vectors.write().unwrap();
        for id in &deleted_ids {
            vectors.remove(id);
        }
        let capacity = *self.capacity.read().unwrap();
        self.rebuild_locked(capacity, &vectors);
        self.deleted.write().unwrap().clear();
        debug!("compacted vector index, dropped {} soft-deleted entries", deleted_ids.len());
    }

    /// Loads from `path`'s sidecar `<path>.meta` plus a re-insertion of every
    /// vector recorded there; returns a fresh, empty index if neither file
    /// exists yet.
    pub fn open(
        path: &Path,
        dimensions: usize,
        m: usize,
        ef_construction: usize,
        ef_search: usize,
        max_elements: usize,
    ) -> Result<Self, DomainError> {
        let meta_path = meta_path_for(path);
        let vectors_path = vectors_path_for(path);

        if !meta_path.exists() || !vectors_path.exists() {
            return Ok(Self::new(dimensions, m, ef_construction, ef_search, max_elements));
        }

        let meta_raw = std::fs::read_to_string(&meta_path).map_err(DomainError::Io)?;
        let meta: IndexMeta = serde_json::from_str(&meta_raw)
            .map_err(|e| DomainError::index_integrity(format!("malformed vector index meta: {e}")))?;

        let vectors_raw = std::fs::read_to_string(&vectors_path).map_err(DomainError::Io)?;
        let vectors: HashMap<i64, Vec<f32>> = serde_json::from_str(&vectors_raw)
            .map_err(|e| DomainError::index_integrity(format!("malformed vector index data: {e}")))?;

        let capacity = max_elements.max(vectors.len() * 2).max(1);
        let index = Self::new(meta.dimensions, m, ef_construction, meta.ef_search, capacity);
        {
            let hnsw = index.inner.write().unwrap();
            for (id, vector) in &vectors {
                hnsw.insert((vector, *id as usize));
            }
        }
        *index.vectors.write().unwrap() = vectors;
        *index.deleted.write().unwrap() = meta.deleted.into_iter().collect();

        debug!("loaded vector index with {} vectors from {:?}", index.vectors.read().unwrap().len(), path);
        Ok(index)
    }
}

fn meta_path_for(path: &Path) -> PathBuf {
    let mut s = path.as_os_str().to_os_string();
    s.push(".meta");
    PathBuf::from(s)
}

fn vectors_path_for(path: &Path) -> PathBuf {
    let mut s = path.as_os_str().to_os_string();
    s.push(".vectors");
    PathBuf::from(s)
}

impl VectorIndex for HnswVectorIndex {
    fn add(&self, id: i64, vector: Vec<f32>) -> Result<(), DomainError> {
        if vector.len() != self.dimensions {
            return Err(DomainError::VectorDimensionMismatch {
                expected: self.dimensions,
                actual: vector.len(),
            });
        }

        let mut vectors = self.vectors.write().unwrap();
        let was_present = vectors.contains_key(&id);
        vectors.insert(id, vector.clone());

        let needed = vectors.len();
        let capacity_before = *self.capacity.read().unwrap();
        self.grow_if_needed_locked(needed, &vectors);
        let grew = *self.capacity.read().unwrap() != capacity_before;

        // A grow rebuild already reinserted every vector, including this
        // one; only insert directly when no rebuild happened.
        if !grew {
            if was_present {
                // hnsw_rs has no update-in-place; a replace is a rebuild too.
                self.rebuild_locked(capacity_before, &vectors);
            } else {
                self.inner.write().unwrap().insert((&vector, id as usize));
            }
        }
        self.deleted.write().unwrap().remove(&id);
        Ok(())
    }

    fn add_batch(&self, items: Vec<(i64, Vec<f32>)>) -> Result<(), DomainError> {
        for (id, vector) in items {
            self.add(id, vector)?;
        }
        Ok(())
    }

    fn mark_deleted(&self, id: i64) -> Result<(), DomainError> {
        self.deleted.write().unwrap().insert(id);
        self.compact_if_needed_locked();
        Ok(())
    }

    fn search(&self, vector: &[f32], k: usize, ef_search: Option<usize>) -> Result<Vec<(i64, f32)>, DomainError> {
        if vector.len() != self.dimensions {
            return Err(DomainError::VectorDimensionMismatch {
                expected: self.dimensions,
                actual: vector.len(),
            });
        }
        let ef = ef_search.unwrap_or(self.ef_search);
        let deleted = self.deleted.read().unwrap();

        // Over-fetch to absorb soft-deleted hits, since hnsw_rs has no way
        // to exclude ids from the search itself.
        let fetch = (k + deleted.len()).max(k * 2);
        let neighbours = self.inner.read().unwrap().search(vector, fetch, ef);

        let mut results: Vec<(i64, f32)> = neighbours
            .into_iter()
            .map(|n| (n.d_id as i64, 1.0 - n.distance))
            .filter(|(id, _)| !deleted.contains(id))
            .collect();
        results.truncate(k);
        Ok(results)
    }

    fn save(&self, path: &Path) -> Result<(), DomainError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(DomainError::Io)?;
        }

        let vectors = self.vectors.read().unwrap();
        let vectors_json = serde_json::to_string(&*vectors).map_err(|e| DomainError::internal(e.to_string()))?;
        std::fs::write(vectors_path_for(path), vectors_json).map_err(DomainError::Io)?;

        let meta = IndexMeta {
            dimensions: self.dimensions,
            ef_search: self.ef_search,
            deleted: self.deleted.read().unwrap().iter().copied().collect(),
        };
        let meta_json = serde_json::to_string_pretty(&meta).map_err(|e| DomainError::internal(e.to_string()))?;
        std::fs::write(meta_path_for(path), meta_json).map_err(DomainError::Io)?;

        debug!("saved vector index with {} vectors to {:?}", vectors.len(), path);
        Ok(())
    }

    fn contains(&self, id: i64) -> Result<bool, DomainError> {
        let deleted = self.deleted.read().unwrap();
        Ok(self.vectors.read().unwrap().contains_key(&id) && !deleted.contains(&id))
    }

    fn clear(&self) -> Result<(), DomainError> {
        let capacity = 1024;
        *self.inner.write().unwrap() = Hnsw::new(self.m, capacity, 16, self.ef_construction, DistCosine {});
        *self.capacity.write().unwrap() = capacity;
        self.vectors.write().unwrap().clear();
        self.deleted.write().unwrap().clear();
        Ok(())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn len(&self) -> Result<usize, DomainError> {
        let deleted = self.deleted.read().unwrap();
        Ok(self.vectors.read().unwrap().len().saturating_sub(deleted.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_vector(dims: usize, seed: f32) -> Vec<f32> {
        let mut v = vec![0.0; dims];
        v[0] = seed;
        v[1] = 1.0;
        v
    }

    #[test]
    fn add_then_search_returns_the_vector() {
        let index = HnswVectorIndex::new(4, 16, 200, 50, 1000);
        index.add(1, unit_vector(4, 0.1)).unwrap();
        index.add(2, unit_vector(4, 5.0)).unwrap();

        let results = index.search(&unit_vector(4, 0.1), 1, None).unwrap();
        assert_eq!(results[0].0, 1);
    }

    #[test]
    fn mark_deleted_hides_from_search() {
        let index = HnswVectorIndex::new(4, 16, 200, 50, 1000);
        index.add(1, unit_vector(4, 0.1)).unwrap();
        index.mark_deleted(1).unwrap();

        let results = index.search(&unit_vector(4, 0.1), 5, None).unwrap();
        assert!(results.iter().all(|(id, _)| *id != 1));
        assert_eq!(index.len().unwrap(), 0);
    }

    #[test]
    fn dimension_mismatch_is_rejected() {
        let index = HnswVectorIndex::new(4, 16, 200, 50, 1000);
        let err = index.add(1, vec![0.0, 1.0]).unwrap_err();
        assert!(matches!(err, DomainError::VectorDimensionMismatch { .. }));
    }

    #[test]
    fn capacity_doubles_past_the_initial_max_elements() {
        let index = HnswVectorIndex::new(4, 16, 200, 50, 2);
        for i in 0..10 {
            index.add(i, unit_vector(4, i as f32)).unwrap();
        }
        assert_eq!(index.len().unwrap(), 10);
        assert!(*index.capacity.read().unwrap() >= 10);

        let results = index.search(&unit_vector(4, 7.0), 1, None).unwrap();
        assert_eq!(results[0].0, 7);
    }

    #[test]
    fn deleting_past_half_compacts_and_drops_entries() {
        let index = HnswVectorIndex::new(4, 16, 200, 50, 1000);
        for i in 0..4 {
            index.add(i, unit_vector(4, i as f32)).unwrap();
        }
        index.mark_deleted(0).unwrap();
        index.mark_deleted(1).unwrap();
        index.mark_deleted(2).unwrap();

        // compaction clears the deleted set by physically dropping entries
        assert!(index.deleted.read().unwrap().is_empty());
        assert_eq!(index.len().unwrap(), 1);
        assert!(index.contains(3).unwrap());
    }
}
