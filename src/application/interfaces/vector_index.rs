use std::path::Path;

use crate::domain::DomainError;

/// Approximate nearest-neighbor index over chunk vectors (§4.6).
pub trait VectorIndex: Send + Sync {
    /// Inserts or replaces the vector for `id`.
    fn add(&self, id: i64, vector: Vec<f32>) -> Result<(), DomainError>;

    fn add_batch(&self, items: Vec<(i64, Vec<f32>)>) -> Result<(), DomainError>;

    /// Logical delete; `id` is never returned by `search` until re-added.
    fn mark_deleted(&self, id: i64) -> Result<(), DomainError>;

    /// Up to `k` non-deleted ids ordered by descending cosine similarity.
    /// `ef_search` overrides the index's default search width for this query.
    fn search(&self, vector: &[f32], k: usize, ef_search: Option<usize>) -> Result<Vec<(i64, f32)>, DomainError>;

    /// Persists the index to `path`, with a sibling `<path>.meta` file
    /// recording dimension, capacity, size, and soft-deleted ids.
    fn save(&self, path: &Path) -> Result<(), DomainError>;

    fn contains(&self, id: i64) -> Result<bool, DomainError>;

    /// Drops every entry, returning the index to a fresh, empty state (used
    /// by `force` reindexing and `clear_index`).
    fn clear(&self) -> Result<(), DomainError>;

    fn dimensions(&self) -> usize;

    fn len(&self) -> Result<usize, DomainError>;

    fn is_empty(&self) -> Result<bool, DomainError> {
        Ok(self.len()? == 0)
    }
}
