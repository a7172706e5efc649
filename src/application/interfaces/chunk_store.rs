use crate::domain::{Chunk, DomainError};

/// Persistent relational store over chunks with a synchronized full-text
/// index (§4.5). `insert_chunks`/`delete_chunks_by_path` are the only writers;
/// every implementation must route both operations through whatever
/// mechanism keeps `chunks_fts` in lockstep with `chunks` (real triggers, or
/// an emulated single-transaction write per DESIGN NOTES §9).
pub trait ChunkStore: Send + Sync {
    /// Batch insert; returns assigned ids in the same order as `chunks`.
    fn insert_chunks(&self, chunks: Vec<Chunk>) -> Result<Vec<i64>, DomainError>;

    /// Removes all chunks (and their FTS rows) for `path`; returns the ids
    /// removed so the caller can cascade the deletion to the vector index.
    fn delete_chunks_by_path(&self, path: &str) -> Result<Vec<i64>, DomainError>;

    /// BM25-ranked full-text search. `expression` is the disjunctive FTS
    /// query built by the query processor. Returns `(chunk_id, bm25_rank_score)`
    /// ordered best-first, restricted to `extension_filter` if given.
    fn search_fts(
        &self,
        expression: &str,
        limit: usize,
        extension_filter: Option<&[String]>,
    ) -> Result<Vec<(i64, f32)>, DomainError>;

    /// Returns chunks in the order of `ids`; missing ids are omitted.
    fn get_by_ids(&self, ids: &[i64]) -> Result<Vec<Chunk>, DomainError>;

    /// Total non-deleted chunk count, used for status reporting.
    fn count(&self) -> Result<usize, DomainError>;

    /// Startup consistency check (§7, "Index integrity error"): every id in
    /// `chunks` must have exactly one row in `chunks_fts`, and vice versa.
    fn check_integrity(&self) -> Result<(), DomainError>;

    /// Recovery path for a failed integrity check: rebuilds `chunks_fts`
    /// entirely from the primary table.
    fn rebuild_fts(&self) -> Result<(), DomainError>;

    /// Drops all chunks (used by `force` reindexing and `clear_index`).
    fn clear(&self) -> Result<(), DomainError>;
}
