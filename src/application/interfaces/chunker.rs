use crate::domain::{Chunk, DomainError, Language};

/// Size bounds shared by both chunker implementations (§4.3).
#[derive(Debug, Clone, Copy)]
pub struct ChunkerConfig {
    pub min_chunk_size: usize,
    pub max_chunk_size: usize,
    pub chunk_overlap: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            min_chunk_size: 50,
            max_chunk_size: 2000,
            chunk_overlap: 200,
        }
    }
}

/// Splits one file's content into chunks. Implementations never see a
/// not-yet-persisted `Chunk::id` — the chunk store assigns it on insert.
pub trait Chunker: Send + Sync {
    fn chunk(
        &self,
        path: &str,
        content: &str,
        language: Language,
        config: &ChunkerConfig,
        now: i64,
    ) -> Result<Vec<Chunk>, DomainError>;
}
