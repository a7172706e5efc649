use serde::{Deserialize, Serialize};

use super::Chunk;

/// Hard cap on `SearchQuery::limit`, per §6's command surface table.
pub const MAX_SEARCH_LIMIT: usize = 50;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchQuery {
    query: String,
    limit: usize,
    extension_filter: Option<Vec<String>>,
    rerank: bool,
}

impl SearchQuery {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            limit: 10,
            extension_filter: None,
            rerank: true,
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit.clamp(1, MAX_SEARCH_LIMIT);
        self
    }

    pub fn with_extension_filter(mut self, extensions: Vec<String>) -> Self {
        self.extension_filter = Some(extensions);
        self
    }

    pub fn with_rerank(mut self, rerank: bool) -> Self {
        self.rerank = rerank;
        self
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn extension_filter(&self) -> Option<&[String]> {
        self.extension_filter.as_deref()
    }

    pub fn rerank(&self) -> bool {
        self.rerank
    }
}

/// One hit returned from the hybrid searcher, carrying both legs' RRF
/// contributions alongside the fused score (§4.7 step 8).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    chunk: Chunk,
    bm25_score: f32,
    vector_score: f32,
    combined_score: f32,
    rank: usize,
}

impl SearchResult {
    pub fn new(chunk: Chunk, bm25_score: f32, vector_score: f32, combined_score: f32, rank: usize) -> Self {
        Self {
            chunk,
            bm25_score,
            vector_score,
            combined_score,
            rank,
        }
    }

    pub fn chunk(&self) -> &Chunk {
        &self.chunk
    }

    pub fn bm25_score(&self) -> f32 {
        self.bm25_score
    }

    pub fn vector_score(&self) -> f32 {
        self.vector_score
    }

    pub fn combined_score(&self) -> f32 {
        self.combined_score
    }

    pub fn rank(&self) -> usize {
        self.rank
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::chunk::ChunkType;

    #[test]
    fn limit_clamps_to_the_external_interface_bound() {
        let query = SearchQuery::new("foo").with_limit(1000);
        assert_eq!(query.limit(), MAX_SEARCH_LIMIT);
        let query = SearchQuery::new("foo").with_limit(0);
        assert_eq!(query.limit(), 1);
    }

    #[test]
    fn rerank_defaults_to_true() {
        assert!(SearchQuery::new("foo").rerank());
    }

    #[test]
    fn search_result_carries_both_legs_and_the_fused_score() {
        let chunk = Chunk::new("a.py", "def foo(): return 1", 1, 2, "python", ChunkType::Function, 0);
        let result = SearchResult::new(chunk, 0.02, 0.01, 0.03, 1);
        assert_eq!(result.rank(), 1);
        assert!((result.combined_score() - 0.03).abs() < 1e-6);
    }
}
