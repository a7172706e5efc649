use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use crate::application::Reranker;
use crate::domain::{DomainError, SearchResult};

/// Deterministic stand-in for a cross-encoder reranker (§4.4's reranking
/// model is out of scope here, same as the embedding model). Hashes the
/// query against each chunk's content so identical inputs always reorder
/// the same way.
pub struct MockReranker;

impl MockReranker {
    pub fn new() -> Self {
        Self
    }
}

impl Default for MockReranker {
    fn default() -> Self {
        Self::new()
    }
}

impl Reranker for MockReranker {
    fn rerank(
        &self,
        query: &str,
        results: Vec<SearchResult>,
        top_k: usize,
    ) -> Result<Vec<SearchResult>, DomainError> {
        if results.is_empty() {
            return Ok(Vec::new());
        }

        let mut query_hasher = DefaultHasher::new();
        query.hash(&mut query_hasher);
        let query_hash = query_hasher.finish();

        let mut scored: Vec<(SearchResult, f32)> = results
            .into_iter()
            .map(|result| {
                let mut hasher = DefaultHasher::new();
                query_hash.hash(&mut hasher);
                result.chunk().content().hash(&mut hasher);
                let score = (hasher.finish() % 10_000) as f32 / 10_000.0;
                (result, score)
            })
            .collect();

        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(top_k);

        let reranked = scored
            .into_iter()
            .enumerate()
            .map(|(rank, (result, score))| {
                SearchResult::new(result.chunk().clone(), result.bm25_score(), score, result.combined_score(), rank + 1)
            })
            .collect();

        Ok(reranked)
    }

    fn model_name(&self) -> &str {
        "mock-reranker"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Chunk, ChunkType};

    fn result(path: &str) -> SearchResult {
        SearchResult::new(Chunk::new(path, "fn x() {}", 1, 1, "rust", ChunkType::Function, 0), 0.1, 0.1, 0.2, 1)
    }

    #[test]
    fn reranking_is_deterministic() {
        let reranker = MockReranker::new();
        let results = vec![result("a.rs"), result("b.rs")];
        let a = reranker.rerank("query", results.clone(), 2).unwrap();
        let b = reranker.rerank("query", results, 2).unwrap();
        assert_eq!(a[0].vector_score(), b[0].vector_score());
    }

    #[test]
    fn truncates_to_top_k() {
        let reranker = MockReranker::new();
        let results: Vec<SearchResult> = (0..10).map(|i| result(&format!("{i}.rs"))).collect();
        let reranked = reranker.rerank("q", results, 3).unwrap();
        assert_eq!(reranked.len(), 3);
    }
}
