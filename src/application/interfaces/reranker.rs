use crate::domain::{DomainError, SearchResult};

/// Cross-encoder reranking of an already-fused result list (§4.7 step 7).
pub trait Reranker: Send + Sync {
    fn rerank(
        &self,
        query: &str,
        results: Vec<SearchResult>,
        top_k: usize,
    ) -> Result<Vec<SearchResult>, DomainError>;

    fn model_name(&self) -> &str;
}
