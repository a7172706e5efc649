use crate::domain::DomainError;

/// Output of tokenizing and expanding a user query (§4.5, "FTS query
/// construction contract").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessedQuery {
    pub terms: Vec<String>,
    pub fts_expression: String,
}

/// Tokenizes and expands a free-text query into an FTS boolean expression.
pub trait QueryProcessor: Send + Sync {
    fn process(&self, query: &str) -> Result<ProcessedQuery, DomainError>;
}
