use crate::domain::DomainError;

/// Stateless batched `text[] → vector[]` call (§4.4). The underlying model
/// instance is a process-wide singleton owned by the adapter; this trait is
/// the pure-function surface callers see.
pub trait Embedder: Send + Sync {
    /// Embeds a batch of texts, L2-normalized, all of `dimensions()` length.
    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, DomainError>;

    /// Embeds a single query string using the original text, not an expanded
    /// lexical expression (§4.7 step 1).
    fn embed_query(&self, query: &str) -> Result<Vec<f32>, DomainError> {
        Ok(self
            .embed(std::slice::from_ref(&query.to_string()))?
            .into_iter()
            .next()
            .unwrap_or_default())
    }

    fn dimensions(&self) -> usize;

    fn batch_size(&self) -> usize;
}
