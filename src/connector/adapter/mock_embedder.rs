use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use rand::Rng;
use rand::SeedableRng;
use tracing::debug;

use crate::application::Embedder;
use crate::domain::DomainError;

/// Deterministic, hash-seeded embedder standing in for a real sentence
/// encoder (§4.4's model is an explicit external collaborator, out of scope
/// here). Every call for the same text produces the same L2-normalized
/// vector, so search and indexing behave consistently in tests.
pub struct MockEmbedder {
    dimensions: usize,
    batch_size: usize,
}

impl MockEmbedder {
    pub fn new(dimensions: usize, batch_size: usize) -> Self {
        Self {
            dimensions,
            batch_size,
        }
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut hasher = DefaultHasher::new();
        text.hash(&mut hasher);
        let seed = hasher.finish();

        let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
        let mut vector: Vec<f32> = (0..self.dimensions).map(|_| rng.gen_range(-1.0..1.0)).collect();

        let magnitude: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if magnitude > 0.0 {
            for x in &mut vector {
                *x /= magnitude;
            }
        }
        vector
    }
}

impl Default for MockEmbedder {
    fn default() -> Self {
        Self::new(384, 32)
    }
}

impl Embedder for MockEmbedder {
    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, DomainError> {
        let vectors: Vec<Vec<f32>> = texts.iter().map(|t| self.embed_one(t)).collect();
        debug!("generated {} mock embeddings", vectors.len());
        Ok(vectors)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn batch_size(&self) -> usize {
        self.batch_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_text_is_deterministic() {
        let embedder = MockEmbedder::default();
        let a = embedder.embed_query("hello world").unwrap();
        let b = embedder.embed_query("hello world").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn vectors_are_l2_normalized() {
        let embedder = MockEmbedder::default();
        let vector = embedder.embed_query("test").unwrap();
        let magnitude: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((magnitude - 1.0).abs() < 0.001);
    }

    #[test]
    fn respects_configured_dimensions() {
        let embedder = MockEmbedder::new(128, 16);
        assert_eq!(embedder.embed_query("x").unwrap().len(), 128);
    }
}
