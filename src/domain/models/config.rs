use serde::{Deserialize, Serialize};

/// Merged configuration for one repository: built-in defaults overridden (or,
/// for the two list fields, extended) by `.codii.yaml` (§6).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CodiiConfig {
    pub ignore_patterns: Vec<String>,
    pub extensions: Vec<String>,
    pub embedding_model: String,
    pub embedding_batch_size: usize,
    pub max_chunk_size: usize,
    pub min_chunk_size: usize,
    pub chunk_overlap: usize,
    pub hnsw_m: usize,
    pub hnsw_ef_construction: usize,
    pub hnsw_ef_search: usize,
    pub default_search_limit: usize,
    pub max_search_limit: usize,
    pub bm25_weight: f32,
    pub vector_weight: f32,
}

impl Default for CodiiConfig {
    fn default() -> Self {
        Self {
            ignore_patterns: vec![
                ".git/".to_string(),
                "node_modules/".to_string(),
                "target/".to_string(),
                "__pycache__/".to_string(),
                ".venv/".to_string(),
                "dist/".to_string(),
                "build/".to_string(),
            ],
            extensions: vec![
                "rs".to_string(),
                "py".to_string(),
                "js".to_string(),
                "jsx".to_string(),
                "mjs".to_string(),
                "cjs".to_string(),
                "ts".to_string(),
                "tsx".to_string(),
                "go".to_string(),
                "txt".to_string(),
                "md".to_string(),
            ],
            embedding_model: "sentence-transformers/all-MiniLM-L6-v2".to_string(),
            embedding_batch_size: 32,
            max_chunk_size: 2000,
            min_chunk_size: 50,
            chunk_overlap: 200,
            hnsw_m: 16,
            hnsw_ef_construction: 200,
            hnsw_ef_search: 100,
            default_search_limit: 10,
            max_search_limit: 50,
            bm25_weight: 0.5,
            vector_weight: 0.5,
        }
    }
}

impl CodiiConfig {
    /// Merges a partially-specified project override over these defaults.
    /// `ignore_patterns` and `extensions` are additive (§6); every other
    /// field, when present in `other`, replaces the default wholesale.
    pub fn merge(mut self, other: CodiiConfigOverride) -> Self {
        if let Some(patterns) = other.ignore_patterns {
            self.ignore_patterns.extend(patterns);
        }
        if let Some(extensions) = other.extensions {
            self.extensions.extend(extensions);
        }
        if let Some(v) = other.embedding_model {
            self.embedding_model = v;
        }
        if let Some(v) = other.embedding_batch_size {
            self.embedding_batch_size = v;
        }
        if let Some(v) = other.max_chunk_size {
            self.max_chunk_size = v;
        }
        if let Some(v) = other.min_chunk_size {
            self.min_chunk_size = v;
        }
        if let Some(v) = other.chunk_overlap {
            self.chunk_overlap = v;
        }
        if let Some(v) = other.hnsw_m {
            self.hnsw_m = v;
        }
        if let Some(v) = other.hnsw_ef_construction {
            self.hnsw_ef_construction = v;
        }
        if let Some(v) = other.hnsw_ef_search {
            self.hnsw_ef_search = v;
        }
        if let Some(v) = other.default_search_limit {
            self.default_search_limit = v;
        }
        if let Some(v) = other.max_search_limit {
            self.max_search_limit = v;
        }
        if let Some(v) = other.bm25_weight {
            self.bm25_weight = v;
        }
        if let Some(v) = other.vector_weight {
            self.vector_weight = v;
        }
        self
    }
}

/// Shape of `.codii.yaml` as parsed off disk: every key optional so a partial
/// file only overrides what it names.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CodiiConfigOverride {
    pub ignore_patterns: Option<Vec<String>>,
    pub extensions: Option<Vec<String>>,
    pub embedding_model: Option<String>,
    pub embedding_batch_size: Option<usize>,
    pub max_chunk_size: Option<usize>,
    pub min_chunk_size: Option<usize>,
    pub chunk_overlap: Option<usize>,
    pub hnsw_m: Option<usize>,
    pub hnsw_ef_construction: Option<usize>,
    pub hnsw_ef_search: Option<usize>,
    pub default_search_limit: Option<usize>,
    pub max_search_limit: Option<usize>,
    pub bm25_weight: Option<f32>,
    pub vector_weight: Option<f32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_fields_are_additive() {
        let merged = CodiiConfig::default().merge(CodiiConfigOverride {
            ignore_patterns: Some(vec!["vendor/".to_string()]),
            ..Default::default()
        });
        assert!(merged.ignore_patterns.contains(&"vendor/".to_string()));
        assert!(merged.ignore_patterns.contains(&".git/".to_string()));
    }

    #[test]
    fn scalar_fields_override() {
        let merged = CodiiConfig::default().merge(CodiiConfigOverride {
            max_chunk_size: Some(4000),
            ..Default::default()
        });
        assert_eq!(merged.max_chunk_size, 4000);
        assert_eq!(merged.min_chunk_size, CodiiConfig::default().min_chunk_size);
    }
}
