use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

fn default_limit() -> usize {
    10
}

fn default_true() -> bool {
    true
}

/// Input parameters for the `index_codebase` tool.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct IndexCodebaseInput {
    /// Absolute path to the codebase root.
    pub path: String,

    /// Ignore the merkle cache and re-chunk every file.
    #[serde(default)]
    pub force: bool,

    /// Extra file extensions to index, beyond the built-in defaults.
    pub custom_extensions: Option<Vec<String>>,

    /// Extra ignore patterns, beyond the built-in defaults.
    pub ignore_patterns: Option<Vec<String>>,
}

/// Result of an `index_codebase` call.
#[derive(Debug, Serialize, JsonSchema)]
pub struct IndexCodebaseOutput {
    pub outcome: String,
}

/// Input parameters for the `search_code` tool.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct SearchCodeInput {
    /// Absolute path to the codebase root.
    pub path: String,

    /// Natural-language or keyword search query.
    pub query: String,

    /// Maximum number of results to return (1-50, default 10).
    #[serde(default = "default_limit")]
    pub limit: usize,

    /// Restrict results to these file extensions (e.g. ["rs", "py"]).
    pub extension_filter: Option<Vec<String>>,

    /// Whether to apply the reranking pass (default true).
    #[serde(default = "default_true")]
    pub rerank: bool,
}

/// A single search result returned by the `search_code` tool.
#[derive(Debug, Serialize, JsonSchema)]
pub struct SearchResultOutput {
    pub path: String,
    pub start_line: u32,
    pub end_line: u32,
    pub language: String,
    pub chunk_type: String,
    pub content: String,
    pub bm25_score: f32,
    pub vector_score: f32,
    pub combined_score: f32,
    pub rank: usize,
}

/// Input parameters for the `get_indexing_status` tool.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct GetIndexingStatusInput {
    /// Absolute path to the codebase root.
    pub path: String,
}

/// Input parameters for the `clear_index` tool.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct ClearIndexInput {
    /// Absolute path to the codebase root.
    pub path: String,
}

/// Result of a `clear_index` call.
#[derive(Debug, Serialize, JsonSchema)]
pub struct ClearIndexOutput {
    pub ok: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_result_output_serializes_with_expected_fields() {
        let output = SearchResultOutput {
            path: "src/lib.rs".to_string(),
            start_line: 10,
            end_line: 20,
            language: "rust".to_string(),
            chunk_type: "function".to_string(),
            content: "fn authenticate() {}".to_string(),
            bm25_score: 0.4,
            vector_score: 0.6,
            combined_score: 0.02,
            rank: 1,
        };
        let json = serde_json::to_string(&output).unwrap();
        assert!(json.contains("authenticate"));
        assert!(json.contains("src/lib.rs"));
    }
}
