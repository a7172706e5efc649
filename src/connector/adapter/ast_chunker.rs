use std::collections::BTreeSet;

use streaming_iterator::StreamingIterator;
use tracing::debug;
use tree_sitter::{Parser, Query, QueryCursor};

use crate::application::{Chunker, ChunkerConfig};
use crate::domain::{Chunk, ChunkType, DomainError, Language};

use super::text_chunker::TextChunker;

/// Tree-sitter chunker: one chunk per semantic node (function, class, method,
/// module) per language, with a module chunk covering the top-level regions
/// a query misses (§4.3). Falls back to `TextChunker` when a file has no
/// grammar or fails to parse.
pub struct AstChunker {
    fallback: TextChunker,
}

impl AstChunker {
    pub fn new() -> Self {
        Self {
            fallback: TextChunker::new(),
        }
    }

    fn ts_language(language: Language) -> Option<tree_sitter::Language> {
        match language {
            Language::Rust => Some(tree_sitter_rust::LANGUAGE.into()),
            Language::Python => Some(tree_sitter_python::LANGUAGE.into()),
            Language::JavaScript => Some(tree_sitter_javascript::LANGUAGE.into()),
            Language::TypeScript => Some(tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into()),
            Language::Go => Some(tree_sitter_go::LANGUAGE.into()),
            Language::Unknown => None,
        }
    }

    fn query_patterns(language: Language) -> &'static str {
        match language {
            Language::Rust => {
                r#"
                (function_item) @function
                (impl_item) @class
                (struct_item) @class
                (enum_item) @class
                (trait_item) @class
                (mod_item) @module
                "#
            }
            Language::Python => {
                r#"
                (function_definition) @function
                (class_definition) @class
                "#
            }
            Language::JavaScript => {
                r#"
                (function_declaration) @function
                (class_declaration) @class
                (method_definition) @method
                (arrow_function) @function
                "#
            }
            Language::TypeScript => {
                r#"
                (function_declaration) @function
                (class_declaration) @class
                (method_definition) @method
                (arrow_function) @function
                (interface_declaration) @class
                "#
            }
            Language::Go => {
                r#"
                (function_declaration) @function
                (method_declaration) @method
                (type_declaration) @class
                "#
            }
            Language::Unknown => "",
        }
    }

    fn capture_to_chunk_type(capture_name: &str) -> ChunkType {
        match capture_name {
            "function" => ChunkType::Function,
            "class" => ChunkType::Class,
            "method" => ChunkType::Method,
            "module" => ChunkType::Module,
            _ => ChunkType::Text,
        }
    }
}

impl Default for AstChunker {
    fn default() -> Self {
        Self::new()
    }
}

impl Chunker for AstChunker {
    fn chunk(
        &self,
        path: &str,
        content: &str,
        language: Language,
        config: &ChunkerConfig,
        now: i64,
    ) -> Result<Vec<Chunk>, DomainError> {
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }

        let Some(ts_language) = Self::ts_language(language) else {
            return self.fallback.chunk(path, content, language, config, now);
        };

        let mut parser = Parser::new();
        if parser.set_language(&ts_language).is_err() {
            return self.fallback.chunk(path, content, language, config, now);
        }

        let Some(tree) = parser.parse(content, None) else {
            debug!("tree-sitter failed to parse {}, falling back to text chunker", path);
            return self.fallback.chunk(path, content, language, config, now);
        };

        let query_source = Self::query_patterns(language);
        if query_source.is_empty() {
            return self.fallback.chunk(path, content, language, config, now);
        }

        let query = match Query::new(&ts_language, query_source) {
            Ok(q) => q,
            Err(_) => return self.fallback.chunk(path, content, language, config, now),
        };

        let capture_names: Vec<&str> = query.capture_names().to_vec();
        let mut cursor = QueryCursor::new();
        let text_bytes = content.as_bytes();
        let mut matches_iter = cursor.matches(&query, tree.root_node(), text_bytes);

        let mut chunks = Vec::new();
        let mut covered_lines: BTreeSet<u32> = BTreeSet::new();

        while let Some(query_match) = matches_iter.next() {
            for capture in query_match.captures {
                let capture_name = capture_names
                    .get(capture.index as usize)
                    .copied()
                    .unwrap_or("");
                let node = capture.node;
                let node_content = content[node.byte_range()].to_string();

                if node_content.trim().is_empty() {
                    continue;
                }

                let start_line = node.start_position().row as u32 + 1;
                let end_line = node.end_position().row as u32 + 1;
                let chunk_type = Self::capture_to_chunk_type(capture_name);

                let allow_oversized = matches!(chunk_type, ChunkType::Function | ChunkType::Method | ChunkType::Class);
                let chunk = Chunk::new(path, node_content, start_line, end_line, language.as_str(), chunk_type, now);
                if !chunk.within_size_bounds(config.min_chunk_size, config.max_chunk_size, allow_oversized) {
                    continue;
                }

                for line in start_line..=end_line {
                    covered_lines.insert(line);
                }
                chunks.push(chunk);
            }
        }

        // Fill module-level chunks for uncovered regions (imports, top-level
        // statements, comments not captured by the query above).
        let total_lines = content.lines().count() as u32;
        let mut region_start: Option<u32> = None;
        for line in 1..=total_lines {
            if covered_lines.contains(&line) {
                if let Some(start) = region_start.take() {
                    push_module_region(&mut chunks, path, content, language, config, now, start, line - 1);
                }
            } else if region_start.is_none() {
                region_start = Some(line);
            }
        }
        if let Some(start) = region_start {
            push_module_region(&mut chunks, path, content, language, config, now, start, total_lines);
        }

        if chunks.is_empty() {
            return self.fallback.chunk(path, content, language, config, now);
        }

        chunks.sort_by_key(|c| c.start_line());
        Ok(chunks)
    }
}

#[allow(clippy::too_many_arguments)]
fn push_module_region(
    chunks: &mut Vec<Chunk>,
    path: &str,
    content: &str,
    language: Language,
    config: &ChunkerConfig,
    now: i64,
    start: u32,
    end: u32,
) {
    let lines: Vec<&str> = content.lines().collect();
    let slice_start = start.saturating_sub(1) as usize;
    let slice_end = (end as usize).min(lines.len());
    if slice_start >= slice_end {
        return;
    }
    let text = lines[slice_start..slice_end].join("\n");
    if text.trim().is_empty() {
        return;
    }
    let chunk = Chunk::new(path, text, start, end, language.as_str(), ChunkType::Module, now);
    if chunk.within_size_bounds(config.min_chunk_size, config.max_chunk_size, false) {
        chunks.push(chunk);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ChunkerConfig {
        ChunkerConfig {
            min_chunk_size: 1,
            max_chunk_size: 5000,
            chunk_overlap: 0,
        }
    }

    #[test]
    fn extracts_rust_functions() {
        let chunker = AstChunker::new();
        let content = "fn hello() {\n    println!(\"hi\");\n}\n\nfn add(a: i32, b: i32) -> i32 {\n    a + b\n}\n";
        let chunks = chunker.chunk("a.rs", content, Language::Rust, &config(), 0).unwrap();

        assert!(chunks.iter().any(|c| c.chunk_type() == ChunkType::Function));
    }

    #[test]
    fn falls_back_to_text_chunker_for_unknown_language() {
        let chunker = AstChunker::new();
        let content = "just some text\nwith multiple lines\n";
        let chunks = chunker.chunk("a.txt", content, Language::Unknown, &config(), 0).unwrap();

        assert!(!chunks.is_empty());
        assert!(chunks.iter().all(|c| c.chunk_type() == ChunkType::Text));
    }

    #[test]
    fn unparsable_content_falls_back_without_error() {
        let chunker = AstChunker::new();
        let content = "{{{ not actually rust ((( ";
        let result = chunker.chunk("a.rs", content, Language::Rust, &config(), 0);
        assert!(result.is_ok());
    }
}
