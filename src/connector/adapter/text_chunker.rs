use crate::application::{Chunker, ChunkerConfig};
use crate::domain::{Chunk, ChunkType, DomainError, Language};

/// Sliding-window chunker used for languages without a tree-sitter grammar,
/// and as the fallback when AST chunking fails to parse a file (§4.3).
pub struct TextChunker;

impl TextChunker {
    pub fn new() -> Self {
        Self
    }
}

impl Default for TextChunker {
    fn default() -> Self {
        Self::new()
    }
}

impl Chunker for TextChunker {
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

        let lines: Vec<&str> = content.lines().collect();
        if lines.is_empty() {
            return Ok(Vec::new());
        }

        let mut chunks = Vec::new();
        let mut start = 0usize;

        while start < lines.len() {
            let mut end = start;
            let mut size = 0usize;
            while end < lines.len() && size < config.max_chunk_size {
                size += lines[end].len() + 1;
                end += 1;
            }

            let window = lines[start..end].join("\n");
            if window.len() >= config.min_chunk_size || end == lines.len() {
                chunks.push(Chunk::new(
                    path,
                    window,
                    start as u32 + 1,
                    end as u32,
                    language.as_str(),
                    ChunkType::Text,
                    now,
                ));
            }

            if end >= lines.len() {
                break;
            }

            // Step forward leaving `chunk_overlap` bytes worth of trailing
            // lines in view for the next window.
            let mut back = end;
            let mut overlap_size = 0usize;
            while back > start && overlap_size < config.chunk_overlap {
                back -= 1;
                overlap_size += lines[back].len() + 1;
            }
            start = back.max(start + 1);
        }

        Ok(chunks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ChunkerConfig {
        ChunkerConfig {
            min_chunk_size: 10,
            max_chunk_size: 50,
            chunk_overlap: 10,
        }
    }

    #[test]
    fn empty_content_yields_no_chunks() {
        let chunker = TextChunker::new();
        let chunks = chunker.chunk("a.txt", "   \n  ", Language::Unknown, &config(), 0).unwrap();
        assert!(chunks.is_empty());
    }

    #[test]
    fn windows_advance_and_cover_the_whole_file() {
        let chunker = TextChunker::new();
        let content = (0..20).map(|i| format!("line {i}")).collect::<Vec<_>>().join("\n");
        let chunks = chunker.chunk("a.txt", &content, Language::Unknown, &config(), 0).unwrap();

        assert!(chunks.len() > 1);
        assert_eq!(chunks.last().unwrap().end_line() as usize, 20);
    }

    #[test]
    fn consecutive_windows_overlap() {
        let chunker = TextChunker::new();
        let content = (0..20).map(|i| format!("line {i}")).collect::<Vec<_>>().join("\n");
        let chunks = chunker.chunk("a.txt", &content, Language::Unknown, &config(), 0).unwrap();

        if chunks.len() > 1 {
            assert!(chunks[1].start_line() <= chunks[0].end_line());
        }
    }
}
