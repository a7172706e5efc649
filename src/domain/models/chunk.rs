use serde::{Deserialize, Serialize};

/// Unit of retrieval: a contiguous, non-empty textual region of one source file.
///
/// `id` is assigned by the chunk store on insert (monotonic integer primary key);
/// a freshly chunked, not-yet-persisted `Chunk` carries `id = None`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    id: Option<i64>,
    path: String,
    content: String,
    start_line: u32,
    end_line: u32,
    language: String,
    chunk_type: ChunkType,
    created_at: i64,
}

impl Chunk {
    /// Builds a chunk fresh out of a chunker, before it has been assigned an id.
    pub fn new(
        path: impl Into<String>,
        content: impl Into<String>,
        start_line: u32,
        end_line: u32,
        language: impl Into<String>,
        chunk_type: ChunkType,
        created_at: i64,
    ) -> Self {
        Self {
            id: None,
            path: path.into(),
            content: content.into(),
            start_line,
            end_line,
            language: language.into(),
            chunk_type,
            created_at,
        }
    }

    /// Rehydrates a chunk already persisted by the chunk store.
    #[allow(clippy::too_many_arguments)]
    pub fn reconstitute(
        id: i64,
        path: String,
        content: String,
        start_line: u32,
        end_line: u32,
        language: String,
        chunk_type: ChunkType,
        created_at: i64,
    ) -> Self {
        Self {
            id: Some(id),
            path,
            content,
            start_line,
            end_line,
            language,
            chunk_type,
            created_at,
        }
    }

    pub fn with_id(mut self, id: i64) -> Self {
        self.id = Some(id);
        self
    }

    pub fn id(&self) -> Option<i64> {
        self.id
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn start_line(&self) -> u32 {
        self.start_line
    }

    pub fn end_line(&self) -> u32 {
        self.end_line
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn chunk_type(&self) -> ChunkType {
        self.chunk_type
    }

    pub fn created_at(&self) -> i64 {
        self.created_at
    }

    pub fn line_count(&self) -> u32 {
        self.end_line.saturating_sub(self.start_line) + 1
    }

    /// Extension of `path`, lowercased, used for the chunk store's extension filter.
    pub fn extension(&self) -> Option<String> {
        std::path::Path::new(&self.path)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
    }

    /// Checks the invariant from §3: content non-empty and within
    /// `[min, max]`, unless it is a single atomic AST node kept whole
    /// (`allow_oversized`) — that exemption waives both bounds, not just the
    /// upper one, since an atomic node can legitimately be shorter than
    /// `min_chunk_size` too.
    pub fn within_size_bounds(&self, min: usize, max: usize, allow_oversized: bool) -> bool {
        let len = self.content.len();
        if len == 0 {
            return false;
        }
        if allow_oversized {
            return true;
        }
        len >= min && len <= max
    }
}

/// Chunk classification, per §3's fixed vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkType {
    Function,
    Class,
    Method,
    Module,
    Comment,
    Text,
}

impl ChunkType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChunkType::Function => "function",
            ChunkType::Class => "class",
            ChunkType::Method => "method",
            ChunkType::Module => "module",
            ChunkType::Comment => "comment",
            ChunkType::Text => "text",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "function" => ChunkType::Function,
            "class" => ChunkType::Class,
            "method" => ChunkType::Method,
            "module" => ChunkType::Module,
            "comment" => ChunkType::Comment,
            _ => ChunkType::Text,
        }
    }
}

impl std::fmt::Display for ChunkType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_chunk_has_no_id_until_assigned() {
        let chunk = Chunk::new("a.py", "def foo(): return 1", 1, 2, "python", ChunkType::Function, 0);
        assert_eq!(chunk.id(), None);
        let persisted = chunk.with_id(7);
        assert_eq!(persisted.id(), Some(7));
    }

    #[test]
    fn line_count_is_inclusive() {
        let chunk = Chunk::new("a.py", "x", 5, 10, "python", ChunkType::Text, 0);
        assert_eq!(chunk.line_count(), 6);
    }

    #[test]
    fn size_bounds_allow_single_oversized_atomic_node() {
        let big = "x".repeat(5000);
        let chunk = Chunk::new("a.rs", big, 1, 1, "rust", ChunkType::Function, 0);
        assert!(!chunk.within_size_bounds(10, 2000, false));
        assert!(chunk.within_size_bounds(10, 2000, true));
    }

    #[test]
    fn size_bounds_allow_single_undersized_atomic_node() {
        let chunk = Chunk::new("a.py", "def foo(): return 1", 1, 1, "python", ChunkType::Function, 0);
        assert!(!chunk.within_size_bounds(50, 2000, false));
        assert!(chunk.within_size_bounds(50, 2000, true));
    }

    #[test]
    fn extension_is_lowercased() {
        let chunk = Chunk::new("src/Main.RS", "x", 1, 1, "rust", ChunkType::Module, 0);
        assert_eq!(chunk.extension().as_deref(), Some("rs"));
    }
}
