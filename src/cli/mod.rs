use clap::Subcommand;

#[derive(Subcommand)]
pub enum Commands {
    /// Index a codebase, creating or incrementally updating its stores.
    IndexCodebase {
        /// Path to the codebase root.
        path: String,

        /// Ignore the merkle cache and re-chunk every file.
        #[arg(short, long)]
        force: bool,

        /// Extra file extensions to index, beyond the built-in defaults.
        #[arg(long)]
        custom_extensions: Option<Vec<String>>,

        /// Extra ignore patterns, beyond the built-in defaults.
        #[arg(long)]
        ignore_patterns: Option<Vec<String>>,

        /// Block until the background indexing worker finishes.
        #[arg(long)]
        wait: bool,
    },

    /// Search an indexed codebase.
    SearchCode {
        /// Path to the codebase root.
        path: String,

        /// Natural-language or keyword search query.
        query: String,

        /// Maximum number of results (1-50).
        #[arg(short, long, default_value = "10")]
        limit: usize,

        /// Restrict results to these file extensions (e.g. "rs", "py").
        #[arg(long)]
        extension_filter: Option<Vec<String>>,

        /// Disable the reranking pass.
        #[arg(long)]
        no_rerank: bool,
    },

    /// Report the current (possibly in-progress) indexing status.
    GetIndexingStatus {
        /// Path to the codebase root.
        path: String,
    },

    /// Drop a codebase's stores and status entry.
    ClearIndex {
        /// Path to the codebase root.
        path: String,
    },

    /// Start the MCP (Model Context Protocol) server over stdio.
    Mcp,
}
