use std::sync::Arc;

use rmcp::handler::server::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::{
    CallToolResult, Content, Implementation, ProtocolVersion, ServerCapabilities, ServerInfo,
};
use rmcp::tool;
use rmcp::tool_handler;
use rmcp::tool_router;
use rmcp::ErrorData as McpError;
use rmcp::ServerHandler;

use crate::connector::api::Container;
use crate::domain::SearchQuery;

use super::tools::{
    ClearIndexInput, ClearIndexOutput, GetIndexingStatusInput, IndexCodebaseInput,
    IndexCodebaseOutput, SearchCodeInput, SearchResultOutput,
};

/// Server-side maximum for the number of results a single search can return (§6).
const MAX_LIMIT: usize = 50;

fn to_mcp_error(err: crate::domain::DomainError) -> McpError {
    McpError::internal_error(err.to_string(), None)
}

fn to_json(value: &impl serde::Serialize) -> Result<String, McpError> {
    serde_json::to_string_pretty(value)
        .map_err(|e| McpError::internal_error(format!("failed to serialize result: {e}"), None))
}

/// Bridges a blocking synchronous call into the async MCP transport, the same
/// pattern the teacher uses to call into its sync SQLite adapter from async
/// handlers (§5 redesign).
async fn blocking<F, T>(f: F) -> Result<T, McpError>
where
    F: FnOnce() -> Result<T, crate::domain::DomainError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| McpError::internal_error(format!("blocking task panicked: {e}"), None))?
        .map_err(to_mcp_error)
}

/// MCP server exposing `index_codebase`, `search_code`, `get_indexing_status`,
/// and `clear_index` as tools, backed by the same composition root as the CLI.
#[derive(Clone)]
pub struct CodiiMcpServer {
    container: Arc<Container>,
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl CodiiMcpServer {
    pub fn new(container: Arc<Container>) -> Self {
        Self {
            container,
            tool_router: Self::tool_router(),
        }
    }

    /// Index (or incrementally re-index) a codebase, creating its chunk store
    /// and vector index if they don't already exist. Returns immediately with
    /// `accepted` once the background indexing run has started, or
    /// `no_changes` if nothing changed since the last run.
    #[tool(name = "index_codebase")]
    async fn index_codebase(
        &self,
        params: Parameters<IndexCodebaseInput>,
    ) -> Result<CallToolResult, McpError> {
        let input = params.0;
        let container = self.container.clone();
        let run = blocking(move || {
            container.index_use_case().execute(
                &input.path,
                input.force,
                input.custom_extensions,
                input.ignore_patterns,
            )
        })
        .await?;

        let outcome = match run.outcome {
            crate::application::IndexOutcome::Accepted => "accepted",
            crate::application::IndexOutcome::NoChanges => "no_changes",
        };
        let json = to_json(&IndexCodebaseOutput {
            outcome: outcome.to_string(),
        })?;
        Ok(CallToolResult::success(vec![Content::text(json)]))
    }

    /// Search a previously indexed codebase using hybrid lexical + semantic
    /// search with reciprocal rank fusion. Returns ranked code snippets
    /// matching the query.
    #[tool(name = "search_code")]
    async fn search_code(
        &self,
        params: Parameters<SearchCodeInput>,
    ) -> Result<CallToolResult, McpError> {
        let input = params.0;
        let limit = input.limit.min(MAX_LIMIT);

        let mut query = SearchQuery::new(&input.query)
            .with_limit(limit)
            .with_rerank(input.rerank);
        if let Some(extensions) = input.extension_filter {
            query = query.with_extension_filter(extensions);
        }

        let container = self.container.clone();
        let path = input.path.clone();
        let results = blocking(move || container.search_use_case().execute(&path, query)).await?;

        let outputs: Vec<SearchResultOutput> = results
            .iter()
            .map(|r| {
                let chunk = r.chunk();
                SearchResultOutput {
                    path: chunk.path().to_string(),
                    start_line: chunk.start_line(),
                    end_line: chunk.end_line(),
                    language: chunk.language().to_string(),
                    chunk_type: chunk.chunk_type().to_string(),
                    content: chunk.content().to_string(),
                    bm25_score: r.bm25_score(),
                    vector_score: r.vector_score(),
                    combined_score: r.combined_score(),
                    rank: r.rank(),
                }
            })
            .collect();

        let json = to_json(&outputs)?;
        Ok(CallToolResult::success(vec![Content::text(json)]))
    }

    /// Reports the current (possibly in-progress) indexing status for a
    /// codebase: `not_found` if it has never been indexed.
    #[tool(name = "get_indexing_status")]
    async fn get_indexing_status(
        &self,
        params: Parameters<GetIndexingStatusInput>,
    ) -> Result<CallToolResult, McpError> {
        let input = params.0;
        let container = self.container.clone();
        let status = blocking(move || container.status_use_case().execute(&input.path)).await?;
        let json = to_json(&status)?;
        Ok(CallToolResult::success(vec![Content::text(json)]))
    }

    /// Drops a codebase's chunk store, vector index, merkle cache, and status
    /// entry. Not an error if the codebase was never indexed.
    #[tool(name = "clear_index")]
    async fn clear_index(
        &self,
        params: Parameters<ClearIndexInput>,
    ) -> Result<CallToolResult, McpError> {
        let input = params.0;
        let container = self.container.clone();
        blocking(move || container.clear_use_case().execute(&input.path)).await?;
        let json = to_json(&ClearIndexOutput { ok: true })?;
        Ok(CallToolResult::success(vec![Content::text(json)]))
    }
}

#[tool_handler]
impl ServerHandler for CodiiMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation::from_build_env(),
            instructions: Some(
                "Local code-search indexing and retrieval server. Call index_codebase once \
                 per repository, then search_code with a natural-language or keyword query to \
                 retrieve ranked code snippets. get_indexing_status reports progress; \
                 clear_index drops a repository's stores."
                    .into(),
            ),
        }
    }
}
