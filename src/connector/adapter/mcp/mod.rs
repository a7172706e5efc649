//! MCP (Model Context Protocol) surface: exposes the same four operations as
//! the CLI — `index_codebase`, `search_code`, `get_indexing_status`,
//! `clear_index` — as tools over stdio (§6).

mod server;
mod tools;

pub use server::CodiiMcpServer;

use std::sync::Arc;

use anyhow::Result;
use rmcp::transport::stdio;
use rmcp::ServiceExt;
use tracing::info;

use crate::connector::api::Container;

/// Serves the MCP tool surface over stdio until the client disconnects.
pub async fn run_stdio_server(container: &Arc<Container>) -> Result<()> {
    info!("starting MCP server over stdio");
    let server = CodiiMcpServer::new(container.clone());
    let service = server.serve(stdio()).await?;
    service.waiting().await?;
    Ok(())
}
