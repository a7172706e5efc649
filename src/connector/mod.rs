//! # Connector Layer
//!
//! External integrations implementing the application layer's interfaces:
//! - `adapter`: the scanner, chunkers, embedder, chunk store, vector index,
//!   query processor, reranker, snapshot store, and MCP server
//! - `api`: the composition root wiring adapters into use cases for the CLI
//!   and MCP surfaces

pub mod adapter;
pub mod api;

pub use adapter::*;
pub use api::*;
