//! Composition root: wires the adapters in `connector::adapter` into the
//! application layer's four use cases for the CLI and MCP surfaces.

mod container;

pub use container::{Container, ContainerConfig};
