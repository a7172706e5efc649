//! # Domain Layer
//!
//! Core business logic and models. Independent of storage, network, and
//! process-boundary concerns, which live in `connector`.

mod error;
pub mod models;

pub use error::DomainError;
pub use models::*;
