use thiserror::Error;

/// Every error kind the core can raise, per the error handling design: each
/// variant maps to one propagation policy (recover locally, abort the stage and
/// fail the status, or surface directly to the caller) rather than to a type name.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("index integrity error: {0}")]
    IndexIntegrity(String),

    #[error("query validation error: {0}")]
    QueryValidation(String),

    #[error("vector dimension mismatch: expected {expected}, got {actual}")]
    VectorDimensionMismatch { expected: usize, actual: usize },

    #[error("cancelled")]
    Cancellation,

    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl DomainError {
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    pub fn index_integrity(msg: impl Into<String>) -> Self {
        Self::IndexIntegrity(msg.into())
    }

    pub fn query_validation(msg: impl Into<String>) -> Self {
        Self::QueryValidation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn already_exists(msg: impl Into<String>) -> Self {
        Self::AlreadyExists(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::Cancellation)
    }

    /// Maps to the CLI exit codes in the external interfaces section: 2 for bad
    /// arguments, 3 for operations that require a prior index, 1 otherwise.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::QueryValidation(_) | Self::Configuration(_) => 2,
            Self::NotFound(_) => 3,
            _ => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_match_external_interface_table() {
        assert_eq!(DomainError::query_validation("too short").exit_code(), 2);
        assert_eq!(DomainError::not_found("repo").exit_code(), 3);
        assert_eq!(DomainError::internal("boom").exit_code(), 1);
    }

    #[test]
    fn cancellation_is_not_an_ordinary_error() {
        let err = DomainError::Cancellation;
        assert!(err.is_cancellation());
        assert_eq!(err.to_string(), "cancelled");
    }
}
