use crate::domain::{CodebaseStatus, DomainError};

/// Cross-repository registry of indexing state and progress (§4.8). Every
/// mutation is a file-locked read-modify-write; implementations must not
/// expose a way to write without holding the lock.
pub trait SnapshotStore: Send + Sync {
    fn get(&self, path: &str) -> Result<Option<CodebaseStatus>, DomainError>;

    fn upsert(&self, status: CodebaseStatus) -> Result<(), DomainError>;

    fn remove(&self, path: &str) -> Result<(), DomainError>;

    fn list(&self) -> Result<Vec<CodebaseStatus>, DomainError>;
}
