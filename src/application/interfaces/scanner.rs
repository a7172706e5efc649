use std::path::Path;

use crate::domain::DomainError;

/// Ignore-pattern and extension-filtered directory walk (§4.1).
#[derive(Debug, Clone)]
pub struct ScanConfig {
    pub extensions: Vec<String>,
    pub ignore_patterns: Vec<String>,
}

/// Walks a repository root and yields candidate file paths, relative to root,
/// honoring gitignore semantics, a custom ignore list, and an extension
/// allow-list. Does not read file contents.
pub trait Scanner: Send + Sync {
    fn scan(&self, root: &Path, config: &ScanConfig) -> Result<Vec<String>, DomainError>;
}
