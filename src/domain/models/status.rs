use serde::{Deserialize, Serialize};

/// One entry in the snapshot/status registry (§3, §4.8).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodebaseStatus {
    pub path: String,
    pub status: IndexStatus,
    pub progress: u8,
    pub current_stage: Stage,
    pub merkle_root: Option<String>,
    pub indexed_files: usize,
    pub total_chunks: usize,
    pub last_updated: i64,
    pub error_message: Option<String>,
}

impl CodebaseStatus {
    pub fn not_found(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            status: IndexStatus::NotFound,
            progress: 0,
            current_stage: Stage::Preparing,
            merkle_root: None,
            indexed_files: 0,
            total_chunks: 0,
            last_updated: 0,
            error_message: None,
        }
    }

    pub fn starting(path: impl Into<String>, now: i64) -> Self {
        Self {
            path: path.into(),
            status: IndexStatus::Indexing,
            progress: 0,
            current_stage: Stage::Preparing,
            merkle_root: None,
            indexed_files: 0,
            total_chunks: 0,
            last_updated: now,
            error_message: None,
        }
    }

    pub fn advance(&mut self, stage: Stage, progress: u8, now: i64) {
        self.status = IndexStatus::Indexing;
        self.current_stage = stage;
        self.progress = progress.max(self.progress).min(100);
        self.last_updated = now;
    }

    pub fn complete(&mut self, merkle_root: String, indexed_files: usize, total_chunks: usize, now: i64) {
        self.status = IndexStatus::Indexed;
        self.current_stage = Stage::Complete;
        self.progress = 100;
        self.merkle_root = Some(merkle_root);
        self.indexed_files = indexed_files;
        self.total_chunks = total_chunks;
        self.last_updated = now;
        self.error_message = None;
    }

    pub fn fail(&mut self, error_message: impl Into<String>, now: i64) {
        self.status = IndexStatus::Failed;
        self.error_message = Some(error_message.into());
        self.last_updated = now;
    }

    pub fn cancel(&mut self, now: i64) {
        self.fail("cancelled", now);
    }

    pub fn is_indexed(&self) -> bool {
        matches!(self.status, IndexStatus::Indexed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexStatus {
    NotFound,
    Indexing,
    Indexed,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Preparing,
    Deleting,
    Chunking,
    Embedding,
    Indexing,
    Complete,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_is_monotonic_within_advance_calls() {
        let mut status = CodebaseStatus::starting("/repo", 0);
        status.advance(Stage::Deleting, 10, 1);
        status.advance(Stage::Chunking, 5, 2); // stale, lower progress
        assert_eq!(status.progress, 10);
        status.advance(Stage::Chunking, 40, 3);
        assert_eq!(status.progress, 40);
    }

    #[test]
    fn cancellation_fails_with_the_documented_message() {
        let mut status = CodebaseStatus::starting("/repo", 0);
        status.cancel(5);
        assert_eq!(status.status, IndexStatus::Failed);
        assert_eq!(status.error_message.as_deref(), Some("cancelled"));
    }

    #[test]
    fn complete_resets_progress_to_100_and_clears_errors() {
        let mut status = CodebaseStatus::starting("/repo", 0);
        status.fail("transient", 1);
        status.complete("root-hash".into(), 2, 5, 3);
        assert!(status.is_indexed());
        assert_eq!(status.progress, 100);
        assert!(status.error_message.is_none());
    }
}
