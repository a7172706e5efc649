use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// One row of the files table (§3): `path` is the primary key, at most one
/// record per path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileRecord {
    path: String,
    content_hash: String,
    last_modified: i64,
}

impl FileRecord {
    pub fn new(path: impl Into<String>, content_hash: impl Into<String>, last_modified: i64) -> Self {
        Self {
            path: path.into(),
            content_hash: content_hash.into(),
            last_modified,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn content_hash(&self) -> &str {
        &self.content_hash
    }

    pub fn last_modified(&self) -> i64 {
        self.last_modified
    }
}

/// SHA-256 of raw file bytes, hex-encoded.
pub fn compute_file_hash(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    format!("{:x}", digest)
}

/// Stable short identifier for a repository: the first 16 hex characters of the
/// SHA-256 of its absolute canonical path (§3, "Repository identity"). Used only
/// to name per-repository storage locations.
pub fn repository_id(canonical_path: &str) -> String {
    let digest = Sha256::digest(canonical_path.as_bytes());
    format!("{:x}", digest)[..16].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_deterministic_and_sensitive_to_content() {
        let h1 = compute_file_hash(b"fn main() {}");
        let h2 = compute_file_hash(b"fn main() {}");
        let h3 = compute_file_hash(b"fn main() { println!(\"hi\"); }");

        assert_eq!(h1.len(), 64);
        assert_eq!(h1, h2);
        assert_ne!(h1, h3);
    }

    #[test]
    fn repository_id_is_16_hex_chars() {
        let id = repository_id("/home/user/project");
        assert_eq!(id.len(), 16);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(id, repository_id("/home/user/project"));
        assert_ne!(id, repository_id("/home/user/other"));
    }
}
