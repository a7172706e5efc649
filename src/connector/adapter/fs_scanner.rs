use std::path::Path;

use ignore::gitignore::GitignoreBuilder;
use ignore::WalkBuilder;
use tracing::debug;

use crate::application::{ScanConfig, Scanner};
use crate::domain::DomainError;

/// Walks a repository honoring `.gitignore`, the project's custom ignore
/// patterns, and an extension allow-list (§4.1). Binary files (detected by a
/// NUL byte in the first 8KiB) and symlinks resolving outside `root` are
/// skipped without error.
pub struct FsScanner;

impl FsScanner {
    pub fn new() -> Self {
        Self
    }

    fn looks_binary(path: &Path) -> bool {
        let Ok(bytes) = std::fs::read(path) else {
            return true;
        };
        let probe = &bytes[..bytes.len().min(8192)];
        probe.contains(&0)
    }

    fn is_within_root(root: &Path, path: &Path) -> bool {
        match path.canonicalize() {
            Ok(resolved) => resolved.starts_with(root),
            Err(_) => false,
        }
    }
}

impl Default for FsScanner {
    fn default() -> Self {
        Self::new()
    }
}

impl Scanner for FsScanner {
    fn scan(&self, root: &Path, config: &ScanConfig) -> Result<Vec<String>, DomainError> {
        let canonical_root = root.canonicalize().map_err(DomainError::Io)?;

        // Compile the caller's ignore patterns (built-in defaults plus
        // anything from `.codii.yaml`/CLI flags) into a real gitignore
        // matcher, so `!negation`, leading-`/` anchoring, trailing-`/`
        // directory-only patterns, and `**` all behave per standard
        // gitignore semantics (§4.1) rather than a substring guess.
        let mut custom_builder = GitignoreBuilder::new(&canonical_root);
        for pattern in &config.ignore_patterns {
            let _ = custom_builder.add_line(None, pattern);
        }
        let custom_ignore = custom_builder
            .build()
            .map_err(|e| DomainError::configuration(format!("invalid ignore pattern: {e}")))?;

        let mut builder = WalkBuilder::new(&canonical_root);
        builder.hidden(false).git_ignore(true).git_global(true).git_exclude(true);

        // `filter_entry` prunes whole directories before the walker
        // descends into them (§4.1: "traversal must not descend into
        // ignored directories"), rather than filtering files after the
        // fact.
        let filter_root = canonical_root.clone();
        builder.filter_entry(move |entry| {
            let path = entry.path();
            if path == filter_root {
                return true;
            }
            let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
            !custom_ignore.matched(path, is_dir).is_ignore()
        });

        let extensions: std::collections::HashSet<String> =
            config.extensions.iter().map(|e| e.to_lowercase()).collect();

        let mut paths = Vec::new();
        for entry in builder.build() {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    debug!("skipping unreadable directory entry: {}", e);
                    continue;
                }
            };

            let path = entry.path();
            if !path.is_file() {
                continue;
            }

            if path.is_symlink() && !Self::is_within_root(&canonical_root, path) {
                continue;
            }

            let extension = path
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| e.to_lowercase());
            match extension {
                Some(ref ext) if extensions.contains(ext) => {}
                _ => continue,
            }

            if Self::looks_binary(path) {
                continue;
            }

            let relative = path
                .strip_prefix(&canonical_root)
                .unwrap_or(path)
                .to_string_lossy()
                .replace('\\', "/");
            paths.push(relative);
        }

        paths.sort();
        Ok(paths)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn config() -> ScanConfig {
        ScanConfig {
            extensions: vec!["rs".to_string(), "py".to_string()],
            ignore_patterns: vec!["target/".to_string()],
        }
    }

    #[test]
    fn scan_finds_matching_extensions_and_skips_ignored_dirs() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.rs"), "fn main() {}").unwrap();
        fs::write(dir.path().join("b.txt"), "not included").unwrap();
        fs::create_dir(dir.path().join("target")).unwrap();
        fs::write(dir.path().join("target/c.rs"), "fn skip() {}").unwrap();

        let scanner = FsScanner::new();
        let found = scanner.scan(dir.path(), &config()).unwrap();

        assert_eq!(found, vec!["a.rs".to_string()]);
    }

    #[test]
    fn negated_pattern_rescues_an_otherwise_ignored_file() {
        // Gitignore semantics cannot re-include a file under an excluded
        // directory, only a file excluded directly by its own pattern — so
        // the negation here targets a file-level ignore, not a directory one.
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("generated.rs"), "fn a() {}").unwrap();
        fs::write(dir.path().join("keep.rs"), "fn keep() {}").unwrap();

        let scanner = FsScanner::new();
        let config = ScanConfig {
            extensions: vec!["rs".to_string()],
            ignore_patterns: vec!["*.rs".to_string(), "!keep.rs".to_string()],
        };
        let found = scanner.scan(dir.path(), &config).unwrap();

        assert_eq!(found, vec!["keep.rs".to_string()]);
    }

    #[test]
    fn scan_skips_binary_files() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("bin.rs"), [0u8, 1, 2, 3]).unwrap();
        fs::write(dir.path().join("text.rs"), "fn main() {}").unwrap();

        let scanner = FsScanner::new();
        let found = scanner.scan(dir.path(), &config()).unwrap();

        assert_eq!(found, vec!["text.rs".to_string()]);
    }
}
