use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Flat file-hash tree: `path → content_hash` plus a root hash computed as
/// SHA-256 over the sorted concatenation `path || ":" || hash || "\n"` (§3).
/// Used purely for diffing between indexing runs; the root hash never
/// participates in the diff itself, only in status output.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct MerkleTree {
    files: BTreeMap<String, String>,
}

/// Wire format for `merkle/<repo-hash>.json` (§6).
#[derive(Debug, Serialize, Deserialize)]
pub struct MerkleJson {
    pub root: String,
    pub files: BTreeMap<String, String>,
}

impl MerkleTree {
    pub fn new(files: BTreeMap<String, String>) -> Self {
        Self { files }
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn files(&self) -> &BTreeMap<String, String> {
        &self.files
    }

    pub fn get(&self, path: &str) -> Option<&String> {
        self.files.get(path)
    }

    /// Root hash per §3: a digest over `path`, ordered by the BTreeMap's
    /// natural sort, with no separator ambiguity since paths cannot contain `\n`.
    pub fn root_hash(&self) -> String {
        let mut hasher = Sha256::new();
        for (path, hash) in &self.files {
            hasher.update(path.as_bytes());
            hasher.update(b":");
            hasher.update(hash.as_bytes());
            hasher.update(b"\n");
        }
        format!("{:x}", hasher.finalize())
    }

    pub fn to_json(&self) -> MerkleJson {
        MerkleJson {
            root: self.root_hash(),
            files: self.files.clone(),
        }
    }

    pub fn from_json(json: MerkleJson) -> Self {
        Self { files: json.files }
    }

    /// Computes `(added, modified, removed)` between an old and a new tree
    /// (§4.2). `modified` is the set of paths present in both with a changed
    /// hash; `added`/`removed` are set differences.
    pub fn diff(old: &MerkleTree, new: &MerkleTree) -> MerkleDiff {
        let old_keys: BTreeSet<&String> = old.files.keys().collect();
        let new_keys: BTreeSet<&String> = new.files.keys().collect();

        let added = new_keys
            .difference(&old_keys)
            .map(|p| (*p).clone())
            .collect();
        let removed = old_keys
            .difference(&new_keys)
            .map(|p| (*p).clone())
            .collect();
        let modified = old_keys
            .intersection(&new_keys)
            .filter(|p| old.files[**p] != new.files[**p])
            .map(|p| (*p).clone())
            .collect();

        MerkleDiff {
            added,
            modified,
            removed,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MerkleDiff {
    pub added: BTreeSet<String>,
    pub modified: BTreeSet<String>,
    pub removed: BTreeSet<String>,
}

impl MerkleDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.modified.is_empty() && self.removed.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree(pairs: &[(&str, &str)]) -> MerkleTree {
        MerkleTree::new(
            pairs
                .iter()
                .map(|(p, h)| (p.to_string(), h.to_string()))
                .collect(),
        )
    }

    #[test]
    fn root_hash_is_order_independent_of_insertion() {
        let a = tree(&[("b.py", "h2"), ("a.py", "h1")]);
        let b = tree(&[("a.py", "h1"), ("b.py", "h2")]);
        assert_eq!(a.root_hash(), b.root_hash());
    }

    #[test]
    fn root_hash_changes_with_content() {
        let a = tree(&[("a.py", "h1")]);
        let b = tree(&[("a.py", "h2")]);
        assert_ne!(a.root_hash(), b.root_hash());
    }

    #[test]
    fn diff_partitions_into_three_disjoint_sets() {
        let old = tree(&[("a.py", "h1"), ("b.py", "h2"), ("c.py", "h3")]);
        let new = tree(&[("a.py", "h1"), ("b.py", "h2-changed"), ("d.py", "h4")]);

        let diff = MerkleTree::diff(&old, &new);

        assert_eq!(diff.added, BTreeSet::from(["d.py".to_string()]));
        assert_eq!(diff.modified, BTreeSet::from(["b.py".to_string()]));
        assert_eq!(diff.removed, BTreeSet::from(["c.py".to_string()]));
    }

    #[test]
    fn no_op_diff_is_empty() {
        let t = tree(&[("a.py", "h1")]);
        assert!(MerkleTree::diff(&t, &t).is_empty());
    }

    #[test]
    fn empty_old_tree_means_everything_is_added() {
        let old = MerkleTree::default();
        let new = tree(&[("a.py", "h1")]);
        let diff = MerkleTree::diff(&old, &new);
        assert_eq!(diff.added.len(), 1);
        assert!(diff.modified.is_empty());
        assert!(diff.removed.is_empty());
    }
}
