use std::collections::BTreeMap;
use std::fs;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use tracing::{debug, info, warn};

use crate::application::{
    Chunker, Embedder, RepositoryHandle, ScanConfig, Scanner, SnapshotStore, StoreFactory,
};
use crate::domain::{
    compute_file_hash, CodebaseStatus, DomainError, Language, MerkleJson, MerkleTree, Stage,
};

const PROGRESS_INTERVAL_MS: u128 = 500;
const PROGRESS_DELTA: u8 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexOutcome {
    Accepted,
    NoChanges,
}

fn now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

/// Background indexing pipeline combining the scanner, hasher, chunkers,
/// embedder, chunk store, and vector index (§4.9).
pub struct IndexCodebaseUseCase {
    store_factory: Arc<dyn StoreFactory>,
    scanner: Arc<dyn Scanner>,
    chunker: Arc<dyn Chunker>,
    embedder: Arc<dyn Embedder>,
    snapshot_store: Arc<dyn SnapshotStore>,
}

/// Handle to a started (or completed, for `NoChanges`) indexing run. The CLI
/// may `join()` the worker to behave as a foreground operation; the MCP
/// surface returns immediately after `execute` with `Accepted`.
pub struct IndexRun {
    pub outcome: IndexOutcome,
    pub worker: Option<thread::JoinHandle<()>>,
    pub cancel: Arc<AtomicBool>,
}

impl IndexRun {
    /// Blocks until the background worker (if any) finishes.
    pub fn join(self) {
        if let Some(worker) = self.worker {
            let _ = worker.join();
        }
    }
}

impl IndexCodebaseUseCase {
    pub fn new(
        store_factory: Arc<dyn StoreFactory>,
        scanner: Arc<dyn Scanner>,
        chunker: Arc<dyn Chunker>,
        embedder: Arc<dyn Embedder>,
        snapshot_store: Arc<dyn SnapshotStore>,
    ) -> Self {
        Self {
            store_factory,
            scanner,
            chunker,
            embedder,
            snapshot_store,
        }
    }

    /// Entry point: `index(repo_path, force) → Accepted | NoChanges` (§4.9).
    ///
    /// `custom_extensions` and `ignore_patterns` are additive on top of the
    /// repository's merged `.codii.yaml` config, for this run only — they are
    /// not persisted (§6's `index_codebase` command surface).
    pub fn execute(
        &self,
        repo_path: &str,
        force: bool,
        custom_extensions: Option<Vec<String>>,
        ignore_patterns: Option<Vec<String>>,
    ) -> Result<IndexRun, DomainError> {
        let root = std::path::Path::new(repo_path);
        if !root.exists() {
            return Err(DomainError::not_found(format!("path does not exist: {repo_path}")));
        }
        let canonical = fs::canonicalize(root).map_err(DomainError::Io)?;
        let canonical_str = canonical.to_string_lossy().to_string();

        let handle = self.store_factory.open(&canonical)?;

        self.snapshot_store
            .upsert(CodebaseStatus::starting(canonical_str.clone(), now()))?;

        info!("scanning {}", canonical_str);
        let mut extensions = handle.config.extensions.clone();
        extensions.extend(custom_extensions.unwrap_or_default());
        let mut ignore = handle.config.ignore_patterns.clone();
        ignore.extend(ignore_patterns.unwrap_or_default());
        let scan_config = ScanConfig {
            extensions,
            ignore_patterns: ignore,
        };
        let paths = self.scanner.scan(&canonical, &scan_config)?;

        let mut new_files = BTreeMap::new();
        for path in &paths {
            let bytes = fs::read(canonical.join(path)).map_err(DomainError::Io)?;
            new_files.insert(path.clone(), compute_file_hash(&bytes));
        }
        let new_tree = MerkleTree::new(new_files);

        if force {
            handle.chunk_store.clear()?;
            handle.vector_index.clear()?;
            let _ = fs::remove_file(&handle.merkle_path);
        }

        let old_tree = load_merkle(&handle)?;
        let diff = MerkleTree::diff(&old_tree, &new_tree);

        if diff.is_empty() && !force {
            let mut status = CodebaseStatus::starting(canonical_str, now());
            status.complete(
                new_tree.root_hash(),
                new_tree.files().len(),
                handle.chunk_store.count().unwrap_or(0),
                now(),
            );
            self.snapshot_store.upsert(status)?;
            return Ok(IndexRun {
                outcome: IndexOutcome::NoChanges,
                worker: None,
                cancel: Arc::new(AtomicBool::new(false)),
            });
        }

        let cancel = Arc::new(AtomicBool::new(false));
        let worker_cancel = cancel.clone();
        let handle = handle.clone();
        let chunker = self.chunker.clone();
        let embedder = self.embedder.clone();
        let snapshot_store = self.snapshot_store.clone();

        let worker = thread::spawn(move || {
            run_worker(
                handle,
                canonical,
                diff,
                new_tree,
                chunker,
                embedder,
                snapshot_store,
                worker_cancel,
            );
        });

        Ok(IndexRun {
            outcome: IndexOutcome::Accepted,
            worker: Some(worker),
            cancel,
        })
    }
}

fn load_merkle(handle: &RepositoryHandle) -> Result<MerkleTree, DomainError> {
    match fs::read_to_string(&handle.merkle_path) {
        Ok(raw) => {
            let json: MerkleJson = serde_json::from_str(&raw)
                .map_err(|e| DomainError::index_integrity(format!("malformed merkle cache: {e}")))?;
            Ok(MerkleTree::from_json(json))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(MerkleTree::default()),
        Err(e) => Err(DomainError::Io(e)),
    }
}

fn persist_merkle(handle: &RepositoryHandle, tree: &MerkleTree) -> Result<(), DomainError> {
    if let Some(parent) = handle.merkle_path.parent() {
        fs::create_dir_all(parent).map_err(DomainError::Io)?;
    }
    let json = serde_json::to_string_pretty(&tree.to_json()).map_err(|e| DomainError::internal(e.to_string()))?;
    fs::write(&handle.merkle_path, json).map_err(DomainError::Io)
}

#[allow(clippy::too_many_arguments)]
fn run_worker(
    handle: Arc<RepositoryHandle>,
    root: std::path::PathBuf,
    diff: crate::domain::MerkleDiff,
    new_tree: MerkleTree,
    chunker: Arc<dyn Chunker>,
    embedder: Arc<dyn Embedder>,
    snapshot_store: Arc<dyn SnapshotStore>,
    cancel: Arc<AtomicBool>,
) {
    let repo_path = root.to_string_lossy().to_string();
    let mut progress = ProgressWriter::new(snapshot_store, repo_path.clone());

    if let Err(e) = run_worker_fallible(&handle, &root, &diff, &new_tree, &chunker, &embedder, &mut progress, &cancel) {
        warn!("indexing {} failed: {}", repo_path, e);
        progress.fail(e.to_string());
    }
}

#[allow(clippy::too_many_arguments)]
fn run_worker_fallible(
    handle: &RepositoryHandle,
    root: &std::path::Path,
    diff: &crate::domain::MerkleDiff,
    new_tree: &MerkleTree,
    chunker: &Arc<dyn Chunker>,
    embedder: &Arc<dyn Embedder>,
    progress: &mut ProgressWriter,
    cancel: &Arc<AtomicBool>,
) -> Result<(), DomainError> {
    // Stage: deleting (modified ∪ removed) before anything is added, per the
    // orchestrator's ordering guarantee (§5, "DELETE before ADD").
    progress.advance(Stage::Deleting, 10);
    for path in diff.modified.iter().chain(diff.removed.iter()) {
        check_cancelled(cancel)?;
        let removed_ids = handle.chunk_store.delete_chunks_by_path(path)?;
        for id in removed_ids {
            handle.vector_index.mark_deleted(id)?;
        }
    }

    // Stage: chunking (added ∪ modified).
    progress.advance(Stage::Chunking, 10);
    let mut pending = Vec::new();
    let to_chunk: Vec<&String> = diff.added.iter().chain(diff.modified.iter()).collect();
    let total = to_chunk.len().max(1);
    for (i, path) in to_chunk.iter().enumerate() {
        check_cancelled(cancel)?;
        let content = match fs::read_to_string(root.join(path)) {
            Ok(c) => c,
            Err(e) => {
                warn!("skipping unreadable file {}: {}", path, e);
                continue;
            }
        };
        let language = Language::from_path(std::path::Path::new(path));
        let chunks = chunker.chunk(
            path,
            &content,
            language,
            &crate::application::ChunkerConfig {
                min_chunk_size: handle.config.min_chunk_size,
                max_chunk_size: handle.config.max_chunk_size,
                chunk_overlap: handle.config.chunk_overlap,
            },
            now(),
        )?;
        pending.extend(chunks);
        progress.advance_within(Stage::Chunking, 10, 40, i + 1, total);
    }

    // Stage: embedding, batched up to embedding_batch_size.
    progress.advance(Stage::Embedding, 40);
    let mut vectors = Vec::with_capacity(pending.len());
    let batch_size = handle.config.embedding_batch_size.max(1);
    let batches = pending.len().div_ceil(batch_size).max(1);
    for (batch_idx, chunk_batch) in pending.chunks(batch_size).enumerate() {
        check_cancelled(cancel)?;
        let texts: Vec<String> = chunk_batch.iter().map(|c| c.content().to_string()).collect();
        let embedded = embedder.embed(&texts)?;
        vectors.extend(embedded);
        progress.advance_within(Stage::Embedding, 40, 80, batch_idx + 1, batches);
    }

    // Stage: indexing — insert into the chunk store to obtain ids, then add
    // the same ids to the vector index, per batch.
    progress.advance(Stage::Indexing, 80);
    if !pending.is_empty() {
        let ids = handle.chunk_store.insert_chunks(pending.clone())?;
        let items: Vec<(i64, Vec<f32>)> = ids.into_iter().zip(vectors.into_iter()).collect();
        handle.vector_index.add_batch(items)?;
    }
    progress.advance(Stage::Indexing, 99);

    // Commit: persist the vector index and merkle cache only after every
    // stage has succeeded (§7: never partially update the merkle cache).
    handle.vector_index.save(&handle.vectors_path)?;
    persist_merkle(handle, new_tree)?;

    // §3/§4.9: `indexed_files` is the repository's total indexed file count,
    // not this run's changed-file count.
    let indexed_files = new_tree.files().len();
    let total_chunks = handle.chunk_store.count()?;
    progress.complete(new_tree.root_hash(), indexed_files, total_chunks);
    debug!("indexed {} files, {} chunks total", indexed_files, total_chunks);
    Ok(())
}

fn check_cancelled(cancel: &AtomicBool) -> Result<(), DomainError> {
    if cancel.load(Ordering::Relaxed) {
        Err(DomainError::Cancellation)
    } else {
        Ok(())
    }
}

/// Advisory, monotonic-within-stage progress writer (§4.9, "Progress
/// reporting"): flushes to the snapshot store every ≥500ms or ≥5% delta.
struct ProgressWriter {
    store: Arc<dyn SnapshotStore>,
    #[allow(dead_code)]
    path: String,
    status: CodebaseStatus,
    last_flush: Instant,
    last_progress: u8,
}

impl ProgressWriter {
    fn new(store: Arc<dyn SnapshotStore>, path: String) -> Self {
        Self {
            status: CodebaseStatus::starting(path.clone(), now()),
            store,
            path,
            last_flush: Instant::now(),
            last_progress: 0,
        }
    }

    fn advance(&mut self, stage: Stage, progress: u8) {
        self.status.advance(stage, progress, now());
        self.maybe_flush(true);
    }

    fn advance_within(&mut self, stage: Stage, lo: u8, hi: u8, done: usize, total: usize) {
        let span = (hi - lo) as f64;
        let fraction = done as f64 / total as f64;
        let progress = lo as f64 + span * fraction;
        self.status.advance(stage, progress.round() as u8, now());
        self.maybe_flush(false);
    }

    fn maybe_flush(&mut self, force: bool) {
        let elapsed_ok = self.last_flush.elapsed().as_millis() >= PROGRESS_INTERVAL_MS;
        let delta_ok = self.status.progress.saturating_sub(self.last_progress) >= PROGRESS_DELTA;
        if force || elapsed_ok || delta_ok {
            let _ = self.store.upsert(self.status.clone());
            self.last_flush = Instant::now();
            self.last_progress = self.status.progress;
        }
    }

    fn complete(&mut self, merkle_root: String, indexed_files: usize, total_chunks: usize) {
        self.status.complete(merkle_root, indexed_files, total_chunks, now());
        let _ = self.store.upsert(self.status.clone());
    }

    fn fail(&mut self, message: String) {
        self.status.fail(message, now());
        let _ = self.store.upsert(self.status.clone());
    }
}
