//! End-to-end tests driving the composition root the way the CLI and MCP
//! surfaces do: index a temporary repository, then search, inspect status,
//! and clear it.

use std::fs;
use std::sync::Mutex;

use codii::connector::api::{Container, ContainerConfig};
use codii::domain::IndexStatus;

// `Container::new` reads `CODII_BASE_DIR` via `FilesystemStoreFactory::from_env`.
// Tests run in parallel by default, so serialize anything that sets it.
static ENV_LOCK: Mutex<()> = Mutex::new(());

fn make_container(base_dir: &std::path::Path) -> Container {
    std::env::set_var("CODII_BASE_DIR", base_dir);
    Container::new(ContainerConfig::default())
}

#[test]
fn index_then_search_finds_a_function_by_name() {
    let _guard = ENV_LOCK.lock().unwrap();
    let base_dir = tempfile::tempdir().unwrap();
    let repo = tempfile::tempdir().unwrap();

    fs::write(
        repo.path().join("math.rs"),
        "pub fn add(a: i32, b: i32) -> i32 {\n    a + b\n}\n\nfn multiply(x: f64, y: f64) -> f64 {\n    x * y\n}\n",
    )
    .unwrap();

    let container = make_container(base_dir.path());

    let run = container
        .index_use_case()
        .execute(repo.path().to_str().unwrap(), false, None, None)
        .expect("indexing should start");
    run.join();

    let status = container
        .status_use_case()
        .execute(repo.path().to_str().unwrap())
        .expect("status lookup should succeed");
    assert_eq!(status.status, IndexStatus::Indexed);
    assert!(status.total_chunks > 0, "should have indexed at least one chunk");

    let query = codii::domain::SearchQuery::new("add").with_limit(5);
    let results = container
        .search_use_case()
        .execute(repo.path().to_str().unwrap(), query)
        .expect("search should succeed");
    assert!(!results.is_empty(), "should find the add function");
    assert!(results.iter().any(|r| r.chunk().content().contains("add")));
}

#[test]
fn reindexing_with_no_changes_reports_no_changes() {
    let _guard = ENV_LOCK.lock().unwrap();
    let base_dir = tempfile::tempdir().unwrap();
    let repo = tempfile::tempdir().unwrap();
    fs::write(repo.path().join("a.py"), "def foo():\n    return 1\n").unwrap();

    let container = make_container(base_dir.path());
    let path = repo.path().to_str().unwrap();

    let first = container.index_use_case().execute(path, false, None, None).unwrap();
    first.join();

    let second = container.index_use_case().execute(path, false, None, None).unwrap();
    assert_eq!(second.outcome, codii::application::IndexOutcome::NoChanges);
}

#[test]
fn clear_index_removes_status_and_stores() {
    let _guard = ENV_LOCK.lock().unwrap();
    let base_dir = tempfile::tempdir().unwrap();
    let repo = tempfile::tempdir().unwrap();
    fs::write(repo.path().join("a.go"), "package main\n\nfunc main() {}\n").unwrap();

    let container = make_container(base_dir.path());
    let path = repo.path().to_str().unwrap();

    container.index_use_case().execute(path, false, None, None).unwrap().join();
    container.clear_use_case().execute(path).expect("clear should succeed");

    let status = container.status_use_case().execute(path).unwrap();
    assert_eq!(status.status, IndexStatus::NotFound);
}

#[test]
fn get_indexing_status_for_unindexed_path_is_not_found() {
    let _guard = ENV_LOCK.lock().unwrap();
    let base_dir = tempfile::tempdir().unwrap();
    let repo = tempfile::tempdir().unwrap();

    let container = make_container(base_dir.path());
    let status = container
        .status_use_case()
        .execute(repo.path().to_str().unwrap())
        .unwrap();
    assert_eq!(status.status, IndexStatus::NotFound);
}

#[test]
fn ast_chunker_extracts_rust_functions_from_the_sample_fixture() {
    use codii::application::{Chunker, ChunkerConfig};
    use codii::connector::adapter::AstChunker;
    use codii::domain::Language;

    let source = fs::read_to_string("tests/fixtures/sample_rust.rs").unwrap();
    let chunker = AstChunker::new();
    let chunks = chunker
        .chunk("sample_rust.rs", &source, Language::Rust, &ChunkerConfig::default(), 0)
        .expect("chunking should succeed");

    assert!(!chunks.is_empty());
    assert!(chunks.iter().any(|c| c.content().contains("fn add")));
}
