use std::sync::Arc;

use tracing::debug;

use crate::application::{
    ClearIndexUseCase, GetIndexingStatusUseCase, IndexCodebaseUseCase, SearchCodeUseCase,
    StoreFactory,
};
use crate::connector::adapter::{
    AstChunker, FilesystemStoreFactory, FsScanner, JsonSnapshotStore, MockEmbedder, MockReranker,
    RuleBasedQueryProcessor,
};

/// Embedding dimensionality of the configured model (§4.4). The mock embedder
/// stands in for `sentence-transformers/all-MiniLM-L6-v2`, whose real output
/// is 384-dimensional; kept fixed here so the vector index's dimension check
/// never trips on a config change.
const EMBEDDING_DIMENSIONS: usize = 384;

pub struct ContainerConfig {
    /// Use mock embeddings and reranking rather than a real model (always
    /// `true` today — no real model integration is in scope, see §4.4).
    pub mock_embeddings: bool,
    pub no_rerank: bool,
}

impl Default for ContainerConfig {
    fn default() -> Self {
        Self {
            mock_embeddings: true,
            no_rerank: false,
        }
    }
}

/// Composition root wiring the filesystem-backed adapters into the four use
/// cases exposed by the CLI and MCP surfaces (§6).
pub struct Container {
    store_factory: Arc<dyn StoreFactory>,
    scanner: Arc<FsScanner>,
    chunker: Arc<AstChunker>,
    embedder: Arc<MockEmbedder>,
    reranker: Option<Arc<MockReranker>>,
    query_processor: Arc<RuleBasedQueryProcessor>,
    snapshot_store: Arc<JsonSnapshotStore>,
}

impl Container {
    pub fn new(config: ContainerConfig) -> Self {
        let factory = FilesystemStoreFactory::from_env(EMBEDDING_DIMENSIONS);
        let snapshot_store = Arc::new(JsonSnapshotStore::new(factory.snapshot_path()));
        let store_factory: Arc<dyn StoreFactory> = Arc::new(factory);

        debug!("using mock embedding service");
        let embedder = Arc::new(MockEmbedder::new(EMBEDDING_DIMENSIONS, 32));

        let reranker = if config.no_rerank {
            None
        } else {
            debug!("using mock reranking service");
            Some(Arc::new(MockReranker::new()))
        };

        let _ = config.mock_embeddings;

        Self {
            store_factory,
            scanner: Arc::new(FsScanner::new()),
            chunker: Arc::new(AstChunker::new()),
            embedder,
            reranker,
            query_processor: Arc::new(RuleBasedQueryProcessor::new()),
            snapshot_store,
        }
    }

    pub fn index_use_case(&self) -> IndexCodebaseUseCase {
        IndexCodebaseUseCase::new(
            self.store_factory.clone(),
            self.scanner.clone(),
            self.chunker.clone(),
            self.embedder.clone(),
            self.snapshot_store.clone(),
        )
    }

    pub fn search_use_case(&self) -> SearchCodeUseCase {
        let use_case = SearchCodeUseCase::new(
            self.store_factory.clone(),
            self.query_processor.clone(),
            self.embedder.clone(),
        );
        match &self.reranker {
            Some(reranker) => use_case.with_reranker(reranker.clone()),
            None => use_case,
        }
    }

    pub fn status_use_case(&self) -> GetIndexingStatusUseCase {
        GetIndexingStatusUseCase::new(self.snapshot_store.clone())
    }

    pub fn clear_use_case(&self) -> ClearIndexUseCase {
        ClearIndexUseCase::new(self.store_factory.clone(), self.snapshot_store.clone())
    }
}
