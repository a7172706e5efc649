use std::collections::HashMap;
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use tracing::{debug, info};

use crate::application::{Embedder, QueryProcessor, Reranker, StoreFactory};
use crate::domain::{DomainError, SearchQuery, SearchResult};

const RRF_K: f32 = 60.0;

/// Hybrid lexical + semantic search with reciprocal rank fusion (§4.7).
pub struct SearchCodeUseCase {
    store_factory: Arc<dyn StoreFactory>,
    query_processor: Arc<dyn QueryProcessor>,
    embedder: Arc<dyn Embedder>,
    reranker: Option<Arc<dyn Reranker>>,
}

impl SearchCodeUseCase {
    pub fn new(
        store_factory: Arc<dyn StoreFactory>,
        query_processor: Arc<dyn QueryProcessor>,
        embedder: Arc<dyn Embedder>,
    ) -> Self {
        Self {
            store_factory,
            query_processor,
            embedder,
            reranker: None,
        }
    }

    pub fn with_reranker(mut self, reranker: Arc<dyn Reranker>) -> Self {
        self.reranker = Some(reranker);
        self
    }

    pub fn execute(
        &self,
        repo_path: &str,
        query: SearchQuery,
    ) -> Result<Vec<SearchResult>, DomainError> {
        let processed = self.query_processor.process(query.query())?;

        let root = std::path::Path::new(repo_path);
        let canonical = std::fs::canonicalize(root).map_err(DomainError::Io)?;
        let handle = self.store_factory.open(&canonical)?;

        let start = Instant::now();
        info!("searching {} for: {}", repo_path, query.query());

        // Each leg fetches its own over-large candidate pool before fusion
        // (§4.7 steps 2-3: N_L = N_V = max(n×5, 50)).
        let fetch_limit = (query.limit() * 5).max(50);

        let query_embedding = self.embedder.embed_query(query.query())?;

        let chunk_store = handle.chunk_store.clone();
        let vector_index = handle.vector_index.clone();
        let extension_filter = query.extension_filter().map(|e| e.to_vec());
        let fts_expression = processed.fts_expression.clone();

        let (lexical, semantic) = thread::scope(|scope| {
            let lexical_handle = scope.spawn(|| {
                chunk_store.search_fts(&fts_expression, fetch_limit, extension_filter.as_deref())
            });
            let semantic_handle = scope.spawn(|| {
                vector_index.search(&query_embedding, fetch_limit, None)
            });
            (lexical_handle.join(), semantic_handle.join())
        });

        let lexical = lexical
            .map_err(|_| DomainError::internal("lexical search thread panicked"))??;
        let semantic = semantic
            .map_err(|_| DomainError::internal("vector search thread panicked"))??;

        debug!(
            "{} lexical candidates, {} semantic candidates",
            lexical.len(),
            semantic.len()
        );

        // Fuse the full candidate pool first (step 5), then decide how much
        // of it to keep: reranking (step 7) needs a wider slice than the
        // final `n` so the cross-encoder has something to reorder.
        let fused = self.fuse(
            &handle.chunk_store,
            lexical,
            semantic,
            fetch_limit,
            handle.config.bm25_weight,
            handle.config.vector_weight,
            extension_filter.as_deref(),
        )?;

        let results = if query.rerank() {
            if let Some(ref reranker) = self.reranker {
                let rerank_pool = (query.limit() * 3).min(30);
                let mut pool = fused;
                pool.truncate(rerank_pool);
                reranker.rerank(query.query(), pool, query.limit())?
            } else {
                let mut fused = fused;
                fused.truncate(query.limit());
                fused
            }
        } else {
            let mut fused = fused;
            fused.truncate(query.limit());
            fused
        };

        let duration = start.elapsed();
        info!("found {} results in {:.3}s", results.len(), duration.as_secs_f64());

        Ok(results)
    }

    /// Reciprocal rank fusion over the BM25 and vector legs, weighted by
    /// `bm25_weight`/`vector_weight` (§4.7: `score = w_L/(k+r_L) + w_V/(k+r_V)`).
    #[allow(clippy::too_many_arguments)]
    fn fuse(
        &self,
        chunk_store: &Arc<dyn crate::application::ChunkStore>,
        lexical: Vec<(i64, f32)>,
        semantic: Vec<(i64, f32)>,
        limit: usize,
        w_l: f32,
        w_v: f32,
        extension_filter: Option<&[String]>,
    ) -> Result<Vec<SearchResult>, DomainError> {
        let mut lexical_rank: HashMap<i64, usize> = HashMap::new();
        let mut lexical_score: HashMap<i64, f32> = HashMap::new();
        for (rank, (id, score)) in lexical.iter().enumerate() {
            lexical_rank.insert(*id, rank + 1);
            lexical_score.insert(*id, *score);
        }

        let mut semantic_rank: HashMap<i64, usize> = HashMap::new();
        let mut semantic_score: HashMap<i64, f32> = HashMap::new();
        for (rank, (id, score)) in semantic.iter().enumerate() {
            semantic_rank.insert(*id, rank + 1);
            semantic_score.insert(*id, *score);
        }

        let mut all_ids: Vec<i64> = lexical_rank.keys().chain(semantic_rank.keys()).copied().collect();
        all_ids.sort_unstable();
        all_ids.dedup();

        let mut fused: Vec<(i64, f32, f32, f32)> = all_ids
            .into_iter()
            .map(|id| {
                let mut combined = 0.0;
                if let Some(r) = lexical_rank.get(&id) {
                    combined += w_l / (RRF_K + *r as f32);
                }
                if let Some(r) = semantic_rank.get(&id) {
                    combined += w_v / (RRF_K + *r as f32);
                }
                (
                    id,
                    *lexical_score.get(&id).unwrap_or(&0.0),
                    *semantic_score.get(&id).unwrap_or(&0.0),
                    combined,
                )
            })
            .collect();

        // Ties broken by lower lexical rank, then lower id (§4.7 step 5).
        fused.sort_by(|a, b| {
            b.3.partial_cmp(&a.3)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| {
                    let rank_a = lexical_rank.get(&a.0).copied().unwrap_or(usize::MAX);
                    let rank_b = lexical_rank.get(&b.0).copied().unwrap_or(usize::MAX);
                    rank_a.cmp(&rank_b)
                })
                .then_with(|| a.0.cmp(&b.0))
        });
        fused.truncate(limit);

        let ids: Vec<i64> = fused.iter().map(|(id, ..)| *id).collect();
        let chunks = chunk_store.get_by_ids(&ids)?;
        let chunk_by_id: HashMap<i64, _> = chunks.into_iter().filter_map(|c| c.id().map(|id| (id, c))).collect();

        // §4.7 step 6: apply the extension filter to the fused set if it
        // wasn't already applied lexically — the semantic leg never filters
        // by extension on its own, so a vector-only hit still needs checking.
        let wanted: Option<Vec<String>> = extension_filter.map(|exts| {
            exts.iter().map(|e| e.trim_start_matches('.').to_lowercase()).collect()
        });

        let mut results = Vec::with_capacity(fused.len());
        for (rank, (id, bm25, vector, combined)) in fused.into_iter().enumerate() {
            if let Some(chunk) = chunk_by_id.get(&id) {
                if let Some(ref wanted) = wanted {
                    match chunk.extension() {
                        Some(ext) if wanted.contains(&ext) => {}
                        _ => continue,
                    }
                }
                results.push(SearchResult::new(chunk.clone(), bm25, vector, combined, rank + 1));
            }
        }
        Ok(results)
    }

    pub fn search(&self, repo_path: &str, query: &str, limit: usize) -> Result<Vec<SearchResult>, DomainError> {
        let search_query = SearchQuery::new(query).with_limit(limit);
        self.execute(repo_path, search_query)
    }
}
