use std::{sync::Arc, time::Duration};

use crate::{
    cache::{
        answers::QueryResponseCache, dedup::IngestionDeduplicator, documents::DocumentRegistry,
        embeddings::EmbeddingCache, retrieval::RetrievalCache, state::PipelineStateTracker,
        CacheStore,
    },
    storage::{store::StorageManager, vector_index::VectorIndex},
    utils::{config::AppConfig, embedding::Embedder, llm::TextGenerator},
};

/// Explicitly constructed clients shared by the ingestion and answer paths.
#[derive(Clone)]
pub struct AppContext {
    pub config: AppConfig,
    pub cache: Arc<dyn CacheStore>,
    pub embedder: Arc<dyn Embedder>,
    pub vector_index: Arc<dyn VectorIndex>,
    pub generator: Arc<dyn TextGenerator>,
    pub storage: StorageManager,
}

impl AppContext {
    pub fn new(
        config: AppConfig,
        cache: Arc<dyn CacheStore>,
        embedder: Arc<dyn Embedder>,
        vector_index: Arc<dyn VectorIndex>,
        generator: Arc<dyn TextGenerator>,
        storage: StorageManager,
    ) -> Self {
        Self {
            config,
            cache,
            embedder,
            vector_index,
            generator,
            storage,
        }
    }

    pub fn state_tracker(&self) -> PipelineStateTracker {
        PipelineStateTracker::new(Arc::clone(&self.cache))
    }

    pub fn deduplicator(&self) -> IngestionDeduplicator {
        IngestionDeduplicator::new(
            Arc::clone(&self.cache),
            Duration::from_secs(self.config.dedup_ttl_secs),
        )
    }

    pub fn embedding_cache(&self) -> EmbeddingCache {
        EmbeddingCache::new(Arc::clone(&self.cache))
    }

    pub fn answer_cache(&self) -> QueryResponseCache {
        QueryResponseCache::new(
            Arc::clone(&self.cache),
            Duration::from_secs(self.config.answer_ttl_secs),
        )
    }

    pub fn retrieval_cache(&self) -> RetrievalCache {
        RetrievalCache::new(
            Arc::clone(&self.cache),
            Duration::from_secs(self.config.retrieval_ttl_secs),
        )
    }

    pub fn documents(&self) -> DocumentRegistry {
        DocumentRegistry::new(Arc::clone(&self.cache))
    }
}
