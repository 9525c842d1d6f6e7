//! Caching and deduplication in front of ingestion, embedding, retrieval and
//! answer generation.

pub mod answers;
pub mod dedup;
pub mod documents;
pub mod embeddings;
pub mod fingerprint;
pub mod keys;
pub mod memory_store;
pub mod redis_store;
pub mod retrieval;
pub mod state;
pub mod store;

use std::sync::Arc;

pub use store::{CacheStore, StoreError};

use crate::utils::config::{AppConfig, CacheBackend};

/// Builds the configured cache backend.
pub async fn connect(config: &AppConfig) -> Result<Arc<dyn CacheStore>, StoreError> {
    match config.cache_backend {
        CacheBackend::Redis => Ok(Arc::new(
            redis_store::RedisCacheStore::connect(&config.redis_url).await?,
        )),
        CacheBackend::Memory => Ok(Arc::new(memory_store::InMemoryCacheStore::new())),
    }
}
