use std::{sync::Arc, time::Duration};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::storage::types::use_case::UseCase;

use super::{
    keys,
    store::{get_json, set_json, CacheStore},
};

/// A chunk returned by the vector index for a question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedChunk {
    pub text: String,
    pub page: u32,
    pub source: String,
    pub score: f32,
}

/// Short-lived memo of index results per `(use-case, document, normalized question)`.
#[derive(Clone)]
pub struct RetrievalCache {
    store: Arc<dyn CacheStore>,
    ttl: Duration,
}

impl RetrievalCache {
    pub fn new(store: Arc<dyn CacheStore>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    pub async fn get(
        &self,
        use_case: UseCase,
        document_id: &str,
        question: &str,
    ) -> Option<Vec<RetrievedChunk>> {
        let key = keys::retrieval(use_case, document_id, question);
        get_json(self.store.as_ref(), &key)
            .await
            .unwrap_or_else(|err| {
                warn!(document_id, error = %err, "Retrieval cache read failed; treating as miss");
                None
            })
    }

    pub async fn put(
        &self,
        use_case: UseCase,
        document_id: &str,
        question: &str,
        chunks: &[RetrievedChunk],
    ) {
        let key = keys::retrieval(use_case, document_id, question);
        if let Err(err) = set_json(self.store.as_ref(), &key, &chunks, Some(self.ttl)).await {
            warn!(document_id, error = %err, "Retrieval cache write failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::memory_store::InMemoryCacheStore;

    #[tokio::test(start_paused = true)]
    async fn memo_expires_after_ttl() {
        let cache = RetrievalCache::new(
            Arc::new(InMemoryCacheStore::new()),
            Duration::from_secs(900),
        );
        let chunks = vec![RetrievedChunk {
            text: "Invoice number INV-7".into(),
            page: 1,
            source: "uploads/invoice/doc-1/a.pdf".into(),
            score: 0.8,
        }];

        cache.put(UseCase::Invoice, "doc-1", "Invoice number?", &chunks).await;
        assert_eq!(
            cache.get(UseCase::Invoice, "doc-1", " invoice NUMBER? ").await,
            Some(chunks)
        );

        tokio::time::advance(Duration::from_secs(901)).await;
        assert_eq!(cache.get(UseCase::Invoice, "doc-1", "Invoice number?").await, None);
    }
}
