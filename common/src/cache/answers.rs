use std::{sync::Arc, time::Duration};

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::{
    keys,
    store::{get_json, set_json, CacheStore},
};

/// One source reference attached to an answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerSource {
    pub page: u32,
    pub source: String,
    pub score: f32,
}

/// The cached part of an answer. `cached` is never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerPayload {
    pub answer: String,
    pub sources: Vec<AnswerSource>,
}

/// Response body of a chat request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    #[serde(flatten)]
    pub payload: AnswerPayload,
    pub cached: bool,
}

impl ChatResponse {
    pub fn fresh(payload: AnswerPayload) -> Self {
        Self {
            payload,
            cached: false,
        }
    }

    pub fn from_cache(payload: AnswerPayload) -> Self {
        Self {
            payload,
            cached: true,
        }
    }
}

/// Whole-answer memo per `(document, normalized question)`.
#[derive(Clone)]
pub struct QueryResponseCache {
    store: Arc<dyn CacheStore>,
    ttl: Duration,
}

impl QueryResponseCache {
    pub fn new(store: Arc<dyn CacheStore>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    /// Read failures and corrupt entries are reported as misses.
    pub async fn get_answer(&self, document_id: &str, question: &str) -> Option<AnswerPayload> {
        let key = keys::answer(document_id, question);
        get_json(self.store.as_ref(), &key)
            .await
            .unwrap_or_else(|err| {
                warn!(document_id, error = %err, "Answer cache read failed; treating as miss");
                None
            })
    }

    pub async fn put_answer(&self, document_id: &str, question: &str, payload: &AnswerPayload) {
        let key = keys::answer(document_id, question);
        if let Err(err) = set_json(self.store.as_ref(), &key, payload, Some(self.ttl)).await {
            warn!(document_id, error = %err, "Answer cache write failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::memory_store::InMemoryCacheStore;

    fn payload() -> AnswerPayload {
        AnswerPayload {
            answer: "Photosynthesis converts light into chemical energy.".into(),
            sources: vec![AnswerSource {
                page: 3,
                source: "uploads/study/doc-1/biology.pdf".into(),
                score: 0.91,
            }],
        }
    }

    #[tokio::test]
    async fn stored_answers_are_found_by_normalized_question() {
        let cache = QueryResponseCache::new(
            Arc::new(InMemoryCacheStore::new()),
            Duration::from_secs(3600),
        );
        cache.put_answer("doc-1", "What is X?", &payload()).await;

        assert_eq!(cache.get_answer("doc-1", "  what is x?  ").await, Some(payload()));
        assert_eq!(cache.get_answer("doc-2", "What is X?").await, None);
    }

    #[tokio::test]
    async fn corrupt_entries_are_misses() {
        let store = Arc::new(InMemoryCacheStore::new());
        let cache = QueryResponseCache::new(store.clone(), Duration::from_secs(3600));
        store
            .set_forever(&keys::answer("doc-1", "q"), "{not json")
            .await
            .expect("set");

        assert_eq!(cache.get_answer("doc-1", "q").await, None);
    }

    #[tokio::test]
    async fn outage_degrades_reads_and_swallows_writes() {
        let store = Arc::new(InMemoryCacheStore::new());
        let cache = QueryResponseCache::new(store.clone(), Duration::from_secs(3600));
        store.set_unavailable(true);

        cache.put_answer("doc-1", "q", &payload()).await;
        assert_eq!(cache.get_answer("doc-1", "q").await, None);
    }

    #[test]
    fn chat_response_flattens_payload() {
        let json = serde_json::to_value(ChatResponse::from_cache(payload())).expect("json");
        assert_eq!(json["cached"], true);
        assert_eq!(json["sources"][0]["page"], 3);
        assert!(json["answer"].is_string());
    }
}
