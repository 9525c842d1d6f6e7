use std::{sync::Arc, time::Duration};

use tracing::{debug, info};

use crate::{error::AppError, storage::types::use_case::UseCase};

use super::{keys, store::CacheStore};

/// Outcome of racing for ownership of a content fingerprint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DedupClaim {
    /// The caller's candidate id now owns the fingerprint.
    Claimed,
    /// Another upload already owns the fingerprint.
    Existing(String),
    /// The mapping disappeared between the failed claim and the follow-up read.
    Vanished,
}

/// Maps `(content fingerprint, use-case)` onto the document id that ingested it.
#[derive(Clone)]
pub struct IngestionDeduplicator {
    store: Arc<dyn CacheStore>,
    ttl: Duration,
}

impl IngestionDeduplicator {
    pub fn new(store: Arc<dyn CacheStore>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    pub async fn lookup(
        &self,
        content_fingerprint: &str,
        use_case: UseCase,
    ) -> Result<Option<String>, AppError> {
        let key = keys::content_dedup(use_case, content_fingerprint);
        Ok(self.store.get(&key).await?)
    }

    pub async fn record(
        &self,
        content_fingerprint: &str,
        use_case: UseCase,
        document_id: &str,
    ) -> Result<(), AppError> {
        let key = keys::content_dedup(use_case, content_fingerprint);
        self.store.set(&key, document_id, self.ttl).await?;
        Ok(())
    }

    /// Atomically binds `candidate_id` to the fingerprint unless one is already bound.
    pub async fn claim(
        &self,
        content_fingerprint: &str,
        use_case: UseCase,
        candidate_id: &str,
    ) -> Result<DedupClaim, AppError> {
        let key = keys::content_dedup(use_case, content_fingerprint);
        if self.store.set_if_absent(&key, candidate_id, self.ttl).await? {
            info!(%use_case, document_id = candidate_id, "Claimed new content fingerprint");
            return Ok(DedupClaim::Claimed);
        }

        match self.store.get(&key).await? {
            Some(existing) => {
                debug!(%use_case, document_id = %existing, "Content fingerprint already claimed");
                Ok(DedupClaim::Existing(existing))
            }
            None => Ok(DedupClaim::Vanished),
        }
    }

    /// Drops the mapping only while it still points at `document_id`.
    pub async fn release(
        &self,
        content_fingerprint: &str,
        use_case: UseCase,
        document_id: &str,
    ) -> Result<bool, AppError> {
        let key = keys::content_dedup(use_case, content_fingerprint);
        Ok(self.store.delete_if_equals(&key, document_id).await?)
    }
}
