use std::time::Duration;

use bytes::Bytes;
use common::{
    cache::{
        dedup::{DedupClaim, IngestionDeduplicator},
        documents::{DocumentRecord, DocumentRegistry},
        fingerprint::fingerprint_bytes,
        state::{IngestionState, PipelineStateTracker},
    },
    context::AppContext,
    error::AppError,
    storage::{
        store::{upload_location, StorageManager},
        types::use_case::UseCase,
    },
};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::queue::{IngestionJob, IngestionQueue};

const MAX_CLAIM_ATTEMPTS: usize = 3;

/// How long a duplicate upload waits for the owning upload to publish its state.
#[derive(Debug, Clone, Copy)]
pub struct ClaimPolling {
    pub attempts: usize,
    pub interval: Duration,
}

impl Default for ClaimPolling {
    fn default() -> Self {
        Self {
            attempts: 40,
            interval: Duration::from_millis(50),
        }
    }
}

pub struct UploadRequest {
    pub bytes: Bytes,
    pub file_name: String,
    pub use_case: UseCase,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadOutcome {
    pub document_id: String,
    pub status: String,
    pub cached: bool,
}

/// Admits uploads, collapsing byte-identical files onto one document per use-case.
#[derive(Clone)]
pub struct UploadCoordinator {
    dedup: IngestionDeduplicator,
    tracker: PipelineStateTracker,
    documents: DocumentRegistry,
    storage: StorageManager,
    queue: IngestionQueue,
    polling: ClaimPolling,
}

impl UploadCoordinator {
    pub fn new(context: &AppContext, queue: IngestionQueue) -> Self {
        Self {
            dedup: context.deduplicator(),
            tracker: context.state_tracker(),
            documents: context.documents(),
            storage: context.storage.clone(),
            queue,
            polling: ClaimPolling::default(),
        }
    }

    #[tracing::instrument(
        skip_all,
        fields(use_case = %request.use_case, file_name = %request.file_name, bytes = request.bytes.len())
    )]
    pub async fn submit(&self, request: UploadRequest) -> Result<UploadOutcome, AppError> {
        if request.bytes.is_empty() {
            return Err(AppError::Validation("uploaded file is empty".into()));
        }

        let fingerprint = fingerprint_bytes(&request.bytes);
        let use_case = request.use_case;

        for _ in 0..MAX_CLAIM_ATTEMPTS {
            let candidate_id = Uuid::new_v4().to_string();
            match self.dedup.claim(&fingerprint, use_case, &candidate_id).await? {
                DedupClaim::Claimed => {
                    return self
                        .start_ingestion(&request, &fingerprint, candidate_id)
                        .await;
                }
                DedupClaim::Existing(document_id) => match self.await_state(&document_id).await? {
                    Some(IngestionState::Failed { reason }) => {
                        info!(%document_id, %reason, "previous ingestion failed; reclaiming");
                        self.dedup.release(&fingerprint, use_case, &document_id).await?;
                    }
                    Some(state) => {
                        info!(%document_id, state = state.as_label(), "duplicate upload");
                        return Ok(UploadOutcome {
                            document_id,
                            status: state.as_label().to_string(),
                            cached: true,
                        });
                    }
                    None => {
                        warn!(%document_id, "dedup mapping has no ingestion state; reclaiming");
                        self.dedup.release(&fingerprint, use_case, &document_id).await?;
                    }
                },
                DedupClaim::Vanished => {}
            }
        }

        Err(AppError::InternalError(
            "could not settle ownership of uploaded content".into(),
        ))
    }

    async fn await_state(&self, document_id: &str) -> Result<Option<IngestionState>, AppError> {
        for attempt in 0..self.polling.attempts {
            if let Some(state) = self.tracker.get_state(document_id).await? {
                return Ok(Some(state));
            }
            if attempt.saturating_add(1) < self.polling.attempts {
                tokio::time::sleep(self.polling.interval).await;
            }
        }
        Ok(None)
    }

    async fn start_ingestion(
        &self,
        request: &UploadRequest,
        fingerprint: &str,
        document_id: String,
    ) -> Result<UploadOutcome, AppError> {
        let use_case = request.use_case;

        if let Err(err) = self.tracker.mark_processing(&document_id).await {
            self.release_claim(fingerprint, use_case, &document_id).await;
            return Err(err);
        }

        if let Err(err) = self
            .persist_and_enqueue(request, fingerprint, &document_id)
            .await
        {
            if let Err(state_err) = self
                .tracker
                .mark_failed(&document_id, &err.to_string())
                .await
            {
                warn!(%document_id, error = %state_err, "failed to record upload failure");
            }
            self.release_claim(fingerprint, use_case, &document_id).await;
            return Err(err);
        }

        info!(%document_id, %use_case, "accepted new document for ingestion");
        Ok(UploadOutcome {
            document_id,
            status: IngestionState::Processing.as_label().to_string(),
            cached: false,
        })
    }

    async fn persist_and_enqueue(
        &self,
        request: &UploadRequest,
        fingerprint: &str,
        document_id: &str,
    ) -> Result<(), AppError> {
        let location = upload_location(request.use_case, document_id, &request.file_name);
        self.storage.put(&location, request.bytes.clone()).await?;

        self.documents
            .save(&DocumentRecord {
                document_id: document_id.to_string(),
                use_case: request.use_case,
                source_url: location.clone(),
                content_fingerprint: fingerprint.to_string(),
                file_name: request.file_name.clone(),
            })
            .await?;

        self.queue
            .enqueue(IngestionJob {
                document_id: document_id.to_string(),
                use_case: request.use_case,
                source_url: location,
            })
            .await
    }

    async fn release_claim(&self, fingerprint: &str, use_case: UseCase, document_id: &str) {
        if let Err(err) = self.dedup.release(fingerprint, use_case, document_id).await {
            warn!(%document_id, error = %err, "failed to release dedup claim");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use common::cache::{memory_store::InMemoryCacheStore, CacheStore};
    use tokio::sync::mpsc::error::TryRecvError;

    use crate::queue::IngestionReceiver;

    struct Harness {
        store: Arc<InMemoryCacheStore>,
        storage: StorageManager,
        coordinator: UploadCoordinator,
        tracker: PipelineStateTracker,
        receiver: IngestionReceiver,
    }

    fn harness() -> Harness {
        let store = Arc::new(InMemoryCacheStore::new());
        let cache: Arc<dyn CacheStore> = store.clone();
        let storage = StorageManager::memory();
        let (queue, receiver) = IngestionQueue::bounded(16);
        let tracker = PipelineStateTracker::new(Arc::clone(&cache));
        let coordinator = UploadCoordinator {
            dedup: IngestionDeduplicator::new(Arc::clone(&cache), Duration::from_secs(86_400)),
            tracker: tracker.clone(),
            documents: DocumentRegistry::new(Arc::clone(&cache)),
            storage: storage.clone(),
            queue,
            polling: ClaimPolling {
                attempts: 20,
                interval: Duration::from_millis(5),
            },
        };
        Harness {
            store,
            storage,
            coordinator,
            tracker,
            receiver,
        }
    }

    fn request(bytes: &'static [u8], use_case: UseCase) -> UploadRequest {
        UploadRequest {
            bytes: Bytes::from_static(bytes),
            file_name: "lecture notes.pdf".into(),
            use_case,
        }
    }

    #[tokio::test]
    async fn first_upload_is_stored_and_enqueued() {
        let mut h = harness();
        let outcome = h
            .coordinator
            .submit(request(b"%PDF-1.7 chapter one", UseCase::Study))
            .await
            .expect("upload");

        assert_eq!(outcome.status, "PROCESSING");
        assert!(!outcome.cached);

        let job = h.receiver.try_recv().expect("job enqueued");
        assert_eq!(job.document_id, outcome.document_id);
        assert_eq!(
            job.source_url,
            format!("uploads/study/{}/lecture_notes.pdf", outcome.document_id)
        );
        assert!(h.storage.exists(&job.source_url).await.expect("exists"));
        assert_eq!(
            h.tracker.get_state(&outcome.document_id).await.expect("state"),
            Some(IngestionState::Processing)
        );
        assert!(h
            .store
            .exists(&format!("doc:{}", outcome.document_id))
            .await
            .expect("exists"));
    }

    #[tokio::test]
    async fn identical_bytes_return_existing_document() {
        let mut h = harness();
        let first = h
            .coordinator
            .submit(request(b"%PDF-1.7 same", UseCase::Study))
            .await
            .expect("upload");
        h.receiver.try_recv().expect("first job");

        let second = h
            .coordinator
            .submit(request(b"%PDF-1.7 same", UseCase::Study))
            .await
            .expect("upload");

        assert_eq!(second.document_id, first.document_id);
        assert_eq!(second.status, "PROCESSING");
        assert!(second.cached);
        assert!(matches!(h.receiver.try_recv(), Err(TryRecvError::Empty)));

        h.tracker.mark_done(&first.document_id).await.expect("done");
        let third = h
            .coordinator
            .submit(request(b"%PDF-1.7 same", UseCase::Study))
            .await
            .expect("upload");
        assert_eq!(third.status, "DONE");
        assert!(third.cached);
    }

    #[tokio::test]
    async fn use_cases_do_not_share_documents() {
        let h = harness();
        let study = h
            .coordinator
            .submit(request(b"%PDF-1.7 shared", UseCase::Study))
            .await
            .expect("upload");
        let invoice = h
            .coordinator
            .submit(request(b"%PDF-1.7 shared", UseCase::Invoice))
            .await
            .expect("upload");

        assert_ne!(study.document_id, invoice.document_id);
        assert!(!invoice.cached);
    }

    #[tokio::test]
    async fn failed_document_is_reingested_under_new_id() {
        let mut h = harness();
        let first = h
            .coordinator
            .submit(request(b"%PDF-1.7 broken", UseCase::Study))
            .await
            .expect("upload");
        h.receiver.try_recv().expect("first job");
        h.tracker
            .mark_failed(&first.document_id, "no extractable text")
            .await
            .expect("failed");

        let retry = h
            .coordinator
            .submit(request(b"%PDF-1.7 broken", UseCase::Study))
            .await
            .expect("upload");

        assert_ne!(retry.document_id, first.document_id);
        assert!(!retry.cached);
        assert_eq!(
            h.receiver.try_recv().expect("second job").document_id,
            retry.document_id
        );
    }

    #[tokio::test]
    async fn concurrent_duplicates_produce_one_job() {
        let mut h = harness();
        let mut handles = Vec::new();
        for _ in 0..8 {
            let coordinator = h.coordinator.clone();
            handles.push(tokio::spawn(async move {
                coordinator
                    .submit(request(b"%PDF-1.7 racing", UseCase::Invoice))
                    .await
                    .expect("upload")
            }));
        }

        let mut outcomes = Vec::new();
        for handle in handles {
            outcomes.push(handle.await.expect("task joins"));
        }

        let owner = outcomes
            .iter()
            .find(|o| !o.cached)
            .expect("one upload owns the content");
        assert_eq!(outcomes.iter().filter(|o| !o.cached).count(), 1);
        assert!(outcomes.iter().all(|o| o.document_id == owner.document_id));

        h.receiver.try_recv().expect("single job");
        assert!(matches!(h.receiver.try_recv(), Err(TryRecvError::Empty)));
    }

    #[tokio::test]
    async fn store_outage_fails_the_upload() {
        let h = harness();
        h.store.set_unavailable(true);
        let result = h
            .coordinator
            .submit(request(b"%PDF-1.7 offline", UseCase::Study))
            .await;
        assert!(matches!(result, Err(AppError::Store(_))));
    }

    #[tokio::test]
    async fn empty_upload_is_rejected() {
        let h = harness();
        let result = h.coordinator.submit(request(b"", UseCase::Study)).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }
}
