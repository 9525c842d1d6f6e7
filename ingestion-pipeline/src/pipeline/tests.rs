use std::sync::Arc;

use async_trait::async_trait;
use common::{
    cache::{memory_store::InMemoryCacheStore, state::IngestionState, state::PipelineStateTracker},
    error::AppError,
    storage::{
        types::{
            chunk::{Chunk, PageText},
            use_case::UseCase,
        },
        vector_index::VectorRecord,
    },
};
use tokio::sync::Mutex;

use crate::queue::IngestionJob;

use super::{
    config::{IngestionConfig, IngestionTuning},
    services::PipelineServices,
    IngestionPipeline,
};

struct MockServices {
    pages: Vec<PageText>,
    embedding_dim: usize,
    calls: Mutex<Vec<&'static str>>,
    indexed: Mutex<Vec<(String, Vec<VectorRecord>)>>,
}

impl MockServices {
    fn new() -> Self {
        Self {
            pages: vec![
                PageText {
                    page: 1,
                    text: "Photosynthesis converts light into chemical energy.".into(),
                },
                PageText {
                    page: 2,
                    text: "Chlorophyll absorbs mostly blue and red light.".into(),
                },
            ],
            embedding_dim: 8,
            calls: Mutex::new(Vec::new()),
            indexed: Mutex::new(Vec::new()),
        }
    }

    fn with_pages(mut self, pages: Vec<PageText>) -> Self {
        self.pages = pages;
        self
    }

    async fn record(&self, stage: &'static str) {
        self.calls.lock().await.push(stage);
    }
}

#[async_trait]
impl PipelineServices for MockServices {
    async fn load_pages(&self, _source_url: &str) -> Result<Vec<PageText>, AppError> {
        self.record("load").await;
        Ok(self.pages.clone())
    }

    async fn chunk_pages(
        &self,
        _use_case: UseCase,
        pages: &[PageText],
        _tuning: &IngestionTuning,
    ) -> Result<Vec<Chunk>, AppError> {
        self.record("chunk").await;
        Ok(pages
            .iter()
            .filter(|page| !page.text.trim().is_empty())
            .map(|page| Chunk::new(page.text.clone(), page.page))
            .collect())
    }

    async fn embed_chunks(
        &self,
        _use_case: UseCase,
        texts: &[String],
    ) -> Result<Vec<Vec<f32>>, AppError> {
        self.record("embed").await;
        Ok(texts.iter().map(|_| vec![0.5; self.embedding_dim]).collect())
    }

    async fn index_vectors(
        &self,
        namespace: &str,
        records: Vec<VectorRecord>,
    ) -> Result<(), AppError> {
        self.record("index").await;
        self.indexed
            .lock()
            .await
            .push((namespace.to_string(), records));
        Ok(())
    }
}

struct FailingEmbedServices {
    inner: MockServices,
}

#[async_trait]
impl PipelineServices for FailingEmbedServices {
    async fn load_pages(&self, source_url: &str) -> Result<Vec<PageText>, AppError> {
        self.inner.load_pages(source_url).await
    }

    async fn chunk_pages(
        &self,
        use_case: UseCase,
        pages: &[PageText],
        tuning: &IngestionTuning,
    ) -> Result<Vec<Chunk>, AppError> {
        self.inner.chunk_pages(use_case, pages, tuning).await
    }

    async fn embed_chunks(
        &self,
        _use_case: UseCase,
        _texts: &[String],
    ) -> Result<Vec<Vec<f32>>, AppError> {
        self.inner.record("embed").await;
        Err(AppError::Upstream("embedding provider returned 503".into()))
    }

    async fn index_vectors(
        &self,
        namespace: &str,
        records: Vec<VectorRecord>,
    ) -> Result<(), AppError> {
        self.inner.index_vectors(namespace, records).await
    }
}

fn job(document_id: &str, use_case: UseCase) -> IngestionJob {
    IngestionJob {
        document_id: document_id.into(),
        use_case,
        source_url: format!("uploads/{use_case}/{document_id}/notes.pdf"),
    }
}

async fn processing_tracker(document_id: &str) -> PipelineStateTracker {
    let tracker = PipelineStateTracker::new(Arc::new(InMemoryCacheStore::new()));
    tracker
        .mark_processing(document_id)
        .await
        .expect("mark processing");
    tracker
}

#[tokio::test]
async fn successful_job_runs_every_stage_and_marks_done() {
    let tracker = processing_tracker("doc-1").await;
    let services = Arc::new(MockServices::new());
    let pipeline = IngestionPipeline::with_services(
        tracker.clone(),
        IngestionConfig::default(),
        services.clone(),
    );

    pipeline
        .process_job(&job("doc-1", UseCase::Study))
        .await
        .expect("pipeline succeeds");

    assert_eq!(
        *services.calls.lock().await,
        vec!["load", "chunk", "embed", "index"]
    );
    assert_eq!(
        tracker.get_state("doc-1").await.expect("state"),
        Some(IngestionState::Done)
    );

    let indexed = services.indexed.lock().await;
    let (namespace, records) = indexed.first().expect("index call recorded");
    assert_eq!(namespace, "study:doc-1");
    assert_eq!(records.len(), 2);
    assert_eq!(
        records.iter().map(|r| r.id.as_str()).collect::<Vec<_>>(),
        vec!["doc-1_0", "doc-1_1"]
    );
    assert_eq!(
        records.iter().map(|r| r.metadata.page).collect::<Vec<_>>(),
        vec![1, 2]
    );
    assert!(records
        .iter()
        .all(|r| r.metadata.source == "uploads/study/doc-1/notes.pdf"));
}

#[tokio::test]
async fn embedding_failure_marks_failed_and_skips_indexing() {
    let tracker = processing_tracker("doc-2").await;
    let services = Arc::new(FailingEmbedServices {
        inner: MockServices::new(),
    });
    let pipeline = IngestionPipeline::with_services(
        tracker.clone(),
        IngestionConfig::default(),
        services.clone(),
    );

    let result = pipeline.process_job(&job("doc-2", UseCase::Invoice)).await;

    assert!(matches!(result, Err(AppError::Processing(_))));
    assert_eq!(
        *services.inner.calls.lock().await,
        vec!["load", "chunk", "embed"]
    );
    assert!(services.inner.indexed.lock().await.is_empty());

    match tracker.get_state("doc-2").await.expect("state") {
        Some(IngestionState::Failed { reason }) => {
            assert!(reason.contains("embedding provider returned 503"));
        }
        other => panic!("expected FAILED state, got {other:?}"),
    }
}

#[tokio::test]
async fn document_without_text_fails_after_extraction() {
    let tracker = processing_tracker("doc-3").await;
    let services = Arc::new(MockServices::new().with_pages(vec![
        PageText {
            page: 1,
            text: "   ".into(),
        },
        PageText {
            page: 2,
            text: String::new(),
        },
    ]));
    let pipeline = IngestionPipeline::with_services(
        tracker.clone(),
        IngestionConfig::default(),
        services.clone(),
    );

    let result = pipeline.process_job(&job("doc-3", UseCase::Study)).await;

    assert!(result.is_err());
    assert_eq!(*services.calls.lock().await, vec!["load"]);
    assert!(matches!(
        tracker.get_state("doc-3").await.expect("state"),
        Some(IngestionState::Failed { .. })
    ));
}

#[tokio::test]
async fn job_for_unknown_document_runs_no_stages() {
    let tracker = PipelineStateTracker::new(Arc::new(InMemoryCacheStore::new()));
    let services = Arc::new(MockServices::new());
    let pipeline = IngestionPipeline::with_services(
        tracker.clone(),
        IngestionConfig::default(),
        services.clone(),
    );

    let result = pipeline.process_job(&job("doc-4", UseCase::Study)).await;

    assert!(matches!(result, Err(AppError::Validation(_))));
    assert!(services.calls.lock().await.is_empty());
    assert!(services.indexed.lock().await.is_empty());
    assert_eq!(tracker.get_state("doc-4").await.expect("state"), None);
}

#[tokio::test]
async fn job_for_finished_document_is_not_rerun() {
    let tracker = processing_tracker("doc-5").await;
    tracker.mark_done("doc-5").await.expect("mark done");
    let services = Arc::new(MockServices::new());
    let pipeline = IngestionPipeline::with_services(
        tracker.clone(),
        IngestionConfig::default(),
        services.clone(),
    );

    let result = pipeline.process_job(&job("doc-5", UseCase::Study)).await;

    assert!(result.is_err());
    assert!(services.calls.lock().await.is_empty());
    assert_eq!(
        tracker.get_state("doc-5").await.expect("state"),
        Some(IngestionState::Done)
    );
}
