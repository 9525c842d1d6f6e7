#![allow(clippy::missing_docs_in_private_items, clippy::result_large_err)]

pub mod pipeline;
pub mod queue;
pub mod upload;
pub mod utils;

pub use pipeline::{IngestionConfig, IngestionPipeline, IngestionTuning};
pub use queue::{IngestionJob, IngestionQueue, IngestionReceiver};
pub use upload::{UploadCoordinator, UploadOutcome, UploadRequest};

use std::sync::Arc;
use tokio::{sync::Mutex, task::JoinHandle};
use tracing::{error, info};

/// Pulls jobs off the shared queue until every sender is gone.
pub async fn run_worker_loop(
    worker_id: usize,
    receiver: Arc<Mutex<IngestionReceiver>>,
    ingestion_pipeline: Arc<IngestionPipeline>,
) {
    loop {
        let next = receiver.lock().await.recv().await;
        let Some(job) = next else {
            info!(worker_id, "ingestion queue closed; worker exiting");
            return;
        };

        info!(
            worker_id,
            document_id = %job.document_id,
            use_case = %job.use_case,
            "picked up ingestion job"
        );
        if let Err(err) = ingestion_pipeline.process_job(&job).await {
            error!(
                worker_id,
                document_id = %job.document_id,
                error = %err,
                "ingestion job failed"
            );
        }
    }
}

pub fn spawn_workers(
    count: usize,
    receiver: IngestionReceiver,
    ingestion_pipeline: Arc<IngestionPipeline>,
) -> Vec<JoinHandle<()>> {
    let receiver = Arc::new(Mutex::new(receiver));
    (0..count.max(1))
        .map(|worker_id| {
            tokio::spawn(run_worker_loop(
                worker_id,
                Arc::clone(&receiver),
                Arc::clone(&ingestion_pipeline),
            ))
        })
        .collect()
}
