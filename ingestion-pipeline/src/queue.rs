use common::{error::AppError, storage::types::use_case::UseCase};
use tokio::sync::mpsc;

/// Work item handed from the upload path to the ingestion workers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestionJob {
    pub document_id: String,
    pub use_case: UseCase,
    pub source_url: String,
}

/// Sending half of the bounded ingestion queue.
#[derive(Clone)]
pub struct IngestionQueue {
    sender: mpsc::Sender<IngestionJob>,
}

pub type IngestionReceiver = mpsc::Receiver<IngestionJob>;

impl IngestionQueue {
    pub fn bounded(capacity: usize) -> (Self, IngestionReceiver) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (Self { sender }, receiver)
    }

    /// Waits for queue capacity, so a burst of uploads applies backpressure.
    pub async fn enqueue(&self, job: IngestionJob) -> Result<(), AppError> {
        self.sender
            .send(job)
            .await
            .map_err(|_| AppError::InternalError("ingestion queue is closed".into()))
    }
}
