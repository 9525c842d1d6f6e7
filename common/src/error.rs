use async_openai::error::OpenAIError;
use thiserror::Error;
use tokio::task::JoinError;

use crate::cache::StoreError;

/// Why a document cannot serve answers yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotReadyReason {
    /// No ingestion state exists for the id; the client should re-upload.
    Unknown,
    /// Ingestion is still running; the client should retry later.
    Processing,
    /// Ingestion terminated with an error; the client should re-upload.
    Failed(String),
}

impl std::fmt::Display for NotReadyReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unknown => f.write_str("document is unknown"),
            Self::Processing => f.write_str("document is still processing"),
            Self::Failed(reason) => write!(f, "document ingestion failed: {reason}"),
        }
    }
}

// Core internal errors
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Document not ready: {document_id}: {reason}")]
    NotReady {
        document_id: String,
        reason: NotReadyReason,
    },
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("Upstream failure: {0}")]
    Upstream(String),
    #[error("Extraction failure: {0}")]
    Extraction(String),
    #[error("Database error: {0}")]
    Database(#[from] surrealdb::Error),
    #[error("OpenAI error: {0}")]
    OpenAI(#[from] OpenAIError),
    #[error("Object storage error: {0}")]
    ObjectStore(#[from] object_store::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Task join error: {0}")]
    Join(#[from] JoinError),
    #[error("IoError: {0}")]
    Io(#[from] std::io::Error),
    #[error("Reqwest error: {0}")]
    Reqwest(#[from] reqwest::Error),
    #[error("Anyhow error: {0}")]
    Anyhow(#[from] anyhow::Error),
    #[error("Ingestion Processing error: {0}")]
    Processing(String),
    #[error("Internal service error: {0}")]
    InternalError(String),
}

impl AppError {
    pub fn not_ready(document_id: impl Into<String>, reason: NotReadyReason) -> Self {
        Self::NotReady {
            document_id: document_id.into(),
            reason,
        }
    }
}
