use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::{error::AppError, storage::types::use_case::UseCase};

use super::{
    keys,
    store::{get_json, set_json, CacheStore},
};

/// Immutable facts about an uploaded document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub document_id: String,
    pub use_case: UseCase,
    /// Object storage location or remote URL the pipeline loads pages from.
    pub source_url: String,
    pub content_fingerprint: String,
    pub file_name: String,
}

#[derive(Clone)]
pub struct DocumentRegistry {
    store: Arc<dyn CacheStore>,
}

impl DocumentRegistry {
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self { store }
    }

    pub async fn save(&self, record: &DocumentRecord) -> Result<(), AppError> {
        set_json(
            self.store.as_ref(),
            &keys::document(&record.document_id),
            record,
            None,
        )
        .await?;
        Ok(())
    }

    pub async fn get(&self, document_id: &str) -> Result<Option<DocumentRecord>, AppError> {
        Ok(get_json(self.store.as_ref(), &keys::document(document_id)).await?)
    }
}
