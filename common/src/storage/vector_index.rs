use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::AppError;

use super::{
    db::SurrealDbClient,
    types::{indexed_chunk::IndexedChunk, StoredObject},
};

/// Metadata stored alongside every vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub text: String,
    pub page: u32,
    pub source: String,
    pub document_id: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VectorRecord {
    pub id: String,
    pub values: Vec<f32>,
    pub metadata: ChunkMetadata,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct VectorMatch {
    pub id: String,
    pub score: f32,
    #[serde(flatten)]
    pub metadata: ChunkMetadata,
}

/// Namespaced nearest-neighbour store.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Inserts or replaces records by id within `namespace`.
    async fn upsert(&self, namespace: &str, records: Vec<VectorRecord>) -> Result<(), AppError>;

    /// Returns at most `top_k` matches ordered by descending similarity.
    async fn query(
        &self,
        namespace: &str,
        vector: &[f32],
        top_k: usize,
    ) -> Result<Vec<VectorMatch>, AppError>;

    async fn ping(&self) -> Result<(), AppError>;
}

/// Vector index backed by a SurrealDB table with cosine scoring.
#[derive(Clone)]
pub struct SurrealVectorIndex {
    db: Arc<SurrealDbClient>,
}

impl SurrealVectorIndex {
    pub fn new(db: Arc<SurrealDbClient>) -> Self {
        Self { db }
    }

    pub async fn ensure_schema(&self) -> Result<(), AppError> {
        let query = format!(
            "DEFINE INDEX IF NOT EXISTS idx_{table}_namespace ON TABLE {table} FIELDS namespace;",
            table = IndexedChunk::table_name()
        );
        self.db.client.query(query).await?.check()?;
        Ok(())
    }
}

#[async_trait]
impl VectorIndex for SurrealVectorIndex {
    async fn upsert(&self, namespace: &str, records: Vec<VectorRecord>) -> Result<(), AppError> {
        let count = records.len();
        for record in records {
            let row = IndexedChunk::new(
                record.id,
                namespace.to_owned(),
                record.metadata.document_id,
                record.metadata.text,
                record.metadata.page,
                record.metadata.source,
                record.values,
            );
            self.db
                .upsert_item(row)
                .await
                .map_err(|e| AppError::Upstream(format!("vector index upsert failed: {e}")))?;
        }
        debug!(namespace, count, "Upserted vectors");
        Ok(())
    }

    async fn query(
        &self,
        namespace: &str,
        vector: &[f32],
        top_k: usize,
    ) -> Result<Vec<VectorMatch>, AppError> {
        let query = format!(
            "SELECT record::id(id) AS id, text, page, source, document_id, \
             vector::similarity::cosine(embedding, $vector) AS score \
             FROM {table} WHERE namespace = $namespace \
             ORDER BY score DESC LIMIT $top_k",
            table = IndexedChunk::table_name()
        );

        let mut response = self
            .db
            .client
            .query(query)
            .bind(("vector", vector.to_vec()))
            .bind(("namespace", namespace.to_owned()))
            .bind(("top_k", top_k))
            .await
            .map_err(|e| AppError::Upstream(format!("vector index query failed: {e}")))?;

        let matches: Vec<VectorMatch> = response
            .take(0)
            .map_err(|e| AppError::Upstream(format!("vector index query failed: {e}")))?;
        Ok(matches)
    }

    async fn ping(&self) -> Result<(), AppError> {
        Ok(self.db.ping().await?)
    }
}
