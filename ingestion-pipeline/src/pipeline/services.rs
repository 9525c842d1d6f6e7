use std::sync::Arc;

use async_trait::async_trait;
use common::{
    cache::embeddings::EmbeddingCache,
    context::AppContext,
    error::AppError,
    storage::{
        types::{
            chunk::{Chunk, PageText},
            use_case::UseCase,
        },
        vector_index::{VectorIndex, VectorRecord},
    },
    utils::embedding::Embedder,
};

use crate::utils::{chunking::chunk_pages, pdf_ingestion::DocumentLoader};

use super::config::IngestionTuning;

/// Collaborators the ingestion stages call out to.
#[async_trait]
pub trait PipelineServices: Send + Sync {
    async fn load_pages(&self, source_url: &str) -> Result<Vec<PageText>, AppError>;

    async fn chunk_pages(
        &self,
        use_case: UseCase,
        pages: &[PageText],
        tuning: &IngestionTuning,
    ) -> Result<Vec<Chunk>, AppError>;

    /// Returns one vector per text, reusing cached vectors where possible.
    async fn embed_chunks(
        &self,
        use_case: UseCase,
        texts: &[String],
    ) -> Result<Vec<Vec<f32>>, AppError>;

    async fn index_vectors(
        &self,
        namespace: &str,
        records: Vec<VectorRecord>,
    ) -> Result<(), AppError>;
}

pub struct DefaultPipelineServices {
    loader: Arc<dyn DocumentLoader>,
    embedding_cache: EmbeddingCache,
    embedder: Arc<dyn Embedder>,
    vector_index: Arc<dyn VectorIndex>,
}

impl DefaultPipelineServices {
    pub fn new(
        loader: Arc<dyn DocumentLoader>,
        embedding_cache: EmbeddingCache,
        embedder: Arc<dyn Embedder>,
        vector_index: Arc<dyn VectorIndex>,
    ) -> Self {
        Self {
            loader,
            embedding_cache,
            embedder,
            vector_index,
        }
    }

    pub fn from_context(context: &AppContext, loader: Arc<dyn DocumentLoader>) -> Self {
        Self::new(
            loader,
            context.embedding_cache(),
            Arc::clone(&context.embedder),
            Arc::clone(&context.vector_index),
        )
    }
}

#[async_trait]
impl PipelineServices for DefaultPipelineServices {
    async fn load_pages(&self, source_url: &str) -> Result<Vec<PageText>, AppError> {
        self.loader.load(source_url).await
    }

    async fn chunk_pages(
        &self,
        use_case: UseCase,
        pages: &[PageText],
        tuning: &IngestionTuning,
    ) -> Result<Vec<Chunk>, AppError> {
        chunk_pages(use_case, pages, tuning.chunk_size, tuning.chunk_overlap)
    }

    async fn embed_chunks(
        &self,
        use_case: UseCase,
        texts: &[String],
    ) -> Result<Vec<Vec<f32>>, AppError> {
        self.embedding_cache
            .resolve(use_case, texts, self.embedder.as_ref())
            .await
    }

    async fn index_vectors(
        &self,
        namespace: &str,
        records: Vec<VectorRecord>,
    ) -> Result<(), AppError> {
        self.vector_index.upsert(namespace, records).await
    }
}
