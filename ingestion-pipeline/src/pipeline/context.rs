use common::{
    error::AppError,
    storage::types::chunk::{Chunk, PageText},
};
use tracing::error;

use crate::queue::IngestionJob;

use super::{config::IngestionConfig, services::PipelineServices};

pub struct PipelineContext<'a> {
    pub job: &'a IngestionJob,
    pub document_id: String,
    pub pipeline_config: &'a IngestionConfig,
    pub services: &'a dyn PipelineServices,
    pub pages: Vec<PageText>,
    pub chunks: Vec<Chunk>,
    pub embeddings: Vec<Vec<f32>>,
}

impl<'a> PipelineContext<'a> {
    pub fn new(
        job: &'a IngestionJob,
        pipeline_config: &'a IngestionConfig,
        services: &'a dyn PipelineServices,
    ) -> Self {
        Self {
            job,
            document_id: job.document_id.clone(),
            pipeline_config,
            services,
            pages: Vec::new(),
            chunks: Vec::new(),
            embeddings: Vec::new(),
        }
    }

    pub fn abort(&mut self, err: AppError) -> AppError {
        error!(
            document_id = %self.document_id,
            use_case = %self.job.use_case,
            error = %err,
            "ingestion pipeline aborted"
        );
        err
    }
}
