mod config;
mod context;
mod services;
mod stages;
mod state;

pub use config::{IngestionConfig, IngestionTuning};
#[allow(clippy::module_name_repetitions)]
pub use services::{DefaultPipelineServices, PipelineServices};

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use common::{
    cache::state::{IngestionState, PipelineStateTracker},
    context::AppContext,
    error::AppError,
};
use tracing::{info, warn};

use crate::{queue::IngestionJob, utils::pdf_ingestion::DocumentLoader};

use self::{
    context::PipelineContext,
    stages::{chunk, embed, extract, index},
    state::ready,
};

#[allow(clippy::module_name_repetitions)]
pub struct IngestionPipeline {
    tracker: PipelineStateTracker,
    pipeline_config: IngestionConfig,
    services: Arc<dyn PipelineServices>,
}

impl IngestionPipeline {
    pub fn new(context: &AppContext, loader: Arc<dyn DocumentLoader>) -> Self {
        let services = DefaultPipelineServices::from_context(context, loader);
        Self::with_services(
            context.state_tracker(),
            IngestionConfig::from_app_config(&context.config),
            Arc::new(services),
        )
    }

    pub fn with_services(
        tracker: PipelineStateTracker,
        pipeline_config: IngestionConfig,
        services: Arc<dyn PipelineServices>,
    ) -> Self {
        Self {
            tracker,
            pipeline_config,
            services,
        }
    }

    /// Runs one job and records the terminal state.
    ///
    /// The document must already be `PROCESSING`. Any stage failure moves it to
    /// `FAILED` with the error as reason. Jobs for documents in any other state
    /// are rejected before the first stage and leave the state untouched.
    #[tracing::instrument(
        skip_all,
        fields(document_id = %job.document_id, use_case = %job.use_case)
    )]
    pub async fn process_job(&self, job: &IngestionJob) -> Result<(), AppError> {
        match self.tracker.get_state(&job.document_id).await? {
            Some(IngestionState::Processing) => {}
            other => {
                let state = other.as_ref().map_or("UNKNOWN", IngestionState::as_label);
                warn!(
                    document_id = %job.document_id,
                    state,
                    "skipping ingestion job for document that is not processing"
                );
                return Err(AppError::Validation(format!(
                    "Document {} is {state}, not PROCESSING",
                    job.document_id
                )));
            }
        }

        match self.drive_pipeline(job).await {
            Ok(()) => {
                self.tracker.mark_done(&job.document_id).await?;
                info!(document_id = %job.document_id, "ingestion job succeeded");
                Ok(())
            }
            Err(err) => {
                let reason = err.to_string();
                if let Err(state_err) = self.tracker.mark_failed(&job.document_id, &reason).await {
                    warn!(
                        document_id = %job.document_id,
                        error = %state_err,
                        "failed to record ingestion failure"
                    );
                }
                Err(AppError::Processing(reason))
            }
        }
    }

    fn duration_millis(duration: Duration) -> u64 {
        u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
    }

    async fn drive_pipeline(&self, job: &IngestionJob) -> Result<(), AppError> {
        let mut ctx = PipelineContext::new(job, &self.pipeline_config, self.services.as_ref());

        let machine = ready();

        let pipeline_started = Instant::now();

        let stage_start = Instant::now();
        let machine = extract(machine, &mut ctx)
            .await
            .map_err(|err| ctx.abort(err))?;
        let extract_duration = stage_start.elapsed();

        let stage_start = Instant::now();
        let machine = chunk(machine, &mut ctx)
            .await
            .map_err(|err| ctx.abort(err))?;
        let chunk_duration = stage_start.elapsed();
        let chunk_count = ctx.chunks.len();

        let stage_start = Instant::now();
        let machine = embed(machine, &mut ctx)
            .await
            .map_err(|err| ctx.abort(err))?;
        let embed_duration = stage_start.elapsed();

        let stage_start = Instant::now();
        let _machine = index(machine, &mut ctx)
            .await
            .map_err(|err| ctx.abort(err))?;
        let index_duration = stage_start.elapsed();

        let total_duration = pipeline_started.elapsed();
        info!(
            document_id = %ctx.document_id,
            use_case = %job.use_case,
            pages = ctx.pages.len(),
            chunk_count,
            total_ms = Self::duration_millis(total_duration),
            extract_ms = Self::duration_millis(extract_duration),
            chunk_ms = Self::duration_millis(chunk_duration),
            embed_ms = Self::duration_millis(embed_duration),
            index_ms = Self::duration_millis(index_duration),
            "ingestion pipeline finished"
        );

        Ok(())
    }
}

#[cfg(test)]
mod tests;
