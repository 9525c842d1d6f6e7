use common::{cache::state::PipelineStateTracker, context::AppContext, utils::config::AppConfig};
use ingestion_pipeline::{IngestionQueue, UploadCoordinator};
use retrieval_pipeline::AnswerCoordinator;

#[derive(Clone)]
pub struct ApiState {
    pub context: AppContext,
    pub uploads: UploadCoordinator,
    pub answers: AnswerCoordinator,
    pub tracker: PipelineStateTracker,
}

impl ApiState {
    pub fn new(context: AppContext, queue: IngestionQueue) -> Self {
        Self {
            uploads: UploadCoordinator::new(&context, queue),
            answers: AnswerCoordinator::new(&context),
            tracker: context.state_tracker(),
            context,
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.context.config
    }
}
