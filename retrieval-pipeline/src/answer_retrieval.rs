use std::sync::Arc;

use common::{
    cache::{
        answers::{AnswerPayload, AnswerSource, ChatResponse, QueryResponseCache},
        documents::DocumentRegistry,
        keys::vector_namespace,
        retrieval::{RetrievalCache, RetrievedChunk},
        state::{IngestionState, PipelineStateTracker},
    },
    context::AppContext,
    error::{AppError, NotReadyReason},
    storage::{types::use_case::UseCase, vector_index::VectorIndex},
    utils::{embedding::Embedder, llm::TextGenerator},
};
use tracing::{debug, info, warn};

use crate::{
    prompts::{build_context, create_user_message, system_prompt},
    retrieve_chunks,
};

/// Serves chat answers for ingested documents, reusing cached answers and retrievals.
#[derive(Clone)]
pub struct AnswerCoordinator {
    tracker: PipelineStateTracker,
    documents: DocumentRegistry,
    answers: QueryResponseCache,
    retrievals: RetrievalCache,
    embedder: Arc<dyn Embedder>,
    vector_index: Arc<dyn VectorIndex>,
    generator: Arc<dyn TextGenerator>,
    top_k: usize,
}

impl AnswerCoordinator {
    pub fn new(context: &AppContext) -> Self {
        Self {
            tracker: context.state_tracker(),
            documents: context.documents(),
            answers: context.answer_cache(),
            retrievals: context.retrieval_cache(),
            embedder: Arc::clone(&context.embedder),
            vector_index: Arc::clone(&context.vector_index),
            generator: Arc::clone(&context.generator),
            top_k: context.config.retrieval_top_k.max(1),
        }
    }

    /// Answers `question` against one document.
    ///
    /// Documents that are not `DONE` are rejected before any cache, index or
    /// model access.
    #[tracing::instrument(skip_all, fields(document_id = %document_id))]
    pub async fn answer(
        &self,
        document_id: &str,
        question: &str,
        requested_use_case: Option<UseCase>,
    ) -> Result<ChatResponse, AppError> {
        if question.trim().is_empty() {
            return Err(AppError::Validation("question must not be empty".into()));
        }

        self.ensure_ready(document_id).await?;

        if let Some(payload) = self.answers.get_answer(document_id, question).await {
            info!(document_id, "answer served from cache");
            return Ok(ChatResponse::from_cache(payload));
        }

        let use_case = self.resolve_use_case(document_id, requested_use_case).await;
        let chunks = self.retrieve(use_case, document_id, question).await?;

        let context = build_context(&chunks);
        let answer = self
            .generator
            .complete(system_prompt(use_case), &create_user_message(&context, question))
            .await?;

        let payload = AnswerPayload {
            answer,
            sources: chunks
                .into_iter()
                .map(|chunk| AnswerSource {
                    page: chunk.page,
                    source: chunk.source,
                    score: chunk.score,
                })
                .collect(),
        };
        self.answers.put_answer(document_id, question, &payload).await;

        info!(
            document_id,
            %use_case,
            source_count = payload.sources.len(),
            "answer generated"
        );
        Ok(ChatResponse::fresh(payload))
    }

    async fn ensure_ready(&self, document_id: &str) -> Result<(), AppError> {
        match self.tracker.get_state(document_id).await? {
            Some(IngestionState::Done) => Ok(()),
            Some(IngestionState::Processing) => Err(AppError::not_ready(
                document_id,
                NotReadyReason::Processing,
            )),
            Some(IngestionState::Failed { reason }) => Err(AppError::not_ready(
                document_id,
                NotReadyReason::Failed(reason),
            )),
            None => Err(AppError::not_ready(document_id, NotReadyReason::Unknown)),
        }
    }

    /// Prefers the use-case recorded at upload over the one in the request.
    async fn resolve_use_case(&self, document_id: &str, requested: Option<UseCase>) -> UseCase {
        let fallback = requested.unwrap_or_default();
        match self.documents.get(document_id).await {
            Ok(Some(record)) => {
                if record.use_case != fallback && requested.is_some() {
                    debug!(
                        document_id,
                        recorded = %record.use_case,
                        requested = %fallback,
                        "request use-case differs from upload; using recorded"
                    );
                }
                record.use_case
            }
            Ok(None) => fallback,
            Err(err) => {
                warn!(document_id, error = %err, "document record lookup failed");
                fallback
            }
        }
    }

    async fn retrieve(
        &self,
        use_case: UseCase,
        document_id: &str,
        question: &str,
    ) -> Result<Vec<RetrievedChunk>, AppError> {
        if let Some(chunks) = self.retrievals.get(use_case, document_id, question).await {
            debug!(document_id, chunk_count = chunks.len(), "retrieval memo hit");
            return Ok(chunks);
        }

        let namespace = vector_namespace(use_case, document_id);
        let chunks = retrieve_chunks(
            self.embedder.as_ref(),
            self.vector_index.as_ref(),
            &namespace,
            question,
            self.top_k,
        )
        .await?;

        self.retrievals
            .put(use_case, document_id, question, &chunks)
            .await;
        Ok(chunks)
    }
}
