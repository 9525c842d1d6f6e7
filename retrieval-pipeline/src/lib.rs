pub mod answer_retrieval;
pub mod prompts;

pub use answer_retrieval::AnswerCoordinator;

use common::{
    cache::retrieval::RetrievedChunk, error::AppError, storage::vector_index::VectorIndex,
    utils::embedding::Embedder,
};
use tracing::{debug, instrument};

/// Embeds the question and returns the closest chunks within `namespace`.
#[instrument(skip_all, fields(namespace = %namespace, top_k = top_k))]
pub async fn retrieve_chunks(
    embedder: &dyn Embedder,
    vector_index: &dyn VectorIndex,
    namespace: &str,
    question: &str,
    top_k: usize,
) -> Result<Vec<RetrievedChunk>, AppError> {
    let query_vector = embedder
        .embed_batch(vec![question.to_string()])
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| AppError::Upstream("embedding provider returned no vector".into()))?;

    let matches = vector_index.query(namespace, &query_vector, top_k).await?;
    debug!(namespace, match_count = matches.len(), "vector index queried");

    Ok(matches
        .into_iter()
        .map(|m| RetrievedChunk {
            text: m.metadata.text,
            page: m.metadata.page,
            source: m.metadata.source,
            score: m.score,
        })
        .collect())
}
