use common::{
    cache::keys::vector_namespace,
    error::AppError,
    storage::vector_index::{ChunkMetadata, VectorRecord},
};
use state_machines::core::GuardError;
use tracing::{debug, instrument};

use super::{
    context::PipelineContext,
    state::{Chunked, Embedded, Extracted, Indexed, IngestionMachine, Ready},
};

#[instrument(
    level = "trace",
    skip_all,
    fields(document_id = %ctx.document_id, use_case = %ctx.job.use_case)
)]
pub async fn extract(
    machine: IngestionMachine<(), Ready>,
    ctx: &mut PipelineContext<'_>,
) -> Result<IngestionMachine<(), Extracted>, AppError> {
    let pages = ctx.services.load_pages(&ctx.job.source_url).await?;

    if pages.iter().all(|page| page.text.trim().is_empty()) {
        return Err(AppError::Extraction(format!(
            "no extractable text in {} page(s)",
            pages.len()
        )));
    }

    debug!(
        document_id = %ctx.document_id,
        pages = pages.len(),
        "ingestion pages extracted"
    );
    ctx.pages = pages;

    machine
        .extract()
        .map_err(|(_, guard)| map_guard_error("extract", &guard))
}

#[instrument(
    level = "trace",
    skip_all,
    fields(document_id = %ctx.document_id, use_case = %ctx.job.use_case)
)]
pub async fn chunk(
    machine: IngestionMachine<(), Extracted>,
    ctx: &mut PipelineContext<'_>,
) -> Result<IngestionMachine<(), Chunked>, AppError> {
    let chunks = ctx
        .services
        .chunk_pages(ctx.job.use_case, &ctx.pages, &ctx.pipeline_config.tuning)
        .await?;

    if chunks.is_empty() {
        return Err(AppError::Extraction("document produced no chunks".into()));
    }

    debug!(
        document_id = %ctx.document_id,
        chunk_count = chunks.len(),
        "ingestion chunks prepared"
    );
    ctx.chunks = chunks;

    machine
        .chunk()
        .map_err(|(_, guard)| map_guard_error("chunk", &guard))
}

#[instrument(
    level = "trace",
    skip_all,
    fields(document_id = %ctx.document_id, use_case = %ctx.job.use_case)
)]
pub async fn embed(
    machine: IngestionMachine<(), Chunked>,
    ctx: &mut PipelineContext<'_>,
) -> Result<IngestionMachine<(), Embedded>, AppError> {
    let texts: Vec<String> = ctx.chunks.iter().map(|c| c.text.clone()).collect();
    let embeddings = ctx.services.embed_chunks(ctx.job.use_case, &texts).await?;

    if embeddings.len() != texts.len() {
        return Err(AppError::Upstream(format!(
            "expected {} embeddings, received {}",
            texts.len(),
            embeddings.len()
        )));
    }

    ctx.embeddings = embeddings;

    machine
        .embed()
        .map_err(|(_, guard)| map_guard_error("embed", &guard))
}

#[instrument(
    level = "trace",
    skip_all,
    fields(document_id = %ctx.document_id, use_case = %ctx.job.use_case)
)]
pub async fn index(
    machine: IngestionMachine<(), Embedded>,
    ctx: &mut PipelineContext<'_>,
) -> Result<IngestionMachine<(), Indexed>, AppError> {
    let records = build_vector_records(ctx);
    let record_count = records.len();
    let namespace = vector_namespace(ctx.job.use_case, &ctx.document_id);

    ctx.services.index_vectors(&namespace, records).await?;

    debug!(
        document_id = %ctx.document_id,
        %namespace,
        record_count,
        "ingestion vectors indexed"
    );

    machine
        .index()
        .map_err(|(_, guard)| map_guard_error("index", &guard))
}

fn build_vector_records(ctx: &mut PipelineContext<'_>) -> Vec<VectorRecord> {
    let chunks = std::mem::take(&mut ctx.chunks);
    let embeddings = std::mem::take(&mut ctx.embeddings);

    chunks
        .into_iter()
        .zip(embeddings)
        .enumerate()
        .map(|(i, (chunk, values))| VectorRecord {
            id: format!("{}_{i}", ctx.document_id),
            values,
            metadata: ChunkMetadata {
                text: chunk.text,
                page: chunk.page,
                source: ctx.job.source_url.clone(),
                document_id: ctx.document_id.clone(),
            },
        })
        .collect()
}

fn map_guard_error(event: &str, guard: &GuardError) -> AppError {
    AppError::InternalError(format!(
        "invalid ingestion pipeline transition during {event}: {guard:?}"
    ))
}
