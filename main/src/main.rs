use api_router::{api_routes, api_state::ApiState, cors_layer};
use axum::Router;
use common::{
    cache,
    context::AppContext,
    storage::{db::SurrealDbClient, store::StorageManager, vector_index::SurrealVectorIndex},
    utils::{
        config::{get_config, AppConfig},
        embedding::EmbeddingProvider,
        llm::{create_openai_client, OpenAiGenerator},
    },
};
use ingestion_pipeline::{
    spawn_workers,
    utils::pdf_ingestion::{DocumentLoader, PdfLoader},
    IngestionPipeline, IngestionQueue, IngestionReceiver,
};
use std::{sync::Arc, time::Duration};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Set up tracing
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env())
        .try_init()
        .ok();

    // Get config
    let config = get_config()?;

    let context = build_context(&config).await?;

    if config.flush_cache_on_startup {
        match context.cache.flush().await {
            Ok(()) => info!("Cache flushed on startup"),
            Err(e) => warn!(error = %e, "Failed to flush cache on startup"),
        }
    }

    let (queue, receiver) = IngestionQueue::bounded(config.ingestion_queue_capacity);
    let loader = PdfLoader::new(
        context.storage.clone(),
        Duration::from_secs(config.fetch_timeout_secs),
    )?;
    let workers = start_workers(&context, receiver, Arc::new(loader));
    info!(workers = workers.len(), "Ingestion workers started");

    let app = build_router(ApiState::new(context, queue), &config);

    info!("Starting server listening on 0.0.0.0:{}", config.http_port);
    let serve_address = format!("0.0.0.0:{}", config.http_port);
    let listener = tokio::net::TcpListener::bind(serve_address).await?;

    if let Err(e) = axum::serve(listener, app).await {
        error!("Server error: {}", e);
    }

    Ok(())
}

/// Constructs every external client once and bundles them for injection.
async fn build_context(config: &AppConfig) -> Result<AppContext, Box<dyn std::error::Error>> {
    let cache = cache::connect(config).await?;
    info!(backend = ?config.cache_backend, "Cache store connected");

    let db = Arc::new(
        SurrealDbClient::new(
            &config.surrealdb_address,
            &config.surrealdb_username,
            &config.surrealdb_password,
            &config.surrealdb_namespace,
            &config.surrealdb_database,
        )
        .await?,
    );
    let vector_index = SurrealVectorIndex::new(db);
    vector_index.ensure_schema().await?;

    let openai_client = Arc::new(create_openai_client(config));

    let embedding_provider =
        Arc::new(EmbeddingProvider::from_config(config, Arc::clone(&openai_client)).await?);
    info!(
        embedding_backend = ?config.embedding_backend,
        embedding_dimension = embedding_provider.dimension(),
        "Embedding provider initialized"
    );

    let generator = Arc::new(OpenAiGenerator::new(
        openai_client,
        config.generation_model.clone(),
    ));

    // Create global storage manager
    let storage = StorageManager::new(config).await?;

    Ok(AppContext::new(
        config.clone(),
        cache,
        embedding_provider,
        Arc::new(vector_index),
        generator,
        storage,
    ))
}

fn start_workers(
    context: &AppContext,
    receiver: IngestionReceiver,
    loader: Arc<dyn DocumentLoader>,
) -> Vec<tokio::task::JoinHandle<()>> {
    let ingestion_pipeline = Arc::new(IngestionPipeline::new(context, loader));

    spawn_workers(
        context.config.ingestion_workers,
        receiver,
        ingestion_pipeline,
    )
}

fn build_router(api_state: ApiState, config: &AppConfig) -> Router {
    Router::new()
        .merge(api_routes(&api_state))
        .layer(cors_layer(config))
        .layer(TraceLayer::new_for_http())
        .with_state(api_state)
}
