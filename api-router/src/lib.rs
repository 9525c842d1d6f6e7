use api_state::ApiState;
use axum::{
    extract::{DefaultBodyLimit, FromRef},
    http::{HeaderValue, Method},
    routing::{get, post},
    Router,
};
use common::utils::config::AppConfig;
use routes::{
    chat::chat, liveness::live, readiness::ready, status::document_status,
    upload::upload_document,
};
use tower_http::cors::{AllowHeaders, AllowOrigin, CorsLayer};
use tracing::warn;

pub mod api_state;
pub mod error;
mod routes;

/// Router for the upload, chat and probe endpoints.
pub fn api_routes<S>(app_state: &ApiState) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
    ApiState: FromRef<S>,
{
    // Probes stay cheap and unauthenticated
    let probes = Router::new()
        .route("/ready", get(ready))
        .route("/live", get(live));

    let documents = Router::new()
        .route(
            "/upload",
            post(upload_document).layer(DefaultBodyLimit::max(
                app_state.config().ingest_max_body_bytes,
            )),
        )
        .route("/chat", post(chat))
        .route("/documents/{document_id}/status", get(document_status));

    probes.merge(documents)
}

/// CORS policy for the configured frontend origins. Invalid origins are skipped.
pub fn cors_layer(config: &AppConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors_origins()
        .into_iter()
        .filter_map(|origin| match HeaderValue::from_str(&origin) {
            Ok(value) => Some(value),
            Err(err) => {
                warn!(%origin, error = %err, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(AllowHeaders::mirror_request())
}
