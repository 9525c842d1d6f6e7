use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

use crate::api_state::ApiState;

/// Readiness probe: returns 200 if the cache store and vector index answer, else 503.
pub async fn ready(State(state): State<ApiState>) -> impl IntoResponse {
    let cache = state.context.cache.ping().await.map_err(|e| e.to_string());
    let index = state
        .context
        .vector_index
        .ping()
        .await
        .map_err(|e| e.to_string());

    let label = |result: &Result<(), String>| if result.is_ok() { "ok" } else { "fail" };
    let checks = json!({ "cache": label(&cache), "vector_index": label(&index) });

    match (cache, index) {
        (Ok(()), Ok(())) => (
            StatusCode::OK,
            Json(json!({
                "status": "ok",
                "checks": checks
            })),
        ),
        (cache, index) => {
            let reason = [cache.err(), index.err()]
                .into_iter()
                .flatten()
                .collect::<Vec<_>>()
                .join("; ");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "error",
                    "checks": checks,
                    "reason": reason
                })),
            )
        }
    }
}
