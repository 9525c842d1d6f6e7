use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use common::cache::state::IngestionState;
use serde_json::json;

use crate::{api_state::ApiState, error::ApiError};

/// Reports the ingestion state of one document.
pub async fn document_status(
    State(state): State<ApiState>,
    Path(document_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let Some(current) = state.tracker.get_state(&document_id).await? else {
        return Err(ApiError::NotFound(format!("document {document_id}")));
    };

    let body = match &current {
        IngestionState::Failed { reason } => json!({
            "document_id": document_id,
            "status": current.as_label(),
            "error": reason,
        }),
        _ => json!({
            "document_id": document_id,
            "status": current.as_label(),
        }),
    };

    Ok(Json(body))
}
