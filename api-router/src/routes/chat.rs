use std::str::FromStr;

use axum::{extract::State, response::IntoResponse, Json};
use common::storage::types::use_case::UseCase;
use serde::Deserialize;
use tracing::info;

use crate::{api_state::ApiState, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub document_id: String,
    pub question: String,
    #[serde(default)]
    pub use_case: Option<String>,
}

pub async fn chat(
    State(state): State<ApiState>,
    Json(request): Json<ChatRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let use_case = request
        .use_case
        .as_deref()
        .map(UseCase::from_str)
        .transpose()?;

    info!(
        document_id = %request.document_id,
        question_chars = request.question.chars().count(),
        "Received chat request"
    );

    let response = state
        .answers
        .answer(&request.document_id, &request.question, use_case)
        .await?;

    Ok(Json(response))
}
