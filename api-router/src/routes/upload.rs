use std::str::FromStr;

use axum::{body::Bytes, extract::State, http::StatusCode, response::IntoResponse, Json};
use axum_typed_multipart::{BaseMultipart, FieldData, TryFromMultipart};
use common::storage::types::use_case::UseCase;
use ingestion_pipeline::UploadRequest;
use serde_json::json;
use tracing::info;

use crate::{api_state::ApiState, error::ApiError};

const DEFAULT_FILE_NAME: &str = "document.pdf";

#[derive(Debug, TryFromMultipart)]
pub struct UploadParams {
    #[form_data(limit = "unlimited")]
    pub file: FieldData<Bytes>,
    pub use_case: Option<String>,
}

pub async fn upload_document(
    State(state): State<ApiState>,
    upload: BaseMultipart<UploadParams, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    let input = upload.data;
    let use_case = match input.use_case.as_deref() {
        Some(raw) if !raw.trim().is_empty() => UseCase::from_str(raw)?,
        _ => UseCase::default(),
    };
    let file_name = input
        .file
        .metadata
        .file_name
        .clone()
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_FILE_NAME.to_string());

    info!(
        %use_case,
        %file_name,
        file_bytes = input.file.contents.len(),
        "Received upload request"
    );

    let outcome = state
        .uploads
        .submit(UploadRequest {
            bytes: input.file.contents,
            file_name,
            use_case,
        })
        .await?;

    let message = if outcome.cached {
        format!("Document already uploaded for {use_case}")
    } else {
        "Upload successful".to_string()
    };

    Ok((
        StatusCode::OK,
        Json(json!({
            "document_id": outcome.document_id,
            "status": outcome.status,
            "cached": outcome.cached,
            "message": message,
        })),
    ))
}
