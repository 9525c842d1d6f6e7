use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use common::{
    cache::StoreError,
    error::{AppError, NotReadyReason},
};
use axum_typed_multipart::TypedMultipartError;
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug, Serialize, Clone)]
pub enum ApiError {
    #[error("Internal server error")]
    InternalError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("{0}")]
    DocumentUnknown(String),

    #[error("{0}")]
    DocumentProcessing(String),

    #[error("{0}")]
    DocumentFailed(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Generation error: {0}")]
    Upstream(String),

    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        match err {
            AppError::NotReady {
                document_id,
                reason,
            } => match reason {
                NotReadyReason::Unknown => Self::DocumentUnknown(format!(
                    "Document {document_id} is unknown; upload it first"
                )),
                NotReadyReason::Processing => Self::DocumentProcessing(format!(
                    "Document {document_id} is still processing; try again shortly"
                )),
                NotReadyReason::Failed(reason) => Self::DocumentFailed(format!(
                    "Document {document_id} failed to ingest: {reason}; upload it again"
                )),
            },
            AppError::Store(StoreError::Unavailable(msg)) => {
                tracing::error!(error = %msg, "Cache store unavailable");
                Self::ServiceUnavailable("cache store unavailable".to_string())
            }
            AppError::Upstream(msg) => Self::Upstream(msg),
            AppError::OpenAI(err) => Self::Upstream(err.to_string()),
            AppError::NotFound(msg) => Self::NotFound(msg),
            AppError::Validation(msg) => Self::ValidationError(msg),
            _ => {
                tracing::error!("Internal error: {:?}", err);
                Self::InternalError("Internal server error".to_string())
            }
        }
    }
}

impl From<TypedMultipartError> for ApiError {
    fn from(err: TypedMultipartError) -> Self {
        match err.get_status() {
            StatusCode::PAYLOAD_TOO_LARGE => Self::PayloadTooLarge(err.to_string()),
            status if status.is_client_error() => Self::ValidationError(err.to_string()),
            _ => {
                tracing::error!("Multipart error: {:?}", err);
                Self::InternalError("Internal server error".to_string())
            }
        }
    }
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ValidationError(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) | Self::DocumentUnknown(_) => StatusCode::NOT_FOUND,
            Self::DocumentProcessing(_) => StatusCode::CONFLICT,
            Self::DocumentFailed(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Upstream(_) => StatusCode::BAD_GATEWAY,
            Self::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
        }
    }

    /// Document state for not-ready errors, `"error"` otherwise.
    fn status_label(&self) -> &'static str {
        match self {
            Self::DocumentUnknown(_) => "UNKNOWN",
            Self::DocumentProcessing(_) => "PROCESSING",
            Self::DocumentFailed(_) => "FAILED",
            _ => "error",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_response = ErrorResponse {
            error: self.to_string(),
            status: self.status_label().to_string(),
        };

        (status, Json(error_response)).into_response()
    }
}

#[derive(Serialize, Debug)]
struct ErrorResponse {
    error: String,
    status: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fmt::Debug;

    // Helper to check status code
    fn assert_status_code<T: IntoResponse + Debug>(response: T, expected_status: StatusCode) {
        let response = response.into_response();
        assert_eq!(response.status(), expected_status);
    }

    fn not_ready(reason: NotReadyReason) -> ApiError {
        ApiError::from(AppError::not_ready("doc-1", reason))
    }

    #[test]
    fn not_ready_reasons_map_to_distinct_statuses() {
        assert_status_code(not_ready(NotReadyReason::Unknown), StatusCode::NOT_FOUND);
        assert_status_code(not_ready(NotReadyReason::Processing), StatusCode::CONFLICT);
        assert_status_code(
            not_ready(NotReadyReason::Failed("no text".into())),
            StatusCode::UNPROCESSABLE_ENTITY,
        );
    }

    #[test]
    fn failed_reason_is_reported() {
        let error = not_ready(NotReadyReason::Failed("no extractable text".into()));
        assert!(error.to_string().contains("no extractable text"));
        assert_eq!(error.status_label(), "FAILED");
    }

    #[test]
    fn store_and_upstream_failures() {
        let unavailable = ApiError::from(AppError::Store(StoreError::Unavailable(
            "connection refused".into(),
        )));
        assert!(matches!(&unavailable, ApiError::ServiceUnavailable(msg) if !msg.contains("refused")));
        assert_status_code(unavailable, StatusCode::SERVICE_UNAVAILABLE);

        let upstream = ApiError::from(AppError::Upstream("rate limited".into()));
        assert_eq!(upstream.to_string(), "Generation error: rate limited");
        assert_status_code(upstream, StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn validation_and_not_found_pass_through() {
        let validation = ApiError::from(AppError::Validation("unknown use case".into()));
        assert!(matches!(&validation, ApiError::ValidationError(msg) if msg == "unknown use case"));
        assert_status_code(validation, StatusCode::BAD_REQUEST);

        let not_found = ApiError::from(AppError::NotFound("doc-9".into()));
        assert_eq!(not_found.status_label(), "error");
        assert_status_code(not_found, StatusCode::NOT_FOUND);
    }

    #[test]
    fn multipart_errors_map_to_client_statuses() {
        let too_large = ApiError::from(TypedMultipartError::FieldTooLarge {
            field_name: "file".into(),
            limit_bytes: 16,
        });
        assert!(matches!(too_large, ApiError::PayloadTooLarge(_)));
        assert_status_code(too_large, StatusCode::PAYLOAD_TOO_LARGE);

        let missing = ApiError::from(TypedMultipartError::MissingField {
            field_name: "file".into(),
        });
        assert!(matches!(&missing, ApiError::ValidationError(msg) if msg.contains("'file'")));
        assert_status_code(missing, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn internal_errors_are_sanitized() {
        let internal = ApiError::from(AppError::Store(StoreError::Command(
            "WRONGTYPE secret key layout".into(),
        )));
        assert_eq!(internal.to_string(), "Internal server error");
        assert_status_code(internal, StatusCode::INTERNAL_SERVER_ERROR);

        let io = ApiError::from(AppError::Io(std::io::Error::other("disk full")));
        assert!(matches!(io, ApiError::InternalError(_)));
    }
}
