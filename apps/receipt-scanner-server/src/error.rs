//! Error types for the Receipt Scanner server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::pipeline::PipelineError;

/// Application-wide result type
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    /// The message is shown to the client as given
    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

/// Error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg),
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", msg)
            }
            AppError::Pipeline(e) => pipeline_status(e),
        };

        (status, Json(ErrorResponse { error: error_type, message })).into_response()
    }
}

fn pipeline_status(error: PipelineError) -> (StatusCode, &'static str, String) {
    let message = error.to_string();

    match error {
        PipelineError::Validation(_) => (StatusCode::BAD_REQUEST, "validation_error", message),
        PipelineError::NoStagedReceipt => (StatusCode::BAD_REQUEST, "no_staged_receipt", message),
        PipelineError::Processing(detail) => {
            tracing::error!("Capture failed: {}", detail);
            (StatusCode::INTERNAL_SERVER_ERROR, "processing_error", message)
        }
        PipelineError::StagedFile(_) => {
            tracing::error!("{}", message);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "staged_file_error",
                "Staged receipt file could not be read.".to_string(),
            )
        }
        PipelineError::ReceiptTimeout => (StatusCode::GATEWAY_TIMEOUT, "upload_timeout", message),
        PipelineError::ReceiptUpload(_) => (StatusCode::BAD_GATEWAY, "receipt_upload_error", message),
        PipelineError::Ledger(e) => {
            tracing::error!("Ledger error: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "ledger_error",
                "Error saving data to the ledger.".to_string(),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::LedgerError;
    use crate::uploads::{UploadError, UploadTarget};

    fn status_of(error: AppError) -> StatusCode {
        error.into_response().status()
    }

    #[test]
    fn test_pipeline_status_codes() {
        assert_eq!(
            status_of(PipelineError::Validation("x".into()).into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(status_of(PipelineError::NoStagedReceipt.into()), StatusCode::BAD_REQUEST);
        assert_eq!(
            status_of(PipelineError::Processing("boom".into()).into()),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status_of(PipelineError::from(UploadError::Timeout(UploadTarget::Receipt)).into()),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(
            status_of(
                PipelineError::from(UploadError::BadStatus {
                    target: UploadTarget::Receipt,
                    status: 500,
                })
                .into()
            ),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status_of(PipelineError::from(LedgerError::Timeout).into()),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_ledger_detail_stays_in_logs() {
        let error = PipelineError::from(LedgerError::Api {
            status: 403,
            message: "{\"error\": \"caller lacks permission on sheet-1\"}".to_string(),
        });

        let response = AppError::from(error).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"], "ledger_error");
        assert_eq!(body["message"], "Error saving data to the ledger.");
        assert!(!String::from_utf8_lossy(&bytes).contains("sheet-1"));
    }

    #[test]
    fn test_simple_status_codes() {
        assert_eq!(status_of(AppError::NotFound("x".into())), StatusCode::NOT_FOUND);
        assert_eq!(status_of(AppError::BadRequest("x".into())), StatusCode::BAD_REQUEST);
        assert_eq!(status_of(AppError::Internal("x".into())), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
