//! Receipt Routes
//!
//! Capture and submission endpoints, keyed by the session cookie.
//!
//! Endpoints:
//! - POST /upload_file - Read the total off a receipt photo and stage it
//! - POST /submit - Upload the staged receipt and evidence, append the ledger row
//! - GET /staged_receipt - Show the session's staged receipt
//! - DELETE /staged_receipt - Abandon the session's staged receipt

use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::{header, HeaderMap},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use uuid::Uuid;

use super::session::{session_cookie, session_id};
use crate::config::MAX_UPLOAD_BYTES;
use crate::error::{AppError, Result};
use crate::pipeline::{CaptureOutcome, EvidenceOutcome, PipelineError, SubmissionMetadata};
use crate::staging::StagedReceipt;
use crate::state::AppState;
use crate::uploads::{EvidenceFile, UploadFile};

const SUBMIT_SUCCESS_MESSAGE: &str =
    "Data saved successfully! Files uploaded to Google Drive via APIs.";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/upload_file", post(upload_file))
        .route("/submit", post(submit))
        .route("/staged_receipt", get(get_staged).delete(discard_staged))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
}

// ============================================================================
// Capture
// ============================================================================

#[derive(Serialize)]
struct CaptureResponse {
    extracted_text: String,
    message: &'static str,
}

async fn upload_file(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<Response> {
    let mut upload = None;

    while let Some(field) = multipart.next_field().await.map_err(read_error)? {
        if field.name() != Some("file") {
            continue;
        }

        let filename = field.file_name().unwrap_or("").to_string();
        let content_type = field.content_type().unwrap_or("").to_string();
        let data = field.bytes().await.map_err(read_error)?;

        upload = Some(UploadFile {
            filename,
            content_type,
            data: data.to_vec(),
        });
    }

    let upload = upload.ok_or_else(|| AppError::BadRequest("No file part".to_string()))?;

    let (session, issued) = match session_id(&headers) {
        Some(id) => (id, false),
        None => (Uuid::new_v4(), true),
    };

    match state.capture().capture(session, upload).await? {
        CaptureOutcome::Staged(receipt) => {
            let body = Json(CaptureResponse {
                extracted_text: receipt.extracted_text,
                message: "Total value extracted successfully.",
            });

            if issued {
                let cookie = session_cookie(session, state.config().server.secure_cookies)?;
                Ok(([(header::SET_COOKIE, cookie)], body).into_response())
            } else {
                Ok(body.into_response())
            }
        }
        CaptureOutcome::NotDetected { label } => Err(AppError::NotFound(format!(
            "No {} detected in the receipt.",
            label
        ))),
    }
}

// ============================================================================
// Submission
// ============================================================================

#[derive(Serialize)]
struct SubmitResponse {
    success: bool,
    message: &'static str,
    row: u64,
    evidence: EvidenceOutcome,
}

async fn submit(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<Json<SubmitResponse>> {
    let mut metadata = SubmissionMetadata::default();
    let mut evidence = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(read_error)? {
        let name = field.name().unwrap_or("").to_string();

        if name == "evidence_files" {
            let filename = field.file_name().unwrap_or("").to_string();
            let content_type = field.content_type().unwrap_or("").to_string();
            let data = field.bytes().await.map_err(read_error)?;

            // An untouched file input still sends an empty, unnamed part
            if filename.is_empty() && data.is_empty() {
                continue;
            }

            evidence.push(EvidenceFile {
                filename,
                content_type,
                data: data.to_vec(),
            });
            continue;
        }

        let value = field.text().await.map_err(read_error)?;
        let value = html_escape::encode_quoted_attribute(&value).into_owned();

        match name.as_str() {
            "rencana_id" => metadata.plan_id = value,
            "account_skkos_id" => metadata.account_code = value,
            "currency" => metadata.currency = value,
            "amount" => metadata.amount = value,
            "uraian" => metadata.description = value,
            "judulLaporan" => metadata.report_title = value,
            _ => tracing::debug!(field = %name, "Ignoring unknown form field"),
        }
    }

    // Without a session there is nothing staged; still validate the form first
    if metadata.account_code.trim().is_empty() {
        return Err(PipelineError::Validation("No account_skkos_id provided".to_string()).into());
    }
    let session = session_id(&headers).ok_or(PipelineError::NoStagedReceipt)?;

    let outcome = state
        .orchestrator()
        .submit(session, metadata, evidence)
        .await?;

    Ok(Json(SubmitResponse {
        success: true,
        message: SUBMIT_SUCCESS_MESSAGE,
        row: outcome.row_number,
        evidence: outcome.evidence,
    }))
}

// ============================================================================
// Staged Receipt
// ============================================================================

async fn get_staged(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<StagedReceipt>> {
    let session = session_id(&headers).ok_or_else(no_staged)?;

    state
        .staging()
        .get(session)
        .await
        .map(Json)
        .ok_or_else(no_staged)
}

#[derive(Serialize)]
struct DiscardResponse {
    success: bool,
    discarded: bool,
}

async fn discard_staged(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Json<DiscardResponse> {
    let discarded = match session_id(&headers) {
        Some(session) => state.staging().discard(session).await.is_some(),
        None => false,
    };

    Json(DiscardResponse {
        success: true,
        discarded,
    })
}

fn no_staged() -> AppError {
    AppError::NotFound("No staged receipt".to_string())
}

fn read_error(e: axum::extract::multipart::MultipartError) -> AppError {
    tracing::error!("Failed to read multipart field: {}", e);
    AppError::BadRequest(format!("Failed to read upload: {}", e))
}
