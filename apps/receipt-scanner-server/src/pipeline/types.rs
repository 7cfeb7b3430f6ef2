//! Pipeline types

use serde::Serialize;

use crate::ledger::{LedgerError, LedgerRow};
use crate::staging::StagedReceipt;
use crate::uploads::{ImageRejection, SkippedEvidence, UploadError};

// ============================================================================
// Capture
// ============================================================================

/// Result of a capture that did not fail
#[derive(Debug, Clone)]
pub enum CaptureOutcome {
    /// Region found and read; the receipt is now staged for the session
    Staged(StagedReceipt),

    /// The image holds no region with the target label
    NotDetected { label: String },
}

// ============================================================================
// Submission
// ============================================================================

/// Form fields accompanying a submission
#[derive(Debug, Clone, Default)]
pub struct SubmissionMetadata {
    pub plan_id: String,
    pub account_code: String,
    /// Accepted from the form, not recorded
    pub currency: String,
    pub amount: String,
    pub description: String,
    pub report_title: String,
}

/// What happened to the evidence photos
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EvidenceStatus {
    Uploaded,
    /// Nothing valid to send
    Skipped,
    /// The evidence service call failed; the row was still written
    Failed,
}

#[derive(Debug, Clone, Serialize)]
pub struct EvidenceOutcome {
    pub status: EvidenceStatus,
    pub links: Vec<String>,
    pub skipped: Vec<SkippedEvidence>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// A completed submission
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionOutcome {
    pub row_number: u64,
    pub row: LedgerRow,
    pub evidence: EvidenceOutcome,
}

// ============================================================================
// Error Types
// ============================================================================

/// Pipeline error types
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("{0}")]
    Validation(String),

    #[error("No receipt file found to upload.")]
    NoStagedReceipt,

    /// Detection, cropping, OCR or temp-file failure during capture
    #[error("Error processing image.")]
    Processing(String),

    #[error("Staged receipt file could not be read: {0}")]
    StagedFile(String),

    #[error("Receipt API request timed out.")]
    ReceiptTimeout,

    #[error("Failed to upload receipt to Receipt API.")]
    ReceiptUpload(#[source] UploadError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

impl From<ImageRejection> for PipelineError {
    fn from(rejection: ImageRejection) -> Self {
        PipelineError::Validation(rejection.to_string())
    }
}

impl From<UploadError> for PipelineError {
    fn from(error: UploadError) -> Self {
        match error {
            UploadError::Timeout(_) => PipelineError::ReceiptTimeout,
            other => PipelineError::ReceiptUpload(other),
        }
    }
}
