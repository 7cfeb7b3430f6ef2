//! OCR Types

use serde::{Deserialize, Serialize};

/// OCR result
#[derive(Debug, Clone, Default, Serialize)]
pub struct OcrResult {
    /// Top text block, empty when nothing legible was found
    pub text: String,
    /// Number of text blocks the service reported
    pub blocks: usize,
}

/// Vision `images:annotate` response envelope
#[derive(Debug, Deserialize)]
pub(crate) struct AnnotateResponse {
    #[serde(default)]
    pub responses: Vec<AnnotateImageResponse>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AnnotateImageResponse {
    #[serde(default)]
    pub text_annotations: Vec<TextAnnotation>,
    #[serde(default)]
    pub error: Option<ServiceStatus>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TextAnnotation {
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ServiceStatus {
    #[serde(default)]
    pub message: String,
}

/// OCR error types
#[derive(Debug, thiserror::Error)]
pub enum OcrError {
    #[error("OCR service error: {0}")]
    Service(String),

    #[error("Failed to encode region: {0}")]
    ImageEncoding(String),

    #[error("API error: {0}")]
    ApiError(String),
}
