//! Upload types for the receipt and evidence services

use serde::Deserialize;

// ============================================================================
// Payload Types
// ============================================================================

/// A file headed for one of the upload services
#[derive(Debug, Clone)]
pub struct UploadFile {
    /// Original file name (sanitized when sent)
    pub filename: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

/// Evidence photo as received from the browser, before validation
#[derive(Debug, Clone)]
pub struct EvidenceFile {
    pub filename: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

impl EvidenceFile {
    pub fn size(&self) -> usize {
        self.data.len()
    }
}

impl From<EvidenceFile> for UploadFile {
    fn from(file: EvidenceFile) -> Self {
        Self {
            filename: file.filename,
            content_type: file.content_type,
            data: file.data,
        }
    }
}

// ============================================================================
// Response Types
// ============================================================================

/// `{status, message?, data?}` envelope shared by both services
#[derive(Debug, Deserialize)]
pub(crate) struct ServiceResponse {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub data: Option<serde_json::Value>,
}

impl ServiceResponse {
    pub fn is_success(&self) -> bool {
        self.status == "success"
    }

    pub fn failure_message(&self) -> String {
        self.message
            .clone()
            .unwrap_or_else(|| format!("status '{}'", self.status))
    }
}

/// Collect `fileLink` values from `data`, which is either one object or a list
pub(crate) fn collect_file_links(data: Option<&serde_json::Value>) -> Vec<String> {
    fn link(item: &serde_json::Value) -> Option<String> {
        item.get("fileLink")
            .and_then(|l| l.as_str())
            .filter(|l| !l.is_empty())
            .map(str::to_string)
    }

    match data {
        Some(serde_json::Value::Array(items)) => items.iter().filter_map(link).collect(),
        Some(item @ serde_json::Value::Object(_)) => link(item).into_iter().collect(),
        _ => Vec::new(),
    }
}

// ============================================================================
// Error Types
// ============================================================================

/// Which remote service a call went to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadTarget {
    Receipt,
    Evidence,
}

impl UploadTarget {
    pub(crate) fn request_error(self, error: reqwest::Error) -> UploadError {
        if error.is_timeout() {
            UploadError::Timeout(self)
        } else {
            UploadError::Transport {
                target: self,
                message: error.to_string(),
            }
        }
    }
}

impl std::fmt::Display for UploadTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Receipt => write!(f, "Receipt API"),
            Self::Evidence => write!(f, "Evidence API"),
        }
    }
}

/// Upload error types
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("{0} request timed out")]
    Timeout(UploadTarget),

    #[error("{target} responded with status code {status}")]
    BadStatus { target: UploadTarget, status: u16 },

    #[error("{target} reported failure: {message}")]
    Rejected { target: UploadTarget, message: String },

    #[error("{target} response is missing a file link")]
    MissingLink { target: UploadTarget },

    #[error("{target} sent an unreadable response: {message}")]
    InvalidResponse { target: UploadTarget, message: String },

    #[error("{target} request failed: {message}")]
    Transport { target: UploadTarget, message: String },
}
