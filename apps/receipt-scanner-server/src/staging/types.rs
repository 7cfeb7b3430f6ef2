//! Staging types

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Staged receipts older than this are swept: 24 hours
pub const STAGING_EXPIRY_HOURS: i64 = 24;

/// Interval between expiry sweeps: 5 minutes
pub const CLEANUP_INTERVAL_SECS: u64 = 300;

/// Opaque identity of a browser session
pub type SessionId = Uuid;

/// A captured receipt awaiting confirmation
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StagedReceipt {
    /// Temporary file owned by the session
    #[serde(skip_serializing)]
    pub file_path: PathBuf,

    /// File name as sent by the browser
    pub original_filename: String,

    pub content_type: String,

    /// OCR output of the total region, possibly empty
    pub extracted_text: String,

    pub staged_at: DateTime<Utc>,
}

impl StagedReceipt {
    pub fn new(
        file_path: PathBuf,
        original_filename: impl Into<String>,
        content_type: impl Into<String>,
        extracted_text: impl Into<String>,
    ) -> Self {
        Self {
            file_path,
            original_filename: original_filename.into(),
            content_type: content_type.into(),
            extracted_text: extracted_text.into(),
            staged_at: Utc::now(),
        }
    }

    /// Check if the entry has outlived the staging TTL
    pub fn is_expired(&self, ttl_hours: i64) -> bool {
        Utc::now() - chrono::Duration::hours(ttl_hours) > self.staged_at
    }
}
