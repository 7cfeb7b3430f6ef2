//! Image content checks
//!
//! File types are sniffed from magic bytes; the declared extension and
//! content type are never trusted.

use image::ImageFormat;

use super::types::{EvidenceFile, UploadFile};

/// Why an uploaded image was refused
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ImageRejection {
    #[error("No selected file")]
    EmptyFilename,

    #[error("Invalid image file.")]
    NotAnImage,

    #[error("File size exceeds {}MB limit.", .max / (1024 * 1024))]
    TooLarge { size: usize, max: usize },
}

/// Detect the image format from the leading bytes
pub fn sniff_image(data: &[u8]) -> Option<ImageFormat> {
    image::guess_format(data).ok()
}

/// Check an uploaded image and return its sniffed format
pub fn check_image(filename: &str, data: &[u8], max_bytes: usize) -> Result<ImageFormat, ImageRejection> {
    if filename.is_empty() {
        return Err(ImageRejection::EmptyFilename);
    }

    let format = sniff_image(data).ok_or(ImageRejection::NotAnImage)?;

    if data.len() > max_bytes {
        return Err(ImageRejection::TooLarge {
            size: data.len(),
            max: max_bytes,
        });
    }

    Ok(format)
}

/// Evidence file that did not make it into the batch
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct SkippedEvidence {
    pub filename: String,
    pub reason: String,
}

/// Evidence files split into the forwarded batch and the skipped ones
#[derive(Debug, Default)]
pub struct EvidenceBatch {
    pub accepted: Vec<UploadFile>,
    pub skipped: Vec<SkippedEvidence>,
}

/// Filter evidence files; invalid ones are skipped, never fatal
pub fn validate_evidence(files: Vec<EvidenceFile>, max_bytes: usize) -> EvidenceBatch {
    let mut batch = EvidenceBatch::default();

    for file in files {
        match check_image(&file.filename, &file.data, max_bytes) {
            Ok(_) => batch.accepted.push(file.into()),
            Err(rejection) => {
                tracing::warn!(
                    file_name = %file.filename,
                    size = file.size(),
                    "Skipped evidence file: {}",
                    rejection
                );
                batch.skipped.push(SkippedEvidence {
                    filename: file.filename,
                    reason: rejection.to_string(),
                });
            }
        }
    }

    batch
}

/// Make a browser-supplied file name safe to forward.
///
/// Non-ASCII characters are dropped, path separators become spaces,
/// whitespace runs become `_`, anything outside `[A-Za-z0-9_.-]` is removed
/// and leading/trailing `.`/`_` are trimmed.
pub fn sanitize_filename(filename: &str) -> String {
    let ascii: String = filename
        .chars()
        .filter(char::is_ascii)
        .map(|c| if c == '/' || c == '\\' { ' ' } else { c })
        .collect();

    let joined = ascii.split_whitespace().collect::<Vec<_>>().join("_");

    let cleaned: String = joined
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
        .collect();

    let trimmed = cleaned.trim_matches(|c| c == '.' || c == '_');

    if trimmed.is_empty() {
        "file".to_string()
    } else {
        trimmed.to_string()
    }
}
