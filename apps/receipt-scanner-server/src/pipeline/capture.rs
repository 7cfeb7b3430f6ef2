//! Receipt Capture
//!
//! Validate the photo, keep a temporary copy, find the total region, read it
//! and stage the result for the session. A capture that does not end staged
//! leaves no temporary file behind.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::ImageFormat;
use uuid::Uuid;

use super::types::{CaptureOutcome, PipelineError};
use crate::config::UploadConfig;
use crate::detection::RegionDetector;
use crate::ocr::TextExtractor;
use crate::staging::{store::remove_file_logged, SessionId, StagedReceipt, StagingStore};
use crate::uploads::{check_image, ImageRejection, UploadFile};

/// Capture flow behind `POST /upload_file`
#[derive(Clone)]
pub struct ReceiptCapture {
    detector: RegionDetector,
    extractor: TextExtractor,
    staging: StagingStore,
    upload_dir: PathBuf,
    max_bytes: usize,
    target_label: String,
}

impl ReceiptCapture {
    pub fn new(
        detector: RegionDetector,
        extractor: TextExtractor,
        staging: StagingStore,
        upload: &UploadConfig,
        target_label: impl Into<String>,
    ) -> Self {
        Self {
            detector,
            extractor,
            staging,
            upload_dir: upload.dir.clone(),
            max_bytes: upload.max_bytes,
            target_label: target_label.into(),
        }
    }

    /// Run the capture for one uploaded photo
    pub async fn capture(
        &self,
        session_id: SessionId,
        file: UploadFile,
    ) -> Result<CaptureOutcome, PipelineError> {
        let UploadFile { filename, data, .. } = file;
        let format = check_image(&filename, &data, self.max_bytes)?;

        // Uploads run to 100 MiB; decode on the blocking pool
        let (data, decoded) = tokio::task::spawn_blocking(move || {
            let decoded = image::load_from_memory_with_format(&data, format);
            (data, decoded)
        })
        .await
        .map_err(|e| PipelineError::Processing(format!("Task join error: {}", e)))?;

        let image = Arc::new(decoded.map_err(|e| {
            tracing::warn!(file_name = %filename, "Undecodable image: {}", e);
            PipelineError::from(ImageRejection::NotAnImage)
        })?);

        let temp_path = self.upload_dir.join(temp_file_name(format));
        tokio::fs::write(&temp_path, &data).await.map_err(|e| {
            tracing::error!(path = %temp_path.display(), "Failed to write temporary file: {}", e);
            PipelineError::Processing(e.to_string())
        })?;

        tracing::debug!(
            session_id = %session_id,
            file_name = %filename,
            size = data.len(),
            path = %temp_path.display(),
            "Receipt saved for processing"
        );

        let region = match self.detector.detect(image.clone(), &self.target_label).await {
            Ok(Some(region)) => region,
            Ok(None) => {
                tracing::info!(
                    session_id = %session_id,
                    file_name = %filename,
                    "No {} region detected",
                    self.target_label
                );
                remove_file_logged(&temp_path).await;
                return Ok(CaptureOutcome::NotDetected {
                    label: self.target_label.clone(),
                });
            }
            Err(e) => return Err(self.abort(&temp_path, e.to_string()).await),
        };

        let text = match self.detector.crop(image, &region).await {
            Ok(cropped) => self.extractor.extract_text(cropped).await.map_err(|e| e.to_string()),
            Err(e) => Err(e.to_string()),
        };
        let text = match text {
            Ok(text) => text,
            Err(message) => return Err(self.abort(&temp_path, message).await),
        };

        tracing::info!(
            session_id = %session_id,
            score = region.score,
            chars = text.len(),
            "Extracted total region text"
        );

        let receipt = StagedReceipt::new(temp_path, filename, format.to_mime_type(), text);
        self.staging.put(session_id, receipt.clone()).await;

        Ok(CaptureOutcome::Staged(receipt))
    }

    /// Drop the temporary file of a failed capture
    async fn abort(&self, temp_path: &Path, message: String) -> PipelineError {
        tracing::error!(path = %temp_path.display(), "Error processing image: {}", message);
        remove_file_logged(temp_path).await;
        PipelineError::Processing(message)
    }
}

/// `temp_<uuid hex>.<ext>`, the extension following the sniffed format
fn temp_file_name(format: ImageFormat) -> String {
    let extension = format.extensions_str().first().copied().unwrap_or("img");
    format!("temp_{}.{}", Uuid::new_v4().simple(), extension)
}
