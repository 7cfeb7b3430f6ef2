//! Region Detector
//!
//! Picks the best region for a target label out of the backend's detections.

use std::sync::Arc;

use image::DynamicImage;

use super::{
    provider::DetectionBackend,
    types::{Detection, DetectionError, Region},
};

/// Detector over a shared, read-only backend
#[derive(Clone)]
pub struct RegionDetector {
    backend: Arc<dyn DetectionBackend>,
}

impl RegionDetector {
    pub fn new(backend: Arc<dyn DetectionBackend>) -> Self {
        Self { backend }
    }

    /// Find the highest-confidence region labeled `target_label`.
    ///
    /// `Ok(None)` means the label is not on the image; that is a normal
    /// outcome, not an error.
    pub async fn detect(
        &self,
        image: Arc<DynamicImage>,
        target_label: &str,
    ) -> Result<Option<Region>, DetectionError> {
        let detections = self.backend.detect(image).await?;

        tracing::debug!(
            detections = detections.len(),
            target_label = %target_label,
            "Detection finished"
        );

        Ok(select_best(&detections, target_label))
    }

    /// [`crop_region`] on the blocking pool
    pub async fn crop(
        &self,
        image: Arc<DynamicImage>,
        region: &Region,
    ) -> Result<DynamicImage, DetectionError> {
        let region = region.clone();
        tokio::task::spawn_blocking(move || crop_region(&image, &region))
            .await
            .map_err(|e| DetectionError::Task(format!("Task join error: {}", e)))?
    }
}

/// Select the detection with the strictly highest score for `target_label`.
///
/// Scanning starts from a best score of zero, so a zero-confidence detection
/// never wins. On an exact tie the earliest detection in backend order wins.
pub fn select_best(detections: &[Detection], target_label: &str) -> Option<Region> {
    let mut best: Option<&Detection> = None;
    let mut highest = 0.0_f32;

    for detection in detections {
        if detection.label.as_deref() != Some(target_label) {
            continue;
        }
        if detection.score > highest {
            highest = detection.score;
            best = Some(detection);
        }
    }

    best.map(|d| Region {
        bbox: d.bbox,
        score: d.score,
        label: target_label.to_string(),
    })
}

/// Crop the image to the region, clamped to the image bounds
pub fn crop_region(image: &DynamicImage, region: &Region) -> Result<DynamicImage, DetectionError> {
    let rect = region
        .bbox
        .to_pixels(image.width(), image.height())
        .ok_or(DetectionError::EmptyRegion(region.bbox))?;

    Ok(image.crop_imm(rect.x, rect.y, rect.width, rect.height))
}
