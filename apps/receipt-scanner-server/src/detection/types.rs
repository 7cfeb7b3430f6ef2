//! Detection Types

use serde::{Deserialize, Serialize};

/// Box corners in image pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl BoundingBox {
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Clamp to the image and truncate to whole pixels.
    ///
    /// Returns `None` when nothing of the box is left inside the image.
    pub fn to_pixels(&self, image_width: u32, image_height: u32) -> Option<PixelRect> {
        let clamp = |v: f32, max: u32| -> u32 {
            if v.is_nan() || v <= 0.0 {
                0
            } else {
                (v as u32).min(max)
            }
        };

        let x1 = clamp(self.x1, image_width);
        let y1 = clamp(self.y1, image_height);
        let x2 = clamp(self.x2, image_width);
        let y2 = clamp(self.y2, image_height);

        if x2 <= x1 || y2 <= y1 {
            return None;
        }

        Some(PixelRect {
            x: x1,
            y: y1,
            width: x2 - x1,
            height: y2 - y1,
        })
    }
}

/// Pixel-based rectangle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Single raw detection from the model
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub bbox: BoundingBox,
    /// Confidence in [0, 1]
    pub score: f32,
    /// Resolved class label; `None` when the class id is unknown to the model
    pub label: Option<String>,
}

/// The detection chosen for a target label
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Region {
    pub bbox: BoundingBox,
    pub score: f32,
    pub label: String,
}

/// Detection error types
#[derive(Debug, thiserror::Error)]
pub enum DetectionError {
    #[error("Detection backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("Detection request failed: {0}")]
    RequestFailed(String),

    #[error("Malformed detection response: {0}")]
    InvalidResponse(String),

    #[error("Failed to encode image: {0}")]
    ImageEncoding(String),

    #[error("Region {0:?} has no area inside the image")]
    EmptyRegion(BoundingBox),

    #[error("Image task failed: {0}")]
    Task(String),
}
