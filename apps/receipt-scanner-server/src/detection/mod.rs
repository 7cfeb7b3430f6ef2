//! Region Detection Module
//!
//! Locates labeled regions (the printed total, by default) on receipt photos.
//!
//! The detection model itself lives behind [`DetectionBackend`]; the server
//! talks to an inference server over HTTP, and tests plug in fixed outputs.
//!
//! ## Usage
//!
//! ```rust,ignore
//! let backend = HttpDetectionBackend::connect(&config.detector, timeout).await?;
//! let detector = RegionDetector::new(Arc::new(backend));
//!
//! if let Some(region) = detector.detect(&image, "total_value").await? {
//!     let cropped = crop_region(&image, &region)?;
//! }
//! ```

mod detector;
mod provider;
mod types;

pub use detector::{crop_region, select_best, RegionDetector};
pub use provider::{DetectionBackend, HttpDetectionBackend};
pub use types::{BoundingBox, Detection, DetectionError, PixelRect, Region};

#[cfg(test)]
pub use provider::MockDetector;
