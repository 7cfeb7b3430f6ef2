//! Detection Backends
//!
//! Defines the backend trait and the HTTP inference-server implementation.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use image::DynamicImage;
use serde::Deserialize;

use super::types::{BoundingBox, Detection, DetectionError};
use crate::config::DetectorConfig;

/// Detection backend trait
///
/// Implementations must be safe for concurrent read-only inference; a single
/// instance is shared by every request.
#[async_trait]
pub trait DetectionBackend: Send + Sync {
    /// Run the model once over the image, in the model's output order
    async fn detect(&self, image: Arc<DynamicImage>) -> Result<Vec<Detection>, DetectionError>;
}

#[derive(Debug, Deserialize)]
struct NamesResponse {
    names: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct PredictResponse {
    #[serde(default)]
    detections: Vec<RawDetection>,
}

#[derive(Debug, Deserialize)]
struct RawDetection {
    #[serde(rename = "box")]
    bbox: [f32; 4],
    score: f32,
    class_id: u32,
}

/// Detection model served by an HTTP inference server
pub struct HttpDetectionBackend {
    client: reqwest::Client,
    base_url: String,
    /// Class id -> label table, fetched once at startup
    class_names: HashMap<u32, String>,
}

impl HttpDetectionBackend {
    /// Connect to the inference server and load the model's class names
    pub async fn connect(config: &DetectorConfig, timeout: Duration) -> Result<Self, DetectionError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DetectionError::BackendUnavailable(e.to_string()))?;

        let base_url = config.url.trim_end_matches('/').to_string();
        let url = format!("{}/names", base_url);

        let response = client
            .get(&url)
            .send()
            .await
            .map_err(|e| DetectionError::BackendUnavailable(format!("Failed to reach detector: {}", e)))?;

        if !response.status().is_success() {
            return Err(DetectionError::BackendUnavailable(format!(
                "Detector returned {} for class names",
                response.status()
            )));
        }

        let names: NamesResponse = response
            .json()
            .await
            .map_err(|e| DetectionError::InvalidResponse(format!("Failed to parse class names: {}", e)))?;

        let class_names = parse_class_names(names.names)?;

        tracing::info!(
            url = %base_url,
            classes = class_names.len(),
            "Detection model loaded"
        );

        Ok(Self {
            client,
            base_url,
            class_names,
        })
    }
}

fn parse_class_names(raw: HashMap<String, String>) -> Result<HashMap<u32, String>, DetectionError> {
    raw.into_iter()
        .map(|(id, name)| {
            id.trim()
                .parse::<u32>()
                .map(|id| (id, name))
                .map_err(|_| DetectionError::InvalidResponse(format!("Class id '{}' is not numeric", id)))
        })
        .collect()
}

#[async_trait]
impl DetectionBackend for HttpDetectionBackend {
    async fn detect(&self, image: Arc<DynamicImage>) -> Result<Vec<Detection>, DetectionError> {
        use base64::Engine;

        let encoded = tokio::task::spawn_blocking(move || {
            let mut buffer = Vec::new();
            image
                .write_to(&mut std::io::Cursor::new(&mut buffer), image::ImageFormat::Png)
                .map_err(|e| DetectionError::ImageEncoding(e.to_string()))?;
            Ok::<_, DetectionError>(base64::engine::general_purpose::STANDARD.encode(&buffer))
        })
        .await
        .map_err(|e| DetectionError::Task(format!("Task join error: {}", e)))??;

        let request = serde_json::json!({ "image": encoded });

        let url = format!("{}/predict", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| DetectionError::RequestFailed(format!("Failed to call detector: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(DetectionError::RequestFailed(format!(
                "Detector returned {}: {}",
                status, body
            )));
        }

        let result: PredictResponse = response
            .json()
            .await
            .map_err(|e| DetectionError::InvalidResponse(e.to_string()))?;

        Ok(result
            .detections
            .into_iter()
            .map(|raw| {
                let [x1, y1, x2, y2] = raw.bbox;
                Detection {
                    bbox: BoundingBox::new(x1, y1, x2, y2),
                    score: raw.score,
                    label: self.class_names.get(&raw.class_id).cloned(),
                }
            })
            .collect())
    }
}

/// Mock backend for testing
#[cfg(test)]
pub struct MockDetector {
    pub detections: Vec<Detection>,
    pub calls: std::sync::atomic::AtomicUsize,
}

#[cfg(test)]
impl MockDetector {
    pub fn new(detections: Vec<Detection>) -> Self {
        Self {
            detections,
            calls: std::sync::atomic::AtomicUsize::new(0),
        }
    }
}

#[cfg(test)]
#[async_trait]
impl DetectionBackend for MockDetector {
    async fn detect(&self, _image: Arc<DynamicImage>) -> Result<Vec<Detection>, DetectionError> {
        self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        Ok(self.detections.clone())
    }
}
