//! OCR Providers
//!
//! Defines the provider trait and the Google Cloud Vision implementation.

use std::time::Duration;

use async_trait::async_trait;

use super::types::{AnnotateResponse, OcrError, OcrResult};
use crate::config::OcrConfig;

/// OCR provider trait
#[async_trait]
pub trait OcrProviderTrait: Send + Sync {
    /// Perform OCR on an encoded image
    async fn recognize(&self, image_data: &[u8]) -> Result<OcrResult, OcrError>;
}

/// Google Cloud Vision text detection
pub struct VisionProvider {
    client: reqwest::Client,
    /// Vision API base URL
    endpoint: String,
    api_key: String,
}

impl VisionProvider {
    pub fn new(config: &OcrConfig, timeout: Duration) -> Result<Self, OcrError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| OcrError::ApiError(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }
}

#[async_trait]
impl OcrProviderTrait for VisionProvider {
    async fn recognize(&self, image_data: &[u8]) -> Result<OcrResult, OcrError> {
        use base64::Engine;

        let url = format!("{}/v1/images:annotate", self.endpoint);

        let request = serde_json::json!({
            "requests": [{
                "image": { "content": base64::engine::general_purpose::STANDARD.encode(image_data) },
                "features": [{ "type": "TEXT_DETECTION" }]
            }]
        });

        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&request)
            .send()
            .await
            .map_err(|e| OcrError::ApiError(format!("Failed to call Vision API: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(OcrError::ApiError(format!(
                "Vision API returned {}: {}",
                status, body
            )));
        }

        let result: AnnotateResponse = response
            .json()
            .await
            .map_err(|e| OcrError::ApiError(format!("Failed to parse response: {}", e)))?;

        interpret(result)
    }
}

/// Turn an annotate response into text, surfacing service-reported errors
fn interpret(response: AnnotateResponse) -> Result<OcrResult, OcrError> {
    let first = response.responses.into_iter().next().unwrap_or_default();

    if let Some(error) = first.error {
        if !error.message.is_empty() {
            return Err(OcrError::Service(error.message));
        }
    }

    let blocks = first.text_annotations.len();
    let text = first
        .text_annotations
        .into_iter()
        .next()
        .map(|a| a.description)
        .unwrap_or_default();

    Ok(OcrResult { text, blocks })
}

/// Mock provider for testing
#[cfg(test)]
pub struct MockProvider {
    pub response: Result<OcrResult, String>,
}

#[cfg(test)]
impl MockProvider {
    pub fn text(text: &str) -> Self {
        Self {
            response: Ok(OcrResult {
                text: text.to_string(),
                blocks: 1,
            }),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            response: Err(message.to_string()),
        }
    }
}

#[cfg(test)]
#[async_trait]
impl OcrProviderTrait for MockProvider {
    async fn recognize(&self, _image_data: &[u8]) -> Result<OcrResult, OcrError> {
        self.response.clone().map_err(OcrError::Service)
    }
}
