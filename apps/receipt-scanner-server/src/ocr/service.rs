//! Text Extractor
//!
//! Encodes a cropped region and hands it to the OCR provider.

use std::sync::Arc;

use image::DynamicImage;

use super::{
    provider::OcrProviderTrait,
    types::OcrError,
};

/// Extracts the printed text of a receipt region
#[derive(Clone)]
pub struct TextExtractor {
    provider: Arc<dyn OcrProviderTrait>,
}

impl TextExtractor {
    pub fn new(provider: Arc<dyn OcrProviderTrait>) -> Self {
        Self { provider }
    }

    /// Return the top text block of the region.
    ///
    /// A region without legible text yields an empty string; only errors
    /// reported by the service fail.
    pub async fn extract_text(&self, region: DynamicImage) -> Result<String, OcrError> {
        let buffer = tokio::task::spawn_blocking(move || {
            let mut buffer = Vec::new();
            region
                .write_to(&mut std::io::Cursor::new(&mut buffer), image::ImageFormat::Png)
                .map_err(|e| OcrError::ImageEncoding(e.to_string()))?;
            Ok::<_, OcrError>(buffer)
        })
        .await
        .map_err(|e| OcrError::ImageEncoding(format!("Task join error: {}", e)))??;

        let result = self.provider.recognize(&buffer).await?;

        if result.blocks > 1 {
            tracing::debug!(blocks = result.blocks, "Multiple text blocks, keeping the top one");
        }

        Ok(result.text)
    }
}
