//! OCR Module
//!
//! Reads the text of a cropped receipt region.
//!
//! The recognition service is Google Cloud Vision (`TEXT_DETECTION`), reached
//! through [`OcrProviderTrait`] so tests can swap in a fixed response.
//!
//! ## Usage
//!
//! ```rust,ignore
//! let provider = VisionProvider::new(&config.ocr, timeout)?;
//! let extractor = TextExtractor::new(Arc::new(provider));
//!
//! let text = extractor.extract_text(&cropped).await?;
//! ```

mod provider;
mod service;
mod types;

pub use provider::{OcrProviderTrait, VisionProvider};
pub use service::TextExtractor;
pub use types::{OcrError, OcrResult};

#[cfg(test)]
pub use provider::MockProvider;
