//! Remote Upload Module
//!
//! Client for the Receipt and Evidence storage services, plus the content
//! checks every uploaded image goes through before it is forwarded.

pub mod client;
pub mod types;
pub mod validation;

pub use client::{HttpUploadClient, UploadService};
pub use types::*;
pub use validation::{
    check_image, sanitize_filename, sniff_image, validate_evidence, EvidenceBatch, ImageRejection,
    SkippedEvidence,
};

#[cfg(test)]
pub use client::MockUploads;
