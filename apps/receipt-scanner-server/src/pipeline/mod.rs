//! Receipt Pipeline
//!
//! The two request flows of the service:
//! - [`ReceiptCapture`]: photo in, total region read, receipt staged
//! - [`SubmissionOrchestrator`]: staged receipt and evidence uploaded,
//!   ledger row appended

mod capture;
mod submission;
mod types;

pub use capture::ReceiptCapture;
pub use submission::SubmissionOrchestrator;
pub use types::*;
