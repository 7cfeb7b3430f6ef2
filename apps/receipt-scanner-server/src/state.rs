//! Application state management

use std::sync::Arc;

use crate::config::Config;
use crate::detection::{DetectionBackend, RegionDetector};
use crate::ledger::{LedgerGateway, LedgerStore};
use crate::ocr::{OcrProviderTrait, TextExtractor};
use crate::pipeline::{ReceiptCapture, SubmissionOrchestrator};
use crate::staging::StagingStore;
use crate::uploads::UploadService;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: Config,
    staging: StagingStore,
    capture: ReceiptCapture,
    orchestrator: SubmissionOrchestrator,
    ledger: LedgerGateway,
}

impl AppState {
    /// Wire the pipeline around the given capabilities
    pub fn new(
        config: Config,
        detector: Arc<dyn DetectionBackend>,
        ocr: Arc<dyn OcrProviderTrait>,
        uploads: Arc<dyn UploadService>,
        ledger: Arc<dyn LedgerStore>,
    ) -> Self {
        let staging = StagingStore::with_ttl_hours(config.upload.staging_ttl_hours);
        let ledger = LedgerGateway::new(ledger);

        let capture = ReceiptCapture::new(
            RegionDetector::new(detector),
            TextExtractor::new(ocr),
            staging.clone(),
            &config.upload,
            config.detector.target_label.clone(),
        );

        let orchestrator = SubmissionOrchestrator::new(
            staging.clone(),
            uploads,
            ledger.clone(),
            config.upload.max_bytes,
        );

        Self {
            inner: Arc::new(AppStateInner {
                config,
                staging,
                capture,
                orchestrator,
                ledger,
            }),
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Get the staging store
    pub fn staging(&self) -> &StagingStore {
        &self.inner.staging
    }

    pub fn capture(&self) -> &ReceiptCapture {
        &self.inner.capture
    }

    pub fn orchestrator(&self) -> &SubmissionOrchestrator {
        &self.inner.orchestrator
    }

    /// Get the ledger gateway
    pub fn ledger(&self) -> &LedgerGateway {
        &self.inner.ledger
    }
}
