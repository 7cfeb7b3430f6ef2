//! Submission Orchestrator
//!
//! Turns the session's staged receipt plus the form fields into a ledger row:
//!
//! 1. validate the account code
//! 2. load the staged receipt (no remote calls without one)
//! 3. upload the receipt; failure keeps the staged entry
//! 4. upload the evidence batch, best-effort
//! 5. append the ledger row
//!
//! Steps 1-3 and 5 fail the submission. A ledger failure after the uploads
//! leaves the files stored remotely with no row pointing at them.

use std::sync::Arc;

use chrono::Local;

use super::types::{
    EvidenceOutcome, EvidenceStatus, PipelineError, SubmissionMetadata, SubmissionOutcome,
};
use crate::ledger::{LedgerGateway, LedgerRow};
use crate::staging::{SessionId, StagingStore};
use crate::uploads::{validate_evidence, EvidenceFile, UploadFile, UploadService};

/// Submission flow behind `POST /submit`
#[derive(Clone)]
pub struct SubmissionOrchestrator {
    staging: StagingStore,
    uploads: Arc<dyn UploadService>,
    ledger: LedgerGateway,
    max_evidence_bytes: usize,
}

impl SubmissionOrchestrator {
    pub fn new(
        staging: StagingStore,
        uploads: Arc<dyn UploadService>,
        ledger: LedgerGateway,
        max_evidence_bytes: usize,
    ) -> Self {
        Self {
            staging,
            uploads,
            ledger,
            max_evidence_bytes,
        }
    }

    pub async fn submit(
        &self,
        session_id: SessionId,
        metadata: SubmissionMetadata,
        evidence: Vec<EvidenceFile>,
    ) -> Result<SubmissionOutcome, PipelineError> {
        let account_code = metadata.account_code.trim();
        if account_code.is_empty() {
            return Err(PipelineError::Validation(
                "No account_skkos_id provided".to_string(),
            ));
        }

        let staged = self
            .staging
            .get(session_id)
            .await
            .ok_or(PipelineError::NoStagedReceipt)?;

        let data = tokio::fs::read(&staged.file_path).await.map_err(|e| {
            tracing::error!(
                session_id = %session_id,
                path = %staged.file_path.display(),
                "Staged receipt file unreadable: {}",
                e
            );
            PipelineError::StagedFile(e.to_string())
        })?;

        let receipt = UploadFile {
            filename: staged.original_filename.clone(),
            content_type: staged.content_type.clone(),
            data,
        };

        let receipt_link = self
            .uploads
            .upload_receipt(receipt, account_code, &staged.extracted_text)
            .await
            .map_err(|e| {
                tracing::error!(session_id = %session_id, "Receipt upload failed: {}", e);
                PipelineError::from(e)
            })?;

        tracing::info!(
            session_id = %session_id,
            receipt_link = %receipt_link,
            "Receipt uploaded"
        );

        self.staging.release(session_id, &staged.file_path).await;

        let evidence = self.upload_evidence(session_id, evidence, account_code).await;

        let row = LedgerRow {
            timestamp: LedgerRow::format_timestamp(&Local::now()),
            amount: metadata.amount,
            plan_id: metadata.plan_id,
            receipt_link,
            evidence_links: LedgerRow::join_links(&evidence.links),
            account_code: account_code.to_string(),
            description: metadata.description,
            report_title: metadata.report_title,
        };

        let row_number = self.ledger.append(&row).await.map_err(|e| {
            tracing::error!(
                session_id = %session_id,
                receipt_link = %row.receipt_link,
                "Ledger append failed after uploads: {}",
                e
            );
            PipelineError::from(e)
        })?;

        Ok(SubmissionOutcome {
            row_number,
            row,
            evidence,
        })
    }

    /// Filter and send the evidence batch; never fails the submission
    async fn upload_evidence(
        &self,
        session_id: SessionId,
        files: Vec<EvidenceFile>,
        account_code: &str,
    ) -> EvidenceOutcome {
        let batch = validate_evidence(files, self.max_evidence_bytes);

        if batch.accepted.is_empty() {
            return EvidenceOutcome {
                status: EvidenceStatus::Skipped,
                links: Vec::new(),
                skipped: batch.skipped,
                error: None,
            };
        }

        let count = batch.accepted.len();

        match self.uploads.upload_evidence(batch.accepted, account_code).await {
            Ok(links) => {
                tracing::info!(
                    session_id = %session_id,
                    files = count,
                    links = links.len(),
                    "Evidence uploaded"
                );
                EvidenceOutcome {
                    status: EvidenceStatus::Uploaded,
                    links,
                    skipped: batch.skipped,
                    error: None,
                }
            }
            Err(e) => {
                tracing::error!(session_id = %session_id, files = count, "Evidence upload failed: {}", e);
                EvidenceOutcome {
                    status: EvidenceStatus::Failed,
                    links: Vec::new(),
                    skipped: batch.skipped,
                    error: Some(e.to_string()),
                }
            }
        }
    }
}
