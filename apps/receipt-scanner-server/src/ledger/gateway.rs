//! Ledger Gateway
//!
//! Thin adapter over the configured ledger store.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::types::{normalize_plan_id, LedgerError, LedgerRow, PlanDetails, PlanRecord};

/// Ledger store trait
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Short backend name for logs
    fn backend_name(&self) -> &'static str;

    /// Write the row into the first blank row (by column A); returns its number
    async fn append_row(&self, row: &LedgerRow) -> Result<u64, LedgerError>;

    /// Column A of the account list, verbatim
    async fn account_codes(&self) -> Result<Vec<String>, LedgerError>;

    /// Every row of the plan sheet
    async fn plan_records(&self) -> Result<Vec<PlanRecord>, LedgerError>;
}

/// Gateway shared by the orchestrator and the lookup routes
#[derive(Clone)]
pub struct LedgerGateway {
    store: Arc<dyn LedgerStore>,
    /// Serializes the read-then-write append within this process
    append_lock: Arc<Mutex<()>>,
}

impl LedgerGateway {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self {
            store,
            append_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn backend_name(&self) -> &'static str {
        self.store.backend_name()
    }

    /// Append one row
    pub async fn append(&self, row: &LedgerRow) -> Result<u64, LedgerError> {
        let _guard = self.append_lock.lock().await;

        let row_number = self.store.append_row(row).await?;

        tracing::info!(
            backend = self.store.backend_name(),
            row = row_number,
            account_code = %row.account_code,
            "Appended ledger row"
        );

        Ok(row_number)
    }

    /// Account codes for the capture form
    pub async fn account_codes(&self) -> Result<Vec<String>, LedgerError> {
        self.store.account_codes().await
    }

    /// Normalized, non-empty plan ids
    pub async fn plan_ids(&self) -> Result<Vec<String>, LedgerError> {
        let records = self.store.plan_records().await?;

        Ok(records
            .iter()
            .filter(|r| !r.id_rencana.trim().is_empty())
            .map(|r| normalize_plan_id(&r.id_rencana))
            .collect())
    }

    /// Find a plan by id, comparing normalized ids
    pub async fn find_plan(&self, plan_id: &str) -> Result<Option<PlanDetails>, LedgerError> {
        let records = self.store.plan_records().await?;

        if records.is_empty() {
            return Err(LedgerError::NoPlanRecords);
        }

        let wanted = plan_id.trim();

        Ok(records
            .into_iter()
            .filter(|r| !r.id_rencana.trim().is_empty())
            .find(|r| normalize_plan_id(&r.id_rencana) == wanted)
            .map(PlanRecord::into_details))
    }
}

/// In-memory ledger for testing
#[cfg(test)]
#[derive(Default)]
pub struct MemoryLedger {
    pub rows: std::sync::Mutex<Vec<LedgerRow>>,
    pub accounts: Vec<String>,
    pub plans: Vec<PlanRecord>,
    /// Simulate an unreachable store on append
    pub fail_append: bool,
    /// Simulate a rejected plan sheet read
    pub fail_lookups: bool,
}

#[cfg(test)]
impl MemoryLedger {
    pub fn rows(&self) -> Vec<LedgerRow> {
        self.rows.lock().unwrap().clone()
    }
}

#[cfg(test)]
#[async_trait]
impl LedgerStore for MemoryLedger {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn append_row(&self, row: &LedgerRow) -> Result<u64, LedgerError> {
        if self.fail_append {
            return Err(LedgerError::Unreachable("connection refused".to_string()));
        }
        let mut rows = self.rows.lock().unwrap();
        rows.push(row.clone());
        // Row 1 holds the headers
        Ok(rows.len() as u64 + 1)
    }

    async fn account_codes(&self) -> Result<Vec<String>, LedgerError> {
        Ok(self.accounts.clone())
    }

    async fn plan_records(&self) -> Result<Vec<PlanRecord>, LedgerError> {
        if self.fail_lookups {
            return Err(LedgerError::Api {
                status: 403,
                message: "PERMISSION_DENIED on spreadsheet sheet-1".to_string(),
            });
        }
        Ok(self.plans.clone())
    }
}
