//! SQLite ledger store

use std::str::FromStr;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};

use super::gateway::LedgerStore;
use super::schema::initialize_schema;
use super::types::{LedgerError, LedgerRow, PlanRecord};

/// Create a new database connection pool
pub async fn create_pool(database_url: &str) -> Result<SqlitePool, LedgerError> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
        .synchronous(sqlx::sqlite::SqliteSynchronous::Normal);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    initialize_schema(&pool).await?;

    Ok(pool)
}

/// Ledger kept in a local SQLite database
#[derive(Clone)]
pub struct SqliteLedger {
    pool: SqlitePool,
}

impl SqliteLedger {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Add a plan record
    pub async fn insert_plan(&self, plan: &PlanRecord) -> Result<(), LedgerError> {
        sqlx::query(
            r#"
            INSERT INTO plans (id_rencana, start_date_ar, end_date_ar, requestor, unit, nominal)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&plan.id_rencana)
        .bind(&plan.start_date_ar)
        .bind(&plan.end_date_ar)
        .bind(&plan.requestor)
        .bind(&plan.unit)
        .bind(&plan.nominal)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Add an account code
    pub async fn insert_account(&self, code: &str) -> Result<(), LedgerError> {
        sqlx::query("INSERT INTO accounts (code) VALUES (?)")
            .bind(code)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Read back a stored row
    pub async fn row(&self, row_number: u64) -> Result<Option<LedgerRow>, LedgerError> {
        let row = sqlx::query_as::<_, (String, String, String, String, String, String, String, String)>(
            r#"
            SELECT timestamp, amount, plan_id, receipt_link, evidence_links,
                   account_code, description, report_title
            FROM ledger_rows
            WHERE row_number = ?
            "#,
        )
        .bind(row_number as i64)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(
            |(timestamp, amount, plan_id, receipt_link, evidence_links, account_code, description, report_title)| {
                LedgerRow {
                    timestamp,
                    amount,
                    plan_id,
                    receipt_link,
                    evidence_links,
                    account_code,
                    description,
                    report_title,
                }
            },
        ))
    }
}

#[async_trait]
impl LedgerStore for SqliteLedger {
    fn backend_name(&self) -> &'static str {
        "sqlite"
    }

    async fn append_row(&self, row: &LedgerRow) -> Result<u64, LedgerError> {
        let result = sqlx::query(
            r#"
            INSERT INTO ledger_rows (
                row_number, timestamp, amount, plan_id, receipt_link, evidence_links,
                account_code, description, report_title
            )
            VALUES ((SELECT COALESCE(MAX(row_number), 1) + 1 FROM ledger_rows), ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&row.timestamp)
        .bind(&row.amount)
        .bind(&row.plan_id)
        .bind(&row.receipt_link)
        .bind(&row.evidence_links)
        .bind(&row.account_code)
        .bind(&row.description)
        .bind(&row.report_title)
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid() as u64)
    }

    async fn account_codes(&self) -> Result<Vec<String>, LedgerError> {
        let codes = sqlx::query_scalar::<_, String>("SELECT code FROM accounts ORDER BY position")
            .fetch_all(&self.pool)
            .await?;

        Ok(codes)
    }

    async fn plan_records(&self) -> Result<Vec<PlanRecord>, LedgerError> {
        let plans = sqlx::query_as::<_, PlanRecord>(
            r#"
            SELECT id_rencana, start_date_ar, end_date_ar, requestor, unit, nominal
            FROM plans
            ORDER BY position
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(plans)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::LedgerGateway;
    use std::sync::Arc;
    use tempfile::TempDir;

    async fn ledger(dir: &TempDir) -> SqliteLedger {
        let url = format!("sqlite:{}", dir.path().join("ledger.db").display());
        SqliteLedger::new(create_pool(&url).await.unwrap())
    }

    fn row(amount: &str) -> LedgerRow {
        LedgerRow {
            timestamp: "09.03.2024 14:07:05".to_string(),
            amount: amount.to_string(),
            plan_id: "00007".to_string(),
            receipt_link: "https://files/r1".to_string(),
            evidence_links: "link1, link2".to_string(),
            account_code: "AC-01".to_string(),
            description: "Konsumsi".to_string(),
            report_title: "Laporan".to_string(),
        }
    }

    #[tokio::test]
    async fn test_append_assigns_rows_after_header() {
        let dir = TempDir::new().unwrap();
        let ledger = ledger(&dir).await;

        assert_eq!(ledger.append_row(&row("150000")).await.unwrap(), 2);
        assert_eq!(ledger.append_row(&row("20000")).await.unwrap(), 3);

        let stored = ledger.row(2).await.unwrap().unwrap();
        assert_eq!(stored, row("150000"));
        assert!(ledger.row(9).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_schema_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let ledger = ledger(&dir).await;
        ledger.append_row(&row("1")).await.unwrap();

        initialize_schema(&ledger.pool).await.unwrap();
        assert_eq!(ledger.append_row(&row("2")).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_lookups_through_gateway() {
        let dir = TempDir::new().unwrap();
        let ledger = ledger(&dir).await;

        ledger.insert_account("AC-01").await.unwrap();
        ledger.insert_account("AC-02").await.unwrap();
        ledger
            .insert_plan(&PlanRecord {
                id_rencana: "7".to_string(),
                start_date_ar: "01/01/2024".to_string(),
                end_date_ar: "31/01/2024".to_string(),
                requestor: "Sari".to_string(),
                unit: "UP3".to_string(),
                nominal: "2500000".to_string(),
            })
            .await
            .unwrap();

        let gateway = LedgerGateway::new(Arc::new(ledger));

        assert_eq!(gateway.account_codes().await.unwrap(), vec!["AC-01", "AC-02"]);
        assert_eq!(gateway.plan_ids().await.unwrap(), vec!["00007"]);

        let plan = gateway.find_plan("00007").await.unwrap().unwrap();
        assert_eq!(plan.requestor, "Sari");
        assert_eq!(plan.end_date_ar, "31/01/2024");
    }
}
