//! Ledger database schema

use sqlx::SqlitePool;

use super::types::LedgerError;

/// Initialize the ledger tables
pub async fn initialize_schema(pool: &SqlitePool) -> Result<(), LedgerError> {
    sqlx::query(SCHEMA_SQL).execute(pool).await?;

    Ok(())
}

const SCHEMA_SQL: &str = r#"
-- Completed submissions; row_number mirrors the sheet row (row 1 is the header)
CREATE TABLE IF NOT EXISTS ledger_rows (
    row_number INTEGER PRIMARY KEY,
    timestamp TEXT NOT NULL,
    amount TEXT NOT NULL,
    plan_id TEXT NOT NULL DEFAULT '',
    receipt_link TEXT NOT NULL,
    evidence_links TEXT NOT NULL DEFAULT '',
    account_code TEXT NOT NULL,
    reserved TEXT NOT NULL DEFAULT '',
    description TEXT NOT NULL DEFAULT '',
    report_title TEXT NOT NULL DEFAULT '',
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_ledger_rows_account ON ledger_rows(account_code);

-- Spending plans
CREATE TABLE IF NOT EXISTS plans (
    position INTEGER PRIMARY KEY AUTOINCREMENT,
    id_rencana TEXT NOT NULL DEFAULT '',
    start_date_ar TEXT NOT NULL DEFAULT '',
    end_date_ar TEXT NOT NULL DEFAULT '',
    requestor TEXT NOT NULL DEFAULT '',
    unit TEXT NOT NULL DEFAULT '',
    nominal TEXT NOT NULL DEFAULT ''
);

-- Account codes offered on the capture form
CREATE TABLE IF NOT EXISTS accounts (
    position INTEGER PRIMARY KEY AUTOINCREMENT,
    code TEXT NOT NULL
);
"#;
