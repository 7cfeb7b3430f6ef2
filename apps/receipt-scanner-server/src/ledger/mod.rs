//! Ledger Module
//!
//! Append-only record of completed submissions, plus the plan and account
//! lookups the capture screens use.
//!
//! Two stores sit behind [`LedgerStore`]:
//! - `sheets`: the shared Google Sheets workbook (production)
//! - `sqlite`: a local database with the same three tables

mod auth;
mod gateway;
mod schema;
mod sheets;
mod sqlite;
mod types;

pub use auth::{AccessTokens, ServiceAccountTokens, SHEETS_SCOPE};
pub use gateway::{LedgerGateway, LedgerStore};
pub use schema::initialize_schema;
pub use sheets::SheetsLedger;
pub use sqlite::{create_pool, SqliteLedger};
pub use types::*;

#[cfg(test)]
pub use gateway::MemoryLedger;
