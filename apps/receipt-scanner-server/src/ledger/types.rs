//! Ledger types

use chrono::{DateTime, TimeZone};
use serde::Serialize;

/// Timestamp layout of column A
pub const TIMESTAMP_FORMAT: &str = "%d.%m.%Y %H:%M:%S";

/// Separator between evidence links in column E
pub const EVIDENCE_LINK_SEPARATOR: &str = ", ";

/// Number of columns in a ledger row (A..I)
pub const LEDGER_COLUMNS: usize = 9;

// ============================================================================
// Ledger Row
// ============================================================================

/// One completed submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerRow {
    pub timestamp: String,
    pub amount: String,
    pub plan_id: String,
    pub receipt_link: String,
    /// Zero or more links joined with `", "`
    pub evidence_links: String,
    pub account_code: String,
    pub description: String,
    pub report_title: String,
}

impl LedgerRow {
    /// Format a timestamp the way column A stores it
    pub fn format_timestamp<Tz: TimeZone>(at: &DateTime<Tz>) -> String
    where
        Tz::Offset: std::fmt::Display,
    {
        at.format(TIMESTAMP_FORMAT).to_string()
    }

    /// Join evidence links into the single column E value
    pub fn join_links(links: &[String]) -> String {
        links.join(EVIDENCE_LINK_SEPARATOR)
    }

    /// Cells A..I; column G is always left blank
    pub fn to_columns(&self) -> [String; LEDGER_COLUMNS] {
        [
            self.timestamp.clone(),
            self.amount.clone(),
            self.plan_id.clone(),
            self.receipt_link.clone(),
            self.evidence_links.clone(),
            self.account_code.clone(),
            String::new(),
            self.description.clone(),
            self.report_title.clone(),
        ]
    }
}

// ============================================================================
// Plan Records
// ============================================================================

/// Raw row of the plan sheet
#[derive(Debug, Clone, Default, PartialEq, Eq, sqlx::FromRow)]
pub struct PlanRecord {
    pub id_rencana: String,
    pub start_date_ar: String,
    pub end_date_ar: String,
    pub requestor: String,
    pub unit: String,
    pub nominal: String,
}

/// Plan details served to the capture screen
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlanDetails {
    pub start_date_ar: String,
    pub end_date_ar: String,
    pub requestor: String,
    pub unit: String,
    pub nominal: String,
    pub id_rencana: String,
}

impl PlanRecord {
    pub fn into_details(self) -> PlanDetails {
        PlanDetails {
            id_rencana: normalize_plan_id(&self.id_rencana),
            start_date_ar: self.start_date_ar,
            end_date_ar: self.end_date_ar,
            requestor: self.requestor,
            unit: self.unit,
            nominal: self.nominal,
        }
    }
}

/// Integer ids become five zero-padded digits, anything else is trimmed
pub fn normalize_plan_id(raw: &str) -> String {
    let trimmed = raw.trim();
    match trimmed.parse::<i64>() {
        Ok(id) => format!("{:05}", id),
        Err(_) => trimmed.to_string(),
    }
}

// ============================================================================
// Error Types
// ============================================================================

/// Ledger error types
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("Ledger store unreachable: {0}")]
    Unreachable(String),

    #[error("Ledger request timed out")]
    Timeout,

    #[error("Ledger API returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Malformed ledger response: {0}")]
    InvalidResponse(String),

    #[error("Ledger credentials rejected: {0}")]
    Credentials(String),

    #[error("No plan records found.")]
    NoPlanRecords,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, Utc};

    #[test]
    fn test_normalize_plan_id() {
        assert_eq!(normalize_plan_id("7"), "00007");
        assert_eq!(normalize_plan_id(" 123 "), "00123");
        assert_eq!(normalize_plan_id("123456"), "123456");
        assert_eq!(normalize_plan_id("RX-9 "), "RX-9");
        assert_eq!(normalize_plan_id("00042"), "00042");
    }

    #[test]
    fn test_columns_order() {
        let row = LedgerRow {
            timestamp: "01.02.2024 09:05:00".to_string(),
            amount: "150000".to_string(),
            plan_id: "00007".to_string(),
            receipt_link: "https://files/r1".to_string(),
            evidence_links: LedgerRow::join_links(&["link1".to_string(), "link2".to_string()]),
            account_code: "AC-01".to_string(),
            description: "Konsumsi rapat".to_string(),
            report_title: "Laporan Q1".to_string(),
        };

        let columns = row.to_columns();
        assert_eq!(columns[0], "01.02.2024 09:05:00");
        assert_eq!(columns[3], "https://files/r1");
        assert_eq!(columns[4], "link1, link2");
        assert_eq!(columns[5], "AC-01");
        assert_eq!(columns[6], "");
        assert_eq!(columns[8], "Laporan Q1");
    }

    #[test]
    fn test_timestamp_format() {
        let offset = FixedOffset::east_opt(7 * 3600).unwrap();
        let at = offset.with_ymd_and_hms(2024, 3, 9, 14, 7, 5).unwrap();
        assert_eq!(LedgerRow::format_timestamp(&at), "09.03.2024 14:07:05");

        let now = LedgerRow::format_timestamp(&Utc::now());
        assert_eq!(now.len(), 19);
    }

    #[test]
    fn test_empty_link_list_joins_to_empty() {
        assert_eq!(LedgerRow::join_links(&[]), "");
    }
}
