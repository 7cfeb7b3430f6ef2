//! Google Sheets ledger store
//!
//! Talks to the Sheets v4 API with service-account bearer tokens. Three
//! worksheets are used:
//! - the ledger sheet, where each row is inserted at `len(column A) + 1`,
//!   shifting anything below it down, and then filled in
//! - the plan sheet, read as header-keyed records
//! - the account sheet, whose column A is the account code list

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::OnceCell;

use super::auth::{AccessTokens, ServiceAccountTokens};
use super::gateway::LedgerStore;
use super::types::{LedgerError, LedgerRow, PlanRecord, LEDGER_COLUMNS};
use crate::config::LedgerConfig;

/// Plan sheet headers, as typed in the workbook
const HEADER_ID: &str = "id rencana";
const HEADER_START: &str = "start date A/R";
const HEADER_END: &str = "end date A/R";
const HEADER_REQUESTOR: &str = "Requestor";
const HEADER_UNIT: &str = "Unit";
const HEADER_NOMINAL: &str = "Nominal";

/// Body of a values GET
#[derive(Debug, Default, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

/// Body of a spreadsheet GET limited to `sheets.properties`
#[derive(Debug, Deserialize)]
struct Spreadsheet {
    #[serde(default)]
    sheets: Vec<SheetEntry>,
}

#[derive(Debug, Deserialize)]
struct SheetEntry {
    properties: SheetProperties,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SheetProperties {
    sheet_id: i64,
    title: String,
}

/// Ledger kept in a shared Google Sheets workbook
#[derive(Clone)]
pub struct SheetsLedger {
    client: reqwest::Client,
    endpoint: String,
    sheet_id: String,
    tokens: Arc<dyn AccessTokens>,
    /// Numeric id of the ledger worksheet, looked up on first append
    ledger_gid: Arc<OnceCell<i64>>,
    ledger_sheet: String,
    plan_sheet: String,
    account_sheet: String,
}

impl SheetsLedger {
    /// Build the store with tokens minted from `GOOGLE_CREDENTIALS_PATH`
    pub fn new(config: &LedgerConfig, timeout: Duration) -> Result<Self, LedgerError> {
        let path = config.credentials_path.as_deref().ok_or_else(|| {
            LedgerError::Credentials("GOOGLE_CREDENTIALS_PATH is not set".to_string())
        })?;
        let tokens = ServiceAccountTokens::from_file(path)?;

        Self::with_tokens(config, timeout, Arc::new(tokens))
    }

    pub fn with_tokens(
        config: &LedgerConfig,
        timeout: Duration,
        tokens: Arc<dyn AccessTokens>,
    ) -> Result<Self, LedgerError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LedgerError::Unreachable(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: config.sheets_endpoint.trim_end_matches('/').to_string(),
            sheet_id: config.sheet_id.clone(),
            tokens,
            ledger_gid: Arc::new(OnceCell::new()),
            ledger_sheet: config.ledger_sheet.clone(),
            plan_sheet: config.plan_sheet.clone(),
            account_sheet: config.account_sheet.clone(),
        })
    }

    fn spreadsheet_url(&self) -> String {
        format!("{}/v4/spreadsheets/{}", self.endpoint, self.sheet_id)
    }

    fn values_url(&self, range: &str) -> String {
        format!("{}/values/{}", self.spreadsheet_url(), urlencoding::encode(range))
    }

    /// Send a request and decode the JSON body
    async fn send(&self, request: reqwest::RequestBuilder) -> Result<Value, LedgerError> {
        let token = self.tokens.access_token().await?;
        let response = request
            .bearer_auth(token)
            .send()
            .await
            .map_err(request_error)?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(LedgerError::Api {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| LedgerError::InvalidResponse(e.to_string()))
    }

    /// Read a range as rows or columns
    async fn read(&self, range: &str, dimension: &str) -> Result<Vec<Vec<String>>, LedgerError> {
        let request = self
            .client
            .get(self.values_url(range))
            .query(&[("majorDimension", dimension)]);

        let body = self.send(request).await?;
        let range: ValueRange = serde_json::from_value(body)
            .map_err(|e| LedgerError::InvalidResponse(e.to_string()))?;

        Ok(range
            .values
            .into_iter()
            .map(|line| line.iter().map(cell_text).collect())
            .collect())
    }

    /// Column A of a sheet, trailing blanks dropped by the API
    async fn first_column(&self, sheet: &str) -> Result<Vec<String>, LedgerError> {
        let columns = self.read(&format!("{}!A:A", sheet), "COLUMNS").await?;
        Ok(columns.into_iter().next().unwrap_or_default())
    }

    /// Numeric sheet id for a worksheet title
    async fn sheet_gid(&self, title: &str) -> Result<i64, LedgerError> {
        let request = self
            .client
            .get(self.spreadsheet_url())
            .query(&[("fields", "sheets.properties(sheetId,title)")]);

        let body = self.send(request).await?;
        let spreadsheet: Spreadsheet = serde_json::from_value(body)
            .map_err(|e| LedgerError::InvalidResponse(e.to_string()))?;

        spreadsheet
            .sheets
            .into_iter()
            .find(|sheet| sheet.properties.title == title)
            .map(|sheet| sheet.properties.sheet_id)
            .ok_or_else(|| LedgerError::InvalidResponse(format!("Worksheet '{}' not found", title)))
    }

    /// Insert an empty row at 1-based `row`, pushing existing rows down
    async fn insert_row(&self, gid: i64, row: u64) -> Result<(), LedgerError> {
        let request = self
            .client
            .post(format!("{}:batchUpdate", self.spreadsheet_url()))
            .json(&insert_row_request(gid, row));

        self.send(request).await?;
        Ok(())
    }
}

#[async_trait]
impl LedgerStore for SheetsLedger {
    fn backend_name(&self) -> &'static str {
        "sheets"
    }

    async fn append_row(&self, row: &LedgerRow) -> Result<u64, LedgerError> {
        let gid = *self
            .ledger_gid
            .get_or_try_init(|| self.sheet_gid(&self.ledger_sheet))
            .await?;

        let next_row = self.first_column(&self.ledger_sheet).await?.len() as u64 + 1;
        self.insert_row(gid, next_row).await?;

        let range = row_range(&self.ledger_sheet, next_row);
        let request = self
            .client
            .put(self.values_url(&range))
            .query(&[("valueInputOption", "USER_ENTERED")])
            .json(&json!({
                "range": range,
                "majorDimension": "ROWS",
                "values": [row.to_columns()],
            }));

        self.send(request).await?;

        Ok(next_row)
    }

    async fn account_codes(&self) -> Result<Vec<String>, LedgerError> {
        self.first_column(&self.account_sheet).await
    }

    async fn plan_records(&self) -> Result<Vec<PlanRecord>, LedgerError> {
        let rows = self.read(&self.plan_sheet, "ROWS").await?;
        Ok(plan_records_from_rows(rows))
    }
}

/// `insertDimension` for one row; formatting is inherited from the row above
/// unless the insert lands on the first row
fn insert_row_request(gid: i64, row: u64) -> Value {
    let start = row.saturating_sub(1);
    json!({
        "requests": [{
            "insertDimension": {
                "range": {
                    "sheetId": gid,
                    "dimension": "ROWS",
                    "startIndex": start,
                    "endIndex": start + 1,
                },
                "inheritFromBefore": start > 0,
            }
        }]
    })
}

fn request_error(e: reqwest::Error) -> LedgerError {
    if e.is_timeout() {
        LedgerError::Timeout
    } else {
        LedgerError::Unreachable(e.to_string())
    }
}

/// Render a cell the way the sheet displays it
fn cell_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Column letter for a 1-based index
fn column_letter(mut index: usize) -> String {
    let mut letters = Vec::new();
    while index > 0 {
        let rem = (index - 1) % 26;
        letters.push(b'A' + rem as u8);
        index = (index - 1) / 26;
    }
    letters.reverse();
    String::from_utf8_lossy(&letters).into_owned()
}

/// `Sheet!A{n}:I{n}` for one ledger row
fn row_range(sheet: &str, row: u64) -> String {
    format!("{}!A{}:{}{}", sheet, row, column_letter(LEDGER_COLUMNS), row)
}

/// First row is the header; the rest become records keyed by it.
/// Rows that are entirely blank are skipped.
fn plan_records_from_rows(rows: Vec<Vec<String>>) -> Vec<PlanRecord> {
    let mut rows = rows.into_iter();
    let header: HashMap<String, usize> = match rows.next() {
        Some(header) => header
            .into_iter()
            .enumerate()
            .map(|(i, name)| (name.trim().to_string(), i))
            .collect(),
        None => return Vec::new(),
    };

    let field = |row: &[String], name: &str| -> String {
        header
            .get(name)
            .and_then(|&i| row.get(i))
            .cloned()
            .unwrap_or_default()
    };

    rows.filter(|row| row.iter().any(|cell| !cell.trim().is_empty()))
        .map(|row| PlanRecord {
            id_rencana: field(&row, HEADER_ID),
            start_date_ar: field(&row, HEADER_START),
            end_date_ar: field(&row, HEADER_END),
            requestor: field(&row, HEADER_REQUESTOR),
            unit: field(&row, HEADER_UNIT),
            nominal: field(&row, HEADER_NOMINAL),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::ledger::auth::StaticToken;
    use crate::test_support::spawn_service;
    use axum::{
        extract::{Path, Query},
        http::{HeaderMap, StatusCode},
        response::{IntoResponse, Response},
        routing::get,
        Json, Router,
    };
    use std::sync::Mutex;

    fn strings(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn test_column_letter() {
        assert_eq!(column_letter(1), "A");
        assert_eq!(column_letter(9), "I");
        assert_eq!(column_letter(26), "Z");
        assert_eq!(column_letter(28), "AB");
    }

    #[test]
    fn test_row_range() {
        assert_eq!(row_range("REKAPREALISASI", 12), "REKAPREALISASI!A12:I12");
    }

    #[test]
    fn test_cell_text() {
        assert_eq!(cell_text(&json!("AC-01")), "AC-01");
        assert_eq!(cell_text(&json!(7)), "7");
        assert_eq!(cell_text(&Value::Null), "");
    }

    #[test]
    fn test_plan_records_keyed_by_header() {
        let rows = vec![
            strings(&["id rencana", "Requestor", "Unit", "start date A/R", "end date A/R", "Nominal"]),
            strings(&["7", "Sari", "UP3", "01/01/2024", "31/01/2024", "2500000"]),
            strings(&["", "", ""]),
            strings(&["RX-9", "Budi"]),
        ];

        let records = plan_records_from_rows(rows);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id_rencana, "7");
        assert_eq!(records[0].start_date_ar, "01/01/2024");
        assert_eq!(records[0].nominal, "2500000");
        assert_eq!(records[1].requestor, "Budi");
        assert_eq!(records[1].unit, "");
    }

    #[test]
    fn test_plan_records_header_only() {
        assert!(plan_records_from_rows(vec![strings(&["id rencana"])]).is_empty());
        assert!(plan_records_from_rows(Vec::new()).is_empty());
    }

    #[test]
    fn test_insert_row_request() {
        let body = insert_row_request(918273, 4);
        let insert = &body["requests"][0]["insertDimension"];
        assert_eq!(insert["range"]["sheetId"], 918273);
        assert_eq!(insert["range"]["dimension"], "ROWS");
        assert_eq!(insert["range"]["startIndex"], 3);
        assert_eq!(insert["range"]["endIndex"], 4);
        assert_eq!(insert["inheritFromBefore"], true);

        let first = insert_row_request(918273, 1);
        assert_eq!(first["requests"][0]["insertDimension"]["inheritFromBefore"], false);
    }

    /// One request the fake API received, in arrival order
    #[derive(Debug, Clone)]
    struct Call {
        kind: &'static str,
        target: String,
        query: HashMap<String, String>,
        body: Value,
    }

    type Calls = Arc<Mutex<Vec<Call>>>;

    fn authorized(headers: &HeaderMap) -> bool {
        headers.get("authorization").and_then(|v| v.to_str().ok()) == Some("Bearer token-1")
    }

    fn unauthorized() -> Response {
        (StatusCode::UNAUTHORIZED, Json(json!({"error": "UNAUTHENTICATED"}))).into_response()
    }

    fn record(calls: &Calls, kind: &'static str, target: String, query: HashMap<String, String>, body: Value) {
        calls.lock().unwrap().push(Call {
            kind,
            target,
            query,
            body,
        });
    }

    async fn fake_sheets(calls: Calls) -> String {
        let metadata_calls = calls.clone();
        let insert_calls = calls.clone();

        let router = Router::new()
            .route(
                "/v4/spreadsheets/:sheet_id",
                get(
                    move |Path(target): Path<String>,
                          Query(query): Query<HashMap<String, String>>,
                          headers: HeaderMap| {
                        let calls = metadata_calls.clone();
                        async move {
                            if !authorized(&headers) {
                                return unauthorized();
                            }
                            record(&calls, "metadata", target, query, Value::Null);
                            Json(json!({"sheets": [
                                {"properties": {"sheetId": 0, "title": "RENCANA"}},
                                {"properties": {"sheetId": 918273, "title": "REKAPREALISASI"}},
                                {"properties": {"sheetId": 55, "title": "ACCOUNTLIST"}}
                            ]}))
                            .into_response()
                        }
                    },
                )
                .post(
                    move |Path(target): Path<String>, headers: HeaderMap, Json(body): Json<Value>| {
                        let calls = insert_calls.clone();
                        async move {
                            if !authorized(&headers) {
                                return unauthorized();
                            }
                            record(&calls, "insert", target, HashMap::new(), body);
                            Json(json!({"replies": [{}]})).into_response()
                        }
                    },
                ),
            )
            .route(
                "/v4/spreadsheets/:sheet_id/values/:range",
                get(
                    |Path((_, range)): Path<(String, String)>, headers: HeaderMap| async move {
                        if !authorized(&headers) {
                            return unauthorized();
                        }
                        let body = match range.as_str() {
                            "REKAPREALISASI!A:A" => {
                                json!({"values": [["Timestamp", "01.01.2024 10:00:00", "02.01.2024 11:00:00"]]})
                            }
                            "ACCOUNTLIST!A:A" => json!({"values": [["Account SKKO", "AC-01"]]}),
                            _ => json!({"range": range}),
                        };
                        Json(body).into_response()
                    },
                )
                .put(
                    move |Path((_, range)): Path<(String, String)>,
                          Query(query): Query<HashMap<String, String>>,
                          headers: HeaderMap,
                          Json(body): Json<Value>| {
                        let calls = calls.clone();
                        async move {
                            if !authorized(&headers) {
                                return unauthorized();
                            }
                            record(&calls, "write", range, query, body);
                            Json(json!({"updatedRows": 1})).into_response()
                        }
                    },
                ),
            );

        spawn_service(router).await
    }

    fn config(base: &str) -> LedgerConfig {
        let mut config = Config::default().ledger;
        config.sheets_endpoint = base.to_string();
        config.sheet_id = "sheet-1".to_string();
        config
    }

    fn ledger(base: &str) -> SheetsLedger {
        let tokens = Arc::new(StaticToken("token-1".to_string()));
        SheetsLedger::with_tokens(&config(base), Duration::from_secs(5), tokens).unwrap()
    }

    fn row() -> LedgerRow {
        LedgerRow {
            timestamp: "09.03.2024 14:07:05".to_string(),
            amount: "150000".to_string(),
            plan_id: "00007".to_string(),
            receipt_link: "https://files/r1".to_string(),
            evidence_links: String::new(),
            account_code: "AC-01".to_string(),
            description: "Konsumsi".to_string(),
            report_title: "Laporan".to_string(),
        }
    }

    #[tokio::test]
    async fn test_append_writes_first_blank_row() {
        let calls: Calls = Arc::default();
        let base = fake_sheets(calls.clone()).await;

        assert_eq!(ledger(&base).append_row(&row()).await.unwrap(), 4);

        let calls = calls.lock().unwrap();
        let kinds: Vec<&str> = calls.iter().map(|c| c.kind).collect();
        // The row is inserted before it is written, so nothing below is overwritten
        assert_eq!(kinds, vec!["metadata", "insert", "write"]);

        let insert = &calls[1];
        assert_eq!(insert.target, "sheet-1:batchUpdate");
        let dimension = &insert.body["requests"][0]["insertDimension"];
        assert_eq!(dimension["range"]["sheetId"], 918273);
        assert_eq!(dimension["range"]["startIndex"], 3);
        assert_eq!(dimension["range"]["endIndex"], 4);

        let write = &calls[2];
        assert_eq!(write.target, "REKAPREALISASI!A4:I4");
        assert_eq!(write.query.get("valueInputOption").map(String::as_str), Some("USER_ENTERED"));
        assert_eq!(write.body["values"][0][3], "https://files/r1");
        assert_eq!(write.body["values"][0][6], "");
        assert_eq!(write.body["values"][0].as_array().unwrap().len(), LEDGER_COLUMNS);
    }

    #[tokio::test]
    async fn test_sheet_id_looked_up_once() {
        let calls: Calls = Arc::default();
        let base = fake_sheets(calls.clone()).await;
        let ledger = ledger(&base);

        ledger.append_row(&row()).await.unwrap();
        ledger.append_row(&row()).await.unwrap();

        let kinds: Vec<&str> = calls.lock().unwrap().iter().map(|c| c.kind).collect();
        assert_eq!(kinds, vec!["metadata", "insert", "write", "insert", "write"]);
    }

    #[tokio::test]
    async fn test_unknown_ledger_worksheet() {
        let calls: Calls = Arc::default();
        let base = fake_sheets(calls.clone()).await;
        let mut config = config(&base);
        config.ledger_sheet = "ARSIP".to_string();
        let tokens = Arc::new(StaticToken("token-1".to_string()));
        let ledger = SheetsLedger::with_tokens(&config, Duration::from_secs(5), tokens).unwrap();

        let result = ledger.append_row(&row()).await;

        assert!(matches!(result, Err(LedgerError::InvalidResponse(m)) if m.contains("ARSIP")));
        assert!(calls.lock().unwrap().iter().all(|c| c.kind == "metadata"));
    }

    #[tokio::test]
    async fn test_account_codes_and_empty_range() {
        let base = fake_sheets(Arc::default()).await;
        let ledger = ledger(&base);

        assert_eq!(ledger.account_codes().await.unwrap(), vec!["Account SKKO", "AC-01"]);
        // A range without values decodes to no records
        assert!(ledger.plan_records().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_rejected_token() {
        let base = fake_sheets(Arc::default()).await;
        let mut ledger = ledger(&base);
        ledger.tokens = Arc::new(StaticToken("wrong".to_string()));

        assert!(matches!(
            ledger.account_codes().await,
            Err(LedgerError::Api { status: 401, .. })
        ));
    }

    #[test]
    fn test_credentials_path_required() {
        let result = SheetsLedger::new(&config("http://127.0.0.1:1"), Duration::from_secs(5));
        assert!(matches!(result, Err(LedgerError::Credentials(m)) if m.contains("GOOGLE_CREDENTIALS_PATH")));
    }
}
