//! Configuration management for the Receipt Scanner server

use serde::Deserialize;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Per-request body ceiling and per-file size cap: 100 MiB
pub const MAX_UPLOAD_BYTES: usize = 100 * 1024 * 1024;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub upload: UploadConfig,
    pub detector: DetectorConfig,
    pub ocr: OcrConfig,
    pub services: ServicesConfig,
    pub ledger: LedgerConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Mark the session cookie `Secure`
    pub secure_cookies: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadConfig {
    /// Directory holding staged receipt files
    pub dir: PathBuf,
    pub max_bytes: usize,
    /// How long an unconfirmed receipt stays staged
    pub staging_ttl_hours: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DetectorConfig {
    /// Base URL of the inference server hosting the detection model
    pub url: String,
    /// Label of the region holding the printed total
    pub target_label: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OcrConfig {
    pub endpoint: String,
    pub api_key: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServicesConfig {
    pub receipt_endpoint: String,
    pub evidence_endpoint: String,
    /// Bounded timeout applied to every remote call
    pub timeout_secs: u64,
}

impl ServicesConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LedgerConfig {
    pub backend: LedgerBackend,
    pub sheet_id: String,
    /// Service-account key file used to mint Sheets access tokens
    pub credentials_path: Option<PathBuf>,
    pub sheets_endpoint: String,
    pub database_url: String,
    pub ledger_sheet: String,
    pub plan_sheet: String,
    pub account_sheet: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LedgerBackend {
    Sheets,
    Sqlite,
}

impl FromStr for LedgerBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s.trim();
        if value.eq_ignore_ascii_case("sheets") {
            Ok(LedgerBackend::Sheets)
        } else if value.eq_ignore_ascii_case("sqlite") {
            Ok(LedgerBackend::Sqlite)
        } else {
            Err(ConfigError::UnknownLedgerBackend(value.to_string()))
        }
    }
}

/// Startup configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable {0}")]
    Missing(&'static str),

    #[error("Unknown LEDGER_BACKEND '{0}' (expected 'sheets' or 'sqlite')")]
    UnknownLedgerBackend(String),
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    env::var(name).map_err(|_| ConfigError::Missing(name))
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 5151,
                secure_cookies: true,
            },
            upload: UploadConfig {
                dir: PathBuf::from("./uploads"),
                max_bytes: MAX_UPLOAD_BYTES,
                staging_ttl_hours: 24,
            },
            detector: DetectorConfig {
                url: "http://localhost:8000".to_string(),
                target_label: "total_value".to_string(),
            },
            ocr: OcrConfig {
                endpoint: "https://vision.googleapis.com".to_string(),
                api_key: String::new(),
            },
            services: ServicesConfig {
                receipt_endpoint: "http://localhost:8080/receipt".to_string(),
                evidence_endpoint: "http://localhost:8080/evidence".to_string(),
                timeout_secs: 500,
            },
            ledger: LedgerConfig {
                backend: LedgerBackend::Sqlite,
                sheet_id: String::new(),
                credentials_path: None,
                sheets_endpoint: "https://sheets.googleapis.com".to_string(),
                database_url: "sqlite:./ledger.db".to_string(),
                ledger_sheet: "REKAPREALISASI".to_string(),
                plan_sheet: "RENCANA".to_string(),
                account_sheet: "ACCOUNTLIST".to_string(),
            },
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Config::default();

        Ok(Config {
            server: ServerConfig {
                host: env::var("SERVER_HOST").unwrap_or(defaults.server.host),
                port: env::var("SERVER_PORT")
                    .ok()
                    .and_then(|p| p.parse().ok())
                    .unwrap_or(defaults.server.port),
                secure_cookies: env::var("SESSION_COOKIE_SECURE")
                    .map(|v| v != "false" && v != "0")
                    .unwrap_or(defaults.server.secure_cookies),
            },
            upload: UploadConfig {
                dir: env::var("UPLOAD_FOLDER")
                    .map(PathBuf::from)
                    .unwrap_or(defaults.upload.dir),
                max_bytes: MAX_UPLOAD_BYTES,
                staging_ttl_hours: env::var("STAGING_TTL_HOURS")
                    .ok()
                    .and_then(|h| h.parse().ok())
                    .unwrap_or(defaults.upload.staging_ttl_hours),
            },
            detector: DetectorConfig {
                url: required("DETECTOR_URL")?,
                target_label: env::var("DETECTOR_TARGET_LABEL")
                    .unwrap_or(defaults.detector.target_label),
            },
            ocr: OcrConfig {
                endpoint: env::var("VISION_ENDPOINT").unwrap_or(defaults.ocr.endpoint),
                api_key: env::var("VISION_API_KEY").unwrap_or_default(),
            },
            services: ServicesConfig {
                receipt_endpoint: required("RECEIPT_API_ENDPOINT")?,
                evidence_endpoint: required("EVIDENCE_API_ENDPOINT")?,
                timeout_secs: env::var("REMOTE_TIMEOUT_SECS")
                    .ok()
                    .and_then(|t| t.parse().ok())
                    .unwrap_or(defaults.services.timeout_secs),
            },
            ledger: LedgerConfig {
                backend: match env::var("LEDGER_BACKEND") {
                    Ok(value) => value.parse()?,
                    Err(_) => defaults.ledger.backend,
                },
                sheet_id: env::var("GOOGLE_SHEET_ID").unwrap_or_default(),
                credentials_path: env::var("GOOGLE_CREDENTIALS_PATH").ok().map(PathBuf::from),
                sheets_endpoint: env::var("SHEETS_ENDPOINT")
                    .unwrap_or(defaults.ledger.sheets_endpoint),
                database_url: env::var("DATABASE_URL").unwrap_or(defaults.ledger.database_url),
                ledger_sheet: env::var("LEDGER_SHEET").unwrap_or(defaults.ledger.ledger_sheet),
                plan_sheet: env::var("PLAN_SHEET").unwrap_or(defaults.ledger.plan_sheet),
                account_sheet: env::var("ACCOUNT_SHEET")
                    .unwrap_or(defaults.ledger.account_sheet),
            },
        })
    }
}
