//! Sheets access tokens
//!
//! Production tokens are minted from a service-account key file. The
//! service account keeps each token until shortly before it expires and then
//! fetches a new one, so a long-running server never holds a stale token.

use std::path::Path;

use async_trait::async_trait;
use gcp_auth::{CustomServiceAccount, TokenProvider};

use super::types::LedgerError;

/// Read/write access to spreadsheets
pub const SHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";

/// Source of bearer tokens for the Sheets API
#[async_trait]
pub trait AccessTokens: Send + Sync {
    async fn access_token(&self) -> Result<String, LedgerError>;
}

/// Tokens for a service account, cached until expiry
pub struct ServiceAccountTokens {
    account: CustomServiceAccount,
}

impl ServiceAccountTokens {
    /// Load the service-account JSON key
    pub fn from_file(path: &Path) -> Result<Self, LedgerError> {
        let account = CustomServiceAccount::from_file(path).map_err(|e| {
            LedgerError::Credentials(format!("{}: {}", path.display(), e))
        })?;

        tracing::info!(path = %path.display(), "Loaded Sheets service-account key");

        Ok(Self { account })
    }
}

#[async_trait]
impl AccessTokens for ServiceAccountTokens {
    async fn access_token(&self) -> Result<String, LedgerError> {
        let token = self
            .account
            .token(&[SHEETS_SCOPE])
            .await
            .map_err(|e| LedgerError::Credentials(e.to_string()))?;

        Ok(token.as_str().to_string())
    }
}

/// Fixed token for tests
#[cfg(test)]
pub struct StaticToken(pub String);

#[cfg(test)]
#[async_trait]
impl AccessTokens for StaticToken {
    async fn access_token(&self) -> Result<String, LedgerError> {
        Ok(self.0.clone())
    }
}
