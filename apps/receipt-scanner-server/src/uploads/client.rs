//! Upload Service Client
//!
//! Multipart client for the Receipt and Evidence storage services.
//!
//! Both services answer `{status, message?, data}`; the receipt service
//! returns a single `{fileLink}`, the evidence service either one object or a
//! list of them.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};

use super::types::{collect_file_links, ServiceResponse, UploadError, UploadFile, UploadTarget};
use super::validation::sanitize_filename;
use crate::config::ServicesConfig;

// ============================================================================
// Upload Service Trait
// ============================================================================

/// Remote storage for receipts and evidence photos
#[async_trait]
pub trait UploadService: Send + Sync {
    /// Store the receipt and return its durable link
    async fn upload_receipt(
        &self,
        file: UploadFile,
        account_code: &str,
        extracted_text: &str,
    ) -> Result<String, UploadError>;

    /// Store a batch of evidence photos and return one link per stored item
    async fn upload_evidence(
        &self,
        files: Vec<UploadFile>,
        account_code: &str,
    ) -> Result<Vec<String>, UploadError>;
}

// ============================================================================
// HTTP Client
// ============================================================================

/// HTTP client for both upload services
#[derive(Clone)]
pub struct HttpUploadClient {
    client: reqwest::Client,
    receipt_endpoint: String,
    evidence_endpoint: String,
}

impl HttpUploadClient {
    pub fn new(config: &ServicesConfig) -> Result<Self, reqwest::Error> {
        Self::with_timeout(
            &config.receipt_endpoint,
            &config.evidence_endpoint,
            config.timeout(),
        )
    }

    pub fn with_timeout(
        receipt_endpoint: &str,
        evidence_endpoint: &str,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            receipt_endpoint: receipt_endpoint.to_string(),
            evidence_endpoint: evidence_endpoint.to_string(),
        })
    }

    /// POST a form and read the service envelope
    async fn post_form(
        &self,
        target: UploadTarget,
        url: &str,
        form: Form,
    ) -> Result<ServiceResponse, UploadError> {
        let response = self
            .client
            .post(url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| target.request_error(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(UploadError::BadStatus {
                target,
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await.map_err(|e| target.request_error(e))?;

        let envelope: ServiceResponse =
            serde_json::from_slice(&body).map_err(|e| UploadError::InvalidResponse {
                target,
                message: e.to_string(),
            })?;

        if !envelope.is_success() {
            return Err(UploadError::Rejected {
                target,
                message: envelope.failure_message(),
            });
        }

        Ok(envelope)
    }
}

/// Build a file part with a sanitized name
fn file_part(target: UploadTarget, file: UploadFile) -> Result<Part, UploadError> {
    let filename = sanitize_filename(&file.filename);
    let content_type = if file.content_type.is_empty() {
        mime_guess::from_path(&filename)
            .first_or_octet_stream()
            .to_string()
    } else {
        file.content_type
    };

    Part::bytes(file.data)
        .file_name(filename)
        .mime_str(&content_type)
        .map_err(|e| UploadError::Transport {
            target,
            message: format!("Invalid content type '{}': {}", content_type, e),
        })
}

#[async_trait]
impl UploadService for HttpUploadClient {
    async fn upload_receipt(
        &self,
        file: UploadFile,
        account_code: &str,
        extracted_text: &str,
    ) -> Result<String, UploadError> {
        let target = UploadTarget::Receipt;

        let form = Form::new()
            .text("accountSKKO", account_code.to_string())
            .text("extracted_text", extracted_text.to_string())
            .part("file", file_part(target, file)?);

        let envelope = self.post_form(target, &self.receipt_endpoint, form).await?;

        collect_file_links(envelope.data.as_ref())
            .into_iter()
            .next()
            .ok_or(UploadError::MissingLink { target })
    }

    async fn upload_evidence(
        &self,
        files: Vec<UploadFile>,
        account_code: &str,
    ) -> Result<Vec<String>, UploadError> {
        let target = UploadTarget::Evidence;

        let mut form = Form::new().text("accountSKKO", account_code.to_string());
        for file in files {
            form = form.part("files", file_part(target, file)?);
        }

        let envelope = self.post_form(target, &self.evidence_endpoint, form).await?;

        Ok(collect_file_links(envelope.data.as_ref()))
    }
}

// ============================================================================
// Mock Service
// ============================================================================

/// Recorded receipt upload: (file name, account code, extracted text)
#[cfg(test)]
pub type ReceiptCall = (String, String, String);

/// Mock upload services for testing
#[cfg(test)]
pub struct MockUploads {
    /// `Ok(link)`, or `Err(true)` for a timeout and `Err(false)` for a rejection
    pub receipt: Result<String, bool>,
    /// `None` simulates an unreachable evidence service
    pub evidence: Option<Vec<String>>,
    pub receipt_calls: std::sync::Mutex<Vec<ReceiptCall>>,
    pub evidence_calls: std::sync::Mutex<Vec<Vec<String>>>,
}

#[cfg(test)]
impl MockUploads {
    pub fn new(receipt_link: &str, evidence_links: &[&str]) -> Self {
        Self {
            receipt: Ok(receipt_link.to_string()),
            evidence: Some(evidence_links.iter().map(|l| l.to_string()).collect()),
            receipt_calls: Default::default(),
            evidence_calls: Default::default(),
        }
    }

    pub fn receipt_call_count(&self) -> usize {
        self.receipt_calls.lock().unwrap().len()
    }

    pub fn evidence_call_count(&self) -> usize {
        self.evidence_calls.lock().unwrap().len()
    }
}

#[cfg(test)]
#[async_trait]
impl UploadService for MockUploads {
    async fn upload_receipt(
        &self,
        file: UploadFile,
        account_code: &str,
        extracted_text: &str,
    ) -> Result<String, UploadError> {
        self.receipt_calls.lock().unwrap().push((
            file.filename,
            account_code.to_string(),
            extracted_text.to_string(),
        ));

        match &self.receipt {
            Ok(link) => Ok(link.clone()),
            Err(true) => Err(UploadError::Timeout(UploadTarget::Receipt)),
            Err(false) => Err(UploadError::Rejected {
                target: UploadTarget::Receipt,
                message: "Drive quota exceeded".to_string(),
            }),
        }
    }

    async fn upload_evidence(
        &self,
        files: Vec<UploadFile>,
        _account_code: &str,
    ) -> Result<Vec<String>, UploadError> {
        self.evidence_calls
            .lock()
            .unwrap()
            .push(files.into_iter().map(|f| f.filename).collect());

        self.evidence.clone().ok_or(UploadError::Transport {
            target: UploadTarget::Evidence,
            message: "connection refused".to_string(),
        })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{png_bytes, spawn_service};
    use axum::{extract::Multipart, http::StatusCode, routing::post, Json, Router};
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    /// Every multipart field as (name, file name, text or byte count)
    type Fields = Arc<Mutex<Vec<(String, Option<String>, String)>>>;

    async fn record(fields: &Fields, mut multipart: Multipart) {
        while let Some(field) = multipart.next_field().await.unwrap() {
            let name = field.name().unwrap_or("").to_string();
            let file_name = field.file_name().map(str::to_string);
            let value = if file_name.is_some() {
                format!("{} bytes", field.bytes().await.unwrap().len())
            } else {
                field.text().await.unwrap()
            };
            fields.lock().unwrap().push((name, file_name, value));
        }
    }

    fn receipt_file(name: &str) -> UploadFile {
        UploadFile {
            filename: name.to_string(),
            content_type: "image/png".to_string(),
            data: png_bytes(6, 6),
        }
    }

    fn client(base: &str, timeout: Duration) -> HttpUploadClient {
        HttpUploadClient::with_timeout(
            &format!("{}/receipt", base),
            &format!("{}/evidence", base),
            timeout,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_receipt_upload_sends_fields_and_returns_link() {
        let fields: Fields = Arc::default();
        let recorded = fields.clone();
        let router = Router::new().route(
            "/receipt",
            post(move |multipart: Multipart| {
                let recorded = recorded.clone();
                async move {
                    record(&recorded, multipart).await;
                    Json(json!({"status": "success", "data": {"fileLink": "https://files/r1"}}))
                }
            }),
        );
        let base = spawn_service(router).await;

        let link = client(&base, Duration::from_secs(5))
            .upload_receipt(receipt_file("my nota.png"), "AC-01", "Rp 150.000")
            .await
            .unwrap();

        assert_eq!(link, "https://files/r1");

        let fields = fields.lock().unwrap();
        assert!(fields.contains(&("accountSKKO".to_string(), None, "AC-01".to_string())));
        assert!(fields.contains(&("extracted_text".to_string(), None, "Rp 150.000".to_string())));
        assert!(fields
            .iter()
            .any(|(name, file_name, _)| name == "file" && file_name.as_deref() == Some("my_nota.png")));
    }

    #[tokio::test]
    async fn test_receipt_reported_failure() {
        let router = Router::new().route(
            "/receipt",
            post(|| async { Json(json!({"status": "error", "message": "quota"})) }),
        );
        let base = spawn_service(router).await;

        let result = client(&base, Duration::from_secs(5))
            .upload_receipt(receipt_file("a.png"), "AC-01", "")
            .await;

        assert!(matches!(result, Err(UploadError::Rejected { message, .. }) if message == "quota"));
    }

    #[tokio::test]
    async fn test_receipt_bad_status() {
        let router = Router::new().route(
            "/receipt",
            post(|| async { (StatusCode::BAD_GATEWAY, "upstream down") }),
        );
        let base = spawn_service(router).await;

        let result = client(&base, Duration::from_secs(5))
            .upload_receipt(receipt_file("a.png"), "AC-01", "")
            .await;

        assert!(matches!(result, Err(UploadError::BadStatus { status: 502, .. })));
    }

    #[tokio::test]
    async fn test_receipt_without_link() {
        let router = Router::new().route(
            "/receipt",
            post(|| async { Json(json!({"status": "success", "data": {}})) }),
        );
        let base = spawn_service(router).await;

        let result = client(&base, Duration::from_secs(5))
            .upload_receipt(receipt_file("a.png"), "AC-01", "")
            .await;

        assert!(matches!(result, Err(UploadError::MissingLink { .. })));
    }

    #[tokio::test]
    async fn test_receipt_timeout() {
        let router = Router::new().route(
            "/receipt",
            post(|| async {
                tokio::time::sleep(Duration::from_secs(3)).await;
                Json(json!({"status": "success", "data": {"fileLink": "late"}}))
            }),
        );
        let base = spawn_service(router).await;

        let result = client(&base, Duration::from_millis(200))
            .upload_receipt(receipt_file("a.png"), "AC-01", "")
            .await;

        assert!(matches!(result, Err(UploadError::Timeout(UploadTarget::Receipt))));
    }

    #[tokio::test]
    async fn test_evidence_batch_returns_list_links() {
        let fields: Fields = Arc::default();
        let recorded = fields.clone();
        let router = Router::new().route(
            "/evidence",
            post(move |multipart: Multipart| {
                let recorded = recorded.clone();
                async move {
                    record(&recorded, multipart).await;
                    Json(json!({
                        "status": "success",
                        "data": [{"fileLink": "link1"}, {"fileLink": "link2"}]
                    }))
                }
            }),
        );
        let base = spawn_service(router).await;

        let links = client(&base, Duration::from_secs(5))
            .upload_evidence(vec![receipt_file("e1.png"), receipt_file("e2.png")], "AC-01")
            .await
            .unwrap();

        assert_eq!(links, vec!["link1", "link2"]);

        let fields = fields.lock().unwrap();
        let file_parts: Vec<_> = fields.iter().filter(|(name, _, _)| name == "files").collect();
        assert_eq!(file_parts.len(), 2);
        assert!(fields.contains(&("accountSKKO".to_string(), None, "AC-01".to_string())));
    }

    #[tokio::test]
    async fn test_evidence_single_object_response() {
        let router = Router::new().route(
            "/evidence",
            post(|| async { Json(json!({"status": "success", "data": {"fileLink": "only"}})) }),
        );
        let base = spawn_service(router).await;

        let links = client(&base, Duration::from_secs(5))
            .upload_evidence(vec![receipt_file("e1.png")], "AC-01")
            .await
            .unwrap();

        assert_eq!(links, vec!["only"]);
    }

    #[tokio::test]
    async fn test_unreachable_service() {
        // Bind then drop to get a port nobody listens on
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);

        let result = client(&base, Duration::from_secs(2))
            .upload_evidence(vec![receipt_file("e1.png")], "AC-01")
            .await;

        assert!(matches!(
            result,
            Err(UploadError::Transport { target: UploadTarget::Evidence, .. })
                | Err(UploadError::Timeout(UploadTarget::Evidence))
        ));
    }
}
