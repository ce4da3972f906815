//! Webhook transport: one multipart POST per attempt.
//!
//! The [`OcrTransport`] trait is the seam between the retry loop and the
//! network. The default [`WebhookTransport`] speaks HTTP via `reqwest`;
//! tests inject scripted implementations to exercise the processor without
//! a server.
//!
//! Every failure leaving this module is classified into the error taxonomy
//! — status ranges, timeouts, connection faults, and empty bodies each map
//! to exactly one [`crate::error::ErrorKind`], and anything unrecognised
//! defaults to `processing` (retryable) so the retry loop never stalls on
//! an unclassified error.

use async_trait::async_trait;
use reqwest::header::RETRY_AFTER;
use reqwest::multipart::{Form, Part};
use reqwest::StatusCode;
use tracing::{debug, warn};

use crate::config::OcrConfig;
use crate::document::Document;
use crate::error::OcrError;

/// A single submission attempt, transport-agnostic.
#[async_trait]
pub trait OcrTransport: Send + Sync {
    /// Submit the document once and return the extracted text, trimmed.
    ///
    /// Implementations classify every failure; they never retry internally —
    /// the processor owns the retry loop.
    async fn submit(&self, doc: &Document, config: &OcrConfig) -> Result<String, OcrError>;
}

/// The production transport: multipart POST to the configured webhook.
#[derive(Debug, Clone)]
pub struct WebhookTransport {
    client: reqwest::Client,
}

impl WebhookTransport {
    /// Build a transport whose client enforces the config's hard timeout.
    pub fn new(config: &OcrConfig) -> Result<Self, OcrError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| OcrError::Network(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl OcrTransport for WebhookTransport {
    async fn submit(&self, doc: &Document, config: &OcrConfig) -> Result<String, OcrError> {
        let part = Part::bytes(doc.as_bytes().to_vec())
            .file_name(doc.name().to_string())
            .mime_str(doc.content_type())
            .map_err(|e| OcrError::Processing(format!("invalid content type: {e}")))?;
        let form = Form::new().part(config.field_name.clone(), part);

        debug!(
            "POST {} ({} bytes as '{}')",
            config.webhook_url,
            doc.len(),
            config.field_name
        );

        let response = self
            .client
            .post(&config.webhook_url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| map_reqwest_error(e, config))?;

        let status = response.status();
        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok());

        if let Some(err) = classify_status(status, retry_after) {
            warn!("webhook answered {status}: {err}");
            return Err(err);
        }

        let text = response
            .text()
            .await
            .map_err(|e| map_reqwest_error(e, config))?;

        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(OcrError::EmptyResponse);
        }

        debug!("webhook returned {} bytes of text", trimmed.len());
        Ok(trimmed.to_string())
    }
}

/// Map a non-success status to a classified error; `None` for 2xx.
///
/// 408 and 429 are carved out of the generic client-error rule: both signal
/// transient upstream conditions and are retryable, unlike the rest of the
/// 4xx range.
pub(crate) fn classify_status(status: StatusCode, retry_after: Option<u64>) -> Option<OcrError> {
    if status.is_success() {
        return None;
    }
    Some(match status {
        StatusCode::REQUEST_TIMEOUT => OcrError::UpstreamTimeout,
        StatusCode::TOO_MANY_REQUESTS => OcrError::RateLimited {
            retry_after_secs: retry_after,
        },
        s if s.is_client_error() => OcrError::ClientError { status: s.as_u16() },
        s if s.is_server_error() => OcrError::ServerError { status: s.as_u16() },
        s => OcrError::UnexpectedStatus { status: s.as_u16() },
    })
}

/// Map a reqwest-level failure into the taxonomy.
fn map_reqwest_error(err: reqwest::Error, config: &OcrConfig) -> OcrError {
    if err.is_timeout() {
        return OcrError::Timeout {
            secs: config.request_timeout.as_secs(),
        };
    }
    if err.is_connect() || err.is_request() {
        return OcrError::Network(err.to_string());
    }
    OcrError::Processing(err.to_string())
}
