//! Error types for the pdf2text library.
//!
//! Every failure that can occur while a document is being submitted is mapped
//! into exactly one [`ErrorKind`] before it surfaces, so the retry loop always
//! has a classified error to act on. Unexpected transport failures default to
//! [`ErrorKind::Processing`] (retryable) rather than stalling the loop on an
//! unclassified error.
//!
//! [`OcrError::Cancelled`] stands apart from the taxonomy: a user-initiated
//! abort is a reset, not a failure, and is never retried or displayed as an
//! error.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Classification of a submission failure.
///
/// The kind alone decides retryability: everything except `Validation` is
/// worth another attempt. Validation failures require the caller to change
/// the input, so retrying them would only burn the attempt budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorKind {
    /// Input rejected before or by the service; the user must change it.
    Validation,
    /// Transient connectivity problem.
    Network,
    /// The request (or the upstream service) ran out of time.
    Timeout,
    /// The OCR service itself failed.
    Server,
    /// The service answered but produced unusable output.
    Processing,
}

impl ErrorKind {
    /// Whether failures of this kind are worth retrying.
    pub fn is_retryable(self) -> bool {
        !matches!(self, ErrorKind::Validation)
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::Validation => write!(f, "validation"),
            ErrorKind::Network => write!(f, "network"),
            ErrorKind::Timeout => write!(f, "timeout"),
            ErrorKind::Server => write!(f, "server"),
            ErrorKind::Processing => write!(f, "processing"),
        }
    }
}

/// All errors returned by the pdf2text library.
#[derive(Debug, Clone, Error)]
pub enum OcrError {
    // ── Validation errors (pre-flight, never retried) ─────────────────────
    /// The document has zero bytes.
    #[error("file appears to be empty")]
    EmptyFile,

    /// The document's content type is not the accepted one.
    #[error("unsupported file type '{content_type}': only {accepted} is supported")]
    UnsupportedType {
        content_type: String,
        accepted: String,
    },

    /// The document exceeds the configured size limit.
    #[error(
        "file size ({}) exceeds the maximum of {}",
        format_file_size(*.size),
        format_file_size(*.limit)
    )]
    TooLarge { size: u64, limit: u64 },

    // ── HTTP errors ───────────────────────────────────────────────────────
    /// The webhook rejected the request (4xx other than 408/429).
    #[error("client error (HTTP {status})")]
    ClientError { status: u16 },

    /// The webhook itself gave up waiting (HTTP 408). Retryable.
    #[error("OCR service timed out upstream (HTTP 408)")]
    UpstreamTimeout,

    /// The webhook asked us to back off (HTTP 429). Retryable.
    ///
    /// `retry_after_secs` carries a server-specified delay when the
    /// `Retry-After` header was present; the schedule applies otherwise.
    #[error("rate limited by OCR service")]
    RateLimited { retry_after_secs: Option<u64> },

    /// The webhook failed (5xx). Retryable.
    #[error("server error (HTTP {status})")]
    ServerError { status: u16 },

    /// A non-success status outside the 4xx/5xx ranges.
    #[error("unexpected HTTP status {status}")]
    UnexpectedStatus { status: u16 },

    // ── Transport errors ──────────────────────────────────────────────────
    /// Connection-level failure before a response arrived.
    #[error("network error: {0}")]
    Network(String),

    /// The request exceeded the configured hard timeout.
    #[error("request timed out after {secs}s")]
    Timeout { secs: u64 },

    // ── Processing errors ─────────────────────────────────────────────────
    /// The service answered 2xx with an empty body.
    #[error("empty response from OCR service")]
    EmptyResponse,

    /// Catch-all for unclassified failures during submission.
    #[error("OCR processing failed: {0}")]
    Processing(String),

    // ── Non-failure outcomes ──────────────────────────────────────────────
    /// The submission was cancelled by the caller.
    #[error("submission cancelled")]
    Cancelled,

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl OcrError {
    /// The taxonomy kind of this error.
    ///
    /// `None` for [`OcrError::Cancelled`] and [`OcrError::InvalidConfig`],
    /// which are not submission failures.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            OcrError::EmptyFile
            | OcrError::UnsupportedType { .. }
            | OcrError::TooLarge { .. }
            | OcrError::ClientError { .. } => Some(ErrorKind::Validation),
            OcrError::Network(_) | OcrError::UnexpectedStatus { .. } => Some(ErrorKind::Network),
            OcrError::Timeout { .. } | OcrError::UpstreamTimeout => Some(ErrorKind::Timeout),
            OcrError::ServerError { .. } | OcrError::RateLimited { .. } => Some(ErrorKind::Server),
            OcrError::EmptyResponse | OcrError::Processing(_) => Some(ErrorKind::Processing),
            OcrError::Cancelled | OcrError::InvalidConfig(_) => None,
        }
    }

    /// Whether this error is worth another attempt.
    pub fn is_retryable(&self) -> bool {
        self.kind().is_some_and(ErrorKind::is_retryable)
    }

    /// The HTTP status carried by this error, when one exists.
    pub fn status(&self) -> Option<u16> {
        match self {
            OcrError::ClientError { status }
            | OcrError::ServerError { status }
            | OcrError::UnexpectedStatus { status } => Some(*status),
            OcrError::UpstreamTimeout => Some(408),
            OcrError::RateLimited { .. } => Some(429),
            _ => None,
        }
    }

    /// A message suitable for end users.
    ///
    /// Validation messages are specific enough to show verbatim; the other
    /// kinds get a stable, friendlier phrasing than the raw transport error.
    pub fn user_message(&self) -> String {
        match self.kind() {
            Some(ErrorKind::Validation) => self.to_string(),
            Some(ErrorKind::Network) => {
                "Network connection error. Please check your internet connection and try again."
                    .to_string()
            }
            Some(ErrorKind::Timeout) => {
                "Processing timed out. Large files may take longer to process. Please try again."
                    .to_string()
            }
            Some(ErrorKind::Server) => {
                "Server error occurred. Please try again in a few minutes.".to_string()
            }
            Some(ErrorKind::Processing) => {
                "OCR processing failed. Please ensure your PDF is not corrupted and try again."
                    .to_string()
            }
            None => self.to_string(),
        }
    }

    /// Short actionable suggestions matching this error, for display
    /// alongside [`OcrError::user_message`].
    pub fn suggestions(&self) -> Vec<&'static str> {
        match self {
            OcrError::EmptyFile | OcrError::UnsupportedType { .. } => vec![
                "Please select a valid PDF file",
                "Ensure the file is not corrupted",
            ],
            OcrError::TooLarge { .. } => vec![
                "Reduce file size to under the limit",
                "Consider compressing the PDF",
            ],
            _ => match self.kind() {
                Some(ErrorKind::Network) => vec![
                    "Check your internet connection",
                    "Try again in a few moments",
                ],
                Some(ErrorKind::Timeout) => vec![
                    "Large files may take longer to process",
                    "Consider breaking large documents into smaller files",
                ],
                Some(ErrorKind::Server) => vec![
                    "Wait a few minutes and try again",
                    "Contact support if the problem persists",
                ],
                Some(ErrorKind::Processing) => vec![
                    "Ensure your PDF is not password-protected",
                    "Check if the PDF contains readable text or images",
                ],
                _ => vec![],
            },
        }
    }
}

/// Format a byte count for human display: `0 B`, `1.5 KB`, `98.2 MB`, …
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    if bytes == 0 {
        return "0 B".to_string();
    }
    let exp = (bytes.ilog2() / 10).min(UNITS.len() as u32 - 1);
    let value = bytes as f64 / 1024f64.powi(exp as i32);
    if exp == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.1} {}", value, UNITS[exp as usize])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_errors_are_not_retryable() {
        for err in [
            OcrError::EmptyFile,
            OcrError::UnsupportedType {
                content_type: "image/png".into(),
                accepted: "application/pdf".into(),
            },
            OcrError::TooLarge {
                size: 200,
                limit: 100,
            },
            OcrError::ClientError { status: 404 },
        ] {
            assert_eq!(err.kind(), Some(ErrorKind::Validation), "{err}");
            assert!(!err.is_retryable(), "{err}");
        }
    }

    #[test]
    fn transient_errors_are_retryable() {
        for err in [
            OcrError::Network("connection reset".into()),
            OcrError::Timeout { secs: 600 },
            OcrError::UpstreamTimeout,
            OcrError::ServerError { status: 503 },
            OcrError::RateLimited {
                retry_after_secs: Some(30),
            },
            OcrError::UnexpectedStatus { status: 302 },
            OcrError::EmptyResponse,
            OcrError::Processing("unknown".into()),
        ] {
            assert!(err.is_retryable(), "{err}");
        }
    }

    #[test]
    fn cancelled_is_outside_the_taxonomy() {
        let err = OcrError::Cancelled;
        assert_eq!(err.kind(), None);
        assert!(!err.is_retryable());
    }

    #[test]
    fn kind_mapping_matches_taxonomy() {
        assert_eq!(
            OcrError::ServerError { status: 500 }.kind(),
            Some(ErrorKind::Server)
        );
        assert_eq!(
            OcrError::RateLimited {
                retry_after_secs: None
            }
            .kind(),
            Some(ErrorKind::Server)
        );
        assert_eq!(OcrError::UpstreamTimeout.kind(), Some(ErrorKind::Timeout));
        assert_eq!(
            OcrError::UnexpectedStatus { status: 302 }.kind(),
            Some(ErrorKind::Network)
        );
        assert_eq!(OcrError::EmptyResponse.kind(), Some(ErrorKind::Processing));
    }

    #[test]
    fn empty_file_message_mentions_emptiness() {
        assert!(OcrError::EmptyFile.to_string().contains("empty"));
    }

    #[test]
    fn too_large_message_is_human_readable() {
        let err = OcrError::TooLarge {
            size: 150 * 1024 * 1024,
            limit: 100 * 1024 * 1024,
        };
        let msg = err.to_string();
        assert!(msg.contains("150.0 MB"), "got: {msg}");
        assert!(msg.contains("100.0 MB"), "got: {msg}");
    }

    #[test]
    fn status_accessor() {
        assert_eq!(OcrError::ClientError { status: 404 }.status(), Some(404));
        assert_eq!(OcrError::UpstreamTimeout.status(), Some(408));
        assert_eq!(
            OcrError::RateLimited {
                retry_after_secs: None
            }
            .status(),
            Some(429)
        );
        assert_eq!(OcrError::Timeout { secs: 600 }.status(), None);
    }

    #[test]
    fn user_message_is_stable_for_transient_kinds() {
        let msg = OcrError::Network("tls handshake eof".into()).user_message();
        assert!(msg.contains("connection"), "got: {msg}");
        assert!(!msg.contains("tls"), "raw detail leaked: {msg}");
    }

    #[test]
    fn format_file_size_units() {
        assert_eq!(format_file_size(0), "0 B");
        assert_eq!(format_file_size(512), "512 B");
        assert_eq!(format_file_size(1536), "1.5 KB");
        assert_eq!(format_file_size(100 * 1024 * 1024), "100.0 MB");
        assert_eq!(format_file_size(3 * 1024 * 1024 * 1024), "3.0 GB");
    }
}
