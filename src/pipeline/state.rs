//! Observable state of one submission.
//!
//! The pipeline owns exactly one live [`ProcessingState`] per in-flight or
//! completed request and publishes a fresh snapshot on every change. The
//! struct is a value type: snapshots are cheap to clone (the document is
//! behind an `Arc`) and safe to hold across further transitions.
//!
//! State-machine shape:
//!
//! ```text
//! idle ──▶ uploading ──▶ processing ──▶ completed
//!             ▲              │
//!             │   failure    ▼
//!             └───retry─── error ──▶ (terminal, or next attempt)
//! ```
//!
//! Any non-idle state returns to `idle` on cancel/reset.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::document::Document;
use crate::error::OcrError;

/// Lifecycle phase of a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// No submission active.
    #[default]
    Idle,
    /// The request body is being sent.
    Uploading,
    /// The webhook is working on the document.
    Processing,
    /// Extraction finished; the result is available.
    Completed,
    /// The last attempt failed (possibly awaiting an automatic retry).
    Error,
}

impl Status {
    /// Whether work is in flight (upload or remote processing).
    pub fn is_busy(self) -> bool {
        matches!(self, Status::Uploading | Status::Processing)
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Status::Idle => write!(f, "idle"),
            Status::Uploading => write!(f, "uploading"),
            Status::Processing => write!(f, "processing"),
            Status::Completed => write!(f, "completed"),
            Status::Error => write!(f, "error"),
        }
    }
}

/// Retry bookkeeping, present only while retries are possible or pending.
///
/// Created on the first failure, updated on each subsequent one, discarded
/// on success or terminal failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryState {
    /// 1-based number of the upcoming attempt.
    pub attempt: u32,

    /// Wait before that attempt starts; zero once the attempt is running.
    pub next_retry_in: Duration,

    /// Whether another attempt is still allowed.
    pub can_retry: bool,

    /// True while the wait or the re-attempt itself is active.
    pub is_retrying: bool,
}

impl RetryState {
    /// Button-style label for host UIs.
    pub fn label(&self, max_attempts: u32) -> String {
        if self.is_retrying {
            "Retrying…".to_string()
        } else if !self.next_retry_in.is_zero() {
            let secs = self.next_retry_in.as_millis().div_ceil(1000);
            format!("Retry in {secs}s")
        } else {
            format!("Retry ({}/{})", self.attempt, max_attempts)
        }
    }
}

/// Snapshot of a submission's observable state.
///
/// Invariant: `result` is non-null iff `status == Completed`, and `error` is
/// non-null iff `status == Error`; never both.
#[derive(Debug, Clone, Default)]
pub struct ProcessingState {
    pub status: Status,

    /// 0–100, non-decreasing within a single attempt; 0 after reset.
    pub progress: u8,

    /// The submitted input; set at request start, cleared on reset.
    pub file: Option<Arc<Document>>,

    /// Extracted text, present only when completed.
    pub result: Option<String>,

    /// Last failure, present only when in error.
    pub error: Option<OcrError>,

    /// Present only while retries are possible or pending.
    pub retry: Option<RetryState>,

    /// Whether `cancel` is a legal operation right now.
    pub can_cancel: bool,

    /// Whether a retry (automatic or manual) can still happen.
    pub can_retry: bool,
}

impl ProcessingState {
    /// The state of a pipeline with no submission active.
    pub fn idle() -> Self {
        Self::default()
    }

    pub fn is_busy(&self) -> bool {
        self.status.is_busy()
    }

    pub fn is_complete(&self) -> bool {
        self.status == Status::Completed
    }

    pub fn has_error(&self) -> bool {
        self.status == Status::Error
    }

    /// User-facing message for the current error, if any.
    pub fn error_message(&self) -> Option<String> {
        self.error.as_ref().map(OcrError::user_message)
    }

    /// Check the result/error exclusivity invariant. Used by tests.
    #[cfg(test)]
    pub(crate) fn holds_invariant(&self) -> bool {
        match self.status {
            Status::Completed => self.result.is_some() && self.error.is_none(),
            Status::Error => self.error.is_some() && self.result.is_none(),
            _ => self.result.is_none() && self.error.is_none(),
        }
    }
}
