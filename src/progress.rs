//! Progress-callback trait for submission lifecycle events.
//!
//! Inject an `Arc<dyn ProcessingProgress>` via
//! [`crate::config::OcrConfigBuilder::progress`] to receive events as the
//! pipeline moves through its states. Callbacks are the least-invasive
//! integration point: hosts can forward events to a channel, a WebSocket, or
//! a terminal spinner without the library knowing how they communicate.

use std::sync::Arc;
use std::time::Duration;

use crate::error::OcrError;
use crate::pipeline::state::Status;

/// Called by the pipeline as a submission progresses.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Implementations must be `Send + Sync`; events for
/// one submission always arrive in order.
pub trait ProcessingProgress: Send + Sync {
    /// Called whenever `status` changes.
    fn on_status_change(&self, status: Status) {
        let _ = status;
    }

    /// Called whenever the progress percentage changes.
    fn on_progress(&self, percent: u8) {
        let _ = percent;
    }

    /// Called when a failed attempt schedules a retry.
    ///
    /// # Arguments
    /// * `attempt` — 1-based number of the upcoming attempt
    /// * `delay`   — wait before that attempt starts
    fn on_retry_scheduled(&self, attempt: u32, delay: Duration) {
        let _ = (attempt, delay);
    }

    /// Called once when extraction completes.
    fn on_complete(&self, text_len: usize) {
        let _ = text_len;
    }

    /// Called once when the submission ends in a terminal error.
    fn on_error(&self, error: &OcrError) {
        let _ = error;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgress;

impl ProcessingProgress for NoopProgress {}

/// Convenience alias matching the type stored in [`crate::config::OcrConfig`].
pub type ProgressCallback = Arc<dyn ProcessingProgress>;
