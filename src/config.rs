//! Configuration types for OCR submission and text search.
//!
//! All submission behaviour is controlled through [`OcrConfig`], built via
//! its [`OcrConfigBuilder`]. Keeping every knob in one struct makes it
//! trivial to share configs across tasks, log them, and diff two runs to
//! understand why their outcomes differ.
//!
//! The retry policy is an explicit value on the config rather than ambient
//! state: tests inject short schedules and scripted transports and get fully
//! deterministic behaviour.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::error::OcrError;
use crate::progress::ProgressCallback;

/// Multipart field name the webhook expects the file under.
pub const DEFAULT_FIELD_NAME: &str = "data";

/// The one content type the pipeline accepts.
pub const DEFAULT_ACCEPTED_TYPE: &str = "application/pdf";

/// Maximum accepted file size: 100 MB.
pub const DEFAULT_MAX_FILE_SIZE: u64 = 100 * 1024 * 1024;

/// Hard per-attempt timeout: 10 minutes. OCR of large scans is slow.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(600);

/// Governs how failed attempts are re-tried.
///
/// `delays[k-1]` is the wait before attempt `k` (1-based), so the first
/// entry must be zero — attempt 1 never waits. Entries after the first must
/// be strictly increasing; [`OcrConfigBuilder::build`] enforces both.
#[derive(Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Default: 4.
    pub max_attempts: u32,

    /// Delay schedule indexed by upcoming attempt number (1-based).
    /// Default: 0 ms, 2 s, 8 s, 30 s.
    pub delays: Vec<Duration>,

    /// Predicate deciding whether a classified error is worth another
    /// attempt. Default: [`OcrError::is_retryable`].
    pub should_retry: Arc<dyn Fn(&OcrError) -> bool + Send + Sync>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            delays: vec![
                Duration::ZERO,
                Duration::from_secs(2),
                Duration::from_secs(8),
                Duration::from_secs(30),
            ],
            should_retry: Arc::new(OcrError::is_retryable),
        }
    }
}

impl fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_attempts", &self.max_attempts)
            .field("delays", &self.delays)
            .field("should_retry", &"<fn>")
            .finish()
    }
}

impl RetryPolicy {
    /// The wait before the given 1-based attempt number.
    ///
    /// Attempt numbers beyond the schedule reuse the last entry.
    pub fn delay_before(&self, attempt: u32) -> Duration {
        if attempt <= 1 || self.delays.is_empty() {
            return Duration::ZERO;
        }
        let idx = ((attempt - 1) as usize).min(self.delays.len() - 1);
        self.delays[idx]
    }

    /// Validate the schedule's ordinal structure.
    pub(crate) fn validate(&self) -> Result<(), OcrError> {
        if self.max_attempts == 0 {
            return Err(OcrError::InvalidConfig(
                "retry policy needs at least one attempt".into(),
            ));
        }
        if self.delays.is_empty() {
            return Err(OcrError::InvalidConfig(
                "retry delay schedule must not be empty".into(),
            ));
        }
        if !self.delays[0].is_zero() {
            return Err(OcrError::InvalidConfig(
                "first retry delay must be zero (attempt 1 never waits)".into(),
            ));
        }
        if self.delays.windows(2).any(|w| w[1] <= w[0]) {
            return Err(OcrError::InvalidConfig(
                "retry delays must be strictly increasing after the first".into(),
            ));
        }
        Ok(())
    }
}

/// Configuration for OCR submission.
///
/// Built via [`OcrConfig::builder`]. Only the webhook URL has no default.
///
/// # Example
/// ```rust
/// use pdf2text::OcrConfig;
/// use std::time::Duration;
///
/// let config = OcrConfig::builder()
///     .webhook_url("https://ocr.example.com/webhook/abc")
///     .request_timeout(Duration::from_secs(120))
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct OcrConfig {
    /// Endpoint receiving the multipart POST.
    pub webhook_url: String,

    /// Multipart field name the file is attached under. Default: `data`.
    pub field_name: String,

    /// The single accepted content type. Default: `application/pdf`.
    pub accepted_type: String,

    /// Maximum accepted file size in bytes. Default: 100 MB.
    pub max_file_size: u64,

    /// Hard per-attempt timeout. Default: 10 minutes.
    pub request_timeout: Duration,

    /// Retry behaviour for transient failures.
    pub retry: RetryPolicy,

    /// Optional progress callback receiving lifecycle events.
    pub progress: Option<ProgressCallback>,
}

impl fmt::Debug for OcrConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OcrConfig")
            .field("webhook_url", &self.webhook_url)
            .field("field_name", &self.field_name)
            .field("accepted_type", &self.accepted_type)
            .field("max_file_size", &self.max_file_size)
            .field("request_timeout", &self.request_timeout)
            .field("retry", &self.retry)
            .field("progress", &self.progress.as_ref().map(|_| "<dyn ProcessingProgress>"))
            .finish()
    }
}

impl OcrConfig {
    /// Create a new builder for `OcrConfig`.
    pub fn builder() -> OcrConfigBuilder {
        OcrConfigBuilder {
            config: OcrConfig {
                webhook_url: String::new(),
                field_name: DEFAULT_FIELD_NAME.to_string(),
                accepted_type: DEFAULT_ACCEPTED_TYPE.to_string(),
                max_file_size: DEFAULT_MAX_FILE_SIZE,
                request_timeout: DEFAULT_REQUEST_TIMEOUT,
                retry: RetryPolicy::default(),
                progress: None,
            },
        }
    }
}

/// Builder for [`OcrConfig`].
#[derive(Debug)]
pub struct OcrConfigBuilder {
    config: OcrConfig,
}

impl OcrConfigBuilder {
    pub fn webhook_url(mut self, url: impl Into<String>) -> Self {
        self.config.webhook_url = url.into();
        self
    }

    pub fn field_name(mut self, name: impl Into<String>) -> Self {
        self.config.field_name = name.into();
        self
    }

    pub fn accepted_type(mut self, mime: impl Into<String>) -> Self {
        self.config.accepted_type = mime.into();
        self
    }

    pub fn max_file_size(mut self, bytes: u64) -> Self {
        self.config.max_file_size = bytes;
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    pub fn retry(mut self, policy: RetryPolicy) -> Self {
        self.config.retry = policy;
        self
    }

    pub fn progress(mut self, callback: ProgressCallback) -> Self {
        self.config.progress = Some(callback);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<OcrConfig, OcrError> {
        let c = &self.config;
        if c.webhook_url.is_empty() {
            return Err(OcrError::InvalidConfig("webhook URL is required".into()));
        }
        if reqwest::Url::parse(&c.webhook_url).is_err() {
            return Err(OcrError::InvalidConfig(format!(
                "webhook URL '{}' is not a valid URL",
                c.webhook_url
            )));
        }
        if c.field_name.is_empty() {
            return Err(OcrError::InvalidConfig(
                "multipart field name must not be empty".into(),
            ));
        }
        if c.max_file_size == 0 {
            return Err(OcrError::InvalidConfig(
                "maximum file size must be ≥ 1 byte".into(),
            ));
        }
        c.retry.validate()?;
        Ok(self.config)
    }
}

/// Configuration for the text search engine.
///
/// Plain struct with [`Default`]; override fields with struct-update syntax.
#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// Quiet period after the last keystroke before matches recompute.
    /// Default: 300 ms.
    pub debounce: Duration,

    /// Hard cap on match-loop iterations per search. Results beyond the cap
    /// are dropped and the state is flagged as truncated. Default: 10 000.
    pub max_iterations: usize,

    /// Compiled-pattern cache bound. Default: 50 entries.
    pub cache_capacity: usize,

    /// Entries evicted beyond the bound in one trim pass. Trimming in
    /// batches amortises cleanup across many inserts. Default: 10.
    pub cache_trim_batch: usize,

    /// Characters of context on each side of a match preview. Default: 20.
    pub preview_context: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(300),
            max_iterations: 10_000,
            cache_capacity: 50,
            cache_trim_batch: 10,
            preview_context: 20,
        }
    }
}
