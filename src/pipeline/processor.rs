//! The submission processor: validation, attempt loop, retry timers,
//! cancellation.
//!
//! One [`OcrProcessor`] owns the full lifecycle of one submission at a time.
//! Issuing a new submission cancels any prior in-flight one — never silent
//! overlap. At most one transport request and one pending retry timer exist
//! per processor at any moment.
//!
//! ## Cancellation semantics
//!
//! [`OcrProcessor::cancel`] resets the published state to idle
//! *synchronously* and invalidates the in-flight submission's generation.
//! Every state write is generation-checked under the same lock, so a
//! superseded submission can never publish again — there is no window for a
//! late transition after `cancel` returns. The transport request itself is
//! aborted cooperatively when the driving future observes the token (or is
//! dropped).

use std::sync::{Arc, Mutex};

use tokio::sync::{watch, Notify};
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::OcrConfig;
use crate::document::Document;
use crate::error::OcrError;
use crate::pipeline::state::{ProcessingState, RetryState, Status};
use crate::pipeline::transport::{OcrTransport, WebhookTransport};
use crate::pipeline::validate;
use crate::progress::ProgressCallback;

/// Drives OCR submissions against a webhook with bounded retries.
///
/// Cheap to clone; clones share state, so one clone can drive
/// [`submit`](OcrProcessor::submit) while another observes or cancels.
#[derive(Clone)]
pub struct OcrProcessor {
    config: Arc<OcrConfig>,
    transport: Arc<dyn OcrTransport>,
    shared: Arc<Shared>,
}

struct Shared {
    state: watch::Sender<ProcessingState>,
    ctrl: Mutex<Ctrl>,
}

/// Per-submission control handles, replaced by [`Shared::begin`].
struct Ctrl {
    /// Incremented on every new submission and on cancel; writes tagged
    /// with an older generation are discarded.
    generation: u64,
    cancel: CancellationToken,
    retry_now: Arc<Notify>,
}

impl Shared {
    /// Start a new submission: cancel any prior one, mint fresh handles.
    fn begin(&self) -> (u64, CancellationToken, Arc<Notify>) {
        let mut ctrl = self.ctrl.lock().unwrap();
        ctrl.cancel.cancel();
        ctrl.generation += 1;
        ctrl.cancel = CancellationToken::new();
        ctrl.retry_now = Arc::new(Notify::new());
        (ctrl.generation, ctrl.cancel.clone(), ctrl.retry_now.clone())
    }

    /// Publish a snapshot if `gen` is still current. Returns false when the
    /// submission has been superseded and must stop.
    fn publish(&self, gen: u64, state: ProcessingState) -> bool {
        let ctrl = self.ctrl.lock().unwrap();
        if ctrl.generation != gen {
            return false;
        }
        self.state.send_replace(state);
        true
    }
}

impl OcrProcessor {
    /// Create a processor with the default HTTP transport.
    pub fn new(config: OcrConfig) -> Result<Self, OcrError> {
        let transport = Arc::new(WebhookTransport::new(&config)?);
        Ok(Self::with_transport(config, transport))
    }

    /// Create a processor with an injected transport (used by tests and by
    /// hosts that need custom middleware).
    pub fn with_transport(config: OcrConfig, transport: Arc<dyn OcrTransport>) -> Self {
        let (state, _) = watch::channel(ProcessingState::idle());
        Self {
            config: Arc::new(config),
            transport,
            shared: Arc::new(Shared {
                state,
                ctrl: Mutex::new(Ctrl {
                    generation: 0,
                    cancel: CancellationToken::new(),
                    retry_now: Arc::new(Notify::new()),
                }),
            }),
        }
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> ProcessingState {
        self.shared.state.borrow().clone()
    }

    /// Subscribe to state changes.
    pub fn subscribe(&self) -> watch::Receiver<ProcessingState> {
        self.shared.state.subscribe()
    }

    /// Submit a document and drive it to a terminal state.
    ///
    /// Ends in `Completed` with the extracted text, or `Error` with the last
    /// classified failure. Returns [`OcrError::Cancelled`] when the
    /// submission is cancelled or superseded by a newer one; the published
    /// state is then whatever the superseding operation set (idle after
    /// [`cancel`](OcrProcessor::cancel)).
    pub async fn submit(&self, doc: Document) -> Result<String, OcrError> {
        let (gen, cancel, retry_now) = self.shared.begin();
        let doc = Arc::new(doc);
        let mut events = EventTracker::new(self.config.progress.clone());
        info!("submitting '{}' ({} bytes)", doc.name(), doc.len());

        // The file is visible from the first snapshot so hosts can show
        // what was submitted even when validation rejects it.
        let base = ProcessingState {
            status: Status::Uploading,
            progress: 0,
            file: Some(Arc::clone(&doc)),
            can_cancel: true,
            ..ProcessingState::idle()
        };
        if !self.publish(gen, &mut events, base.clone()) {
            return Err(OcrError::Cancelled);
        }

        // ── Pre-flight validation: fails fast, never retried ─────────────
        if let Err(err) = validate::preflight(&doc, &self.config) {
            warn!("pre-flight validation failed: {err}");
            if self.publish(
                gen,
                &mut events,
                ProcessingState {
                    status: Status::Error,
                    error: Some(err.clone()),
                    can_cancel: false,
                    ..base.clone()
                },
            ) {
                events.error(&err);
            }
            return Err(err);
        }

        if !self.publish(
            gen,
            &mut events,
            ProcessingState {
                progress: 10,
                ..base.clone()
            },
        ) {
            return Err(OcrError::Cancelled);
        }
        if !self.publish(
            gen,
            &mut events,
            ProcessingState {
                status: Status::Processing,
                progress: 20,
                ..base.clone()
            },
        ) {
            return Err(OcrError::Cancelled);
        }

        // ── Attempt loop ─────────────────────────────────────────────────
        let policy = &self.config.retry;
        let mut attempts_done: u32 = 0;
        loop {
            attempts_done += 1;
            debug!("attempt {attempts_done}/{}", policy.max_attempts);

            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debug!("cancelled during attempt {attempts_done}");
                    return Err(OcrError::Cancelled);
                }
                res = self.transport.submit(&doc, &self.config) => res,
            };

            let err = match outcome {
                Ok(text) => {
                    if !self.publish(
                        gen,
                        &mut events,
                        ProcessingState {
                            status: Status::Completed,
                            progress: 100,
                            result: Some(text.clone()),
                            can_cancel: false,
                            ..base.clone()
                        },
                    ) {
                        return Err(OcrError::Cancelled);
                    }
                    events.complete(text.len());
                    info!("completed after {attempts_done} attempt(s)");
                    return Ok(text);
                }
                Err(err) => err,
            };

            warn!("attempt {attempts_done} failed: {err}");
            let retryable = (policy.should_retry)(&err);
            if !retryable || attempts_done >= policy.max_attempts {
                if self.publish(
                    gen,
                    &mut events,
                    ProcessingState {
                        status: Status::Error,
                        progress: attempt_progress(attempts_done),
                        error: Some(err.clone()),
                        can_cancel: false,
                        ..base.clone()
                    },
                ) {
                    events.error(&err);
                }
                return Err(err);
            }

            // ── Waiting sub-state: retry scheduled ───────────────────────
            let upcoming = attempts_done + 1;
            let delay = policy.delay_before(upcoming);
            let progress = attempt_progress(attempts_done);
            if !self.publish(
                gen,
                &mut events,
                ProcessingState {
                    status: Status::Error,
                    progress,
                    error: Some(err),
                    retry: Some(RetryState {
                        attempt: upcoming,
                        next_retry_in: delay,
                        can_retry: true,
                        is_retrying: false,
                    }),
                    can_retry: true,
                    ..base.clone()
                },
            ) {
                return Err(OcrError::Cancelled);
            }
            events.retry(upcoming, delay);

            if !delay.is_zero() {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        debug!("cancelled while waiting for retry {upcoming}");
                        return Err(OcrError::Cancelled);
                    }
                    _ = retry_now.notified() => {
                        debug!("manual retry; skipping remaining delay");
                    }
                    _ = sleep(delay) => {}
                }
            }

            // Re-attempt: error → uploading → processing.
            let retrying = Some(RetryState {
                attempt: upcoming,
                next_retry_in: std::time::Duration::ZERO,
                can_retry: true,
                is_retrying: true,
            });
            if !self.publish(
                gen,
                &mut events,
                ProcessingState {
                    status: Status::Uploading,
                    progress,
                    retry: retrying.clone(),
                    can_retry: true,
                    ..base.clone()
                },
            ) {
                return Err(OcrError::Cancelled);
            }
            if !self.publish(
                gen,
                &mut events,
                ProcessingState {
                    status: Status::Processing,
                    progress,
                    retry: retrying,
                    can_retry: true,
                    ..base.clone()
                },
            ) {
                return Err(OcrError::Cancelled);
            }
        }
    }

    /// Fire the next scheduled attempt immediately, superseding the pending
    /// retry delay. No-op when no retry is waiting.
    pub fn retry_now(&self) {
        let ctrl = self.shared.ctrl.lock().unwrap();
        ctrl.retry_now.notify_one();
    }

    /// Abort any in-flight work and reset to idle, synchronously.
    ///
    /// Clears the pending retry timer (if any); no state transition from the
    /// cancelled submission can be observed after this returns.
    pub fn cancel(&self) {
        let prev = self.shared.state.borrow().status;
        {
            let mut ctrl = self.shared.ctrl.lock().unwrap();
            ctrl.cancel.cancel();
            ctrl.generation += 1;
            self.shared.state.send_replace(ProcessingState::idle());
        }
        info!("submission cancelled; state reset to idle");
        if prev != Status::Idle {
            if let Some(cb) = &self.config.progress {
                cb.on_status_change(Status::Idle);
                cb.on_progress(0);
            }
        }
    }

    /// Alias for [`cancel`](OcrProcessor::cancel): clear any outcome and
    /// return to idle.
    pub fn reset(&self) {
        self.cancel();
    }

    fn publish(&self, gen: u64, events: &mut EventTracker, state: ProcessingState) -> bool {
        let applied = self.shared.publish(gen, state.clone());
        if applied {
            events.observe(&state);
        }
        applied
    }
}

/// Progress within the processing phase creeps up with each retry so the UI
/// shows movement, capped well below completion.
fn attempt_progress(attempts_done: u32) -> u8 {
    (20 + attempts_done * 10).min(90) as u8
}

/// Diffs consecutive snapshots and forwards changes to the callback.
struct EventTracker {
    callback: Option<ProgressCallback>,
    last_status: Status,
    last_progress: u8,
}

impl EventTracker {
    fn new(callback: Option<ProgressCallback>) -> Self {
        Self {
            callback,
            last_status: Status::Idle,
            last_progress: 0,
        }
    }

    fn observe(&mut self, state: &ProcessingState) {
        let Some(cb) = &self.callback else { return };
        if state.status != self.last_status {
            self.last_status = state.status;
            cb.on_status_change(state.status);
        }
        if state.progress != self.last_progress {
            self.last_progress = state.progress;
            cb.on_progress(state.progress);
        }
    }

    fn retry(&self, attempt: u32, delay: std::time::Duration) {
        if let Some(cb) = &self.callback {
            cb.on_retry_scheduled(attempt, delay);
        }
    }

    fn complete(&self, text_len: usize) {
        if let Some(cb) = &self.callback {
            cb.on_complete(text_len);
        }
    }

    fn error(&self, err: &OcrError) {
        if let Some(cb) = &self.callback {
            cb.on_error(err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RetryPolicy;
    use crate::error::ErrorKind;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Transport returning a scripted sequence of outcomes.
    struct ScriptedTransport {
        script: Mutex<Vec<Result<String, OcrError>>>,
        calls: AtomicUsize,
        per_call_delay: Duration,
    }

    impl ScriptedTransport {
        fn new(script: Vec<Result<String, OcrError>>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script),
                calls: AtomicUsize::new(0),
                per_call_delay: Duration::ZERO,
            })
        }

        fn slow(script: Vec<Result<String, OcrError>>, per_call_delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script),
                calls: AtomicUsize::new(0),
                per_call_delay,
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl OcrTransport for ScriptedTransport {
        async fn submit(&self, _doc: &Document, _config: &OcrConfig) -> Result<String, OcrError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.per_call_delay.is_zero() {
                sleep(self.per_call_delay).await;
            }
            let mut script = self.script.lock().unwrap();
            if script.is_empty() {
                return Err(OcrError::Processing("script exhausted".into()));
            }
            script.remove(0)
        }
    }

    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            delays: vec![
                Duration::ZERO,
                Duration::from_millis(5),
                Duration::from_millis(10),
                Duration::from_millis(15),
            ],
            ..RetryPolicy::default()
        }
    }

    fn config_with(policy: RetryPolicy) -> OcrConfig {
        OcrConfig::builder()
            .webhook_url("https://ocr.example.com/webhook/abc")
            .retry(policy)
            .build()
            .expect("valid config")
    }

    fn pdf(bytes: &[u8]) -> Document {
        Document::from_bytes("scan.pdf", "application/pdf", bytes.to_vec())
    }

    fn server_error() -> OcrError {
        OcrError::ServerError { status: 503 }
    }

    #[tokio::test]
    async fn validation_failure_makes_no_transport_call() {
        let transport = ScriptedTransport::new(vec![Ok("never".into())]);
        let processor =
            OcrProcessor::with_transport(config_with(fast_policy()), transport.clone());

        let err = processor.submit(pdf(b"")).await.unwrap_err();
        assert!(matches!(err, OcrError::EmptyFile));
        assert_eq!(transport.calls(), 0);

        let state = processor.state();
        assert_eq!(state.status, Status::Error);
        assert!(!state.can_retry);
        assert!(state.retry.is_none());
        assert!(state.holds_invariant());
    }

    #[tokio::test]
    async fn transient_failures_retry_until_success() {
        let transport = ScriptedTransport::new(vec![
            Err(server_error()),
            Err(server_error()),
            Err(server_error()),
            Ok("extracted text".into()),
        ]);
        let processor =
            OcrProcessor::with_transport(config_with(fast_policy()), transport.clone());

        let text = processor.submit(pdf(b"%PDF-1.7")).await.expect("success");
        assert_eq!(text, "extracted text");
        assert_eq!(transport.calls(), 4);

        let state = processor.state();
        assert_eq!(state.status, Status::Completed);
        assert_eq!(state.progress, 100);
        assert_eq!(state.result.as_deref(), Some("extracted text"));
        assert!(state.retry.is_none());
        assert!(state.holds_invariant());
    }

    #[tokio::test(start_paused = true)]
    async fn delays_follow_the_configured_schedule() {
        let transport = ScriptedTransport::new(vec![
            Err(server_error()),
            Err(server_error()),
            Err(server_error()),
            Ok("ok".into()),
        ]);
        let processor =
            OcrProcessor::with_transport(config_with(RetryPolicy::default()), transport);

        let start = tokio::time::Instant::now();
        processor.submit(pdf(b"%PDF-1.7")).await.expect("success");

        // Waits before attempts 2, 3, and 4: 2 s + 8 s + 30 s.
        assert_eq!(start.elapsed(), Duration::from_secs(40));
    }

    #[tokio::test]
    async fn client_errors_stop_after_one_attempt() {
        let transport = ScriptedTransport::new(vec![
            Err(OcrError::ClientError { status: 404 }),
            Ok("never".into()),
        ]);
        let processor =
            OcrProcessor::with_transport(config_with(fast_policy()), transport.clone());

        let err = processor.submit(pdf(b"%PDF-1.7")).await.unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::Validation));
        assert_eq!(transport.calls(), 1);

        let state = processor.state();
        assert_eq!(state.status, Status::Error);
        assert!(!state.can_retry);
    }

    #[tokio::test]
    async fn exhaustion_ends_in_terminal_error() {
        let transport = ScriptedTransport::new(vec![
            Err(server_error()),
            Err(server_error()),
            Err(server_error()),
            Err(server_error()),
        ]);
        let processor =
            OcrProcessor::with_transport(config_with(fast_policy()), transport.clone());

        let err = processor.submit(pdf(b"%PDF-1.7")).await.unwrap_err();
        assert!(matches!(err, OcrError::ServerError { status: 503 }));
        assert_eq!(transport.calls(), 4);

        let state = processor.state();
        assert_eq!(state.status, Status::Error);
        assert!(!state.can_retry, "attempt budget exhausted");
        assert!(state.retry.is_none(), "retry state discarded on terminal failure");
        assert!(state.holds_invariant());
    }

    #[tokio::test]
    async fn first_failure_schedules_the_second_delay() {
        struct Recorder {
            scheduled: Mutex<Vec<(u32, Duration)>>,
        }
        impl crate::progress::ProcessingProgress for Recorder {
            fn on_retry_scheduled(&self, attempt: u32, delay: Duration) {
                self.scheduled.lock().unwrap().push((attempt, delay));
            }
        }

        let recorder = Arc::new(Recorder {
            scheduled: Mutex::new(Vec::new()),
        });
        let config = OcrConfig::builder()
            .webhook_url("https://ocr.example.com/webhook/abc")
            .retry(fast_policy())
            .progress(recorder.clone())
            .build()
            .expect("valid config");

        let transport = ScriptedTransport::new(vec![
            Err(OcrError::Timeout { secs: 600 }),
            Ok("ok".into()),
        ]);
        OcrProcessor::with_transport(config, transport)
            .submit(pdf(b"%PDF-1.7"))
            .await
            .expect("success");

        let scheduled = recorder.scheduled.lock().unwrap();
        assert_eq!(
            *scheduled,
            vec![(2, Duration::from_millis(5))],
            "next_retry_in is the schedule's second entry"
        );
    }

    #[tokio::test]
    async fn cancel_resets_to_idle_with_no_late_transition() {
        let transport = ScriptedTransport::slow(
            vec![Ok("too late".into())],
            Duration::from_millis(200),
        );
        let processor = OcrProcessor::with_transport(config_with(fast_policy()), transport);

        let driver = processor.clone();
        let handle = tokio::spawn(async move { driver.submit(pdf(b"%PDF-1.7")).await });

        let mut rx = processor.subscribe();
        rx.wait_for(|s| s.status == Status::Processing)
            .await
            .expect("reaches processing");

        processor.cancel();

        let state = processor.state();
        assert_eq!(state.status, Status::Idle);
        assert!(state.file.is_none());
        assert!(state.result.is_none());
        assert!(state.retry.is_none());

        assert!(matches!(handle.await.unwrap(), Err(OcrError::Cancelled)));

        // The transport's response lands after cancel; it must not surface.
        sleep(Duration::from_millis(300)).await;
        assert_eq!(processor.state().status, Status::Idle);
    }

    #[tokio::test]
    async fn cancel_clears_a_pending_retry_timer() {
        let policy = RetryPolicy {
            delays: vec![Duration::ZERO, Duration::from_secs(3600)],
            max_attempts: 2,
            ..RetryPolicy::default()
        };
        let transport = ScriptedTransport::new(vec![Err(server_error()), Ok("never".into())]);
        let processor = OcrProcessor::with_transport(config_with(policy), transport.clone());

        let driver = processor.clone();
        let handle = tokio::spawn(async move { driver.submit(pdf(b"%PDF-1.7")).await });

        let mut rx = processor.subscribe();
        rx.wait_for(|s| s.retry.is_some()).await.expect("waiting for retry");

        processor.cancel();
        assert_eq!(processor.state().status, Status::Idle);
        assert!(matches!(handle.await.unwrap(), Err(OcrError::Cancelled)));
        assert_eq!(transport.calls(), 1, "no second attempt after cancel");
    }

    #[tokio::test]
    async fn manual_retry_skips_the_scheduled_delay() {
        let policy = RetryPolicy {
            delays: vec![Duration::ZERO, Duration::from_secs(30)],
            max_attempts: 2,
            ..RetryPolicy::default()
        };
        let transport = ScriptedTransport::new(vec![Err(server_error()), Ok("ok".into())]);
        let processor = OcrProcessor::with_transport(config_with(policy), transport);

        let driver = processor.clone();
        let started = std::time::Instant::now();
        let handle = tokio::spawn(async move { driver.submit(pdf(b"%PDF-1.7")).await });

        let mut rx = processor.subscribe();
        let waiting = rx
            .wait_for(|s| s.retry.is_some())
            .await
            .expect("waiting for retry")
            .clone();
        let retry = waiting.retry.expect("retry state present");
        assert_eq!(retry.attempt, 2);
        assert_eq!(retry.next_retry_in, Duration::from_secs(30));
        assert!(retry.can_retry);

        processor.retry_now();

        let text = handle.await.unwrap().expect("success");
        assert_eq!(text, "ok");
        assert!(
            started.elapsed() < Duration::from_secs(5),
            "manual retry must not wait out the 30 s schedule"
        );
    }

    #[tokio::test]
    async fn new_submission_supersedes_the_previous_one() {
        // The first submission is cancelled mid-sleep, so its script entry
        // is never consumed; the superseding submission gets it.
        let transport = ScriptedTransport::slow(vec![Ok("done".into())], Duration::from_millis(100));
        let processor = OcrProcessor::with_transport(config_with(fast_policy()), transport);

        let first_driver = processor.clone();
        let first = tokio::spawn(async move { first_driver.submit(pdf(b"%PDF-1.7 a")).await });

        let mut rx = processor.subscribe();
        rx.wait_for(|s| s.status == Status::Processing)
            .await
            .expect("first reaches processing");

        let second = processor.submit(pdf(b"%PDF-1.7 b")).await.expect("second wins");
        assert_eq!(second, "done");
        assert!(matches!(first.await.unwrap(), Err(OcrError::Cancelled)));
        assert_eq!(processor.state().status, Status::Completed);
    }

    #[test]
    fn attempt_progress_is_capped() {
        assert_eq!(attempt_progress(1), 30);
        assert_eq!(attempt_progress(3), 50);
        assert_eq!(attempt_progress(40), 90);
    }
}
