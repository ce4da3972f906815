//! A cancellable deferred task: run a closure once a quiet period elapses.
//!
//! At most one task is pending at a time. Scheduling a new one aborts and
//! replaces the previous task, so only the most recent closure ever runs —
//! intermediate keystrokes produce no work. The pending task is owned by
//! the [`Debouncer`] and dies with it; no stray callback can fire after a
//! logical reset.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::sleep;

/// Defers closures by a fixed delay, superseding on each call.
#[derive(Debug)]
pub struct Debouncer {
    delay: Duration,
    pending: Option<JoinHandle<()>>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    /// Schedule `f` to run after the quiet period, cancelling any pending
    /// task. Must be called from within a tokio runtime.
    pub fn call<F>(&mut self, f: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.cancel();
        let delay = self.delay;
        self.pending = Some(tokio::spawn(async move {
            sleep(delay).await;
            f();
        }));
    }

    /// Drop the pending task, if any, without running it.
    pub fn cancel(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }

    /// Whether a task is scheduled and has not yet fired.
    pub fn is_pending(&self) -> bool {
        self.pending.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}
