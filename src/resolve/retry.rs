//! Backoff policy, injectable timer, and cancellation.
//!
//! Retries are driven by an explicit loop rather than self-rescheduling
//! timers, so attempt counts and delays are unit-testable without real
//! waiting: tests inject a [`RetryTimer`] that records instead of
//! sleeping, and every wait races against a [`CancelToken`].

use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use tokio::sync::watch;

/// Exponential backoff configuration for transient failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Delay before the first retry.
    pub base_delay: Duration,
    /// Upper bound on any computed delay.
    pub max_delay: Duration,
    /// Multiplier applied per attempt.
    pub factor: u32,
    /// Attempts allowed per backend, including the first.
    pub max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            factor: 2,
            max_attempts: 3,
        }
    }
}

impl RetryPolicy {
    /// Computed delay after the given 1-based attempt number.
    ///
    /// `base * factor^(attempt-1)`, capped at `max_delay`.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(30);
        let factor = self.factor.saturating_pow(exp);
        self.base_delay
            .saturating_mul(factor)
            .min(self.max_delay)
    }

    /// Delay to wait, preferring a server-supplied Retry-After value.
    pub fn delay_with_hint(&self, attempt: u32, retry_after_secs: Option<u64>) -> Duration {
        match retry_after_secs {
            Some(secs) => Duration::from_secs(secs),
            None => self.delay_after(attempt),
        }
    }
}

/// Suspends a resolution flow between attempts.
///
/// Boxed-future form so the resolver can hold it as a trait object; the
/// production implementation sleeps on the tokio timer, tests substitute
/// one that records the requested delays and returns immediately.
pub trait RetryTimer: Send + Sync {
    /// Waits for `duration` before the next attempt.
    fn wait(&self, duration: Duration) -> BoxFuture<'_, ()>;
}

/// Production timer backed by `tokio::time::sleep`.
#[derive(Debug, Default)]
pub struct TokioTimer;

impl RetryTimer for TokioTimer {
    fn wait(&self, duration: Duration) -> BoxFuture<'_, ()> {
        Box::pin(tokio::time::sleep(duration))
    }
}

/// Cooperative cancellation for a retry chain.
///
/// Cloned into every resolution flow an originating context starts;
/// cancelling the token aborts in-flight lookups and pending backoff
/// waits instead of letting them run after the context is gone.
#[derive(Debug, Clone)]
pub struct CancelToken {
    sender: Arc<watch::Sender<bool>>,
    receiver: watch::Receiver<bool>,
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelToken {
    /// Creates an un-cancelled token.
    pub fn new() -> Self {
        let (sender, receiver) = watch::channel(false);
        Self {
            sender: Arc::new(sender),
            receiver,
        }
    }

    /// Cancels this token and every clone of it.
    pub fn cancel(&self) {
        // Receivers observe the value; a send error only means there are
        // no other clones left to notify.
        let _ = self.sender.send(true);
    }

    /// Whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        *self.receiver.borrow()
    }

    /// Resolves once cancellation is requested.
    pub async fn cancelled(&self) {
        let mut rx = self.receiver.clone();
        if rx.wait_for(|cancelled| *cancelled).await.is_err() {
            // All senders gone without cancelling; nothing will ever
            // cancel this token.
            std::future::pending::<()>().await;
        }
    }
}
