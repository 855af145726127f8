//! Commit resolution orchestration.
//!
//! A resolution walks an explicit state machine: normalize the
//! identifier, try the local mirror (retrying transient failures with
//! exponential backoff), fall through to the remote hosting API only for
//! the "commit not known locally" classes, and merge the winning record
//! into the store before returning. Concurrent resolutions of the same
//! normalized hash share a single in-flight attempt instead of issuing
//! duplicate network sequences.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use super::backend::{CommitSource, RepoContext};
use super::error::ResolveError;
use super::retry::{CancelToken, RetryPolicy, RetryTimer, TokioTimer};
use crate::commit::{normalize, CommitRecord, CommitStore, NormalizedHash};

/// Outcome shared between every caller of one in-flight resolution.
pub type ResolveOutcome = Result<CommitRecord, ResolveError>;

/// Interim feedback published while a resolution is still running.
#[derive(Debug, Clone)]
pub enum ProgressUpdate {
    /// A transient failure is being retried after a backoff wait.
    Retrying {
        /// Backend being retried.
        backend: &'static str,
        /// Upcoming attempt number (1-based).
        attempt: u32,
        /// Attempts allowed against this backend.
        max_attempts: u32,
        /// How long the flow waits before the attempt.
        delay: Duration,
    },
    /// The local mirror gave up and the hosting API is being tried.
    FallingBack {
        /// Why the local lookup did not produce the commit.
        reason: String,
    },
}

impl std::fmt::Display for ProgressUpdate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Retrying {
                backend,
                attempt,
                max_attempts,
                delay,
            } => write!(
                f,
                "retrying {backend} ({attempt}/{max_attempts}) in {}s",
                delay.as_secs()
            ),
            Self::FallingBack { reason } => {
                write!(f, "checking the hosting API: {reason}")
            }
        }
    }
}

/// Receives interim progress so the UI is not silent during multi-second
/// backoff windows.
pub trait ProgressSink: Send + Sync {
    /// Publishes one update. Must not block.
    fn publish(&self, update: ProgressUpdate);
}

/// Discards all progress updates.
#[derive(Debug, Default)]
pub struct NullProgress;

impl ProgressSink for NullProgress {
    fn publish(&self, _update: ProgressUpdate) {}
}

/// Which backend a resolution flow is currently querying.
#[derive(Debug, Clone, Copy)]
enum Lookup {
    /// Querying the local mirror; `attempt` is 1-based.
    Local { attempt: u32 },
    /// Querying the remote hosting API; `attempt` is 1-based.
    Remote { attempt: u32 },
}

/// Result of the in-flight registry check.
enum Flight {
    /// This caller drives the lookup and broadcasts the outcome.
    Leader(broadcast::Sender<ResolveOutcome>),
    /// Another caller is already driving; await its broadcast.
    Follower(broadcast::Receiver<ResolveOutcome>),
}

/// Orchestrates commit lookups across both backends.
pub struct CommitResolver {
    local: Arc<dyn CommitSource>,
    remote: Arc<dyn CommitSource>,
    store: Arc<Mutex<CommitStore>>,
    policy: RetryPolicy,
    timer: Arc<dyn RetryTimer>,
    progress: Arc<dyn ProgressSink>,
    in_flight: Mutex<HashMap<String, broadcast::Sender<ResolveOutcome>>>,
}

impl CommitResolver {
    /// Creates a resolver with the default policy, timer, and no
    /// progress reporting.
    pub fn new(
        local: Arc<dyn CommitSource>,
        remote: Arc<dyn CommitSource>,
        store: Arc<Mutex<CommitStore>>,
    ) -> Self {
        Self {
            local,
            remote,
            store,
            policy: RetryPolicy::default(),
            timer: Arc::new(TokioTimer),
            progress: Arc::new(NullProgress),
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    /// Overrides the backoff policy.
    #[must_use]
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Substitutes the timer used between attempts.
    #[must_use]
    pub fn with_timer(mut self, timer: Arc<dyn RetryTimer>) -> Self {
        self.timer = timer;
        self
    }

    /// Attaches a progress sink for interim retry feedback.
    #[must_use]
    pub fn with_progress(mut self, progress: Arc<dyn ProgressSink>) -> Self {
        self.progress = progress;
        self
    }

    /// Resolves a raw commit identifier into a verified record.
    ///
    /// Malformed identifiers fail locally without any network call. On
    /// success the record has already been merged into the store. If an
    /// identical resolution is in flight, this call awaits its outcome
    /// instead of starting another network sequence.
    pub async fn resolve(
        &self,
        identifier: &str,
        ctx: &RepoContext,
        cancel: &CancelToken,
    ) -> ResolveOutcome {
        let hash = normalize(identifier)?;
        let key = hash.as_str().to_string();

        let flight = {
            #[allow(clippy::unwrap_used)]
            let mut in_flight = self.in_flight.lock().unwrap();
            if let Some(tx) = in_flight.get(&key) {
                Flight::Follower(tx.subscribe())
            } else {
                let (tx, _) = broadcast::channel(1);
                in_flight.insert(key.clone(), tx.clone());
                Flight::Leader(tx)
            }
        };

        match flight {
            Flight::Follower(mut rx) => {
                debug!(hash = %key, "joining in-flight resolution");
                match rx.recv().await {
                    Ok(outcome) => outcome,
                    // The driving flow was torn down before broadcasting.
                    Err(_) => Err(ResolveError::Cancelled),
                }
            }
            Flight::Leader(tx) => {
                let outcome = self.drive(&hash, ctx, cancel).await;
                {
                    #[allow(clippy::unwrap_used)]
                    let mut in_flight = self.in_flight.lock().unwrap();
                    in_flight.remove(&key);
                }
                // No receivers is the common case; nothing to share then.
                let _ = tx.send(outcome.clone());
                outcome
            }
        }
    }

    /// Runs the lookup state machine to a terminal state.
    async fn drive(
        &self,
        hash: &NormalizedHash,
        ctx: &RepoContext,
        cancel: &CancelToken,
    ) -> ResolveOutcome {
        let mut state = Lookup::Local { attempt: 1 };

        loop {
            if cancel.is_cancelled() {
                return Err(ResolveError::Cancelled);
            }

            let source = match state {
                Lookup::Local { .. } => &self.local,
                Lookup::Remote { .. } => &self.remote,
            };

            let result = tokio::select! {
                () = cancel.cancelled() => return Err(ResolveError::Cancelled),
                result = source.lookup(ctx, hash) => result,
            };

            match result {
                Ok(record) => {
                    // Torn-down flows must not write into a store that may
                    // already belong to a different repository.
                    if cancel.is_cancelled() {
                        return Err(ResolveError::Cancelled);
                    }
                    info!(
                        hash = %record.hash,
                        backend = source.name(),
                        files = record.file_changes.len(),
                        "commit resolved"
                    );
                    {
                        #[allow(clippy::unwrap_used)]
                        let mut store = self.store.lock().unwrap();
                        store.upsert(record.clone());
                    }
                    return Ok(record);
                }
                Err(err) => state = self.next_state(state, err, cancel).await?,
            }
        }
    }

    /// Decides the follow-up to a failed attempt: fall back, back off and
    /// retry, or surface the failure. Performs the backoff wait itself.
    async fn next_state(
        &self,
        state: Lookup,
        err: ResolveError,
        cancel: &CancelToken,
    ) -> Result<Lookup, ResolveError> {
        match state {
            Lookup::Local { attempt } => {
                if err.triggers_fallback() {
                    info!(reason = %err, "local mirror lacks commit, trying hosting API");
                    self.progress.publish(ProgressUpdate::FallingBack {
                        reason: err.to_string(),
                    });
                    return Ok(Lookup::Remote { attempt: 1 });
                }
                if err.is_transient() && attempt < self.policy.max_attempts {
                    self.backoff(self.local.name(), attempt, &err, cancel)
                        .await?;
                    return Ok(Lookup::Local {
                        attempt: attempt + 1,
                    });
                }
                warn!(backend = self.local.name(), error = %err, "lookup failed");
                Err(err)
            }
            Lookup::Remote { attempt } => {
                if err.is_transient() && attempt < self.policy.max_attempts {
                    self.backoff(self.remote.name(), attempt, &err, cancel)
                        .await?;
                    return Ok(Lookup::Remote {
                        attempt: attempt + 1,
                    });
                }
                warn!(backend = self.remote.name(), error = %err, "lookup failed");
                Err(err)
            }
        }
    }

    /// Waits out the backoff window for a transient failure.
    ///
    /// A server-supplied Retry-After value takes precedence over the
    /// computed exponential delay. The wait races cancellation.
    async fn backoff(
        &self,
        backend: &'static str,
        failed_attempt: u32,
        err: &ResolveError,
        cancel: &CancelToken,
    ) -> Result<(), ResolveError> {
        let hint = match err {
            ResolveError::RateLimited { retry_after_secs } => *retry_after_secs,
            _ => None,
        };
        let delay = self.policy.delay_with_hint(failed_attempt, hint);

        let update = ProgressUpdate::Retrying {
            backend,
            attempt: failed_attempt + 1,
            max_attempts: self.policy.max_attempts,
            delay,
        };
        warn!(backend, error = %err, delay_secs = delay.as_secs(), "transient failure, backing off");
        self.progress.publish(update);

        tokio::select! {
            () = cancel.cancelled() => Err(ResolveError::Cancelled),
            () = self.timer.wait(delay) => Ok(()),
        }
    }
}
