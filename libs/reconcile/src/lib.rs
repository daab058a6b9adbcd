//! Convergence primitives.
//!
//! This library provides the polling waiter used to confirm that an
//! asynchronous remote state transition has completed. Key concepts:
//!
//! - **Check**: a single observation of remote state, deciding whether the
//!   wait is done or should be retried.
//! - **Backoff**: the delay between checks, growing from `min_delay` towards
//!   `max_delay` with jitter.
//! - **Deadline**: the total time budget (`max_wait`). A waiter never sleeps
//!   past it.
//!
//! # Invariants
//!
//! - The first check runs immediately
//! - Only [`PollDecision::Retry`] is retried; a check error ends the wait
//! - Timeout and check failure are distinct outcomes

use std::fmt;
use std::future::Future;
use std::time::Duration;

use rand::Rng;
use thiserror::Error;
use tokio::time::Instant;

/// Default minimum delay between checks.
pub const DEFAULT_MIN_DELAY: Duration = Duration::from_secs(15);

/// Default maximum delay between checks.
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(120);

/// Default total wait budget.
pub const DEFAULT_MAX_WAIT: Duration = Duration::from_secs(300);

/// Reconciliation errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReconcileError {
    /// Wait settings cannot produce a valid schedule.
    #[error("invalid wait configuration: {0}")]
    InvalidConfig(String),
}

/// Outcome of a wait that did not succeed.
#[derive(Debug, Error)]
pub enum WaitError<E> {
    /// The deadline passed before the check reported done.
    #[error("timed out after {elapsed:?} ({attempts} attempts)")]
    Timeout { elapsed: Duration, attempts: u32 },

    /// A check failed; the wait was aborted.
    #[error("{0}")]
    Failed(E),
}

impl<E> WaitError<E> {
    /// Returns true if the wait ended on its deadline.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

/// Decision returned by a single check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollDecision<T> {
    /// The awaited condition holds.
    Done(T),

    /// Not there yet, check again after a delay.
    Retry,
}

/// Waiter state machine.
///
/// `Polling` is the initial state; the other three are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaiterState {
    Polling,
    Succeeded,
    TimedOut,
    Failed,
}

impl WaiterState {
    /// Returns true once the waiter can no longer change state.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Polling)
    }
}

impl fmt::Display for WaiterState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Polling => "polling",
            Self::Succeeded => "succeeded",
            Self::TimedOut => "timed_out",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Structured events emitted while waiting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaitEvent {
    /// A check is about to run.
    Attempt { attempt: u32 },

    /// The check asked for a retry; the waiter sleeps for `delay`.
    Retrying {
        attempt: u32,
        delay: Duration,
        elapsed: Duration,
    },

    /// The waiter reached a terminal state.
    Finished {
        state: WaiterState,
        attempts: u32,
        elapsed: Duration,
    },
}

/// Receives structured events from a state machine.
///
/// Implemented for any `Fn(&E)`, so closures can be passed directly.
pub trait Observer<E>: Send + Sync {
    fn observe(&self, event: &E);
}

impl<E, F> Observer<E> for F
where
    F: Fn(&E) + Send + Sync,
{
    fn observe(&self, event: &E) {
        self(event)
    }
}

/// Observer that drops every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl<E> Observer<E> for NoopObserver {
    fn observe(&self, _event: &E) {}
}

/// Timing configuration for [`poll_until`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaitConfig {
    /// Lower bound of every delay.
    pub min_delay: Duration,

    /// Upper bound of every delay.
    pub max_delay: Duration,

    /// Total time budget, measured from the first check.
    pub max_wait: Duration,
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            min_delay: DEFAULT_MIN_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
            max_wait: DEFAULT_MAX_WAIT,
        }
    }
}

impl WaitConfig {
    /// Create a config with the default delays and the given wait budget.
    pub fn with_max_wait(max_wait: Duration) -> Self {
        Self {
            max_wait,
            ..Default::default()
        }
    }

    /// Check that the settings describe a usable schedule.
    pub fn validate(&self) -> Result<(), ReconcileError> {
        if self.min_delay.is_zero() {
            return Err(ReconcileError::InvalidConfig(
                "min_delay must be greater than zero".to_string(),
            ));
        }
        if self.max_delay < self.min_delay {
            return Err(ReconcileError::InvalidConfig(format!(
                "max_delay ({:?}) must be at least min_delay ({:?})",
                self.max_delay, self.min_delay
            )));
        }
        if self.max_wait <= self.min_delay {
            return Err(ReconcileError::InvalidConfig(format!(
                "max_wait ({:?}) must be greater than min_delay ({:?})",
                self.max_wait, self.min_delay
            )));
        }
        Ok(())
    }

    /// Number of retries after which the delay is pinned to `max_delay`.
    fn attempt_ceiling(&self) -> f64 {
        let ratio = self.max_delay.as_secs_f64() / self.min_delay.as_secs_f64();
        ratio.log2() + 1.0
    }

    /// Delay before the retry following check number `attempt` (1-based).
    ///
    /// Drawn uniformly from `[min_delay, min_delay * 2^(attempt - 1)]`, capped
    /// at `max_delay`.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        if f64::from(attempt) > self.attempt_ceiling() {
            return self.max_delay;
        }

        let min = self.min_delay.as_secs_f64();
        let exponent = attempt.saturating_sub(1).min(62) as i32;
        let upper = (min * 2f64.powi(exponent)).min(self.max_delay.as_secs_f64());
        if upper <= min {
            return self.min_delay;
        }

        Duration::try_from_secs_f64(rand::rng().random_range(min..=upper))
            .map_or(self.max_delay, |delay| delay.min(self.max_delay))
    }
}

/// Run `check` until it reports done, fails, or the deadline passes.
///
/// The first check runs immediately. Before each further check the waiter
/// computes the next delay; if sleeping that long would pass `max_wait` the
/// wait ends with [`WaitError::Timeout`]. A check error ends the wait with
/// [`WaitError::Failed`] without retrying.
pub async fn poll_until<F, Fut, T, E, O>(
    config: &WaitConfig,
    observer: &O,
    mut check: F,
) -> Result<T, WaitError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<PollDecision<T>, E>>,
    O: Observer<WaitEvent> + ?Sized,
{
    let start = Instant::now();
    // None: the budget reaches past what the clock can represent.
    let deadline = start.checked_add(config.max_wait);
    let mut attempt = 0u32;

    let finish = |state: WaiterState, attempts: u32| {
        observer.observe(&WaitEvent::Finished {
            state,
            attempts,
            elapsed: start.elapsed(),
        });
    };

    loop {
        attempt += 1;
        observer.observe(&WaitEvent::Attempt { attempt });

        match check().await {
            Ok(PollDecision::Done(value)) => {
                finish(WaiterState::Succeeded, attempt);
                return Ok(value);
            }
            Ok(PollDecision::Retry) => {}
            Err(e) => {
                finish(WaiterState::Failed, attempt);
                return Err(WaitError::Failed(e));
            }
        }

        let delay = config.backoff_delay(attempt);
        let past_deadline = match (deadline, Instant::now().checked_add(delay)) {
            (None, _) => false,
            (Some(_), None) => true,
            (Some(deadline), Some(wake)) => wake > deadline,
        };
        if past_deadline {
            finish(WaiterState::TimedOut, attempt);
            return Err(WaitError::Timeout {
                elapsed: start.elapsed(),
                attempts: attempt,
            });
        }

        observer.observe(&WaitEvent::Retrying {
            attempt,
            delay,
            elapsed: start.elapsed(),
        });
        tokio::time::sleep(delay).await;
    }
}
