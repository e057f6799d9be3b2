//! Bounded retry with a fixed backoff interval.
//!
//! Several flows poll something that is expected to become true "soon": the
//! resolver repeats its whole discovery attempt while a freshly woken host
//! boots, and `wait_for_host` polls a health endpoint.  Both are expressed
//! through [`retry_until`] so the envelope (attempt count, interval, success
//! predicate) can be tested on its own with a paused clock.

use std::future::Future;
use std::time::Duration;

use tracing::debug;

/// How many times to try and how long to wait in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first.  Zero is treated as one.
    pub attempts: u32,
    /// Pause between the end of one attempt and the start of the next.
    pub interval: Duration,
}

impl RetryPolicy {
    pub const fn new(attempts: u32, interval: Duration) -> Self {
        Self { attempts, interval }
    }

    /// A policy that tries exactly once.
    pub const fn once() -> Self {
        Self {
            attempts: 1,
            interval: Duration::ZERO,
        }
    }

    /// A policy that keeps polling every `interval` for roughly `timeout`.
    pub fn within(timeout: Duration, interval: Duration) -> Self {
        let attempts = if interval.is_zero() {
            1
        } else {
            (timeout.as_nanos() / interval.as_nanos()).min(u128::from(u32::MAX - 1)) as u32 + 1
        };
        Self { attempts, interval }
    }
}

/// Final result of a retried operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Retried<T> {
    /// The value produced by the last attempt that ran.
    pub value: T,
    /// Number of attempts that ran.
    pub attempts: u32,
    /// Whether `value` satisfied the predicate.
    pub succeeded: bool,
}

/// Runs `op` until `accept` returns `true` for its output or the attempt
/// budget is spent.
///
/// `op` receives the 1-based attempt number.  The interval is slept only
/// between attempts, never after the last one.
pub async fn retry_until<T, F, Fut, P>(policy: RetryPolicy, mut op: F, mut accept: P) -> Retried<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = T>,
    P: FnMut(&T) -> bool,
{
    let budget = policy.attempts.max(1);
    let mut attempt = 1;
    loop {
        let value = op(attempt).await;
        if accept(&value) {
            return Retried {
                value,
                attempts: attempt,
                succeeded: true,
            };
        }
        if attempt >= budget {
            debug!("gave up after {attempt} attempt(s)");
            return Retried {
                value,
                attempts: attempt,
                succeeded: false,
            };
        }
        debug!(
            "attempt {attempt}/{budget} did not succeed; retrying in {:?}",
            policy.interval
        );
        tokio::time::sleep(policy.interval).await;
        attempt += 1;
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
