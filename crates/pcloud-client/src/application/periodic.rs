//! Cancellable fixed-rate background tasks.
//!
//! A [`PeriodicTask`] owns a spawned loop that calls a tick function every
//! `period` until it is stopped.  Session telemetry, the per-frame input loop,
//! and background host re-resolution all run on one.
//!
//! # Stop semantics
//!
//! [`PeriodicTask::stop`] cancels the loop and then awaits it.  When `stop`
//! returns the tick function is not running and will never run again, so a
//! torn-down session cannot emit a late statistics sample.  Dropping the
//! handle without calling `stop` cancels the loop as well, but does not wait.

use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Handle to a running periodic loop.
pub struct PeriodicTask {
    name: &'static str,
    cancel_token: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl PeriodicTask {
    /// Spawns a loop that calls `tick` every `period`, the first time one
    /// `period` after spawning.
    ///
    /// Ticks that fall behind are skipped rather than bunched up, and a tick
    /// in progress is abandoned at its next suspension point on cancellation.
    pub fn spawn<F, Fut>(name: &'static str, period: Duration, mut tick: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let cancel_token = CancellationToken::new();
        let token = cancel_token.clone();

        let handle = tokio::spawn(async move {
            let mut interval = time::interval_at(time::Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    _ = interval.tick() => {
                        tokio::select! {
                            biased;
                            _ = token.cancelled() => break,
                            _ = tick() => {}
                        }
                    }
                }
            }
            debug!("periodic task {name} stopped");
        });

        debug!("periodic task {name} started ({period:?})");
        Self {
            name,
            cancel_token,
            handle: Some(handle),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Returns `true` once the task has been asked to stop.
    pub fn is_cancelled(&self) -> bool {
        self.cancel_token.is_cancelled()
    }

    /// Cancels the loop and waits for it to finish.
    pub async fn stop(mut self) {
        self.cancel_token.cancel();
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                if e.is_panic() {
                    warn!("periodic task {} panicked: {e}", self.name);
                }
            }
        }
    }
}

impl Drop for PeriodicTask {
    fn drop(&mut self) {
        self.cancel_token.cancel();
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn counting_task(period: Duration) -> (PeriodicTask, Arc<AtomicU32>) {
        let ticks = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&ticks);
        let task = PeriodicTask::spawn("test", period, move || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });
        (task, ticks)
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticks_once_per_period() {
        // Arrange
        let (task, ticks) = counting_task(Duration::from_secs(1));

        // Act
        time::sleep(Duration::from_millis(3500)).await;

        // Assert
        assert_eq!(ticks.load(Ordering::SeqCst), 3);
        task.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_tick_after_stop() {
        // Arrange
        let (task, ticks) = counting_task(Duration::from_secs(1));
        time::sleep(Duration::from_millis(2500)).await;

        // Act
        task.stop().await;
        let at_stop = ticks.load(Ordering::SeqCst);
        time::sleep(Duration::from_secs(10)).await;

        // Assert
        assert_eq!(at_stop, 2);
        assert_eq!(ticks.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_cancels_loop() {
        let (task, ticks) = counting_task(Duration::from_secs(1));
        drop(task);

        time::sleep(Duration::from_secs(5)).await;

        assert_eq!(ticks.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_abandons_slow_tick() {
        // Arrange: a tick that would take an hour.
        let finished = Arc::new(AtomicU32::new(0));
        let flag = Arc::clone(&finished);
        let task = PeriodicTask::spawn("slow", Duration::from_secs(1), move || {
            let flag = Arc::clone(&flag);
            async move {
                time::sleep(Duration::from_secs(3600)).await;
                flag.fetch_add(1, Ordering::SeqCst);
            }
        });
        time::sleep(Duration::from_millis(1500)).await;

        // Act
        task.stop().await;

        // Assert
        assert_eq!(finished.load(Ordering::SeqCst), 0);
    }
}
