//! TelemetrySampler: once-a-second rates from cumulative counters.
//!
//! Each tick reads the peer's inbound video counters, turns them into a
//! [`StatsReading`] through a [`StatsTracker`], and hands the reading to the
//! observer.  The first tick, and any tick without a video report, yields
//! [`StatsReading::Pending`].
//!
//! The sampler runs on a [`PeriodicTask`]; stopping that task is what
//! guarantees no reading is emitted after the session closed.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use pcloud_core::{StatsReading, StatsTracker};

use super::peer::PeerSession;
use super::periodic::PeriodicTask;

/// Sampling period.
pub const TELEMETRY_PERIOD: Duration = Duration::from_secs(1);

/// Receives one reading per tick.
pub type StatsObserver = Arc<dyn Fn(StatsReading) + Send + Sync>;

/// Starts sampling `peer` every `period`.
pub fn spawn_telemetry(peer: Arc<dyn PeerSession>, observer: StatsObserver, period: Duration) -> PeriodicTask {
    let tracker = Arc::new(Mutex::new(StatsTracker::new()));
    PeriodicTask::spawn("telemetry", period, move || {
        let reading = {
            let counters = peer.inbound_video_counters();
            let now = tokio::time::Instant::now().into_std();
            let mut tracker = tracker.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            tracker.observe(counters, now)
        };
        observer(reading);
        std::future::ready(())
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::mock::MockPeerSession;
    use pcloud_core::InboundVideoCounters;

    fn recorder() -> (StatsObserver, Arc<Mutex<Vec<StatsReading>>>) {
        let readings = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&readings);
        let observer: StatsObserver = Arc::new(move |r| sink.lock().unwrap().push(r));
        (observer, readings)
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_tick_reports_rates() {
        // Arrange
        let peer = Arc::new(MockPeerSession::new(true));
        peer.set_counters(Some(InboundVideoCounters::default()));
        let (observer, readings) = recorder();
        let task = spawn_telemetry(peer.clone(), observer, TELEMETRY_PERIOD);

        // Act
        tokio::time::sleep(Duration::from_millis(1500)).await;
        peer.set_counters(Some(InboundVideoCounters {
            bytes_received: 125_000,
            frames_decoded: 60,
            packets_received: 95,
            packets_lost: 5,
            frames_dropped: 2,
            jitter_secs: 0.003,
        }));
        tokio::time::sleep(Duration::from_secs(1)).await;
        task.stop().await;

        // Assert
        let readings = readings.lock().unwrap();
        assert_eq!(readings.len(), 2);
        assert_eq!(readings[0], StatsReading::Pending);
        let StatsReading::Sample(s) = readings[1] else {
            panic!("expected a sample, got {:?}", readings[1]);
        };
        assert!((s.bitrate_mbps - 1.0).abs() < 1e-9);
        assert!((s.packet_loss_percent - 5.0).abs() < 1e-9);
        assert!((s.fps - 60.0).abs() < 1e-9);
        assert_eq!(s.frames_dropped_delta, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_video_report_gives_placeholders() {
        let peer = Arc::new(MockPeerSession::new(true));
        let (observer, readings) = recorder();
        let task = spawn_telemetry(peer, observer, TELEMETRY_PERIOD);

        tokio::time::sleep(Duration::from_millis(3500)).await;
        task.stop().await;

        let readings = readings.lock().unwrap();
        assert_eq!(readings.len(), 3);
        assert!(readings.iter().all(|r| *r == StatsReading::Pending));
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_reading_after_stop() {
        // Arrange
        let peer = Arc::new(MockPeerSession::new(true));
        let (observer, readings) = recorder();
        let task = spawn_telemetry(peer, observer, TELEMETRY_PERIOD);
        tokio::time::sleep(Duration::from_millis(2500)).await;

        // Act
        task.stop().await;
        tokio::time::sleep(Duration::from_secs(10)).await;

        // Assert
        assert_eq!(readings.lock().unwrap().len(), 2);
    }
}
