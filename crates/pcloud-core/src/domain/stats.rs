//! Per-second statistics derived from cumulative receive counters.
//!
//! The peer connection only exposes running totals (bytes received so far,
//! frames decoded so far, …).  [`StatsTracker`] remembers the totals from the
//! previous tick and turns the difference into rates:
//!
//! | Field                 | Formula                                              |
//! |-----------------------|------------------------------------------------------|
//! | `fps`                 | Δframes_decoded / elapsed                            |
//! | `bitrate_mbps`        | Δbytes × 8 / elapsed / 1e6                           |
//! | `packet_loss_percent` | Δlost / (Δlost + Δreceived) × 100, 0 if both are 0   |
//! | `frames_dropped_delta`| Δframes_dropped (a count, not a rate)                |
//! | `jitter_ms`           | current jitter estimate × 1000                       |
//!
//! The first tick has nothing to subtract from, so it yields
//! [`StatsReading::Pending`]; so does any tick without an inbound video report.

use std::fmt;
use std::time::Instant;

/// Running totals for the inbound video stream at one instant.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct InboundVideoCounters {
    pub bytes_received: u64,
    pub frames_decoded: u64,
    pub packets_received: u64,
    pub packets_lost: u64,
    pub frames_dropped: u64,
    /// Current interarrival jitter estimate in seconds (not cumulative).
    pub jitter_secs: f64,
}

/// Rates computed over one sampling interval.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatsSnapshot {
    pub fps: f64,
    pub bitrate_mbps: f64,
    pub jitter_ms: f64,
    pub packet_loss_percent: f64,
    pub frames_dropped_delta: u64,
}

/// What a telemetry tick produced.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StatsReading {
    /// No rate is available yet; observers should show placeholders.
    Pending,
    Sample(StatsSnapshot),
}

impl StatsSnapshot {
    /// Computes rates from two readings taken `elapsed_secs` apart.
    ///
    /// Counters that went backwards (a track was replaced) contribute zero.
    pub fn between(
        previous: &InboundVideoCounters,
        current: &InboundVideoCounters,
        elapsed_secs: f64,
    ) -> Self {
        let d_bytes = current.bytes_received.saturating_sub(previous.bytes_received);
        let d_frames = current.frames_decoded.saturating_sub(previous.frames_decoded);
        let d_received = current
            .packets_received
            .saturating_sub(previous.packets_received);
        let d_lost = current.packets_lost.saturating_sub(previous.packets_lost);
        let d_dropped = current.frames_dropped.saturating_sub(previous.frames_dropped);

        let loss_denominator = d_lost + d_received;
        let packet_loss_percent = if loss_denominator == 0 {
            0.0
        } else {
            d_lost as f64 / loss_denominator as f64 * 100.0
        };

        Self {
            fps: d_frames as f64 / elapsed_secs,
            bitrate_mbps: d_bytes as f64 * 8.0 / elapsed_secs / 1e6,
            jitter_ms: current.jitter_secs * 1000.0,
            packet_loss_percent,
            frames_dropped_delta: d_dropped,
        }
    }
}

/// Remembers the previous reading between telemetry ticks.
#[derive(Debug, Default)]
pub struct StatsTracker {
    previous: Option<(InboundVideoCounters, Instant)>,
}

impl StatsTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds the counters read at `now` and returns the derived reading.
    ///
    /// `None` means the connection has no inbound video report yet.
    pub fn observe(&mut self, current: Option<InboundVideoCounters>, now: Instant) -> StatsReading {
        let Some(current) = current else {
            self.previous = None;
            return StatsReading::Pending;
        };

        let reading = match self.previous {
            Some((prev, at)) => {
                let elapsed = now.saturating_duration_since(at).as_secs_f64();
                if elapsed > 0.0 {
                    StatsReading::Sample(StatsSnapshot::between(&prev, &current, elapsed))
                } else {
                    StatsReading::Pending
                }
            }
            None => StatsReading::Pending,
        };

        self.previous = Some((current, now));
        reading
    }

    /// Forgets the previous reading so the next tick is a fresh baseline.
    pub fn reset(&mut self) {
        self.previous = None;
    }
}

impl fmt::Display for StatsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "fps: {:.1} | br: {:.2} Mbps | jitter: {:.0}ms | loss: {:.2}% | dropped: {}",
            self.fps,
            self.bitrate_mbps,
            self.jitter_ms,
            self.packet_loss_percent,
            self.frames_dropped_delta
        )
    }
}

impl fmt::Display for StatsReading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatsReading::Pending => {
                f.write_str("fps: - | br: - Mbps | jitter: -ms | loss: -% | dropped: -")
            }
            StatsReading::Sample(s) => s.fmt(f),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
