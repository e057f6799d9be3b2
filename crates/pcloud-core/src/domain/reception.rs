//! Cumulative counters kept while receiving an RTP video stream.
//!
//! The peer connection adapter feeds every received packet header into a
//! [`ReceptionCounters`].  The counters only ever grow; the telemetry sampler
//! snapshots them once per second and derives rates from the difference
//! between two snapshots.
//!
//! # Loss and jitter
//!
//! Loss is detected from gaps in the 16-bit RTP sequence number (with
//! wrap-around).  A packet that arrives late, after its gap was already
//! counted as lost, is not un-counted; the figure is an upper bound, which is
//! fine for a health display.
//!
//! Jitter is the RFC 3550 §6.4.1 interarrival jitter estimate: a running
//! average of the difference in transit time between consecutive packets,
//! smoothed with gain 1/16.

use super::stats::InboundVideoCounters;

/// Sequence gaps larger than this are treated as a stream restart rather
/// than as loss.
const MAX_SEQUENCE_GAP: u16 = 3000;

/// Header fields of one received RTP packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketInfo {
    pub sequence_number: u16,
    /// RTP timestamp in media clock units.
    pub timestamp: u32,
    /// Marker bit; for video it flags the last packet of a frame.
    pub marker: bool,
    pub payload_len: usize,
}

/// Running totals for one inbound video track.
#[derive(Debug, Clone, Default)]
pub struct ReceptionCounters {
    packets_received: u64,
    packets_lost: u64,
    bytes_received: u64,
    frames_received: u64,
    frames_dropped: u64,
    highest_seq: Option<u16>,
    /// Jitter in media clock units, RFC 3550 style.
    jitter_units: f64,
    last_transit: Option<f64>,
    clock_rate: u32,
}

impl ReceptionCounters {
    /// Creates counters for a stream with the given media clock rate (Hz).
    pub fn new(clock_rate: u32) -> Self {
        Self {
            clock_rate,
            ..Self::default()
        }
    }

    /// Records one packet that arrived `arrival_secs` after an arbitrary
    /// fixed epoch.
    pub fn record(&mut self, packet: &PacketInfo, arrival_secs: f64) {
        self.packets_received += 1;
        self.bytes_received += packet.payload_len as u64;
        if packet.marker {
            self.frames_received += 1;
        }

        match self.highest_seq {
            None => self.highest_seq = Some(packet.sequence_number),
            Some(highest) => {
                let ahead = packet.sequence_number.wrapping_sub(highest);
                // `ahead` in 1..=MAX_SEQUENCE_GAP means a newer packet;
                // anything in the upper half of the space is a late one.
                if ahead != 0 && ahead <= MAX_SEQUENCE_GAP {
                    self.packets_lost += u64::from(ahead - 1);
                    self.highest_seq = Some(packet.sequence_number);
                } else if ahead > MAX_SEQUENCE_GAP && ahead < u16::MAX / 2 {
                    self.highest_seq = Some(packet.sequence_number);
                }
            }
        }

        if self.clock_rate > 0 {
            let arrival_units = arrival_secs * f64::from(self.clock_rate);
            let transit = arrival_units - f64::from(packet.timestamp);
            if let Some(last) = self.last_transit {
                let d = (transit - last).abs();
                self.jitter_units += (d - self.jitter_units) / 16.0;
            }
            self.last_transit = Some(transit);
        }
    }

    /// Records a complete frame the consumer could not accept in time.
    pub fn record_frame_dropped(&mut self) {
        self.frames_dropped += 1;
    }

    /// Current jitter estimate in seconds.
    pub fn jitter_secs(&self) -> f64 {
        if self.clock_rate == 0 {
            return 0.0;
        }
        self.jitter_units / f64::from(self.clock_rate)
    }

    /// Returns a copy of the totals in the shape the sampler consumes.
    pub fn snapshot(&self) -> InboundVideoCounters {
        InboundVideoCounters {
            bytes_received: self.bytes_received,
            frames_decoded: self.frames_received.saturating_sub(self.frames_dropped),
            packets_received: self.packets_received,
            packets_lost: self.packets_lost,
            frames_dropped: self.frames_dropped,
            jitter_secs: self.jitter_secs(),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
