//! Inbound track forwarding.

use std::sync::{Arc, Mutex};
use std::time::Instant;

use pcloud_core::domain::reception::{PacketInfo, ReceptionCounters};
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::debug;
use webrtc::rtp_transceiver::rtp_codec::RTPCodecType;
use webrtc::track::track_remote::TrackRemote;

use crate::application::peer::{MediaPacket, MediaSink, RemoteTrack, TrackKind};

/// Packets buffered between the RTP reader and the sink.
const TRACK_BUFFER: usize = 512;

const VIDEO_CLOCK_RATE: u32 = 90_000;
const AUDIO_CLOCK_RATE: u32 = 48_000;

/// Counters of the current inbound video track, shared with the session.
pub(crate) type SharedCounters = Arc<Mutex<Option<ReceptionCounters>>>;

/// Reads `track` until it ends, handing every packet to `sink`.
///
/// Video headers are recorded in `counters`.  When the sink falls behind the
/// packet is dropped rather than stalling the reader; a dropped packet that
/// completes a frame counts as a dropped frame.
pub(crate) async fn forward_track(
    track: Arc<TrackRemote>,
    sink: Arc<dyn MediaSink>,
    counters: SharedCounters,
    epoch: Instant,
) {
    let (kind, clock_rate) = match track.kind() {
        RTPCodecType::Audio => (TrackKind::Audio, AUDIO_CLOCK_RATE),
        _ => (TrackKind::Video, VIDEO_CLOCK_RATE),
    };
    let id = track.id();
    let (tx, rx) = mpsc::channel(TRACK_BUFFER);
    sink.attach(RemoteTrack {
        kind,
        id: id.clone(),
        packets: rx,
    });

    if kind == TrackKind::Video {
        if let Ok(mut guard) = counters.lock() {
            *guard = Some(ReceptionCounters::new(clock_rate));
        }
    }

    loop {
        let packet = match track.read_rtp().await {
            Ok((packet, _)) => packet,
            Err(e) => {
                debug!("track {id} ended: {e}");
                break;
            }
        };

        let info = PacketInfo {
            sequence_number: packet.header.sequence_number,
            timestamp: packet.header.timestamp,
            marker: packet.header.marker,
            payload_len: packet.payload.len(),
        };
        let dropped = match tx.try_send(MediaPacket {
            payload: packet.payload,
            timestamp: info.timestamp,
            marker: info.marker,
        }) {
            Ok(()) => false,
            Err(TrySendError::Full(_)) => true,
            Err(TrySendError::Closed(_)) => false,
        };

        if kind == TrackKind::Video {
            record(&counters, &info, dropped, epoch);
        }
    }
}

fn record(counters: &SharedCounters, info: &PacketInfo, dropped: bool, epoch: Instant) {
    let Ok(mut guard) = counters.lock() else {
        return;
    };
    if let Some(c) = guard.as_mut() {
        c.record(info, epoch.elapsed().as_secs_f64());
        if dropped && info.marker {
            c.record_frame_dropped();
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
