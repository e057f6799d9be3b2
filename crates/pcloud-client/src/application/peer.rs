//! Ports for the real-time peer connection.
//!
//! The negotiator, input transport, and telemetry sampler only see these
//! traits.  `infrastructure::rtc` implements them on top of the `webrtc`
//! crate, and `infrastructure::mock` provides recording fakes.
//!
//! ```text
//! PeerConnector ──create──► PeerSession ──input_channel──► InputChannel
//!                                │
//!                                └── inbound tracks ──► MediaSink
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use pcloud_core::domain::codec::CodecCapability;
use pcloud_core::protocol::SessionDescription;
use pcloud_core::InboundVideoCounters;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;

/// Delivery guarantee of the input data channel.
///
/// Both variants are ordered.  `Unreliable` disables retransmission so a lost
/// pointer sample is never replayed late.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputReliability {
    Reliable,
    #[default]
    Unreliable,
}

/// What to ask of a new peer connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeerSetup {
    /// Add a receive-only audio transceiver.
    pub audio: bool,
    pub input_reliability: InputReliability,
}

impl Default for PeerSetup {
    fn default() -> Self {
        Self {
            audio: true,
            input_reliability: InputReliability::Unreliable,
        }
    }
}

/// Error from the peer connection layer.
#[derive(Debug, Error)]
pub enum PeerError {
    #[error("failed to create peer connection: {0}")]
    Create(String),

    #[error("failed to create offer: {0}")]
    Offer(String),

    #[error("failed to apply remote answer: {0}")]
    Answer(String),

    #[error("unexpected description type: expected answer")]
    NotAnAnswer,
}

/// Error sending on the input channel.
#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("input channel is not open")]
    NotOpen,

    #[error("send failed: {0}")]
    Send(String),
}

/// Media type of an inbound track.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackKind {
    Audio,
    Video,
}

/// One RTP payload of an inbound track.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaPacket {
    pub payload: Bytes,
    pub timestamp: u32,
    /// For video, set on the last packet of a frame.
    pub marker: bool,
}

/// Handle to an inbound track, delivered to a [`MediaSink`].
///
/// The channel closes when the track ends or the session is closed.
#[derive(Debug)]
pub struct RemoteTrack {
    pub kind: TrackKind,
    pub id: String,
    pub packets: mpsc::Receiver<MediaPacket>,
}

/// Presentation-side consumer of inbound tracks.
///
/// Decoding and rendering live behind this trait.
pub trait MediaSink: Send + Sync {
    fn attach(&self, track: RemoteTrack);
}

/// The session's outbound input channel.
#[async_trait]
pub trait InputChannel: Send + Sync {
    fn is_open(&self) -> bool;
    async fn send_text(&self, text: String) -> Result<(), ChannelError>;
}

/// One live peer connection.
#[async_trait]
pub trait PeerSession: Send + Sync {
    /// The video codecs the local side can receive, in platform order.
    fn video_codecs(&self) -> Vec<CodecCapability>;

    /// Reorders the video transceiver's codec preferences.
    async fn set_video_codec_preferences(&self, codecs: Vec<CodecCapability>) -> Result<(), PeerError>;

    /// Creates the local offer, waits for ICE gathering, and returns the SDP.
    async fn create_offer(&self) -> Result<String, PeerError>;

    async fn apply_answer(&self, answer: SessionDescription) -> Result<(), PeerError>;

    fn input_channel(&self) -> Arc<dyn InputChannel>;

    /// Current cumulative inbound video counters; `None` until a video track
    /// has been received.
    fn inbound_video_counters(&self) -> Option<InboundVideoCounters>;

    /// Closes the connection and ends every inbound track.  Idempotent.
    async fn close(&self);
}

/// Factory for peer connections.
#[async_trait]
pub trait PeerConnector: Send + Sync {
    async fn create(
        &self,
        setup: &PeerSetup,
        sink: Arc<dyn MediaSink>,
    ) -> Result<Arc<dyn PeerSession>, PeerError>;
}
