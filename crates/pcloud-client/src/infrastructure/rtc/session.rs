//! [`PeerSession`] and [`InputChannel`] over `RTCPeerConnection`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use pcloud_core::domain::codec::CodecCapability;
use pcloud_core::protocol::{SdpType, SessionDescription};
use pcloud_core::InboundVideoCounters;
use tracing::{debug, warn};
use webrtc::data_channel::data_channel_state::RTCDataChannelState;
use webrtc::data_channel::RTCDataChannel;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::rtp_transceiver::rtp_codec::RTCRtpCodecParameters;
use webrtc::rtp_transceiver::RTCRtpTransceiver;

use super::codecs::{to_capability, to_parameters};
use super::tracks::SharedCounters;
use crate::application::peer::{ChannelError, InputChannel, PeerError, PeerSession};

/// The `input` data channel.
pub struct DataChannelInput {
    channel: Arc<RTCDataChannel>,
}

impl DataChannelInput {
    pub(crate) fn new(channel: Arc<RTCDataChannel>) -> Self {
        Self { channel }
    }
}

#[async_trait]
impl InputChannel for DataChannelInput {
    fn is_open(&self) -> bool {
        self.channel.ready_state() == RTCDataChannelState::Open
    }

    async fn send_text(&self, text: String) -> Result<(), ChannelError> {
        if !self.is_open() {
            return Err(ChannelError::NotOpen);
        }
        self.channel
            .send_text(text)
            .await
            .map(|_| ())
            .map_err(|e| ChannelError::Send(e.to_string()))
    }
}

/// One live `RTCPeerConnection` with its video transceiver and input channel.
pub struct WebRtcSession {
    pub(crate) connection: Arc<RTCPeerConnection>,
    pub(crate) video: Arc<RTCRtpTransceiver>,
    pub(crate) codecs: Vec<RTCRtpCodecParameters>,
    pub(crate) input: Arc<DataChannelInput>,
    pub(crate) counters: SharedCounters,
    pub(crate) closed: AtomicBool,
}

#[async_trait]
impl PeerSession for WebRtcSession {
    fn video_codecs(&self) -> Vec<CodecCapability> {
        self.codecs.iter().map(to_capability).collect()
    }

    async fn set_video_codec_preferences(&self, codecs: Vec<CodecCapability>) -> Result<(), PeerError> {
        let params: Vec<_> = codecs
            .iter()
            .filter_map(|c| to_parameters(c, &self.codecs))
            .collect();
        self.video
            .set_codec_preferences(params)
            .await
            .map_err(|e| PeerError::Offer(format!("codec preferences rejected: {e}")))
    }

    async fn create_offer(&self) -> Result<String, PeerError> {
        let offer = self
            .connection
            .create_offer(None)
            .await
            .map_err(|e| PeerError::Offer(e.to_string()))?;

        let mut gathered = self.connection.gathering_complete_promise().await;
        self.connection
            .set_local_description(offer)
            .await
            .map_err(|e| PeerError::Offer(e.to_string()))?;
        let _ = gathered.recv().await;
        debug!("ICE gathering complete");

        self.connection
            .local_description()
            .await
            .map(|d| d.sdp)
            .ok_or_else(|| PeerError::Offer("no local description after gathering".into()))
    }

    async fn apply_answer(&self, answer: SessionDescription) -> Result<(), PeerError> {
        if answer.kind != SdpType::Answer {
            return Err(PeerError::NotAnAnswer);
        }
        let description = RTCSessionDescription::answer(answer.sdp).map_err(|e| PeerError::Answer(e.to_string()))?;
        self.connection
            .set_remote_description(description)
            .await
            .map_err(|e| PeerError::Answer(e.to_string()))
    }

    fn input_channel(&self) -> Arc<dyn InputChannel> {
        self.input.clone()
    }

    fn inbound_video_counters(&self) -> Option<InboundVideoCounters> {
        self.counters
            .lock()
            .ok()
            .and_then(|guard| guard.as_ref().map(|c| c.snapshot()))
    }

    async fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Err(e) = self.connection.close().await {
            warn!("error closing peer connection: {e}");
        }
    }
}
