//! Builds `RTCPeerConnection`s configured for a receive-only desktop stream.

use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use async_trait::async_trait;
use tracing::{debug, info};
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::MediaEngine;
use webrtc::api::{APIBuilder, API};
use webrtc::data_channel::data_channel_init::RTCDataChannelInit;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::rtp_transceiver::rtp_codec::{RTCRtpCodecParameters, RTPCodecType};
use webrtc::rtp_transceiver::rtp_transceiver_direction::RTCRtpTransceiverDirection;
use webrtc::rtp_transceiver::rtp_receiver::RTCRtpReceiver;
use webrtc::rtp_transceiver::{RTCRtpTransceiver, RTCRtpTransceiverInit};
use webrtc::track::track_remote::TrackRemote;

use super::codecs::{register_codecs, video_parameters, INPUT_CHANNEL_LABEL};
use super::session::{DataChannelInput, WebRtcSession};
use super::tracks::{forward_track, SharedCounters};
use crate::application::peer::{InputReliability, MediaSink, PeerConnector, PeerError, PeerSession, PeerSetup};

/// [`PeerConnector`] backed by a shared `webrtc` API instance.
pub struct WebRtcConnector {
    api: API,
    codecs: Vec<RTCRtpCodecParameters>,
}

impl WebRtcConnector {
    pub fn new() -> Result<Self, PeerError> {
        let mut engine = MediaEngine::default();
        register_codecs(&mut engine).map_err(create_error)?;
        let registry = register_default_interceptors(Registry::new(), &mut engine).map_err(create_error)?;
        let api = APIBuilder::new()
            .with_media_engine(engine)
            .with_interceptor_registry(registry)
            .build();
        Ok(Self {
            api,
            codecs: video_parameters(),
        })
    }
}

fn create_error(e: webrtc::Error) -> PeerError {
    PeerError::Create(e.to_string())
}

fn recv_only() -> Option<RTCRtpTransceiverInit> {
    Some(RTCRtpTransceiverInit {
        direction: RTCRtpTransceiverDirection::Recvonly,
        send_encodings: Vec::new(),
    })
}

fn channel_init(reliability: InputReliability) -> RTCDataChannelInit {
    RTCDataChannelInit {
        ordered: Some(true),
        max_retransmits: match reliability {
            InputReliability::Reliable => None,
            InputReliability::Unreliable => Some(0),
        },
        ..Default::default()
    }
}

#[async_trait]
impl PeerConnector for WebRtcConnector {
    async fn create(&self, setup: &PeerSetup, sink: Arc<dyn MediaSink>) -> Result<Arc<dyn PeerSession>, PeerError> {
        let connection = Arc::new(
            self.api
                .new_peer_connection(RTCConfiguration::default())
                .await
                .map_err(create_error)?,
        );

        connection.on_peer_connection_state_change(Box::new(|state: RTCPeerConnectionState| {
            info!("peer connection {state}");
            Box::pin(async {})
        }));

        let counters: SharedCounters = Arc::new(Mutex::new(None));
        let epoch = Instant::now();
        let track_counters = Arc::clone(&counters);
        connection.on_track(Box::new(
            move |track: Arc<TrackRemote>, _receiver: Arc<RTCRtpReceiver>, _transceiver: Arc<RTCRtpTransceiver>| {
                let sink = Arc::clone(&sink);
                let counters = Arc::clone(&track_counters);
                Box::pin(async move {
                    tokio::spawn(forward_track(track, sink, counters, epoch));
                })
            },
        ));

        let video = connection
            .add_transceiver_from_kind(RTPCodecType::Video, recv_only())
            .await
            .map_err(create_error)?;
        if setup.audio {
            connection
                .add_transceiver_from_kind(RTPCodecType::Audio, recv_only())
                .await
                .map_err(create_error)?;
        }

        let channel = connection
            .create_data_channel(INPUT_CHANNEL_LABEL, Some(channel_init(setup.input_reliability)))
            .await
            .map_err(create_error)?;
        channel.on_open(Box::new(|| {
            debug!("input channel open");
            Box::pin(async {})
        }));

        Ok(Arc::new(WebRtcSession {
            connection,
            video,
            codecs: self.codecs.clone(),
            input: Arc::new(DataChannelInput::new(channel)),
            counters,
            closed: AtomicBool::new(false),
        }))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::media::DrainSink;
    use std::time::Duration;

    #[test]
    fn test_unreliable_input_disables_retransmits() {
        let init = channel_init(InputReliability::Unreliable);
        assert_eq!(init.ordered, Some(true));
        assert_eq!(init.max_retransmits, Some(0));

        let init = channel_init(InputReliability::Reliable);
        assert_eq!(init.max_retransmits, None);
    }

    #[tokio::test]
    async fn test_offer_lists_video_audio_and_data() {
        // Arrange
        let connector = WebRtcConnector::new().unwrap();
        let session = connector
            .create(&PeerSetup::default(), Arc::new(DrainSink))
            .await
            .unwrap();

        // Act
        let sdp = tokio::time::timeout(Duration::from_secs(10), session.create_offer())
            .await
            .unwrap()
            .unwrap();
        session.close().await;

        // Assert
        assert!(sdp.contains("m=video"));
        assert!(sdp.contains("m=audio"));
        assert!(sdp.contains("m=application"));
        assert!(sdp.contains("a=recvonly"));
        assert!(!session.input_channel().is_open());
        assert_eq!(session.inbound_video_counters(), None);
    }

    #[tokio::test]
    async fn test_video_only_offer_when_audio_disabled() {
        let connector = WebRtcConnector::new().unwrap();
        let setup = PeerSetup {
            audio: false,
            ..PeerSetup::default()
        };
        let session = connector.create(&setup, Arc::new(DrainSink)).await.unwrap();

        let sdp = tokio::time::timeout(Duration::from_secs(10), session.create_offer())
            .await
            .unwrap()
            .unwrap();
        session.close().await;

        assert!(sdp.contains("m=video"));
        assert!(!sdp.contains("m=audio"));
    }
}
