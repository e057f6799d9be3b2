//! Fakes for the peer-connection ports.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use pcloud_core::domain::codec::CodecCapability;
use pcloud_core::protocol::{GamepadState, SessionDescription};
use pcloud_core::{InboundVideoCounters, InputMessage};

use crate::application::input_transport::GamepadSource;
use crate::application::peer::{
    ChannelError, InputChannel, MediaSink, PeerConnector, PeerError, PeerSession, PeerSetup,
};

/// A typical platform video codec list: H264, VP8, then VP9.
pub fn video_codecs() -> Vec<CodecCapability> {
    let cap = |mime: &str, fmtp: &str, pt: u8| CodecCapability {
        mime_type: mime.to_string(),
        clock_rate: 90_000,
        sdp_fmtp_line: fmtp.to_string(),
        payload_type: pt,
    };
    vec![
        cap(
            "video/H264",
            "level-asymmetry-allowed=1;packetization-mode=1;profile-level-id=42e01f",
            102,
        ),
        cap("video/VP8", "", 96),
        cap("video/VP9", "profile-id=0", 98),
    ]
}

/// Records every message sent on it, decoded back into [`InputMessage`].
#[derive(Debug, Default)]
pub struct MockInputChannel {
    open: AtomicBool,
    failing: AtomicBool,
    sent: Mutex<Vec<InputMessage>>,
}

impl MockInputChannel {
    pub fn new(open: bool) -> Self {
        Self {
            open: AtomicBool::new(open),
            ..Self::default()
        }
    }

    pub fn set_open(&self, open: bool) {
        self.open.store(open, Ordering::SeqCst);
    }

    /// When set, every send returns [`ChannelError::Send`] and records nothing.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn messages(&self) -> Vec<InputMessage> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl InputChannel for MockInputChannel {
    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    async fn send_text(&self, text: String) -> Result<(), ChannelError> {
        if !self.is_open() {
            return Err(ChannelError::NotOpen);
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(ChannelError::Send("mock failure".into()));
        }
        let message = InputMessage::from_json(&text).map_err(|e| ChannelError::Send(e.to_string()))?;
        self.sent.lock().unwrap().push(message);
        Ok(())
    }
}

/// A peer session that records what the negotiator did to it.
#[derive(Debug)]
pub struct MockPeerSession {
    channel: Arc<MockInputChannel>,
    counters: Mutex<Option<InboundVideoCounters>>,
    preferences: Mutex<Option<Vec<CodecCapability>>>,
    answer: Mutex<Option<SessionDescription>>,
    closed: AtomicBool,
}

impl MockPeerSession {
    pub fn new(channel_open: bool) -> Self {
        Self {
            channel: Arc::new(MockInputChannel::new(channel_open)),
            counters: Mutex::new(None),
            preferences: Mutex::new(None),
            answer: Mutex::new(None),
            closed: AtomicBool::new(false),
        }
    }

    /// Sets what [`PeerSession::inbound_video_counters`] returns next.
    pub fn set_counters(&self, counters: Option<InboundVideoCounters>) {
        *self.counters.lock().unwrap() = counters;
    }

    pub fn applied_answer(&self) -> Option<SessionDescription> {
        self.answer.lock().unwrap().clone()
    }

    /// The last codec order passed to `set_video_codec_preferences`.
    pub fn preferences(&self) -> Option<Vec<CodecCapability>> {
        self.preferences.lock().unwrap().clone()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn channel(&self) -> Arc<MockInputChannel> {
        Arc::clone(&self.channel)
    }
}

#[async_trait]
impl PeerSession for MockPeerSession {
    fn video_codecs(&self) -> Vec<CodecCapability> {
        video_codecs()
    }

    async fn set_video_codec_preferences(&self, codecs: Vec<CodecCapability>) -> Result<(), PeerError> {
        *self.preferences.lock().unwrap() = Some(codecs);
        Ok(())
    }

    async fn create_offer(&self) -> Result<String, PeerError> {
        if self.is_closed() {
            return Err(PeerError::Offer("connection closed".into()));
        }
        Ok("v=0\r\no=- 0 0 IN IP4 127.0.0.1\r\ns=-\r\n".to_string())
    }

    async fn apply_answer(&self, answer: SessionDescription) -> Result<(), PeerError> {
        *self.answer.lock().unwrap() = Some(answer);
        Ok(())
    }

    fn input_channel(&self) -> Arc<dyn InputChannel> {
        self.channel.clone()
    }

    fn inbound_video_counters(&self) -> Option<InboundVideoCounters> {
        *self.counters.lock().unwrap()
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.channel.set_open(false);
    }
}

/// Hands out [`MockPeerSession`]s with an open input channel and keeps them
/// for inspection.
#[derive(Debug, Default)]
pub struct MockPeerConnector {
    sessions: Mutex<Vec<Arc<MockPeerSession>>>,
    setups: Mutex<Vec<PeerSetup>>,
}

impl MockPeerConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sessions(&self) -> Vec<Arc<MockPeerSession>> {
        self.sessions.lock().unwrap().clone()
    }

    pub fn last(&self) -> Option<Arc<MockPeerSession>> {
        self.sessions.lock().unwrap().last().cloned()
    }

    pub fn created_count(&self) -> usize {
        self.sessions.lock().unwrap().len()
    }

    pub fn setups(&self) -> Vec<PeerSetup> {
        self.setups.lock().unwrap().clone()
    }
}

#[async_trait]
impl PeerConnector for MockPeerConnector {
    async fn create(&self, setup: &PeerSetup, _sink: Arc<dyn MediaSink>) -> Result<Arc<dyn PeerSession>, PeerError> {
        let session = Arc::new(MockPeerSession::new(true));
        self.sessions.lock().unwrap().push(Arc::clone(&session));
        self.setups.lock().unwrap().push(*setup);
        Ok(session)
    }
}

/// A controller whose state the test sets directly.
#[derive(Debug, Default)]
pub struct ScriptedGamepad {
    state: Mutex<Option<GamepadState>>,
}

impl ScriptedGamepad {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, state: Option<GamepadState>) {
        *self.state.lock().unwrap() = state;
    }
}

impl GamepadSource for ScriptedGamepad {
    fn poll(&self) -> Option<GamepadState> {
        self.state.lock().unwrap().clone()
    }
}
