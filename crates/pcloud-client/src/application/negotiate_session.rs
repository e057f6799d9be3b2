//! SessionNegotiator: offer/answer exchange and teardown.
//!
//! # State machine
//!
//! ```text
//! Idle ──negotiate──► Negotiating ──answer applied──► Active
//!  ▲                      │                              │
//!  │                  any failure                    teardown
//!  │                      ▼                              ▼
//!  └───────────────────── Idle ◄──────────────────── Closing
//! ```
//!
//! A failure anywhere after the peer connection was created closes it again
//! before returning, so a failed negotiation never leaks a connection.
//!
//! # Steps
//!
//! 1. Validate the [`SessionConfig`] (even dimensions, http(s) server).
//! 2. Create a peer connection with recv-only transceivers and the `input`
//!    data channel.
//! 3. Move codecs matching `config.codec` to the front of the video
//!    transceiver's preferences.  No match keeps the platform order.
//! 4. Create the offer and `POST` it with the config to
//!    `{server}/api/session/offer`.  Non-2xx aborts.
//! 5. Apply the answer.
//!
//! Teardown `POST`s `{server}/api/session/end` on a best-effort basis and
//! closes the connection whatever that call returns.

use std::sync::Arc;

use async_trait::async_trait;
use pcloud_core::domain::codec::prefer_codec;
use pcloud_core::protocol::{OfferRequest, SdpType, SessionDescription};
use pcloud_core::{SessionConfig, SessionConfigError};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::peer::{MediaSink, PeerConnector, PeerError, PeerSession, PeerSetup};

/// Error talking to the host's signaling endpoints.
#[derive(Debug, Error)]
pub enum SignalingError {
    #[error("request failed: {0}")]
    Transport(String),

    #[error("host answered HTTP {code}: {body}")]
    Status { code: u16, body: String },

    #[error("invalid answer body: {0}")]
    Decode(String),
}

/// The host's HTTP signaling surface.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SignalingClient: Send + Sync {
    /// `POST`s the offer and returns the host's answer.
    async fn post_offer(&self, url: &str, request: &OfferRequest) -> Result<SessionDescription, SignalingError>;

    /// `POST`s the end-of-session notification.
    async fn end_session(&self, url: &str) -> Result<(), SignalingError>;
}

/// Why a negotiation failed.
#[derive(Debug, Error)]
pub enum NegotiationError {
    #[error("invalid session config: {0}")]
    InvalidConfig(#[from] SessionConfigError),

    #[error("a session is already {0:?}")]
    Busy(SessionState),

    #[error(transparent)]
    Peer(#[from] PeerError),

    #[error("signaling failed: {0}")]
    Signaling(#[from] SignalingError),
}

/// Negotiator lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Negotiating,
    Active,
    Closing,
}

/// Result of a successful negotiation.
pub struct Negotiated {
    pub peer: Arc<dyn PeerSession>,
    /// The validated config that was sent to the host.
    pub config: SessionConfig,
}

/// Drives one session at a time through the state machine above.
pub struct SessionNegotiator {
    connector: Arc<dyn PeerConnector>,
    signaling: Arc<dyn SignalingClient>,
    state: SessionState,
}

impl SessionNegotiator {
    pub fn new(connector: Arc<dyn PeerConnector>, signaling: Arc<dyn SignalingClient>) -> Self {
        Self {
            connector,
            signaling,
            state: SessionState::Idle,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// The signaling client, for best-effort calls outside a session.
    pub fn signaling(&self) -> Arc<dyn SignalingClient> {
        Arc::clone(&self.signaling)
    }

    /// Runs the offer/answer exchange.
    ///
    /// # Errors
    ///
    /// - [`NegotiationError::Busy`] if a session is not fully torn down.
    /// - [`NegotiationError::InvalidConfig`] before any peer is created.
    /// - [`NegotiationError::Peer`] / [`NegotiationError::Signaling`] after
    ///   the peer was closed again.
    pub async fn negotiate(
        &mut self,
        config: SessionConfig,
        setup: PeerSetup,
        sink: Arc<dyn MediaSink>,
    ) -> Result<Negotiated, NegotiationError> {
        if self.state != SessionState::Idle {
            return Err(NegotiationError::Busy(self.state));
        }
        let config = config.validated()?;

        self.state = SessionState::Negotiating;
        info!("negotiating {}x{}@{} {} with {}", config.width, config.height, config.fps, config.codec, config.server);

        let peer = match self.connector.create(&setup, sink).await {
            Ok(peer) => peer,
            Err(e) => {
                self.state = SessionState::Idle;
                return Err(e.into());
            }
        };

        match self.exchange(peer.as_ref(), &config).await {
            Ok(()) => {
                self.state = SessionState::Active;
                info!("session active");
                Ok(Negotiated { peer, config })
            }
            Err(e) => {
                warn!("negotiation failed: {e}");
                peer.close().await;
                self.state = SessionState::Idle;
                Err(e)
            }
        }
    }

    async fn exchange(&self, peer: &dyn PeerSession, config: &SessionConfig) -> Result<(), NegotiationError> {
        let order = prefer_codec(&peer.video_codecs(), &config.codec);
        if order.matched > 0 {
            debug!("{} codec(s) match {:?}; moving them first", order.matched, config.codec);
            if let Err(e) = peer.set_video_codec_preferences(order.ordered).await {
                warn!("could not apply codec preferences: {e}");
            }
        } else {
            debug!("no codec matches {:?}; keeping platform order", config.codec);
        }

        let offer = peer.create_offer().await?;
        let request = OfferRequest::new(offer, config);
        let answer = self.signaling.post_offer(&config.offer_url(), &request).await?;
        if answer.kind != SdpType::Answer {
            return Err(PeerError::NotAnAnswer.into());
        }
        peer.apply_answer(answer).await?;
        Ok(())
    }

    /// Ends the session: best-effort end notification, then close.
    ///
    /// Always leaves the negotiator `Idle`.
    pub async fn teardown(&mut self, peer: &dyn PeerSession, config: &SessionConfig) {
        self.state = SessionState::Closing;
        if let Err(e) = self.signaling.end_session(&config.end_url()).await {
            warn!("end-session call failed (ignored): {e}");
        }
        peer.close().await;
        self.state = SessionState::Idle;
        info!("session closed");
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
