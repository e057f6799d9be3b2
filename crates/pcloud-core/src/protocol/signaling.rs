//! JSON bodies exchanged with the host's HTTP endpoints.
//!
//! - `GET /healthz` returns a [`HealthReport`].
//! - `POST /api/session/offer` takes an [`OfferRequest`] and answers with a
//!   [`SessionDescription`].
//! - `POST /api/session/end` takes no body.

use serde::{Deserialize, Serialize};

use crate::domain::session::SessionConfig;

/// Kind of an SDP blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SdpType {
    Offer,
    Answer,
    Pranswer,
    Rollback,
}

/// An SDP blob together with its kind, as both ends exchange it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDescription {
    pub sdp: String,
    #[serde(rename = "type")]
    pub kind: SdpType,
}

/// Body of `POST /api/session/offer`.
///
/// The local offer plus every stream parameter the host needs to configure
/// its capture and encoder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfferRequest {
    pub sdp: String,
    #[serde(rename = "type")]
    pub kind: SdpType,
    pub codec: String,
    pub audio: bool,
    pub fps: u32,
    pub width: u32,
    pub height: u32,
    pub preset: String,
    pub bitrate: String,
    pub capture: String,
}

impl OfferRequest {
    /// Builds the request for an offer SDP and a validated config.
    pub fn new(offer_sdp: impl Into<String>, config: &SessionConfig) -> Self {
        Self {
            sdp: offer_sdp.into(),
            kind: SdpType::Offer,
            codec: config.codec.clone(),
            audio: config.audio,
            fps: config.fps,
            width: config.width,
            height: config.height,
            preset: config.preset.clone(),
            bitrate: config.bitrate.to_string(),
            capture: config.capture.clone(),
        }
    }
}

/// Body of a health response.
///
/// Hosts in the field report liveness under different keys; any one of
/// `ok: true`, `status: "ok"` or `healthy: true` counts.  A body that fails
/// to parse as this shape is treated as not healthy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct HealthReport {
    #[serde(default)]
    pub ok: Option<bool>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub healthy: Option<bool>,
    /// Optional friendly name of the host.
    #[serde(default)]
    pub name: Option<String>,
}

impl HealthReport {
    /// Parses a response body; `None` if it is not a JSON object of the
    /// expected shape.
    pub fn parse(body: &[u8]) -> Option<Self> {
        serde_json::from_slice(body).ok()
    }

    /// Returns `true` if any recognised liveness key is set.
    pub fn is_healthy(&self) -> bool {
        self.ok == Some(true)
            || self.healthy == Some(true)
            || self
                .status
                .as_deref()
                .is_some_and(|s| s.eq_ignore_ascii_case("ok"))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
