//! LAN discovery datagrams.
//!
//! A paired host listens on UDP port 35853.  The client broadcasts a
//! `disc` message naming the device it is looking for; the matching host
//! answers the sender with a unicast `ann` carrying the port of its HTTP
//! service.  Hosts also broadcast a few unsolicited `ann` messages on start.
//!
//! ```json
//! {"t":"disc","v":1,"dev":"<device_id>","port":0,"tok":"<lan_token>"}
//! {"t":"ann","v":1,"dev":"<device_id>","port":8080,"tok":"<lan_token>"}
//! ```

use serde::{Deserialize, Serialize};

/// UDP port hosts listen on for discovery requests.
pub const ANNOUNCE_PORT: u16 = 35853;

/// Only protocol version understood by this client.
pub const ANNOUNCE_VERSION: u32 = 1;

/// Direction of an announce datagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnnounceKind {
    /// Client → hosts: "who is `dev`?"
    Disc,
    /// Host → client: "I am `dev`, my service is on `port`."
    Ann,
}

/// One discovery datagram.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnounceMessage {
    #[serde(rename = "t")]
    pub kind: AnnounceKind,
    #[serde(rename = "v")]
    pub version: u32,
    #[serde(rename = "dev")]
    pub device_id: String,
    #[serde(default)]
    pub port: u16,
    #[serde(rename = "tok", default)]
    pub token: String,
}

impl AnnounceMessage {
    /// Discovery request for `device_id`, authenticated with `token` (may be empty).
    pub fn discover(device_id: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            kind: AnnounceKind::Disc,
            version: ANNOUNCE_VERSION,
            device_id: device_id.into(),
            port: 0,
            token: token.into(),
        }
    }

    /// Parses a received datagram; `None` for anything that is not a
    /// well-formed message.
    pub fn parse(datagram: &[u8]) -> Option<Self> {
        serde_json::from_slice(datagram).ok()
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    /// Returns `true` if this is a version-1 announcement from `device_id`.
    ///
    /// A host with a LAN token echoes it back, so when the client knows a
    /// token the announcement must carry the same one.
    pub fn answers(&self, device_id: &str, token: Option<&str>) -> bool {
        self.kind == AnnounceKind::Ann
            && self.version == ANNOUNCE_VERSION
            && self.device_id == device_id
            && token.map_or(true, |t| t.is_empty() || self.token == t)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
