//! Pairing record domain entity.
//!
//! A pairing record is a trust artifact exported by a host and imported by
//! the user from a JSON file.  The client never generates one itself and
//! never edits one: replacing a record means deleting it and importing again.
//!
//! # File format
//!
//! ```json
//! { "device_id": "3f2a…", "broker": "wss://broker.example.com/ws",
//!   "name": "Studio PC", "mac": "AA:BB:CC:DD:EE:FF",
//!   "port": 8080, "lan_token": "k7…" }
//! ```
//!
//! `device_id` and `broker` are required and must be non-empty.  Every other
//! field is optional, and fields this client does not know (`ver`, `pub`,
//! `fp`, …) are ignored.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::mac::{MacAddress, MacError};

/// Reasons a pairing file is rejected.
#[derive(Debug, Error)]
pub enum PairingError {
    #[error("pairing file is not valid JSON: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("pairing file is missing required field `{0}`")]
    MissingField(&'static str),

    #[error("pairing file has an invalid MAC address: {0}")]
    InvalidMac(#[from] MacError),

    #[error("pairing file has port {0}, expected 1-65535")]
    InvalidPort(i64),
}

/// An imported pairing record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairingRecord {
    pub device_id: String,
    pub broker: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mac: Option<MacAddress>,
    /// Health port advertised by the host.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    /// Shared secret the host expects in LAN discovery requests.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lan_token: Option<String>,
}

/// Shape of the file on disk before validation.
#[derive(Deserialize)]
struct RawPairingFile {
    device_id: Option<String>,
    broker: Option<String>,
    name: Option<String>,
    mac: Option<String>,
    port: Option<i64>,
    lan_token: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

impl PairingRecord {
    /// Parses and validates the contents of a pairing file.
    ///
    /// # Errors
    ///
    /// - [`PairingError::Malformed`] if the text is not a JSON object.
    /// - [`PairingError::MissingField`] if `device_id` or `broker` is absent
    ///   or empty.
    /// - [`PairingError::InvalidMac`] / [`PairingError::InvalidPort`] if an
    ///   optional field is present but malformed.
    pub fn from_json(text: &str) -> Result<Self, PairingError> {
        let raw: RawPairingFile = serde_json::from_str(text)?;

        let device_id = non_empty(raw.device_id).ok_or(PairingError::MissingField("device_id"))?;
        let broker = non_empty(raw.broker).ok_or(PairingError::MissingField("broker"))?;

        let mac = non_empty(raw.mac)
            .map(|m| MacAddress::parse(&m))
            .transpose()?;

        // The exporter writes 0 for "unspecified".
        let port = match raw.port {
            None | Some(0) => None,
            Some(p) => Some(u16::try_from(p).map_err(|_| PairingError::InvalidPort(p))?),
        };

        Ok(Self {
            device_id,
            broker,
            name: non_empty(raw.name),
            mac,
            port,
            lan_token: non_empty(raw.lan_token),
        })
    }

    /// Label to show for this record: the friendly name, or the device id.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.device_id)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
