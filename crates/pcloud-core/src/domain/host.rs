//! Host profile domain entity.
//!
//! A [`HostProfile`] is the user's record of one remote machine.  The MAC
//! address is the durable identity; the IP address is only a cache of the
//! last successful resolution and may be cleared at any time to force
//! auto-resolution.

use std::fmt;
use std::net::Ipv4Addr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use super::mac::{MacAddress, MacError};

/// Port the host's HTTP service listens on unless configured otherwise.
pub const DEFAULT_PORT: u16 = 8080;

/// Opaque identifier of a host profile, assigned once at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HostId(Uuid);

impl HostId {
    /// Generates a fresh random identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for HostId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for HostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl std::str::FromStr for HostId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Errors raised while creating or editing a [`HostProfile`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HostProfileError {
    #[error("invalid MAC address: {0}")]
    InvalidMac(#[from] MacError),

    #[error("port {0} is outside 1-65535")]
    InvalidPort(u32),
}

/// Validates a user-supplied port number.
///
/// # Errors
///
/// Returns [`HostProfileError::InvalidPort`] for 0 and anything above 65535.
pub fn validate_port(port: u32) -> Result<u16, HostProfileError> {
    match u16::try_from(port) {
        Ok(p) if p != 0 => Ok(p),
        _ => Err(HostProfileError::InvalidPort(port)),
    }
}

/// The user's record of a remote machine.
///
/// `online` and `resolving` are runtime state: they are never persisted and
/// start out `false` when a profile is loaded from disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostProfile {
    pub id: HostId,
    pub name: String,
    pub mac: MacAddress,
    /// Last-known address; `None` means "unknown, auto-resolve".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip: Option<Ipv4Addr>,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Advisory liveness cache.  Always re-verified before use.
    #[serde(skip)]
    pub online: bool,
    #[serde(skip)]
    resolving: bool,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

impl HostProfile {
    /// Creates a profile with a fresh id, no known IP, and the offline flag.
    ///
    /// The MAC is validated before anything is stored.
    ///
    /// # Errors
    ///
    /// Returns [`HostProfileError::InvalidMac`] for a malformed MAC.
    pub fn new(name: impl Into<String>, mac: &str, port: u16) -> Result<Self, HostProfileError> {
        let mac = MacAddress::parse(mac)?;
        if port == 0 {
            return Err(HostProfileError::InvalidPort(0));
        }
        Ok(Self {
            id: HostId::new(),
            name: name.into(),
            mac,
            ip: None,
            port,
            online: false,
            resolving: false,
        })
    }

    /// Changes the display label.
    pub fn rename(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Replaces the MAC address.
    ///
    /// A different MAC identifies a different machine, so the cached IP and
    /// liveness are cleared.  The profile is left untouched on error.
    pub fn change_mac(&mut self, mac: &str) -> Result<(), HostProfileError> {
        let mac = MacAddress::parse(mac)?;
        if mac != self.mac {
            self.mac = mac;
            self.ip = None;
            self.online = false;
        }
        Ok(())
    }

    /// Changes the service port.
    pub fn change_port(&mut self, port: u32) -> Result<(), HostProfileError> {
        self.port = validate_port(port)?;
        self.online = false;
        Ok(())
    }

    /// Sets or clears a manual IP override.
    ///
    /// Clearing it (`None`) puts the profile back into auto-resolve mode.
    pub fn set_ip(&mut self, ip: Option<Ipv4Addr>) {
        self.ip = ip;
        self.online = false;
    }

    /// Records a successful resolution.
    pub fn apply_resolution(&mut self, ip: Ipv4Addr) {
        self.ip = Some(ip);
        self.online = true;
    }

    /// Returns `true` when the profile has no cached address.
    pub fn needs_resolution(&self) -> bool {
        self.ip.is_none()
    }

    /// Claims the profile for a resolution attempt.
    ///
    /// Returns `false` if another resolution is already in flight; the caller
    /// must not start a second one.
    pub fn try_begin_resolve(&mut self) -> bool {
        if self.resolving {
            return false;
        }
        self.resolving = true;
        true
    }

    /// Releases the claim taken by [`try_begin_resolve`](Self::try_begin_resolve).
    pub fn finish_resolve(&mut self) {
        self.resolving = false;
    }

    /// Returns `true` while a resolution is in flight.
    pub fn is_resolving(&self) -> bool {
        self.resolving
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> HostProfile {
        HostProfile::new("Desk", "aa-bb-cc-dd-ee-ff", DEFAULT_PORT).unwrap()
    }

    #[test]
    fn test_new_profile_normalizes_mac_and_starts_unresolved() {
        // Arrange / Act
        let host = sample();

        // Assert
        assert_eq!(host.mac.to_string(), "AA:BB:CC:DD:EE:FF");
        assert_eq!(host.ip, None);
        assert!(!host.online);
        assert!(!host.is_resolving());
        assert!(host.needs_resolution());
    }

    #[test]
    fn test_new_profile_rejects_invalid_mac() {
        let result = HostProfile::new("Desk", "not a mac", DEFAULT_PORT);
        assert!(matches!(result, Err(HostProfileError::InvalidMac(_))));
    }

    #[test]
    fn test_new_profile_rejects_port_zero() {
        let result = HostProfile::new("Desk", "AA:BB:CC:DD:EE:FF", 0);
        assert_eq!(result, Err(HostProfileError::InvalidPort(0)));
    }

    #[test]
    fn test_ids_are_unique() {
        assert_ne!(sample().id, sample().id);
    }

    #[test]
    fn test_change_mac_invalidates_ip_and_online() {
        // Arrange
        let mut host = sample();
        host.apply_resolution(Ipv4Addr::new(192, 168, 0, 42));

        // Act
        host.change_mac("11:22:33:44:55:66").unwrap();

        // Assert
        assert_eq!(host.mac.to_string(), "11:22:33:44:55:66");
        assert_eq!(host.ip, None);
        assert!(!host.online);
    }

    #[test]
    fn test_change_mac_to_same_address_keeps_ip() {
        let mut host = sample();
        host.apply_resolution(Ipv4Addr::new(10, 0, 0, 5));

        host.change_mac("aabbccddeeff").unwrap();

        assert_eq!(host.ip, Some(Ipv4Addr::new(10, 0, 0, 5)));
    }

    #[test]
    fn test_change_mac_rejects_invalid_input_and_keeps_state() {
        let mut host = sample();
        host.apply_resolution(Ipv4Addr::new(10, 0, 0, 5));

        let result = host.change_mac("zz");

        assert!(result.is_err());
        assert_eq!(host.mac.to_string(), "AA:BB:CC:DD:EE:FF");
        assert_eq!(host.ip, Some(Ipv4Addr::new(10, 0, 0, 5)));
    }

    #[test]
    fn test_validate_port_bounds() {
        assert_eq!(validate_port(1), Ok(1));
        assert_eq!(validate_port(65535), Ok(65535));
        assert_eq!(validate_port(0), Err(HostProfileError::InvalidPort(0)));
        assert_eq!(
            validate_port(65536),
            Err(HostProfileError::InvalidPort(65536))
        );
    }

    #[test]
    fn test_resolving_flag_prevents_second_claim() {
        // Arrange
        let mut host = sample();

        // Act
        let first = host.try_begin_resolve();
        let second = host.try_begin_resolve();
        host.finish_resolve();
        let third = host.try_begin_resolve();

        // Assert
        assert!(first);
        assert!(!second);
        assert!(third);
    }

    #[test]
    fn test_set_ip_none_returns_to_auto_resolve() {
        let mut host = sample();
        host.apply_resolution(Ipv4Addr::new(192, 168, 1, 9));

        host.set_ip(None);

        assert!(host.needs_resolution());
        assert!(!host.online);
    }

    #[test]
    fn test_runtime_flags_are_not_serialized() {
        // Arrange
        let mut host = sample();
        host.apply_resolution(Ipv4Addr::new(192, 168, 0, 42));
        host.try_begin_resolve();

        // Act
        let json = serde_json::to_string(&host).unwrap();
        let back: HostProfile = serde_json::from_str(&json).unwrap();

        // Assert
        assert!(!json.contains("online"));
        assert!(!json.contains("resolving"));
        assert_eq!(back.ip, host.ip);
        assert!(!back.online);
        assert!(!back.is_resolving());
    }

    #[test]
    fn test_missing_port_defaults_to_8080() {
        let json = r#"{"id":"7d1d8f5e-5f38-4f7a-9d7c-2d7f0a3b9e11","name":"x","mac":"AA:BB:CC:DD:EE:FF"}"#;
        let host: HostProfile = serde_json::from_str(json).unwrap();
        assert_eq!(host.port, 8080);
        assert_eq!(host.ip, None);
    }
}
