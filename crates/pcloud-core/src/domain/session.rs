//! Session configuration value object.
//!
//! [`SessionConfig`] describes the stream the client asks the host to
//! produce.  It is validated once, before negotiation starts, and then handed
//! to the session by value: a running session never sees it change, and a new
//! set of parameters means a new session.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while validating a [`SessionConfig`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SessionConfigError {
    #[error("invalid bitrate {0:?}: expected a number with an optional K, M or G suffix")]
    InvalidBitrate(String),

    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },

    #[error("server URL {0:?} must start with http:// or https://")]
    InvalidServer(String),

    #[error("{field} must not be empty")]
    Empty { field: &'static str },
}

/// Unit suffix of a [`Bitrate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BitrateUnit {
    Kilo,
    Mega,
    Giga,
}

impl BitrateUnit {
    fn suffix(self) -> char {
        match self {
            BitrateUnit::Kilo => 'K',
            BitrateUnit::Mega => 'M',
            BitrateUnit::Giga => 'G',
        }
    }

    fn multiplier(self) -> u64 {
        match self {
            BitrateUnit::Kilo => 1_000,
            BitrateUnit::Mega => 1_000_000,
            BitrateUnit::Giga => 1_000_000_000,
        }
    }
}

/// Target encoder bitrate, written the way encoders expect it (`"25M"`).
///
/// A bare number is read as megabits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Bitrate {
    pub value: u32,
    pub unit: BitrateUnit,
}

impl Bitrate {
    pub const fn megabits(value: u32) -> Self {
        Self {
            value,
            unit: BitrateUnit::Mega,
        }
    }

    /// Returns the rate in bits per second.
    pub fn bits_per_second(&self) -> u64 {
        u64::from(self.value) * self.unit.multiplier()
    }
}

impl fmt::Display for Bitrate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.value, self.unit.suffix())
    }
}

impl FromStr for Bitrate {
    type Err = SessionConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let invalid = || SessionConfigError::InvalidBitrate(s.to_string());

        let (digits, unit) = match trimmed.chars().last() {
            Some('k' | 'K') => (&trimmed[..trimmed.len() - 1], BitrateUnit::Kilo),
            Some('m' | 'M') => (&trimmed[..trimmed.len() - 1], BitrateUnit::Mega),
            Some('g' | 'G') => (&trimmed[..trimmed.len() - 1], BitrateUnit::Giga),
            Some(c) if c.is_ascii_digit() => (trimmed, BitrateUnit::Mega),
            _ => return Err(invalid()),
        };

        let value: u32 = digits.parse().map_err(|_| invalid())?;
        if value == 0 {
            return Err(SessionConfigError::Zero { field: "bitrate" });
        }
        Ok(Self { value, unit })
    }
}

impl TryFrom<String> for Bitrate {
    type Error = SessionConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Bitrate> for String {
    fn from(b: Bitrate) -> Self {
        b.to_string()
    }
}

/// Parameters of the stream to negotiate with a host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Base URL of the host's signaling service, e.g. `http://192.168.0.42:8080`.
    pub server: String,
    /// Codec token matched against the platform's codec list (`"h264"`).
    pub codec: String,
    pub audio: bool,
    pub fps: u32,
    pub width: u32,
    pub height: u32,
    /// Encoder preset passed through to the host (`"p1"`).
    pub preset: String,
    pub bitrate: Bitrate,
    /// Capture-source selector passed through to the host.
    pub capture: String,
}

/// Rounds an odd dimension up to the next even value.
///
/// `u32::MAX` has no even successor and is rounded down instead.
pub fn even_up(n: u32) -> u32 {
    match n.checked_add(n & 1) {
        Some(even) => even,
        None => n - 1,
    }
}

impl SessionConfig {
    /// Validates the config and rounds width and height up to even values.
    ///
    /// The trailing `/` of `server` is removed so endpoint paths can be
    /// appended directly.
    ///
    /// # Errors
    ///
    /// Returns [`SessionConfigError`] for a zero fps or dimension, an empty
    /// codec, or a server URL without an HTTP scheme.
    pub fn validated(mut self) -> Result<Self, SessionConfigError> {
        if self.fps == 0 {
            return Err(SessionConfigError::Zero { field: "fps" });
        }
        if self.width == 0 {
            return Err(SessionConfigError::Zero { field: "width" });
        }
        if self.height == 0 {
            return Err(SessionConfigError::Zero { field: "height" });
        }
        if self.codec.trim().is_empty() {
            return Err(SessionConfigError::Empty { field: "codec" });
        }

        let server = self.server.trim().trim_end_matches('/').to_string();
        if !(server.starts_with("http://") || server.starts_with("https://")) {
            return Err(SessionConfigError::InvalidServer(self.server));
        }

        self.server = server;
        self.width = even_up(self.width);
        self.height = even_up(self.height);
        Ok(self)
    }

    /// `POST` target for the SDP offer.
    pub fn offer_url(&self) -> String {
        format!("{}/api/session/offer", self.server)
    }

    /// `POST` target for the best-effort end-of-session notice.
    pub fn end_url(&self) -> String {
        format!("{}/api/session/end", self.server)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> SessionConfig {
        SessionConfig {
            server: "http://192.168.0.42:8080/".to_string(),
            codec: "h264".to_string(),
            audio: true,
            fps: 60,
            width: 1920,
            height: 1080,
            preset: "p1".to_string(),
            bitrate: Bitrate::megabits(25),
            capture: "desktop".to_string(),
        }
    }

    #[test]
    fn test_odd_dimensions_are_rounded_up() {
        // Arrange
        let mut cfg = base();
        cfg.width = 1365;
        cfg.height = 767;

        // Act
        let cfg = cfg.validated().unwrap();

        // Assert
        assert_eq!((cfg.width, cfg.height), (1366, 768));
    }

    #[test]
    fn test_even_dimensions_are_unchanged() {
        let cfg = base().validated().unwrap();
        assert_eq!((cfg.width, cfg.height), (1920, 1080));
    }

    #[test]
    fn test_trailing_slash_is_removed_from_server() {
        let cfg = base().validated().unwrap();
        assert_eq!(cfg.offer_url(), "http://192.168.0.42:8080/api/session/offer");
        assert_eq!(cfg.end_url(), "http://192.168.0.42:8080/api/session/end");
    }

    #[test]
    fn test_server_without_scheme_is_rejected() {
        let mut cfg = base();
        cfg.server = "192.168.0.42:8080".to_string();
        assert!(matches!(
            cfg.validated(),
            Err(SessionConfigError::InvalidServer(_))
        ));
    }

    #[test]
    fn test_zero_fps_is_rejected() {
        let mut cfg = base();
        cfg.fps = 0;
        assert_eq!(
            cfg.validated(),
            Err(SessionConfigError::Zero { field: "fps" })
        );
    }

    #[test]
    fn test_bitrate_parses_suffixes() {
        assert_eq!("25M".parse::<Bitrate>().unwrap(), Bitrate::megabits(25));
        assert_eq!("20".parse::<Bitrate>().unwrap(), Bitrate::megabits(20));
        let k: Bitrate = "8000k".parse().unwrap();
        assert_eq!(k.to_string(), "8000K");
        assert_eq!(k.bits_per_second(), 8_000_000);
    }

    #[test]
    fn test_bitrate_rejects_garbage() {
        assert!("fast".parse::<Bitrate>().is_err());
        assert!("M".parse::<Bitrate>().is_err());
        assert!("".parse::<Bitrate>().is_err());
        assert!("0M".parse::<Bitrate>().is_err());
    }

    #[test]
    fn test_even_up_stays_even_at_top_of_range() {
        assert_eq!(even_up(u32::MAX), u32::MAX - 1);
        assert_eq!(even_up(u32::MAX - 1), u32::MAX - 1);
        assert_eq!(even_up(3), 4);
    }
}
