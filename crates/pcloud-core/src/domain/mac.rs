//! Hardware (MAC) addresses.
//!
//! A MAC address is the only identity of a host that survives a reboot: the
//! IP address may change every time DHCP hands out a new lease.  Users type
//! MAC addresses in many shapes (`aa-bb-cc-dd-ee-ff`, `AABB.CCDD.EEFF`,
//! `aabbccddeeff`), and `arp`/`ip neigh` print them in yet other shapes, so
//! every comparison goes through [`MacAddress`] rather than raw strings.
//!
//! # Canonical form
//!
//! Six uppercase hex pairs separated by colons: `AA:BB:CC:DD:EE:FF`.
//! Formatting a parsed address always produces this form, and parsing the
//! canonical form yields the same address, so normalisation is idempotent.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of octets in an EUI-48 hardware address.
pub const MAC_LEN: usize = 6;

/// Error type for MAC address parsing.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MacError {
    /// The input contained a character that is neither a hex digit nor a
    /// recognised separator.
    #[error("invalid character {found:?} in MAC address")]
    InvalidCharacter { found: char },

    /// The input did not contain exactly 12 hex digits.
    #[error("MAC address must contain 12 hex digits, found {digits}")]
    WrongLength { digits: usize },
}

/// A validated 6-octet hardware address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MacAddress([u8; MAC_LEN]);

impl MacAddress {
    /// Creates an address from raw octets.
    pub const fn new(octets: [u8; MAC_LEN]) -> Self {
        Self(octets)
    }

    /// Parses any common textual representation.
    ///
    /// Accepted separators are `:`, `-`, `.` and whitespace; they may appear
    /// anywhere and are ignored.  Hex digits are case-insensitive.
    ///
    /// # Errors
    ///
    /// Returns [`MacError::InvalidCharacter`] for any other character and
    /// [`MacError::WrongLength`] when the digit count is not 12.
    pub fn parse(input: &str) -> Result<Self, MacError> {
        let mut nibbles = Vec::with_capacity(MAC_LEN * 2);
        for c in input.chars() {
            match c {
                ':' | '-' | '.' => continue,
                c if c.is_whitespace() => continue,
                c => match c.to_digit(16) {
                    Some(n) => nibbles.push(n as u8),
                    None => return Err(MacError::InvalidCharacter { found: c }),
                },
            }
        }

        if nibbles.len() != MAC_LEN * 2 {
            return Err(MacError::WrongLength {
                digits: nibbles.len(),
            });
        }

        let mut octets = [0u8; MAC_LEN];
        for (i, pair) in nibbles.chunks_exact(2).enumerate() {
            octets[i] = (pair[0] << 4) | pair[1];
        }
        Ok(Self(octets))
    }

    /// Returns the raw octets.
    pub const fn octets(&self) -> [u8; MAC_LEN] {
        self.0
    }
}

/// Parses `input` and returns its canonical uppercase colon-separated form.
///
/// # Errors
///
/// See [`MacAddress::parse`].
pub fn normalize(input: &str) -> Result<String, MacError> {
    MacAddress::parse(input).map(|mac| mac.to_string())
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02X}:{b:02X}:{c:02X}:{d:02X}:{e:02X}:{g:02X}")
    }
}

impl FromStr for MacAddress {
    type Err = MacError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for MacAddress {
    type Error = MacError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<MacAddress> for String {
    fn from(mac: MacAddress) -> Self {
        mac.to_string()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_colon_separated_lowercase() {
        // Arrange / Act
        let mac = MacAddress::parse("aa:bb:cc:dd:ee:ff").unwrap();

        // Assert
        assert_eq!(mac.octets(), [0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF]);
    }

    #[test]
    fn test_parse_dash_separated_windows_style() {
        let mac = MacAddress::parse("00-1a-2B-3c-4D-5e").unwrap();
        assert_eq!(mac.to_string(), "00:1A:2B:3C:4D:5E");
    }

    #[test]
    fn test_parse_dotted_cisco_style() {
        let mac = MacAddress::parse("aabb.ccdd.eeff").unwrap();
        assert_eq!(mac.to_string(), "AA:BB:CC:DD:EE:FF");
    }

    #[test]
    fn test_parse_bare_hex_digits() {
        let mac = MacAddress::parse("0123456789ab").unwrap();
        assert_eq!(mac.to_string(), "01:23:45:67:89:AB");
    }

    #[test]
    fn test_parse_rejects_non_hex_character() {
        // Arrange
        let input = "AA:BB:CC:DD:EE:GG";

        // Act
        let result = MacAddress::parse(input);

        // Assert
        assert_eq!(result, Err(MacError::InvalidCharacter { found: 'G' }));
    }

    #[test]
    fn test_parse_rejects_too_few_digits() {
        let result = MacAddress::parse("AA:BB:CC:DD:EE");
        assert_eq!(result, Err(MacError::WrongLength { digits: 10 }));
    }

    #[test]
    fn test_parse_rejects_too_many_digits() {
        let result = MacAddress::parse("AA:BB:CC:DD:EE:FF:00");
        assert_eq!(result, Err(MacError::WrongLength { digits: 14 }));
    }

    #[test]
    fn test_parse_rejects_empty_string() {
        assert_eq!(
            MacAddress::parse(""),
            Err(MacError::WrongLength { digits: 0 })
        );
    }

    #[test]
    fn test_normalize_is_idempotent_on_canonical_form() {
        let once = normalize("aa-bb-cc-dd-ee-ff").unwrap();
        let twice = normalize(&once).unwrap();
        assert_eq!(once, twice);
        assert_eq!(twice, "AA:BB:CC:DD:EE:FF");
    }

    #[test]
    fn test_serde_uses_canonical_string() {
        // Arrange
        let mac = MacAddress::new([0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF]);

        // Act
        let json = serde_json::to_string(&mac).unwrap();
        let back: MacAddress = serde_json::from_str("\"aabbccddeeff\"").unwrap();

        // Assert
        assert_eq!(json, "\"AA:BB:CC:DD:EE:FF\"");
        assert_eq!(back, mac);
    }

    #[test]
    fn test_serde_rejects_invalid_string() {
        let result: Result<MacAddress, _> = serde_json::from_str("\"not-a-mac\"");
        assert!(result.is_err());
    }
}
