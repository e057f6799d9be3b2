//! Integration tests for the pcloud-core public API.
//!
//! These exercise the crate-root re-exports the client crate relies on: MAC
//! normalisation (including a property test), the magic packet, the offer
//! body built from a session config, and pairing import into a host profile.

use pcloud_core::domain::mac::normalize;
use pcloud_core::protocol::wake::{magic_packet, MAGIC_PACKET_LEN, WAKE_PORT};
use pcloud_core::protocol::OfferRequest;
use pcloud_core::{Bitrate, HostProfile, MacAddress, PairingRecord, SessionConfig, DEFAULT_PORT};
use proptest::prelude::*;

// ── MAC normalisation properties ──────────────────────────────────────────────

fn separator() -> impl Strategy<Value = &'static str> {
    prop_oneof![Just(":"), Just("-"), Just(""), Just(" ")]
}

proptest! {
    #[test]
    fn prop_normalize_is_canonical_and_idempotent(
        octets in proptest::array::uniform6(any::<u8>()),
        sep in separator(),
        upper in any::<bool>(),
    ) {
        let text = octets
            .iter()
            .map(|o| if upper { format!("{o:02X}") } else { format!("{o:02x}") })
            .collect::<Vec<_>>()
            .join(sep);

        let once = normalize(&text).unwrap();
        let twice = normalize(&once).unwrap();

        prop_assert_eq!(&once, &twice);
        prop_assert_eq!(once.len(), 17);
        prop_assert!(once.chars().all(|c| c == ':' || c.is_ascii_digit() || c.is_ascii_uppercase()));
        prop_assert_eq!(MacAddress::parse(&once).unwrap().octets(), octets);
    }

    #[test]
    fn prop_wrong_digit_count_is_rejected(digits in "[0-9a-f]{0,24}") {
        prop_assume!(digits.len() != 12);
        prop_assert!(normalize(&digits).is_err());
    }

    #[test]
    fn prop_non_hex_letters_are_rejected(bad in "[g-zG-Z]") {
        let text = format!("AA:BB:CC:DD:EE:F{bad}");
        prop_assert!(normalize(&text).is_err());
    }
}

// ── Wake packet ───────────────────────────────────────────────────────────────

#[test]
fn test_magic_packet_for_aa_bb_cc_dd_ee_ff() {
    // Arrange
    let mac: MacAddress = "AA:BB:CC:DD:EE:FF".parse().unwrap();

    // Act
    let packet = magic_packet(&mac);

    // Assert
    assert_eq!(MAGIC_PACKET_LEN, 102);
    assert_eq!(WAKE_PORT, 9);
    assert_eq!(&packet[..6], &[0xFF; 6]);
    let expected: Vec<u8> = std::iter::repeat([0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF])
        .take(16)
        .flatten()
        .collect();
    assert_eq!(&packet[6..], expected.as_slice());
}

// ── Offer body ────────────────────────────────────────────────────────────────

#[test]
fn test_offer_body_uses_rounded_dimensions() {
    // Arrange
    let config = SessionConfig {
        server: "http://192.168.0.42:8080".into(),
        codec: "h264".into(),
        audio: true,
        fps: 60,
        width: 1281,
        height: 721,
        preset: "p1".into(),
        bitrate: Bitrate::megabits(25),
        capture: "desktop".into(),
    }
    .validated()
    .unwrap();

    // Act
    let body = serde_json::to_value(OfferRequest::new("sdp", &config)).unwrap();

    // Assert
    assert_eq!(body["width"], 1282);
    assert_eq!(body["height"], 722);
    assert_eq!(body["type"], "offer");
    assert_eq!(body["bitrate"], "25M");
}

// ── Pairing → profile ─────────────────────────────────────────────────────────

#[test]
fn test_pairing_mac_can_seed_a_host_profile() {
    let record = PairingRecord::from_json(
        r#"{"device_id":"d1","broker":"wss://b","name":"Studio","mac":"aabbccddeeff"}"#,
    )
    .unwrap();

    let mac = record.mac.unwrap().to_string();
    let profile =
        HostProfile::new(record.display_name(), &mac, record.port.unwrap_or(DEFAULT_PORT)).unwrap();

    assert_eq!(profile.name, "Studio");
    assert_eq!(profile.mac.to_string(), "AA:BB:CC:DD:EE:FF");
    assert_eq!(profile.port, 8080);
}
