//! Wake-on-LAN magic packet.
//!
//! Layout (102 bytes):
//!
//! ```text
//! offset  0: FF FF FF FF FF FF        synchronisation stream
//! offset  6: <MAC> × 16               target address, repeated
//! ```
//!
//! The packet is sent as a UDP broadcast to port 9.  Delivery says nothing
//! about whether the target actually woke up.

use crate::domain::mac::{MacAddress, MAC_LEN};

/// Conventional Wake-on-LAN UDP port ("discard").
pub const WAKE_PORT: u16 = 9;

/// Number of times the MAC is repeated after the sync stream.
pub const MAC_REPETITIONS: usize = 16;

/// Total packet size: 6 sync bytes + 16 × 6 address bytes.
pub const MAGIC_PACKET_LEN: usize = MAC_LEN + MAC_LEN * MAC_REPETITIONS;

/// Builds the magic packet for `mac`.
pub fn magic_packet(mac: &MacAddress) -> [u8; MAGIC_PACKET_LEN] {
    let mut packet = [0xFFu8; MAGIC_PACKET_LEN];
    let octets = mac.octets();
    for chunk in packet[MAC_LEN..].chunks_exact_mut(MAC_LEN) {
        chunk.copy_from_slice(&octets);
    }
    packet
}

// ── Tests ─────────────────────────────────────────────────────────────────────
