//! # pcloud-core
//!
//! Shared library for the PCloud LAN remote-desktop client containing the
//! domain entities and every wire format the client speaks.
//!
//! It has zero dependencies on OS APIs, sockets, or an async runtime, so
//! everything here can be unit-tested on any machine.
//!
//! # Architecture overview (for beginners)
//!
//! PCloud streams the desktop of a machine on the local network (the "host")
//! to this client.  Before a stream can start the client has to find the host:
//! its MAC address is the only durable identity, because DHCP may hand it a
//! different IP address every time it boots.  Once the host answers on its
//! health endpoint, the client negotiates a peer-to-peer audio/video session
//! and forwards local mouse, keyboard, and gamepad input back to it.
//!
//! This crate (`pcloud-core`) is the shared foundation.  It defines:
//!
//! - **`domain`** – MAC addresses, host profiles, pairing records, the session
//!   configuration, /24 subnet prefixes, pointer mapping onto the video, codec
//!   ordering, and the statistics derived from cumulative receive counters.
//!
//! - **`protocol`** – The JSON messages sent over the input channel, the JSON
//!   bodies of the health and signaling endpoints, the LAN announce datagrams,
//!   and the byte-exact Wake-on-LAN packet.

pub mod domain;
pub mod protocol;

// Re-export the most-used types at the crate root so callers can write
// `pcloud_core::MacAddress` instead of `pcloud_core::domain::mac::MacAddress`.
pub use domain::host::{HostId, HostProfile, HostProfileError, DEFAULT_PORT};
pub use domain::mac::{MacAddress, MacError};
pub use domain::pairing::{PairingError, PairingRecord};
pub use domain::session::{Bitrate, SessionConfig, SessionConfigError};
pub use domain::stats::{InboundVideoCounters, StatsReading, StatsSnapshot, StatsTracker};
pub use domain::subnet::Prefix24;
pub use protocol::input::InputMessage;
