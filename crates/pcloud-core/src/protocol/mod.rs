//! Wire formats spoken by the client.
//!
//! - **`input`**     – JSON messages on the input data channel.
//! - **`signaling`** – JSON bodies of the offer, answer, and health endpoints.
//! - **`wake`**      – The 102-byte Wake-on-LAN magic packet.
//! - **`announce`**  – LAN discovery and announce datagrams.

pub mod announce;
pub mod input;
pub mod signaling;
pub mod wake;

pub use announce::{AnnounceMessage, ANNOUNCE_PORT};
pub use input::{GamepadState, InputMessage};
pub use signaling::{HealthReport, OfferRequest, SdpType, SessionDescription};
pub use wake::{magic_packet, MAGIC_PACKET_LEN, WAKE_PORT};
