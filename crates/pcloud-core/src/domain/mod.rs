//! Domain entities for the PCloud client.
//!
//! This module contains pure business logic with no infrastructure
//! dependencies.  Nothing in here opens a socket, reads a file, or spawns a
//! task; the client crate's application layer orchestrates these types and its
//! infrastructure layer supplies the I/O.
//!
//! # Sub-modules
//!
//! - **`mac`**       – Parsing and canonical formatting of hardware addresses.
//! - **`host`**      – `HostProfile`, the user's record of a remote machine.
//! - **`pairing`**   – `PairingRecord`, a trust artifact imported from a file.
//! - **`session`**   – `SessionConfig`, the stream parameters to negotiate.
//! - **`subnet`**    – /24 prefixes and the candidate addresses to sweep.
//! - **`viewport`**  – Mapping pointer positions onto letterboxed video.
//! - **`codec`**     – Ordering the platform's codec list by preference.
//! - **`reception`** – Cumulative counters kept while receiving RTP packets.
//! - **`stats`**     – Per-second rates derived from those counters.

pub mod codec;
pub mod host;
pub mod mac;
pub mod pairing;
pub mod reception;
pub mod session;
pub mod stats;
pub mod subnet;
pub mod viewport;
