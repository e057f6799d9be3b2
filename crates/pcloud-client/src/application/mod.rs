//! Application layer use cases for the client.
//!
//! Everything in here talks to the outside world only through traits, so the
//! whole layer runs against the recording fakes in
//! `infrastructure::mock` in tests.
//!
//! # What use cases does the client have?
//!
//! - **`resolve_host`** – The discovery engine: MAC address to live IP via the
//!   neighbor cache, an IP hint, and a bounded /24 sweep, wrapped in a retry
//!   envelope.
//!
//! - **`wake_host`** – Validates a MAC and hands the Wake-on-LAN packet to a
//!   transport.
//!
//! - **`negotiate_session`** – Creates a peer connection, orders codecs,
//!   exchanges offer/answer with the host, and tears the session down.
//!
//! - **`input_transport`** – Turns local pointer, keyboard, and controller
//!   events into input-channel messages (coalescing, repeat suppression,
//!   controller diffing).
//!
//! - **`telemetry`** – Samples the peer's inbound counters once a second and
//!   hands rates to an observer.
//!
//! - **`session_controller`** – Composition root: owns the single active
//!   session and sequences resolve, wake, negotiate, input, and telemetry.
//!
//! - **`manage_profiles`** / **`manage_pairings`** – In-memory address book
//!   and pairing store.
//!
//! - **`background_resolve`** / **`host_liveness`** – Periodic re-resolution of
//!   unaddressed profiles, online refresh, and waiting for a booting host.
//!
//! - **`retry`** / **`periodic`** – The two scheduling primitives the rest is
//!   built on.

pub mod background_resolve;
pub mod host_liveness;
pub mod input_transport;
pub mod manage_pairings;
pub mod manage_profiles;
pub mod negotiate_session;
pub mod peer;
pub mod periodic;
pub mod resolve_host;
pub mod retry;
pub mod session_controller;
pub mod telemetry;
pub mod wake_host;
