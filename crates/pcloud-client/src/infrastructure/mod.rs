//! Infrastructure layer for the client.
//!
//! Contains the OS-facing adapters: the WebRTC peer connection, network
//! probes and signaling, the TOML config file, the headless media sink, and
//! in-memory mocks of every port.
//!
//! **Dependency rule**: this layer may depend on `application` and
//! `pcloud_core`, but MUST NOT be imported by the `application` or domain
//! layers (application unit tests may use `mock`).

pub mod media;
pub mod mock;
pub mod network;
pub mod storage;
pub mod rtc;
