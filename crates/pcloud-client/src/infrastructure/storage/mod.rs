//! Storage infrastructure: the TOML config file and pairing file import.
//!
//! - **`config`** – Reads and writes `config.toml` (client settings, resolver
//!   tunables, session defaults, host profiles, pairing records) in the
//!   platform config directory.  A missing file yields defaults.
//!
//! - **`pairing_file`** – Reads a pairing JSON file exported by a host and
//!   validates it into a `PairingRecord`.

pub mod config;
pub mod pairing_file;
