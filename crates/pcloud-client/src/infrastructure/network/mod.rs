//! Network adapters: the HTTP, UDP, and OS-table implementations of the
//! application layer's resolver, wake, and signaling traits.
//!
//! | Module           | Implements                        | Transport           |
//! |------------------|-----------------------------------|---------------------|
//! | `neighbor_table` | `NeighborTable`                   | `ip neigh` / `arp`  |
//! | `interfaces`     | `PrefixSource`                    | OS interface list   |
//! | `health_probe`   | `HealthProbe`                     | HTTP `GET /healthz` |
//! | `wake`           | `WakeTransport`                   | UDP broadcast :9    |
//! | `signaling`      | `SignalingClient`                 | HTTP `POST`         |
//! | `announce`       | paired-host LAN discovery         | UDP :35853          |

pub mod announce;
pub mod health_probe;
pub mod interfaces;
pub mod neighbor_table;
pub mod signaling;
pub mod wake;

pub use announce::{LanLocator, LocatedHost};
pub use health_probe::HttpHealthProbe;
pub use interfaces::InterfacePrefixes;
pub use neighbor_table::SystemNeighborTable;
pub use signaling::HttpSignalingClient;
pub use wake::UdpWakeTransport;
