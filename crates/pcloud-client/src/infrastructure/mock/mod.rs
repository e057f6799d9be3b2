//! In-memory fakes for every application-layer port.
//!
//! # Why mocks?
//!
//! The real adapters open sockets, run `ip neigh`, or build a WebRTC stack.
//! Tests need none of that: they need to script what the outside world
//! answers and then inspect what the use case sent.  Each fake here records
//! its calls behind a `Mutex` so it can be shared through an `Arc` with the
//! code under test and inspected afterwards.
//!
//! # Usage in tests
//!
//! ```ignore
//! let health = Arc::new(MockHealthProbe::new());
//! health.set_alive(Ipv4Addr::new(192, 168, 0, 42));
//!
//! let resolver = Resolver::new(
//!     Arc::new(MockNeighborTable::new()),
//!     Arc::new(StaticPrefixes::new(prefixes)),
//!     health.clone(),
//!     ResolverConfig::default(),
//! );
//! resolver.resolve("AA:BB:CC:DD:EE:FF", 8080, None).await?;
//! assert!(!health.probes().is_empty());
//! ```

mod network;
mod peer;

pub use network::{MockHealthProbe, MockNeighborTable, MockWakeTransport, ScriptedSignaling, StaticPrefixes};
pub use peer::{video_codecs, MockInputChannel, MockPeerConnector, MockPeerSession, ScriptedGamepad};
