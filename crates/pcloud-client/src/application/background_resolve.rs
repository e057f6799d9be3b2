//! Periodic re-resolution of profiles without a known address.
//!
//! Every tick claims each unaddressed profile and runs one resolver attempt
//! for it (no retry envelope; the next tick is the retry).  Profiles are
//! resolved concurrently, each on its own task.  A profile still claimed by
//! an earlier tick or by an interactive `resolve` is skipped.

use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Duration;

use pcloud_core::{HostId, MacAddress};
use tokio::task::JoinSet;
use tracing::{debug, info};

use super::manage_profiles::AddressBook;
use super::periodic::PeriodicTask;
use super::resolve_host::{Resolution, Resolver};
use super::retry::RetryPolicy;

/// Default period of the background re-resolver.
pub const BACKGROUND_INTERVAL: Duration = Duration::from_secs(30);

/// A profile claimed for resolution.  Dropping it without [`finish`] (the
/// task was aborted or panicked) releases the claim with no result.
///
/// [`finish`]: Claim::finish
struct Claim {
    book: Arc<AddressBook>,
    id: HostId,
    mac: MacAddress,
    released: bool,
}

impl Claim {
    fn finish(mut self, found: Option<Ipv4Addr>) {
        self.released = true;
        self.book.release(self.id, self.mac, found);
    }
}

impl Drop for Claim {
    fn drop(&mut self) {
        if !self.released {
            debug!("resolution of {} abandoned; releasing claim", self.id);
            self.book.release(self.id, self.mac, None);
        }
    }
}

/// Runs one attempt for every pending profile and returns how many resolved.
pub async fn resolve_pending(book: Arc<AddressBook>, resolver: Arc<Resolver>) -> usize {
    let mut tasks = JoinSet::new();
    for id in book.pending_resolution() {
        let Some(profile) = book.claim(id) else {
            continue;
        };
        let claim = Claim {
            book: Arc::clone(&book),
            id: profile.id,
            mac: profile.mac,
            released: false,
        };
        let resolver = Arc::clone(&resolver);
        tasks.spawn(async move {
            let resolution = resolver
                .resolve_with(&profile.mac, profile.port, None, RetryPolicy::once())
                .await;
            let found = resolution.ip();
            claim.finish(found);
            if let Resolution::Found { ip, .. } = resolution {
                info!("background: {} is at {ip}", profile.name);
            }
            found.is_some()
        });
    }

    let mut resolved = 0;
    while let Some(result) = tasks.join_next().await {
        if matches!(result, Ok(true)) {
            resolved += 1;
        }
    }
    debug!("background pass resolved {resolved} host(s)");
    resolved
}

/// Starts the periodic re-resolver.
///
/// `on_pass` is called after every pass with the number of hosts resolved,
/// e.g. to persist the book.
pub fn spawn_background_resolver(
    book: Arc<AddressBook>,
    resolver: Arc<Resolver>,
    period: Duration,
    on_pass: impl Fn(usize) + Send + Sync + 'static,
) -> PeriodicTask {
    let on_pass = Arc::new(on_pass);
    PeriodicTask::spawn("background-resolve", period, move || {
        let book = Arc::clone(&book);
        let resolver = Arc::clone(&resolver);
        let on_pass = Arc::clone(&on_pass);
        async move {
            let resolved = resolve_pending(book, resolver).await;
            on_pass(resolved);
        }
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::resolve_host::ResolverConfig;
    use crate::infrastructure::mock::{MockHealthProbe, MockNeighborTable, StaticPrefixes};
    use crate::application::resolve_host::{HealthProbe, ProbeOutcome};
    use async_trait::async_trait;
    use pcloud_core::domain::subnet::{LocalPrefix, Prefix24};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn setup(neighbors: Arc<MockNeighborTable>) -> (Arc<AddressBook>, Arc<Resolver>) {
        let resolver = Resolver::new(
            neighbors,
            Arc::new(StaticPrefixes::new(Vec::new())),
            Arc::new(MockHealthProbe::new()),
            ResolverConfig::default(),
        );
        (Arc::new(AddressBook::new()), Arc::new(resolver))
    }

    #[tokio::test]
    async fn test_pass_resolves_only_unaddressed_profiles() {
        // Arrange
        let neighbors = Arc::new(MockNeighborTable::new());
        neighbors.insert(
            MacAddress::parse("AA:BB:CC:DD:EE:01").unwrap(),
            Ipv4Addr::new(192, 168, 0, 21),
        );
        let (book, resolver) = setup(neighbors.clone());
        let a = book.add("a", "AA:BB:CC:DD:EE:01", 8080).unwrap().id;
        let b = book.add("b", "AA:BB:CC:DD:EE:02", 8080).unwrap().id;
        book.set_ip(b, Some(Ipv4Addr::new(10, 0, 0, 2))).unwrap();

        // Act
        let resolved = resolve_pending(book.clone(), resolver).await;

        // Assert
        assert_eq!(resolved, 1);
        assert_eq!(neighbors.lookups(), 1);
        let profile = book.get(a).unwrap();
        assert_eq!(profile.ip, Some(Ipv4Addr::new(192, 168, 0, 21)));
        assert!(!profile.is_resolving());
    }

    #[tokio::test]
    async fn test_claimed_profile_is_skipped() {
        let neighbors = Arc::new(MockNeighborTable::new());
        let (book, resolver) = setup(neighbors.clone());
        let id = book.add("a", "AA:BB:CC:DD:EE:01", 8080).unwrap().id;
        book.claim(id);

        let resolved = resolve_pending(book, resolver).await;

        assert_eq!(resolved, 0);
        assert_eq!(neighbors.lookups(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_resolver_runs_every_period() {
        // Arrange
        let neighbors = Arc::new(MockNeighborTable::new());
        let (book, resolver) = setup(neighbors.clone());
        book.add("a", "AA:BB:CC:DD:EE:01", 8080).unwrap();
        let passes = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&passes);

        // Act
        let task = spawn_background_resolver(book, resolver, BACKGROUND_INTERVAL, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        tokio::time::sleep(Duration::from_secs(95)).await;
        task.stop().await;

        // Assert
        assert_eq!(passes.load(Ordering::SeqCst), 3);
        assert_eq!(neighbors.lookups(), 3);
    }

    /// Every candidate is dead and takes half a second to say so.
    struct SlowDeadHealth;

    #[async_trait]
    impl HealthProbe for SlowDeadHealth {
        async fn probe(&self, _ip: Ipv4Addr, _port: u16, _timeout: Duration) -> ProbeOutcome {
            tokio::time::sleep(Duration::from_millis(500)).await;
            ProbeOutcome::Dead
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_stopping_mid_pass_releases_the_claim() {
        // Arrange: one /24 takes several seconds to sweep.
        let resolver = Arc::new(Resolver::new(
            Arc::new(MockNeighborTable::new()),
            Arc::new(StaticPrefixes::new(vec![LocalPrefix {
                prefix: Prefix24::new(192, 168, 0),
                local: Ipv4Addr::new(192, 168, 0, 10),
            }])),
            Arc::new(SlowDeadHealth),
            ResolverConfig::default(),
        ));
        let book = Arc::new(AddressBook::new());
        let id = book.add("a", "AA:BB:CC:DD:EE:01", 8080).unwrap().id;
        let task = spawn_background_resolver(book.clone(), resolver, BACKGROUND_INTERVAL, |_| {});
        tokio::time::sleep(BACKGROUND_INTERVAL + Duration::from_millis(200)).await;
        assert!(book.get(id).unwrap().is_resolving());

        // Act
        task.stop().await;
        tokio::time::sleep(Duration::from_secs(1)).await;

        // Assert
        assert!(!book.get(id).unwrap().is_resolving());
        assert_eq!(book.pending_resolution(), vec![id]);
        assert!(book.claim(id).is_some());
    }
}
