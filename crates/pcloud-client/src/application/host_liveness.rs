//! Liveness checks against hosts with a known address.
//!
//! - [`refresh_online`] probes every addressed profile once and updates its
//!   advisory `online` flag.
//! - [`wait_for_host`] polls one address until it answers or a deadline
//!   passes, e.g. after a wake packet when the address is already known.

use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;
use tracing::{debug, info};

use super::manage_profiles::AddressBook;
use super::resolve_host::HealthProbe;
use super::retry::{retry_until, RetryPolicy};

/// Default polling interval of [`wait_for_host`].
pub const WAIT_INTERVAL: Duration = Duration::from_secs(2);
/// Default deadline of [`wait_for_host`].
pub const WAIT_TIMEOUT: Duration = Duration::from_secs(120);

/// Probes every profile that has an IP and records the result.
///
/// Returns the number of profiles found online.  Profiles without an IP are
/// marked offline without a probe.
pub async fn refresh_online(book: &AddressBook, probe: Arc<dyn HealthProbe>, timeout: Duration) -> usize {
    let mut tasks = JoinSet::new();
    for profile in book.list() {
        let Some(ip) = profile.ip else {
            let _ = book.set_online(profile.id, false);
            continue;
        };
        let probe = Arc::clone(&probe);
        tasks.spawn(async move {
            let alive = probe.probe(ip, profile.port, timeout).await.is_alive();
            (profile.id, alive)
        });
    }

    let mut online = 0;
    while let Some(joined) = tasks.join_next().await {
        let Ok((id, alive)) = joined else {
            continue;
        };
        if alive {
            online += 1;
        }
        // The profile may have been removed while the probe ran.
        let _ = book.set_online(id, alive);
    }
    debug!("liveness refresh: {online} host(s) online");
    online
}

/// Polls `ip:port` every `interval` until it is alive or `timeout` elapses.
///
/// Returns `true` if the host answered in time.
pub async fn wait_for_host(
    probe: &dyn HealthProbe,
    ip: Ipv4Addr,
    port: u16,
    probe_timeout: Duration,
    timeout: Duration,
    interval: Duration,
) -> bool {
    info!("waiting up to {timeout:?} for {ip}:{port}");
    let result = retry_until(
        RetryPolicy::within(timeout, interval),
        |_| probe.probe(ip, port, probe_timeout),
        |outcome| outcome.is_alive(),
    )
    .await;
    if result.succeeded {
        info!("{ip}:{port} is up after {} probe(s)", result.attempts);
    }
    result.succeeded
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::mock::MockHealthProbe;
    use tokio::time::Instant;

    #[tokio::test]
    async fn test_refresh_marks_live_and_dead_hosts() {
        // Arrange
        let book = AddressBook::new();
        let up = book.add("up", "AA:BB:CC:DD:EE:01", 8080).unwrap().id;
        let down = book.add("down", "AA:BB:CC:DD:EE:02", 8080).unwrap().id;
        let unknown = book.add("unknown", "AA:BB:CC:DD:EE:03", 8080).unwrap().id;
        book.set_ip(up, Some(Ipv4Addr::new(10, 0, 0, 1))).unwrap();
        book.set_ip(down, Some(Ipv4Addr::new(10, 0, 0, 2))).unwrap();
        let probe = Arc::new(MockHealthProbe::new());
        probe.set_alive(Ipv4Addr::new(10, 0, 0, 1));

        // Act
        let online = refresh_online(&book, probe.clone(), Duration::from_millis(800)).await;

        // Assert
        assert_eq!(online, 1);
        assert!(book.get(up).unwrap().online);
        assert!(!book.get(down).unwrap().online);
        assert!(!book.get(unknown).unwrap().online);
        assert_eq!(probe.probes().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_returns_once_host_answers() {
        // Arrange: the host comes up after three failed polls.
        let probe = MockHealthProbe::new();
        probe.alive_after(Ipv4Addr::new(10, 0, 0, 1), 3);
        let start = Instant::now();

        // Act
        let up = wait_for_host(
            &probe,
            Ipv4Addr::new(10, 0, 0, 1),
            8080,
            Duration::from_millis(800),
            WAIT_TIMEOUT,
            WAIT_INTERVAL,
        )
        .await;

        // Assert
        assert!(up);
        assert_eq!(probe.probes().len(), 4);
        assert_eq!(start.elapsed(), Duration::from_secs(6));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_gives_up_at_deadline() {
        let probe = MockHealthProbe::new();
        let start = Instant::now();

        let up = wait_for_host(
            &probe,
            Ipv4Addr::new(10, 0, 0, 1),
            8080,
            Duration::from_millis(800),
            Duration::from_secs(10),
            Duration::from_secs(2),
        )
        .await;

        assert!(!up);
        assert_eq!(probe.probes().len(), 6);
        assert_eq!(start.elapsed(), Duration::from_secs(10));
    }
}
