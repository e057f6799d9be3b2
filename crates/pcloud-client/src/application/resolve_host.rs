//! Resolver: turns a MAC address into the IP address of a live host.
//!
//! # Strategy
//!
//! Each attempt runs these stages in order and stops at the first success:
//!
//! 1. **Neighbor cache** – ask the OS for its ARP/neighbor table and take the
//!    first IP whose MAC matches.  Free and instant, but only knows hosts the
//!    machine talked to recently; a freshly woken host is usually missing.
//! 2. **Hint** – if the caller remembers an address (the profile's last-known
//!    IP), probe it directly.
//! 3. **Sweep** – for every /24 the client is attached to, health-probe every
//!    host address on the service port.  Probes run concurrently on a worker
//!    pool of fixed width; the first host to answer wins.
//!
//! If an attempt finds nothing, the whole attempt is repeated on a fixed
//! interval ([`RetryPolicy`]), which covers hosts that are still booting after
//! a wake packet.  Only after the budget is spent does the resolver report
//! [`Resolution::NotFound`].
//!
//! # The worker pool (for beginners)
//!
//! A /24 has 254 candidates.  Probing them one by one with an 800 ms timeout
//! could take over three minutes; probing all at once floods the LAN and can
//! exhaust local ephemeral ports.  Instead `concurrency` workers share an
//! atomic cursor into the candidate list.  Each worker takes the next index,
//! probes it, and repeats until the list is exhausted or someone has found
//! the host.  The first worker to see a live host reports it on a channel and
//! the resolver returns right away; probes already in flight are allowed to
//! finish in the background and their results are ignored.
//!
//! # Ambiguity
//!
//! The sweep does not check which MAC answered: any healthy service on the
//! port is accepted.  If two hosts answer, whichever responds first wins.

use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use pcloud_core::domain::subnet::LocalPrefix;
use pcloud_core::{MacAddress, MacError};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use super::retry::{retry_until, RetryPolicy};

/// Default per-probe timeout.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_millis(800);
/// Default worker-pool width for the sweep.
pub const DEFAULT_CONCURRENCY: usize = 64;
/// Default number of full attempts.
pub const DEFAULT_ATTEMPTS: u32 = 9;
/// Default pause between attempts.
pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_secs(5);

// ── Ports ─────────────────────────────────────────────────────────────────────

/// Error reading the OS neighbor table.
#[derive(Debug, Error)]
pub enum NeighborTableError {
    #[error("failed to run `{program}`: {source}")]
    Command {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

/// Read access to the OS neighbor (ARP) cache.
#[async_trait]
pub trait NeighborTable: Send + Sync {
    /// Returns every IP the cache associates with `mac`, in table order.
    async fn lookup(&self, mac: &MacAddress) -> Result<Vec<Ipv4Addr>, NeighborTableError>;
}

/// Source of the /24 prefixes the client itself is attached to.
pub trait PrefixSource: Send + Sync {
    fn local_prefixes(&self) -> Vec<LocalPrefix>;
}

/// Result of a single health probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    Alive {
        /// Friendly host name, if the health body carried one.
        name: Option<String>,
    },
    Dead,
}

impl ProbeOutcome {
    pub fn is_alive(&self) -> bool {
        matches!(self, ProbeOutcome::Alive { .. })
    }
}

/// Bounded-timeout liveness check of one candidate.
///
/// Implementations fold every failure (timeout, refused, non-2xx, bad body)
/// into [`ProbeOutcome::Dead`].
#[async_trait]
pub trait HealthProbe: Send + Sync {
    async fn probe(&self, ip: Ipv4Addr, port: u16, timeout: Duration) -> ProbeOutcome;
}

// ── Resolver ──────────────────────────────────────────────────────────────────

/// Error returned by [`Resolver::resolve`].  "Not found" is not an error.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResolveError {
    #[error("invalid MAC address: {0}")]
    InvalidMac(#[from] MacError),
}

/// Which stage produced an address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveStage {
    NeighborCache,
    Hint,
    Sweep,
}

/// Outcome of a resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Found { ip: Ipv4Addr, stage: ResolveStage },
    NotFound,
}

impl Resolution {
    pub fn ip(&self) -> Option<Ipv4Addr> {
        match self {
            Resolution::Found { ip, .. } => Some(*ip),
            Resolution::NotFound => None,
        }
    }
}

/// Tunables for the resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolverConfig {
    pub probe_timeout: Duration,
    /// Maximum number of probes in flight during a sweep.
    pub concurrency: usize,
    pub retry: RetryPolicy,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
            concurrency: DEFAULT_CONCURRENCY,
            retry: RetryPolicy::new(DEFAULT_ATTEMPTS, DEFAULT_RETRY_INTERVAL),
        }
    }
}

/// The discovery engine.
pub struct Resolver {
    neighbors: Arc<dyn NeighborTable>,
    prefixes: Arc<dyn PrefixSource>,
    health: Arc<dyn HealthProbe>,
    config: ResolverConfig,
}

impl Resolver {
    pub fn new(
        neighbors: Arc<dyn NeighborTable>,
        prefixes: Arc<dyn PrefixSource>,
        health: Arc<dyn HealthProbe>,
        config: ResolverConfig,
    ) -> Self {
        Self {
            neighbors,
            prefixes,
            health,
            config,
        }
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// The health probe the resolver uses, for callers that need to check a
    /// known address the same way.
    pub fn health(&self) -> Arc<dyn HealthProbe> {
        Arc::clone(&self.health)
    }

    /// Resolves `mac` with the full retry envelope.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::InvalidMac`] before any network activity if
    /// `mac` is malformed.  Exhausting the retry budget yields
    /// `Ok(Resolution::NotFound)`.
    pub async fn resolve(
        &self,
        mac: &str,
        port: u16,
        hint: Option<Ipv4Addr>,
    ) -> Result<Resolution, ResolveError> {
        let mac = MacAddress::parse(mac)?;
        Ok(self.resolve_with(&mac, port, hint, self.config.retry).await)
    }

    /// Resolves an already validated MAC with an explicit retry policy.
    pub async fn resolve_with(
        &self,
        mac: &MacAddress,
        port: u16,
        hint: Option<Ipv4Addr>,
        policy: RetryPolicy,
    ) -> Resolution {
        info!("resolving {mac} (port {port})");
        let result = retry_until(
            policy,
            |attempt| {
                debug!("resolve {mac}: attempt {attempt}");
                self.attempt(mac, port, hint)
            },
            |r| matches!(r, Resolution::Found { .. }),
        )
        .await;

        match result.value {
            Resolution::Found { ip, stage } => {
                info!("resolved {mac} to {ip} via {stage:?} after {} attempt(s)", result.attempts);
            }
            Resolution::NotFound => {
                info!("{mac} not found after {} attempt(s)", result.attempts);
            }
        }
        result.value
    }

    /// One pass through the stages, without retrying.
    pub async fn attempt(&self, mac: &MacAddress, port: u16, hint: Option<Ipv4Addr>) -> Resolution {
        match self.neighbors.lookup(mac).await {
            Ok(ips) => {
                if let Some(ip) = ips.first().copied() {
                    debug!("{mac} found in neighbor cache at {ip}");
                    return Resolution::Found {
                        ip,
                        stage: ResolveStage::NeighborCache,
                    };
                }
            }
            Err(e) => warn!("neighbor table unavailable: {e}"),
        }

        if let Some(ip) = hint {
            if self.probe(ip, port).await {
                return Resolution::Found {
                    ip,
                    stage: ResolveStage::Hint,
                };
            }
            debug!("hint {ip} did not answer");
        }

        for local in self.prefixes.local_prefixes() {
            debug!("sweeping {}.0/24 on port {port}", local.prefix);
            if let Some(ip) = self.sweep(local.candidates(), port).await {
                return Resolution::Found {
                    ip,
                    stage: ResolveStage::Sweep,
                };
            }
        }

        Resolution::NotFound
    }

    /// Probes `candidates` on a bounded worker pool and returns the first
    /// live address, or `None` once every candidate has been tried.
    pub async fn sweep(&self, candidates: Vec<Ipv4Addr>, port: u16) -> Option<Ipv4Addr> {
        if candidates.is_empty() {
            return None;
        }

        let candidates = Arc::new(candidates);
        let cursor = Arc::new(AtomicUsize::new(0));
        let found = Arc::new(AtomicBool::new(false));
        let (winner_tx, mut winner_rx) = mpsc::channel::<Ipv4Addr>(1);
        let width = self.config.concurrency.max(1).min(candidates.len());
        let timeout = self.config.probe_timeout;

        let mut workers = JoinSet::new();
        for _ in 0..width {
            let candidates = Arc::clone(&candidates);
            let cursor = Arc::clone(&cursor);
            let found = Arc::clone(&found);
            let health = Arc::clone(&self.health);
            let winner_tx = winner_tx.clone();

            workers.spawn(async move {
                while !found.load(Ordering::Acquire) {
                    let index = cursor.fetch_add(1, Ordering::Relaxed);
                    let Some(&ip) = candidates.get(index) else {
                        break;
                    };
                    if probe_with_timeout(health.as_ref(), ip, port, timeout).await {
                        found.store(true, Ordering::Release);
                        let _ = winner_tx.try_send(ip);
                        break;
                    }
                }
            });
        }
        drop(winner_tx);

        // `None` here means every worker exited without a winner.
        let winner = winner_rx.recv().await;
        found.store(true, Ordering::Release);
        workers.detach_all();
        winner
    }

    async fn probe(&self, ip: Ipv4Addr, port: u16) -> bool {
        probe_with_timeout(self.health.as_ref(), ip, port, self.config.probe_timeout).await
    }
}

async fn probe_with_timeout(health: &dyn HealthProbe, ip: Ipv4Addr, port: u16, timeout: Duration) -> bool {
    match tokio::time::timeout(timeout, health.probe(ip, port, timeout)).await {
        Ok(outcome) => outcome.is_alive(),
        Err(_) => false,
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
