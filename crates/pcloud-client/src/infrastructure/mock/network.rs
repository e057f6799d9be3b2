//! Fakes for the resolver, wake, and signaling ports.

use std::collections::{HashMap, HashSet};
use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use pcloud_core::domain::subnet::LocalPrefix;
use pcloud_core::protocol::{OfferRequest, SdpType, SessionDescription};
use pcloud_core::MacAddress;

use crate::application::negotiate_session::{SignalingClient, SignalingError};
use crate::application::resolve_host::{HealthProbe, NeighborTable, NeighborTableError, PrefixSource, ProbeOutcome};
use crate::application::wake_host::{WakeError, WakeTransport};

/// Health probe that answers `Alive` for a configured set of addresses.
#[derive(Debug, Default)]
pub struct MockHealthProbe {
    alive: Mutex<HashSet<Ipv4Addr>>,
    /// Remaining failed probes before an address comes up.
    pending: Mutex<HashMap<Ipv4Addr, usize>>,
    probes: Mutex<Vec<(Ipv4Addr, u16)>>,
}

impl MockHealthProbe {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_alive(&self, ip: Ipv4Addr) {
        self.alive.lock().unwrap().insert(ip);
    }

    /// `ip` answers `Dead` to the next `failures` probes, then `Alive`.
    pub fn alive_after(&self, ip: Ipv4Addr, failures: usize) {
        self.pending.lock().unwrap().insert(ip, failures);
    }

    /// Every `(ip, port)` probed so far, in call order.
    pub fn probes(&self) -> Vec<(Ipv4Addr, u16)> {
        self.probes.lock().unwrap().clone()
    }
}

#[async_trait]
impl HealthProbe for MockHealthProbe {
    async fn probe(&self, ip: Ipv4Addr, port: u16, _timeout: Duration) -> ProbeOutcome {
        self.probes.lock().unwrap().push((ip, port));

        let mut pending = self.pending.lock().unwrap();
        if let Some(remaining) = pending.get_mut(&ip) {
            if *remaining == 0 {
                pending.remove(&ip);
                self.alive.lock().unwrap().insert(ip);
            } else {
                *remaining -= 1;
                return ProbeOutcome::Dead;
            }
        }
        drop(pending);

        if self.alive.lock().unwrap().contains(&ip) {
            ProbeOutcome::Alive {
                name: Some(format!("host-{ip}")),
            }
        } else {
            ProbeOutcome::Dead
        }
    }
}

/// Neighbor table backed by a map.
#[derive(Debug, Default)]
pub struct MockNeighborTable {
    entries: Mutex<HashMap<MacAddress, Vec<Ipv4Addr>>>,
    lookups: AtomicUsize,
}

impl MockNeighborTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, mac: MacAddress, ip: Ipv4Addr) {
        self.entries.lock().unwrap().entry(mac).or_default().push(ip);
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NeighborTable for MockNeighborTable {
    async fn lookup(&self, mac: &MacAddress) -> Result<Vec<Ipv4Addr>, NeighborTableError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        Ok(self.entries.lock().unwrap().get(mac).cloned().unwrap_or_default())
    }
}

/// Fixed list of local prefixes.
#[derive(Debug, Clone, Default)]
pub struct StaticPrefixes {
    prefixes: Vec<LocalPrefix>,
}

impl StaticPrefixes {
    pub fn new(prefixes: Vec<LocalPrefix>) -> Self {
        Self { prefixes }
    }
}

impl PrefixSource for StaticPrefixes {
    fn local_prefixes(&self) -> Vec<LocalPrefix> {
        self.prefixes.clone()
    }
}

type SendHook = Box<dyn Fn() + Send + Sync>;

/// Wake transport that records packets and can run a hook on each send.
#[derive(Default)]
pub struct MockWakeTransport {
    sent: Mutex<Vec<Vec<u8>>>,
    hook: Mutex<Option<SendHook>>,
}

impl MockWakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `hook` after every recorded packet, e.g. to bring a host up.
    pub fn on_send(&self, hook: impl Fn() + Send + Sync + 'static) {
        *self.hook.lock().unwrap() = Some(Box::new(hook));
    }

    pub fn sent(&self) -> Vec<Vec<u8>> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl WakeTransport for MockWakeTransport {
    async fn send_broadcast(&self, packet: &[u8]) -> Result<(), WakeError> {
        self.sent.lock().unwrap().push(packet.to_vec());
        if let Some(hook) = self.hook.lock().unwrap().as_ref() {
            hook();
        }
        Ok(())
    }
}

/// Signaling client that answers every offer and records the URLs it was
/// called with.
#[derive(Debug, Default)]
pub struct ScriptedSignaling {
    offers: Mutex<Vec<String>>,
    ends: Mutex<Vec<String>>,
}

impl ScriptedSignaling {
    pub fn answering() -> Self {
        Self::default()
    }

    pub fn offer_urls(&self) -> Vec<String> {
        self.offers.lock().unwrap().clone()
    }

    pub fn end_urls(&self) -> Vec<String> {
        self.ends.lock().unwrap().clone()
    }
}

#[async_trait]
impl SignalingClient for ScriptedSignaling {
    async fn post_offer(&self, url: &str, _request: &OfferRequest) -> Result<SessionDescription, SignalingError> {
        self.offers.lock().unwrap().push(url.to_string());
        Ok(SessionDescription {
            sdp: "v=0\r\no=- 1 1 IN IP4 0.0.0.0\r\ns=-\r\n".to_string(),
            kind: SdpType::Answer,
        })
    }

    async fn end_session(&self, url: &str) -> Result<(), SignalingError> {
        self.ends.lock().unwrap().push(url.to_string());
        Ok(())
    }
}
