//! /24 prefixes and the candidate addresses swept inside them.
//!
//! When the neighbor cache does not know a host, the resolver assumes the
//! host lives on one of the subnets the client itself is attached to, and
//! probes every host address of each such /24.

use std::collections::BTreeSet;
use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

/// First host number swept inside a /24.
pub const FIRST_HOST: u8 = 1;
/// Last host number swept inside a /24 (`.255` is the broadcast address).
pub const LAST_HOST: u8 = 254;

/// The first three octets of an IPv4 /24 network, e.g. `192.168.0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Prefix24([u8; 3]);

impl Prefix24 {
    pub const fn new(a: u8, b: u8, c: u8) -> Self {
        Self([a, b, c])
    }

    /// Returns the /24 containing `addr`.
    pub fn of(addr: Ipv4Addr) -> Self {
        let [a, b, c, _] = addr.octets();
        Self([a, b, c])
    }

    /// Returns the address with host number `host` inside this prefix.
    pub fn host(&self, host: u8) -> Ipv4Addr {
        let [a, b, c] = self.0;
        Ipv4Addr::new(a, b, c, host)
    }

    /// Every sweepable address (`.1` to `.254`), in ascending order.
    pub fn hosts(&self) -> impl Iterator<Item = Ipv4Addr> + '_ {
        (FIRST_HOST..=LAST_HOST).map(move |h| self.host(h))
    }

    /// The sweep candidates: [`hosts`](Self::hosts) minus `exclude`.
    ///
    /// Passing the local interface's own address yields 253 candidates;
    /// passing `None` (or an address outside the prefix) yields 254.
    pub fn candidates(&self, exclude: Option<Ipv4Addr>) -> Vec<Ipv4Addr> {
        self.hosts().filter(|ip| Some(*ip) != exclude).collect()
    }
}

impl fmt::Display for Prefix24 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c] = self.0;
        write!(f, "{a}.{b}.{c}")
    }
}

/// Error returned when a string is not a dotted three-octet prefix.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid /24 prefix {0:?}: expected three dotted octets such as 192.168.0")]
pub struct ParsePrefixError(String);

impl FromStr for Prefix24 {
    type Err = ParsePrefixError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParsePrefixError(s.to_string());
        let mut octets = [0u8; 3];
        let mut parts = s.trim().split('.');
        for slot in &mut octets {
            *slot = parts
                .next()
                .and_then(|p| p.parse().ok())
                .ok_or_else(err)?;
        }
        if parts.next().is_some() {
            return Err(err());
        }
        Ok(Self(octets))
    }
}

/// A /24 the client is attached to, with the client's own address in it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LocalPrefix {
    pub prefix: Prefix24,
    pub local: Ipv4Addr,
}

impl LocalPrefix {
    pub fn candidates(&self) -> Vec<Ipv4Addr> {
        self.prefix.candidates(Some(self.local))
    }
}

/// Reduces interface addresses to the distinct /24s worth sweeping.
///
/// Loopback, unspecified, link-local, broadcast and multicast addresses are
/// skipped.  When two interfaces share a /24 only the first address is kept.
pub fn local_prefixes<I>(addrs: I) -> Vec<LocalPrefix>
where
    I: IntoIterator<Item = Ipv4Addr>,
{
    let mut seen = BTreeSet::new();
    let mut out = Vec::new();
    for addr in addrs {
        if addr.is_loopback()
            || addr.is_unspecified()
            || addr.is_link_local()
            || addr.is_broadcast()
            || addr.is_multicast()
        {
            continue;
        }
        let prefix = Prefix24::of(addr);
        if seen.insert(prefix) {
            out.push(LocalPrefix {
                prefix,
                local: addr,
            });
        }
    }
    out
}

// ── Tests ─────────────────────────────────────────────────────────────────────
