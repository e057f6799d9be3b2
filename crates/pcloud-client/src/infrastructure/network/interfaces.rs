//! Local /24 prefixes from the OS interface list.

use std::net::Ipv4Addr;

use network_interface::{Addr, NetworkInterface, NetworkInterfaceConfig};
use pcloud_core::domain::subnet::{local_prefixes, LocalPrefix};
use tracing::warn;

use crate::application::resolve_host::PrefixSource;

/// Enumerates the IPv4 addresses bound to local interfaces on every call.
#[derive(Debug, Clone, Default)]
pub struct InterfacePrefixes;

impl InterfacePrefixes {
    pub fn new() -> Self {
        Self
    }

    /// Every IPv4 address bound to a local interface.
    pub fn local_addresses() -> Vec<Ipv4Addr> {
        match NetworkInterface::show() {
            Ok(interfaces) => interfaces
                .iter()
                .flat_map(|iface| iface.addr.iter())
                .filter_map(|addr| match addr {
                    Addr::V4(v4) => Some(v4.ip),
                    Addr::V6(_) => None,
                })
                .collect(),
            Err(e) => {
                warn!("cannot enumerate network interfaces: {e}");
                Vec::new()
            }
        }
    }
}

impl PrefixSource for InterfacePrefixes {
    fn local_prefixes(&self) -> Vec<LocalPrefix> {
        local_prefixes(Self::local_addresses())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefixes_exclude_loopback() {
        let prefixes = InterfacePrefixes::new().local_prefixes();
        assert!(prefixes.iter().all(|p| !p.local.is_loopback()));
    }
}
