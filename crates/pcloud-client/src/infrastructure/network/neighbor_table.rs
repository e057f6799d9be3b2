//! OS neighbor (ARP) table reader.
//!
//! There is no portable API for the neighbor cache, so the reader runs the
//! platform's own tool and parses its text output:
//!
//! | Platform | Commands                     | Sample line                                              |
//! |----------|------------------------------|----------------------------------------------------------|
//! | Linux    | `ip neigh show`, `arp -an`   | `192.168.0.42 dev eth0 lladdr aa:bb:cc:dd:ee:ff REACHABLE` |
//! | macOS    | `arp -an`                    | `? (192.168.0.42) at a:bb:c:dd:ee:ff on en0 ifscope`      |
//! | Windows  | `arp -a`                     | `  192.168.0.42   aa-bb-cc-dd-ee-ff   dynamic`           |
//!
//! The parser is deliberately format-agnostic: on each line it looks for an
//! IPv4 token and a MAC token (any separator, one or two hex digits per
//! group, since macOS drops leading zeros).

use std::net::Ipv4Addr;

use async_trait::async_trait;
use pcloud_core::domain::mac::MAC_LEN;
use pcloud_core::MacAddress;
use tokio::process::Command;
use tracing::debug;

use crate::application::resolve_host::{NeighborTable, NeighborTableError};

/// Reads the neighbor table with the platform's command-line tools.
#[derive(Debug, Clone, Default)]
pub struct SystemNeighborTable;

impl SystemNeighborTable {
    pub fn new() -> Self {
        Self
    }

    fn commands() -> Vec<(&'static str, Vec<&'static str>)> {
        if cfg!(target_os = "windows") {
            vec![("arp", vec!["-a"])]
        } else if cfg!(target_os = "linux") {
            vec![("ip", vec!["neigh", "show"]), ("arp", vec!["-an"])]
        } else {
            vec![("arp", vec!["-an"])]
        }
    }
}

#[async_trait]
impl NeighborTable for SystemNeighborTable {
    async fn lookup(&self, mac: &MacAddress) -> Result<Vec<Ipv4Addr>, NeighborTableError> {
        let mut last_error = None;
        let mut ran_any = false;
        let mut found = Vec::new();

        for (program, args) in Self::commands() {
            match Command::new(program).args(&args).output().await {
                Ok(output) => {
                    ran_any = true;
                    let text = String::from_utf8_lossy(&output.stdout);
                    for ip in parse_neighbor_output(&text, mac) {
                        if !found.contains(&ip) {
                            found.push(ip);
                        }
                    }
                }
                Err(source) => {
                    debug!("`{program}` unavailable: {source}");
                    last_error = Some(NeighborTableError::Command {
                        program: program.to_string(),
                        source,
                    });
                }
            }
            if !found.is_empty() {
                break;
            }
        }

        match last_error {
            Some(e) if !ran_any => Err(e),
            _ => Ok(found),
        }
    }
}

/// Returns the IPs associated with `mac` in neighbor-table text, in order.
pub fn parse_neighbor_output(text: &str, mac: &MacAddress) -> Vec<Ipv4Addr> {
    let mut ips = Vec::new();
    for line in text.lines() {
        let mut ip = None;
        let mut line_mac = None;
        for token in line.split_whitespace() {
            let token = token.trim_matches(|c| c == '(' || c == ')');
            if ip.is_none() {
                if let Ok(addr) = token.parse::<Ipv4Addr>() {
                    ip = Some(addr);
                    continue;
                }
            }
            if line_mac.is_none() {
                line_mac = parse_table_mac(token);
            }
        }
        if let (Some(ip), Some(found)) = (ip, line_mac) {
            if found == *mac && !ips.contains(&ip) {
                ips.push(ip);
            }
        }
    }
    ips
}

/// Parses a MAC as the tools print it: `:` or `-` separated, 1–2 hex digits
/// per group.
fn parse_table_mac(token: &str) -> Option<MacAddress> {
    let groups: Vec<&str> = token.split(|c| c == ':' || c == '-').collect();
    if groups.len() != MAC_LEN {
        return None;
    }
    let mut octets = [0u8; MAC_LEN];
    for (octet, group) in octets.iter_mut().zip(&groups) {
        if group.is_empty() || group.len() > 2 {
            return None;
        }
        *octet = u8::from_str_radix(group, 16).ok()?;
    }
    Some(MacAddress::new(octets))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
