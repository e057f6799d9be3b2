//! LAN locator for paired hosts.
//!
//! Broadcasts a `disc` datagram for a device id on the announce port and waits
//! for the matching host's unicast `ann` reply.  Unlike the resolver this
//! needs no MAC: the pairing record's device id and LAN token are enough.
//!
//! # How UDP discovery works (for beginners)
//!
//! 1. The client sends a UDP packet to the LAN broadcast address
//!    (`255.255.255.255`) on port 35853.  Every device on the LAN receives it.
//! 2. A host that recognises its own device id (and token) answers the
//!    sender's address directly with its service port.
//! 3. The source address of that reply is the host's IP.
//!
//! Replies from other devices, with the wrong token, or that do not parse
//! are ignored; the locator keeps listening until the deadline.

use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::time::Duration;

use pcloud_core::protocol::{AnnounceMessage, ANNOUNCE_PORT};
use thiserror::Error;
use tokio::net::UdpSocket;
use tokio::time::Instant;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum LocateError {
    #[error("discovery socket error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to encode discovery request: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Where a paired host answered from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocatedHost {
    pub ip: Ipv4Addr,
    /// Service port the host announced; `None` if it sent 0.
    pub port: Option<u16>,
}

/// Sends discovery requests and collects the answer.
#[derive(Debug, Clone)]
pub struct LanLocator {
    target: SocketAddr,
}

impl LanLocator {
    pub fn new() -> Self {
        Self::with_target(SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::BROADCAST, ANNOUNCE_PORT)))
    }

    /// Sends requests to `target` instead of the broadcast address.
    pub fn with_target(target: SocketAddr) -> Self {
        Self { target }
    }

    /// Looks for `device_id` for up to `timeout`.  `Ok(None)` if nobody
    /// answered.
    pub async fn locate(
        &self,
        device_id: &str,
        lan_token: Option<&str>,
        timeout: Duration,
    ) -> Result<Option<LocatedHost>, LocateError> {
        let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0)).await?;
        socket.set_broadcast(true)?;

        let request = AnnounceMessage::discover(device_id, lan_token.unwrap_or_default()).to_bytes()?;
        socket.send_to(&request, self.target).await?;
        debug!("discovery request for {device_id} sent to {}", self.target);

        let deadline = Instant::now() + timeout;
        let mut buf = vec![0u8; 2048];
        loop {
            let received = tokio::time::timeout_at(deadline, socket.recv_from(&mut buf)).await;
            let (len, src) = match received {
                Err(_) => {
                    debug!("no announcement from {device_id} within {timeout:?}");
                    return Ok(None);
                }
                Ok(Err(e)) => return Err(e.into()),
                Ok(Ok(pair)) => pair,
            };

            let Some(message) = AnnounceMessage::parse(&buf[..len]) else {
                debug!("ignoring malformed datagram from {src}");
                continue;
            };
            if !message.answers(device_id, lan_token) {
                continue;
            }
            let SocketAddr::V4(src) = src else {
                continue;
            };

            let located = LocatedHost {
                ip: *src.ip(),
                port: (message.port != 0).then_some(message.port),
            };
            info!("{device_id} announced from {}", located.ip);
            return Ok(Some(located));
        }
    }
}

impl Default for LanLocator {
    fn default() -> Self {
        Self::new()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use pcloud_core::protocol::announce::{AnnounceKind, ANNOUNCE_VERSION};

    /// Answers discovery requests like a paired host would, after first
    /// sending one reply for a different device.
    async fn fake_host(device_id: &'static str, token: &'static str, port: u16) -> SocketAddr {
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let addr = socket.local_addr().unwrap();
        tokio::spawn(async move {
            let mut buf = [0u8; 2048];
            let (len, from) = socket.recv_from(&mut buf).await.unwrap();
            let request = AnnounceMessage::parse(&buf[..len]).unwrap();
            assert_eq!(request.kind, AnnounceKind::Disc);

            let reply = |dev: &str| AnnounceMessage {
                kind: AnnounceKind::Ann,
                version: ANNOUNCE_VERSION,
                device_id: dev.to_string(),
                port,
                token: token.to_string(),
            };
            socket.send_to(&reply("someone-else").to_bytes().unwrap(), from).await.unwrap();
            socket.send_to(b"garbage", from).await.unwrap();
            if request.device_id == device_id && request.token == token {
                socket.send_to(&reply(device_id).to_bytes().unwrap(), from).await.unwrap();
            }
        });
        addr
    }

    #[tokio::test]
    async fn test_locates_matching_host() {
        // Arrange
        let host = fake_host("dev-1", "secret", 8443).await;
        let locator = LanLocator::with_target(host);

        // Act
        let found = locator
            .locate("dev-1", Some("secret"), Duration::from_secs(2))
            .await
            .unwrap();

        // Assert
        assert_eq!(
            found,
            Some(LocatedHost {
                ip: Ipv4Addr::LOCALHOST,
                port: Some(8443)
            })
        );
    }

    #[tokio::test]
    async fn test_wrong_token_times_out() {
        let host = fake_host("dev-1", "secret", 8443).await;
        let locator = LanLocator::with_target(host);

        let found = locator
            .locate("dev-1", Some("guess"), Duration::from_millis(300))
            .await
            .unwrap();

        assert_eq!(found, None);
    }
}
