//! UDP broadcast transport for Wake-on-LAN.

use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};

use async_trait::async_trait;
use pcloud_core::protocol::WAKE_PORT;
use tokio::net::UdpSocket;
use tracing::debug;

use crate::application::wake_host::{WakeError, WakeTransport};

/// Sends wake packets to `255.255.255.255:9` (or a configured target).
#[derive(Debug, Clone)]
pub struct UdpWakeTransport {
    target: SocketAddr,
}

impl UdpWakeTransport {
    pub fn new() -> Self {
        Self::with_target(SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::BROADCAST, WAKE_PORT)))
    }

    /// Sends to `target` instead, e.g. a directed subnet broadcast.
    pub fn with_target(target: SocketAddr) -> Self {
        Self { target }
    }

    pub fn target(&self) -> SocketAddr {
        self.target
    }
}

impl Default for UdpWakeTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WakeTransport for UdpWakeTransport {
    async fn send_broadcast(&self, packet: &[u8]) -> Result<(), WakeError> {
        let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0)).await?;
        socket.set_broadcast(true)?;
        let sent = socket.send_to(packet, self.target).await?;
        debug!("sent {sent}-byte wake packet to {}", self.target);
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use pcloud_core::protocol::magic_packet;
    use pcloud_core::MacAddress;

    #[test]
    fn test_default_target_is_broadcast_port_9() {
        assert_eq!(UdpWakeTransport::new().target().to_string(), "255.255.255.255:9");
    }

    #[tokio::test]
    async fn test_packet_arrives_intact() {
        // Arrange: a local receiver stands in for the broadcast domain.
        let receiver = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let transport = UdpWakeTransport::with_target(receiver.local_addr().unwrap());
        let packet = magic_packet(&MacAddress::parse("AA:BB:CC:DD:EE:FF").unwrap());

        // Act
        transport.send_broadcast(&packet).await.unwrap();
        let mut buf = [0u8; 256];
        let (len, _) = receiver.recv_from(&mut buf).await.unwrap();

        // Assert
        assert_eq!(&buf[..len], &packet[..]);
    }
}
