//! WakeSignaler: validate a MAC and broadcast its magic packet.
//!
//! Sending is fire-and-forget.  `Ok(())` means the datagram left the socket,
//! not that the host woke; callers poll with the resolver or
//! [`wait_for_host`](super::host_liveness::wait_for_host) afterwards.
//!
//! Unlike the best-effort session end call, a send failure is reported: if
//! the packet never went out there is no point waiting for the host.

use std::sync::Arc;

use async_trait::async_trait;
use pcloud_core::protocol::magic_packet;
use pcloud_core::{MacAddress, MacError};
use thiserror::Error;
use tracing::{info, warn};

/// Error returned by [`WakeSignaler::wake`].
#[derive(Debug, Error)]
pub enum WakeError {
    #[error("invalid MAC address: {0}")]
    InvalidMac(#[from] MacError),

    #[error("failed to send wake packet: {0}")]
    Io(#[from] std::io::Error),
}

/// Delivers a wake payload as a broadcast datagram.
#[async_trait]
pub trait WakeTransport: Send + Sync {
    async fn send_broadcast(&self, packet: &[u8]) -> Result<(), WakeError>;
}

/// Builds magic packets and hands them to a [`WakeTransport`].
pub struct WakeSignaler {
    transport: Arc<dyn WakeTransport>,
}

impl WakeSignaler {
    pub fn new(transport: Arc<dyn WakeTransport>) -> Self {
        Self { transport }
    }

    /// Sends the wake packet for `mac`.
    ///
    /// # Errors
    ///
    /// - [`WakeError::InvalidMac`] before anything is sent.
    /// - [`WakeError::Io`] if the transport could not send.
    pub async fn wake(&self, mac: &str) -> Result<(), WakeError> {
        let mac = MacAddress::parse(mac)?;
        self.wake_mac(&mac).await
    }

    /// Sends the wake packet for an already validated MAC.
    pub async fn wake_mac(&self, mac: &MacAddress) -> Result<(), WakeError> {
        let packet = magic_packet(mac);
        match self.transport.send_broadcast(&packet).await {
            Ok(()) => {
                info!("wake packet sent to {mac}");
                Ok(())
            }
            Err(e) => {
                warn!("wake packet for {mac} not sent: {e}");
                Err(e)
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
