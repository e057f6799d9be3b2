//! HTTP health probe.
//!
//! `GET http://{ip}:{port}{health_path}` with a per-request timeout.  The host
//! counts as alive only for a 2xx response whose JSON body reports health
//! (see [`HealthReport`]); timeouts, refused connections, other statuses, and
//! unparseable bodies are all simply `Dead`.

use std::net::Ipv4Addr;
use std::time::Duration;

use async_trait::async_trait;
use pcloud_core::protocol::HealthReport;
use thiserror::Error;
use tracing::trace;

use crate::application::resolve_host::{HealthProbe, ProbeOutcome};

/// Default health path.
pub const DEFAULT_HEALTH_PATH: &str = "/healthz";

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// [`HealthProbe`] over plain HTTP.
#[derive(Debug, Clone)]
pub struct HttpHealthProbe {
    client: reqwest::Client,
    path: String,
}

impl HttpHealthProbe {
    pub fn new(health_path: &str) -> Result<Self, ProbeError> {
        let client = reqwest::Client::builder()
            .no_proxy()
            .pool_max_idle_per_host(0)
            .build()?;
        let path = if health_path.starts_with('/') {
            health_path.to_string()
        } else {
            format!("/{health_path}")
        };
        Ok(Self { client, path })
    }

    pub fn url(&self, ip: Ipv4Addr, port: u16) -> String {
        format!("http://{ip}:{port}{}", self.path)
    }
}

#[async_trait]
impl HealthProbe for HttpHealthProbe {
    async fn probe(&self, ip: Ipv4Addr, port: u16, timeout: Duration) -> ProbeOutcome {
        let url = self.url(ip, port);
        let response = match self.client.get(&url).timeout(timeout).send().await {
            Ok(r) => r,
            Err(e) => {
                trace!("{url}: {e}");
                return ProbeOutcome::Dead;
            }
        };
        if !response.status().is_success() {
            trace!("{url}: HTTP {}", response.status());
            return ProbeOutcome::Dead;
        }
        let Ok(body) = response.bytes().await else {
            return ProbeOutcome::Dead;
        };
        match HealthReport::parse(&body) {
            Some(report) if report.is_healthy() => ProbeOutcome::Alive { name: report.name },
            _ => ProbeOutcome::Dead,
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_includes_port_and_path() {
        let probe = HttpHealthProbe::new("healthz").unwrap();
        assert_eq!(
            probe.url(Ipv4Addr::new(192, 168, 0, 42), 8080),
            "http://192.168.0.42:8080/healthz"
        );
    }

    #[tokio::test]
    async fn test_refused_connection_is_dead() {
        // Arrange: bind then drop a listener so the port is closed.
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let probe = HttpHealthProbe::new(DEFAULT_HEALTH_PATH).unwrap();

        // Act
        let outcome = probe
            .probe(Ipv4Addr::LOCALHOST, port, Duration::from_millis(500))
            .await;

        // Assert
        assert_eq!(outcome, ProbeOutcome::Dead);
    }
}
