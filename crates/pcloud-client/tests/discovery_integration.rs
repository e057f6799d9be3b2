//! Integration tests for host discovery.
//!
//! # Purpose
//!
//! These tests drive the `Resolver` through its public API with the same
//! adapters the binary uses where that is possible offline (the HTTP health
//! probe against a local mock server) and recording fakes where it is not
//! (the OS neighbor table and interface list).  They verify:
//!
//! - A host that is not in the neighbor cache is found by the /24 sweep.
//! - A live IP hint is confirmed over real HTTP without sweeping.
//! - The health probe's notion of "alive": 2xx plus a healthy JSON body.
//!
//! # Resolution order
//!
//! ```text
//! resolve(mac, port, hint)
//!   1. neighbor cache  -> probe each listed IP
//!   2. hint            -> probe it
//!   3. sweep           -> probe .1–.254 of every local /24, 64 at a time
//!   (repeat up to `attempts` times, `interval` apart)
//! ```

use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use std::time::Duration;

use pcloud_client::application::resolve_host::{
    HealthProbe, ProbeOutcome, Resolution, ResolveStage, Resolver, ResolverConfig,
};
use pcloud_client::application::retry::RetryPolicy;
use pcloud_client::infrastructure::mock::{MockHealthProbe, MockNeighborTable, StaticPrefixes};
use pcloud_client::infrastructure::network::HttpHealthProbe;
use pcloud_core::domain::subnet::LocalPrefix;
use pcloud_core::Prefix24;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn home_lan() -> StaticPrefixes {
    StaticPrefixes::new(vec![LocalPrefix {
        prefix: Prefix24::new(192, 168, 0),
        local: Ipv4Addr::new(192, 168, 0, 10),
    }])
}

fn server_port(server: &MockServer) -> u16 {
    server.address().port()
}

async fn health_server(status: u16, body: serde_json::Value) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/healthz"))
        .respond_with(ResponseTemplate::new(status).set_body_json(body))
        .mount(&server)
        .await;
    server
}

// ── Resolver ──────────────────────────────────────────────────────────────────

/// The host's MAC is not cached, so only the sweep can find it.
#[tokio::test]
async fn test_sweep_finds_host_missing_from_neighbor_cache() {
    // Arrange
    let health = Arc::new(MockHealthProbe::new());
    health.set_alive(Ipv4Addr::new(192, 168, 0, 42));
    let resolver = Resolver::new(
        Arc::new(MockNeighborTable::new()),
        Arc::new(home_lan()),
        health.clone(),
        ResolverConfig {
            retry: RetryPolicy::once(),
            ..ResolverConfig::default()
        },
    );

    // Act
    let resolution = tokio_test::assert_ok!(resolver.resolve("aa-bb-cc-dd-ee-ff", 8080, None).await);

    // Assert
    assert_eq!(
        resolution,
        Resolution::Found {
            ip: Ipv4Addr::new(192, 168, 0, 42),
            stage: ResolveStage::Sweep,
        }
    );
    let probes = health.probes();
    assert!(probes.iter().all(|(ip, port)| *port == 8080 && *ip != Ipv4Addr::new(192, 168, 0, 10)));
    assert!(probes.len() <= 253);
}

/// A malformed MAC is rejected before any probe goes out.
#[tokio::test]
async fn test_malformed_mac_is_rejected_without_probing() {
    let health = Arc::new(MockHealthProbe::new());
    let resolver = Resolver::new(
        Arc::new(MockNeighborTable::new()),
        Arc::new(home_lan()),
        health.clone(),
        ResolverConfig::default(),
    );

    tokio_test::assert_err!(resolver.resolve("not-a-mac", 8080, None).await);

    assert!(health.probes().is_empty());
}

/// A hint pointing at a live HTTP health endpoint wins without a sweep.
#[tokio::test]
async fn test_live_hint_is_confirmed_over_http() {
    // Arrange
    let server = health_server(200, serde_json::json!({"ok": true})).await;
    let resolver = Resolver::new(
        Arc::new(MockNeighborTable::new()),
        Arc::new(StaticPrefixes::new(Vec::new())),
        Arc::new(HttpHealthProbe::new("/healthz").unwrap()),
        ResolverConfig {
            retry: RetryPolicy::once(),
            ..ResolverConfig::default()
        },
    );

    // Act
    let resolution = resolver
        .resolve("AA:BB:CC:DD:EE:FF", server_port(&server), Some(Ipv4Addr::LOCALHOST))
        .await
        .unwrap();

    // Assert
    assert_eq!(
        resolution,
        Resolution::Found {
            ip: Ipv4Addr::LOCALHOST,
            stage: ResolveStage::Hint,
        }
    );
}

// ── HTTP health probe ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_healthy_body_with_name_is_alive() {
    let server = health_server(200, serde_json::json!({"status": "OK", "name": "den-pc"})).await;
    let probe = HttpHealthProbe::new("healthz").unwrap();

    let outcome = probe
        .probe(Ipv4Addr::LOCALHOST, server_port(&server), Duration::from_millis(800))
        .await;

    assert_eq!(
        outcome,
        ProbeOutcome::Alive {
            name: Some("den-pc".to_string())
        }
    );
}

#[tokio::test]
async fn test_unhealthy_body_is_dead() {
    let server = health_server(200, serde_json::json!({"ok": false})).await;
    let probe = HttpHealthProbe::new("/healthz").unwrap();

    let outcome = probe
        .probe(Ipv4Addr::LOCALHOST, server_port(&server), Duration::from_millis(800))
        .await;

    assert_eq!(outcome, ProbeOutcome::Dead);
}

#[tokio::test]
async fn test_server_error_is_dead_even_with_healthy_body() {
    let server = health_server(503, serde_json::json!({"ok": true})).await;
    let probe = HttpHealthProbe::new("/healthz").unwrap();

    let outcome = probe
        .probe(Ipv4Addr::LOCALHOST, server_port(&server), Duration::from_millis(800))
        .await;

    assert_eq!(outcome, ProbeOutcome::Dead);
}

#[tokio::test]
async fn test_slow_endpoint_is_dead_after_timeout() {
    // Arrange
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/healthz"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"ok": true}))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;
    let probe = HttpHealthProbe::new("/healthz").unwrap();
    let IpAddr::V4(ip) = server.address().ip() else {
        panic!("mock server bound to IPv6");
    };

    // Act
    let started = std::time::Instant::now();
    let outcome = probe.probe(ip, server_port(&server), Duration::from_millis(300)).await;

    // Assert
    assert_eq!(outcome, ProbeOutcome::Dead);
    assert!(started.elapsed() < Duration::from_secs(3));
}
