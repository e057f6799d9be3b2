//! HTTP signaling client for the host's session endpoints.
//!
//! | Call                      | Method | Path                   | Body            |
//! |---------------------------|--------|------------------------|-----------------|
//! | [`post_offer`]            | POST   | `/api/session/offer`   | `OfferRequest`  |
//! | [`end_session`]           | POST   | `/api/session/end`     | none            |
//! | [`HttpSignalingClient::suspend`] | POST | `/api/system/suspend` | none          |
//!
//! [`post_offer`]: SignalingClient::post_offer
//! [`end_session`]: SignalingClient::end_session

use std::net::Ipv4Addr;
use std::time::Duration;

use async_trait::async_trait;
use pcloud_core::protocol::{OfferRequest, SessionDescription};
use tracing::{debug, info};

use crate::application::negotiate_session::{SignalingClient, SignalingError};

/// Upper bound for the offer exchange; the host starts its encoder before
/// answering.
pub const OFFER_TIMEOUT: Duration = Duration::from_secs(20);
/// Upper bound for the best-effort calls.
pub const NOTIFY_TIMEOUT: Duration = Duration::from_secs(3);

/// [`SignalingClient`] over `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpSignalingClient {
    client: reqwest::Client,
}

impl HttpSignalingClient {
    pub fn new() -> Result<Self, SignalingError> {
        let client = reqwest::Client::builder()
            .no_proxy()
            .build()
            .map_err(|e| SignalingError::Transport(e.to_string()))?;
        Ok(Self { client })
    }

    /// Asks the host at `ip:port` to suspend itself.  Best-effort: the host
    /// may drop the connection before it answers.
    pub async fn suspend(&self, ip: Ipv4Addr, port: u16) -> Result<(), SignalingError> {
        let url = format!("http://{ip}:{port}/api/system/suspend");
        info!("requesting suspend of {ip}:{port}");
        self.post_empty(&url).await
    }

    async fn post_empty(&self, url: &str) -> Result<(), SignalingError> {
        let response = self
            .client
            .post(url)
            .timeout(NOTIFY_TIMEOUT)
            .send()
            .await
            .map_err(|e| SignalingError::Transport(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SignalingError::Status {
                code: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl SignalingClient for HttpSignalingClient {
    async fn post_offer(&self, url: &str, request: &OfferRequest) -> Result<SessionDescription, SignalingError> {
        debug!("POST {url} ({} byte offer)", request.sdp.len());
        let response = self
            .client
            .post(url)
            .timeout(OFFER_TIMEOUT)
            .json(request)
            .send()
            .await
            .map_err(|e| SignalingError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| SignalingError::Transport(e.to_string()))?;
        if !status.is_success() {
            return Err(SignalingError::Status {
                code: status.as_u16(),
                body: String::from_utf8_lossy(&body).into_owned(),
            });
        }
        serde_json::from_slice(&body).map_err(|e| SignalingError::Decode(e.to_string()))
    }

    async fn end_session(&self, url: &str) -> Result<(), SignalingError> {
        debug!("POST {url}");
        self.post_empty(url).await
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use pcloud_core::protocol::SdpType;
    use pcloud_core::{Bitrate, SessionConfig};
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(server: &str) -> SessionConfig {
        SessionConfig {
            server: server.to_string(),
            codec: "h264".to_string(),
            audio: true,
            fps: 60,
            width: 1920,
            height: 1080,
            preset: "p1".to_string(),
            bitrate: Bitrate::megabits(25),
            capture: "monitor:0".to_string(),
        }
    }

    #[tokio::test]
    async fn test_post_offer_returns_answer() {
        // Arrange
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/session/offer"))
            .and(body_partial_json(serde_json::json!({
                "type": "offer",
                "codec": "h264",
                "bitrate": "25M"
            })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"sdp": "v=0\r\n", "type": "answer"})),
            )
            .expect(1)
            .mount(&server)
            .await;
        let cfg = config(&server.uri());
        let client = HttpSignalingClient::new().unwrap();

        // Act
        let answer = client
            .post_offer(&cfg.offer_url(), &OfferRequest::new("v=0\r\n", &cfg))
            .await
            .unwrap();

        // Assert
        assert_eq!(answer.kind, SdpType::Answer);
        assert_eq!(answer.sdp, "v=0\r\n");
    }

    #[tokio::test]
    async fn test_post_offer_non_success_carries_status_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/session/offer"))
            .respond_with(ResponseTemplate::new(503).set_body_string("encoder busy"))
            .mount(&server)
            .await;
        let cfg = config(&server.uri());
        let client = HttpSignalingClient::new().unwrap();

        let err = client
            .post_offer(&cfg.offer_url(), &OfferRequest::new("v=0", &cfg))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            SignalingError::Status { code: 503, ref body } if body == "encoder busy"
        ));
    }

    #[tokio::test]
    async fn test_post_offer_undecodable_body_is_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/session/offer"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;
        let cfg = config(&server.uri());
        let client = HttpSignalingClient::new().unwrap();

        let err = client
            .post_offer(&cfg.offer_url(), &OfferRequest::new("v=0", &cfg))
            .await
            .unwrap_err();

        assert!(matches!(err, SignalingError::Decode(_)));
    }

    #[tokio::test]
    async fn test_end_session_posts_to_end_endpoint() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/session/end"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;
        let cfg = config(&server.uri());
        let client = HttpSignalingClient::new().unwrap();

        client.end_session(&cfg.end_url()).await.unwrap();
    }

    #[tokio::test]
    async fn test_unreachable_host_is_transport_error() {
        let client = HttpSignalingClient::new().unwrap();

        let err = client.end_session("http://127.0.0.1:1/api/session/end").await.unwrap_err();

        assert!(matches!(err, SignalingError::Transport(_)));
    }
}
