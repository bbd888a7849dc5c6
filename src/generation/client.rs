//! Image Generation HTTP Client
//!
//! One POST per attempt against the configured endpoint. The client does no
//! retrying or interpretation of its own: it reports the status and the
//! decoded body (or why it could not be decoded) and leaves routing to the
//! dispatcher.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

use crate::config::ApiConfig;
use crate::constants::api as api_constants;
use crate::types::{NetworkErrorKind, RelayError, Result, truncate_chars};

/// JSON body sent for every attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerationRequest {
    pub model: String,
    pub prompt: String,
    pub num_images: u32,
    pub size: String,
}

/// Decoded response body
#[derive(Debug, Clone, PartialEq)]
pub enum ReplyBody {
    Json(Value),
    /// Body was not valid JSON; carries the decode error
    Malformed(String),
}

/// Raw outcome of a request that reached the provider
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderReply {
    pub status: u16,
    pub body: ReplyBody,
    pub elapsed: Duration,
}

impl ProviderReply {
    pub fn json(status: u16, body: Value) -> Self {
        Self {
            status,
            body: ReplyBody::Json(body),
            elapsed: Duration::ZERO,
        }
    }

    /// Short human-readable detail for error reporting
    pub fn detail(&self) -> String {
        match &self.body {
            ReplyBody::Json(value) => value
                .get("error")
                .and_then(|e| e.get("message").or(Some(e)))
                .or_else(|| value.get("message"))
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| truncate_chars(&value.to_string(), 200)),
            ReplyBody::Malformed(reason) => reason.clone(),
        }
    }
}

/// Request never produced an HTTP response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportError {
    pub kind: NetworkErrorKind,
    pub detail: String,
}

impl std::fmt::Display for TransportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.kind, self.detail)
    }
}

impl std::error::Error for TransportError {}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            NetworkErrorKind::Timeout
        } else {
            NetworkErrorKind::Connection
        };
        Self {
            kind,
            detail: err.to_string(),
        }
    }
}

/// Shared client type for the dispatcher
pub type SharedImageClient = Arc<dyn ImageClient>;

/// Seam between the dispatcher and the network
#[async_trait]
pub trait ImageClient: Send + Sync {
    /// Issue a single generation request
    async fn submit(
        &self,
        request: &GenerationRequest,
    ) -> std::result::Result<ProviderReply, TransportError>;

    /// Client name for logging
    fn name(&self) -> &str;
}

/// reqwest-backed client with secure API key handling
pub struct HttpImageClient {
    /// API key stored securely - never exposed in logs or debug output
    api_key: SecretString,
    endpoint: String,
    client: reqwest::Client,
}

impl std::fmt::Debug for HttpImageClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpImageClient")
            .field("api_key", &"[REDACTED]")
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

impl HttpImageClient {
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let api_key = config
            .key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| {
                std::env::var(api_constants::API_KEY_ENV)
                    .ok()
                    .filter(|k| !k.trim().is_empty())
            })
            .ok_or_else(|| {
                RelayError::Config(format!(
                    "API key not found. Set {} or api.key in config",
                    api_constants::API_KEY_ENV
                ))
            })?;

        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| RelayError::Http(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            api_key: SecretString::from(api_key),
            endpoint: config.endpoint.clone(),
            client,
        })
    }
}

#[async_trait]
impl ImageClient for HttpImageClient {
    async fn submit(
        &self,
        request: &GenerationRequest,
    ) -> std::result::Result<ProviderReply, TransportError> {
        let start = Instant::now();

        debug!(model = %request.model, endpoint = %self.endpoint, "Sending generation request");

        let response = self
            .client
            .post(&self.endpoint)
            .header(
                "Authorization",
                format!("Bearer {}", self.api_key.expose_secret()),
            )
            .header("Accept", "application/json")
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await?;

        let status = response.status().as_u16();
        let bytes = response.bytes().await?;

        let body = match serde_json::from_slice::<Value>(&bytes) {
            Ok(value) => ReplyBody::Json(value),
            Err(e) => ReplyBody::Malformed(format!(
                "invalid JSON ({}): {}",
                e,
                truncate_chars(&String::from_utf8_lossy(&bytes), 200)
            )),
        };

        Ok(ProviderReply {
            status,
            body,
            elapsed: start.elapsed(),
        })
    }

    fn name(&self) -> &str {
        "http"
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(server: &MockServer) -> ApiConfig {
        ApiConfig {
            endpoint: format!("{}/api/v1/generate", server.uri()),
            key: Some("test-api-key".into()),
            timeout_secs: 1,
            ..Default::default()
        }
    }

    fn request() -> GenerationRequest {
        GenerationRequest {
            model: "model-a".into(),
            prompt: "a cat".into(),
            num_images: 1,
            size: "1024x1024".into(),
        }
    }

    #[tokio::test]
    async fn test_submit_sends_expected_request() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/v1/generate"))
            .and(header("Authorization", "Bearer test-api-key"))
            .and(header("Accept", "application/json"))
            .and(header("Content-Type", "application/json"))
            .and(body_json(json!({
                "model": "model-a",
                "prompt": "a cat",
                "num_images": 1,
                "size": "1024x1024"
            })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"data": [{"image_url": "https://x/y.png"}]})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = HttpImageClient::new(&config_for(&server)).unwrap();
        let reply = client.submit(&request()).await.unwrap();

        assert_eq!(reply.status, 200);
        assert_eq!(
            reply.body,
            ReplyBody::Json(json!({"data": [{"image_url": "https://x/y.png"}]}))
        );
    }

    #[tokio::test]
    async fn test_submit_reports_status_and_malformed_body() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("<html>busy</html>"))
            .mount(&server)
            .await;

        let client = HttpImageClient::new(&config_for(&server)).unwrap();
        let reply = client.submit(&request()).await.unwrap();

        assert_eq!(reply.status, 503);
        assert!(matches!(reply.body, ReplyBody::Malformed(ref r) if r.contains("busy")));
    }

    #[tokio::test]
    async fn test_submit_times_out() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
            .mount(&server)
            .await;

        let client = HttpImageClient::new(&config_for(&server)).unwrap();
        let err = client.submit(&request()).await.unwrap_err();

        assert_eq!(err.kind, NetworkErrorKind::Timeout);
    }

    #[test]
    fn test_missing_api_key_is_config_error() {
        let config = ApiConfig {
            key: Some("   ".into()),
            ..Default::default()
        };
        // A blank configured key falls through to the environment
        if std::env::var(api_constants::API_KEY_ENV).is_err() {
            assert!(matches!(
                HttpImageClient::new(&config),
                Err(RelayError::Config(_))
            ));
        }
    }

    #[test]
    fn test_debug_redacts_key() {
        let config = ApiConfig {
            key: Some("sk-very-secret".into()),
            ..Default::default()
        };
        let client = HttpImageClient::new(&config).unwrap();
        let debug = format!("{:?}", client);
        assert!(!debug.contains("sk-very-secret"));
    }

    #[test]
    fn test_reply_detail_prefers_error_message() {
        let reply = ProviderReply::json(401, json!({"error": {"message": "bad key"}}));
        assert_eq!(reply.detail(), "bad key");

        let reply = ProviderReply::json(400, json!({"error": "nope"}));
        assert_eq!(reply.detail(), "nope");

        let reply = ProviderReply::json(404, json!({"message": "no such model"}));
        assert_eq!(reply.detail(), "no such model");
    }
}
