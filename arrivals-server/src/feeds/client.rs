//! Metro open-data HTTP client.
//!
//! Provides async methods for fetching the live position, crowding, and
//! timetable feeds. Handles bearer-token authentication (cached, refreshed
//! reactively on 401), rate-limit detection, and error-page detection.
//! Everything past the wire — normalization, matching, reconciliation —
//! lives elsewhere; this module only produces loose records.

use std::future::Future;
use std::sync::Arc;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde_json::Value;
use tokio::sync::{RwLock, Semaphore};

use super::error::FeedError;
use super::normalize::looks_like_error_page;
use super::types::{LooseRecord, Payload};

/// Default base URL for the metro open-data API.
const DEFAULT_BASE_URL: &str = "https://api.metro.example.tw/v2";

/// Default maximum concurrent requests.
const DEFAULT_MAX_CONCURRENT: usize = 4;

/// Wrapper field names under which some endpoints nest their record array.
const PAYLOAD_WRAPPER_FIELDS: &[&str] = &["data", "Data", "records"];

/// The transport seam between the engine and the wire.
///
/// A transport returns loose records on success or an explicit failure;
/// it never partially succeeds. The production implementation is
/// [`MetroClient`]; tests use `feeds::MockTransport`.
pub trait FeedTransport: Send + Sync {
    /// Live train positions and countdowns for one line.
    fn fetch_track(&self, line: &str) -> impl Future<Output = Result<Payload, FeedError>> + Send;

    /// Crowding for the train-numbered (standard) line family.
    fn fetch_crowd_standard(&self) -> impl Future<Output = Result<Payload, FeedError>> + Send;

    /// Crowding for the direction-keyed line family.
    fn fetch_crowd_directional(&self) -> impl Future<Output = Result<Payload, FeedError>> + Send;

    /// Scheduled timetable for one line.
    fn fetch_schedule(&self, line: &str)
    -> impl Future<Output = Result<Payload, FeedError>> + Send;
}

/// Configuration for the metro client.
#[derive(Debug, Clone)]
pub struct MetroConfig {
    /// Account name for the token endpoint
    pub username: String,
    /// Account password for the token endpoint
    pub password: String,
    /// Base URL for the API
    pub base_url: String,
    /// Maximum concurrent requests
    pub max_concurrent: usize,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl MetroConfig {
    /// Create a new config with the given credentials.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            timeout_secs: 30,
        }
    }

    /// Set a custom base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set maximum concurrent requests.
    pub fn with_max_concurrent(mut self, n: usize) -> Self {
        self.max_concurrent = n;
        self
    }

    /// Set request timeout.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

/// Metro open-data API client.
///
/// Uses a semaphore to limit concurrent requests: the upstream rejects
/// bursts well before it rejects sustained load.
#[derive(Debug, Clone)]
pub struct MetroClient {
    http: reqwest::Client,
    base_url: String,
    username: String,
    password: String,
    token: Arc<RwLock<Option<String>>>,
    semaphore: Arc<Semaphore>,
}

impl MetroClient {
    /// Create a new client with the given configuration.
    pub fn new(config: MetroConfig) -> Result<Self, FeedError> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url,
            username: config.username,
            password: config.password,
            token: Arc::new(RwLock::new(None)),
            semaphore: Arc::new(Semaphore::new(config.max_concurrent)),
        })
    }

    /// Get the cached token, fetching a fresh one if none is cached.
    ///
    /// Tokens are only refreshed here and invalidated on a 401 response;
    /// there is no proactive expiry tracking.
    async fn ensure_token(&self) -> Result<String, FeedError> {
        if let Some(token) = self.token.read().await.clone() {
            return Ok(token);
        }

        let credentials = BASE64.encode(format!("{}:{}", self.username, self.password));
        let response = self
            .http
            .post(format!("{}/token", self.base_url))
            .header("Authorization", format!("Basic {credentials}"))
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(FeedError::Unauthorized);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FeedError::ApiError {
                status: status.as_u16(),
                message: body,
            });
        }

        let body: Value = response.json().await?;
        let token = body
            .get("access_token")
            .and_then(Value::as_str)
            .ok_or_else(|| FeedError::Json {
                message: "token response without access_token".to_string(),
                body: None,
            })?
            .to_string();

        *self.token.write().await = Some(token.clone());
        Ok(token)
    }

    /// Drop the cached token so the next call fetches a fresh one.
    async fn invalidate_token(&self) {
        *self.token.write().await = None;
    }

    /// Fetch one endpoint and unwrap its record list.
    async fn fetch_payload(&self, path: &str) -> Result<Payload, FeedError> {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|_| FeedError::ApiError {
                status: 0,
                message: "Semaphore closed".to_string(),
            })?;

        let token = self.ensure_token().await?;

        let response = self
            .http
            .get(format!("{}{}", self.base_url, path))
            .bearer_auth(&token)
            .send()
            .await?;

        let status = response.status();

        if status == reqwest::StatusCode::UNAUTHORIZED {
            // Token expired server-side; refresh on the next cycle
            self.invalidate_token().await;
            return Err(FeedError::Unauthorized);
        }

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(FeedError::RateLimited);
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FeedError::ApiError {
                status: status.as_u16(),
                message: body,
            });
        }

        let body = response.text().await?;

        if looks_like_error_page(&body) {
            return Err(FeedError::ErrorPage);
        }

        parse_payload(&body)
    }
}

/// Parse a response body into loose records.
///
/// Endpoints disagree about shape: most return a bare array, some nest
/// it under a wrapper field.
fn parse_payload(body: &str) -> Result<Payload, FeedError> {
    let value: Value = serde_json::from_str(body).map_err(|e| FeedError::Json {
        message: e.to_string(),
        body: Some(body.chars().take(500).collect()),
    })?;

    let items = match &value {
        Value::Array(items) => items.as_slice(),
        Value::Object(map) => PAYLOAD_WRAPPER_FIELDS
            .iter()
            .filter_map(|f| map.get(*f))
            .find_map(Value::as_array)
            .map(Vec::as_slice)
            .ok_or_else(|| FeedError::Json {
                message: "expected a record array".to_string(),
                body: Some(body.chars().take(500).collect()),
            })?,
        _ => {
            return Err(FeedError::Json {
                message: "expected a record array".to_string(),
                body: Some(body.chars().take(500).collect()),
            });
        }
    };

    Ok(items
        .iter()
        .filter_map(|item| match item {
            Value::Object(map) => Some(LooseRecord::new(map.clone())),
            _ => None,
        })
        .collect())
}

impl FeedTransport for MetroClient {
    async fn fetch_track(&self, line: &str) -> Result<Payload, FeedError> {
        self.fetch_payload(&format!("/track/{line}")).await
    }

    async fn fetch_crowd_standard(&self) -> Result<Payload, FeedError> {
        self.fetch_payload("/crowding/trains").await
    }

    async fn fetch_crowd_directional(&self) -> Result<Payload, FeedError> {
        self.fetch_payload("/crowding/platforms").await
    }

    async fn fetch_schedule(&self, line: &str) -> Result<Payload, FeedError> {
        self.fetch_payload(&format!("/timetable/{line}")).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_builder() {
        let config = MetroConfig::new("user", "pass")
            .with_base_url("http://localhost:8080")
            .with_max_concurrent(8)
            .with_timeout(60);

        assert_eq!(config.username, "user");
        assert_eq!(config.base_url, "http://localhost:8080");
        assert_eq!(config.max_concurrent, 8);
        assert_eq!(config.timeout_secs, 60);
    }

    #[test]
    fn config_defaults() {
        let config = MetroConfig::new("user", "pass");

        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.max_concurrent, DEFAULT_MAX_CONCURRENT);
        assert_eq!(config.timeout_secs, 30);
    }

    #[test]
    fn client_creation() {
        let client = MetroClient::new(MetroConfig::new("user", "pass"));
        assert!(client.is_ok());
    }

    #[test]
    fn parse_bare_array() {
        let payload = parse_payload(r#"[{"TrainNumber": "132"}]"#).unwrap();
        assert_eq!(payload.len(), 1);
    }

    #[test]
    fn parse_wrapped_array() {
        let payload = parse_payload(r#"{"data": [{"TrainNumber": "1"}, {"TrainNumber": "2"}]}"#)
            .unwrap();
        assert_eq!(payload.len(), 2);
    }

    #[test]
    fn parse_skips_non_object_items() {
        let payload = parse_payload(r#"[{"a": 1}, "stray", 3]"#).unwrap();
        assert_eq!(payload.len(), 1);
    }

    #[test]
    fn parse_rejects_scalars() {
        assert!(parse_payload("42").is_err());
        assert!(parse_payload(r#"{"message": "ok"}"#).is_err());
        assert!(parse_payload("not json at all").is_err());
    }

    // Integration tests against the live API require credentials and
    // network access; the poller paths are covered with MockTransport.
}
