//! Mock feed transport for testing without API access.
//!
//! Serves in-memory payloads through the same [`FeedTransport`] seam the
//! real client implements, and can be told to fail a feed to exercise
//! the poller's error paths.

use std::collections::HashMap;

use serde_json::Value;
use tokio::sync::RwLock;

use super::client::FeedTransport;
use super::error::FeedError;
use super::types::{LooseRecord, Payload};

/// Failure a mock feed should report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockFailure {
    RateLimited,
    Unauthorized,
    ErrorPage,
}

impl From<MockFailure> for FeedError {
    fn from(f: MockFailure) -> Self {
        match f {
            MockFailure::RateLimited => FeedError::RateLimited,
            MockFailure::Unauthorized => FeedError::Unauthorized,
            MockFailure::ErrorPage => FeedError::ErrorPage,
        }
    }
}

/// Build a payload from a JSON array literal (test convenience).
///
/// Non-object items are ignored, matching the real client's parsing.
pub fn payload_from_json(v: Value) -> Payload {
    match v {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::Object(map) => Some(LooseRecord::new(map)),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

/// In-memory feed transport.
#[derive(Default)]
pub struct MockTransport {
    track: RwLock<HashMap<String, Payload>>,
    crowd_standard: RwLock<Payload>,
    crowd_directional: RwLock<Payload>,
    schedule: RwLock<HashMap<String, Payload>>,
    fail_track: RwLock<Option<MockFailure>>,
    fail_crowd: RwLock<Option<MockFailure>>,
    fail_schedule: RwLock<Option<MockFailure>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the track payload served for one line.
    pub async fn set_track(&self, line: &str, payload: Payload) {
        self.track.write().await.insert(line.to_string(), payload);
    }

    pub async fn set_crowd_standard(&self, payload: Payload) {
        *self.crowd_standard.write().await = payload;
    }

    pub async fn set_crowd_directional(&self, payload: Payload) {
        *self.crowd_directional.write().await = payload;
    }

    pub async fn set_schedule(&self, line: &str, payload: Payload) {
        self.schedule
            .write()
            .await
            .insert(line.to_string(), payload);
    }

    /// Make every track fetch fail until cleared with `None`.
    pub async fn fail_track(&self, failure: Option<MockFailure>) {
        *self.fail_track.write().await = failure;
    }

    /// Make every crowd fetch fail until cleared with `None`.
    pub async fn fail_crowd(&self, failure: Option<MockFailure>) {
        *self.fail_crowd.write().await = failure;
    }

    /// Make every schedule fetch fail until cleared with `None`.
    pub async fn fail_schedule(&self, failure: Option<MockFailure>) {
        *self.fail_schedule.write().await = failure;
    }
}

impl FeedTransport for MockTransport {
    async fn fetch_track(&self, line: &str) -> Result<Payload, FeedError> {
        if let Some(failure) = *self.fail_track.read().await {
            return Err(failure.into());
        }
        Ok(self
            .track
            .read()
            .await
            .get(line)
            .cloned()
            .unwrap_or_default())
    }

    async fn fetch_crowd_standard(&self) -> Result<Payload, FeedError> {
        if let Some(failure) = *self.fail_crowd.read().await {
            return Err(failure.into());
        }
        Ok(self.crowd_standard.read().await.clone())
    }

    async fn fetch_crowd_directional(&self) -> Result<Payload, FeedError> {
        if let Some(failure) = *self.fail_crowd.read().await {
            return Err(failure.into());
        }
        Ok(self.crowd_directional.read().await.clone())
    }

    async fn fetch_schedule(&self, line: &str) -> Result<Payload, FeedError> {
        if let Some(failure) = *self.fail_schedule.read().await {
            return Err(failure.into());
        }
        Ok(self
            .schedule
            .read()
            .await
            .get(line)
            .cloned()
            .unwrap_or_default())
    }
}
