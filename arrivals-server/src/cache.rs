//! Caching layer for the schedule feed.
//!
//! Timetables change on the order of weeks, but the poller and the
//! reconciler may ask for them more often (startup, post-failure
//! refetch). A per-line TTL cache keeps those asks off the upstream,
//! which is the feed most sensitive to redundant calls.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache as MokaCache;
use tracing::debug;

use crate::feeds::{
    FeedError, FeedTransport, Normalizer, RawScheduleRecord, ScheduleNormalizer,
};

/// Cached normalized timetable for one line.
type LineEntry = Arc<Vec<RawScheduleRecord>>;

/// Configuration for the schedule cache.
#[derive(Debug, Clone)]
pub struct ScheduleCacheConfig {
    /// TTL for cached entries.
    pub ttl: Duration,

    /// Maximum number of cached lines.
    pub max_capacity: u64,
}

impl Default for ScheduleCacheConfig {
    fn default() -> Self {
        Self {
            // Comfortably under the poller's schedule cadence, so each
            // scheduled tick refetches while triggered asks in between
            // stay local
            ttl: Duration::from_secs(4 * 60 * 60),
            max_capacity: 64,
        }
    }
}

/// Schedule feed access with a per-line TTL cache.
///
/// Wraps a [`FeedTransport`] and caches normalized records. Failures are
/// never cached: a line that failed to fetch is retried on the next ask.
pub struct CachedScheduleFeed<T> {
    transport: Arc<T>,
    lines: MokaCache<String, LineEntry>,
}

impl<T: FeedTransport> CachedScheduleFeed<T> {
    /// Create a new cached feed over the given transport.
    pub fn new(transport: Arc<T>, config: &ScheduleCacheConfig) -> Self {
        let lines = MokaCache::builder()
            .time_to_live(config.ttl)
            .max_capacity(config.max_capacity)
            .build();

        Self { transport, lines }
    }

    /// Get the normalized timetable for a line, fetching on a cache miss.
    pub async fn get_line(&self, line: &str) -> Result<LineEntry, FeedError> {
        if let Some(cached) = self.lines.get(line).await {
            return Ok(cached);
        }

        let payload = self.transport.fetch_schedule(line).await?;
        let batch = ScheduleNormalizer.normalize(&payload);
        if batch.skipped > 0 {
            debug!(line, skipped = batch.skipped, "schedule records skipped");
        }

        let entry = Arc::new(batch.records);
        self.lines.insert(line.to_string(), entry.clone()).await;

        Ok(entry)
    }

    /// Number of cached lines (for monitoring).
    pub fn entry_count(&self) -> u64 {
        self.lines.entry_count()
    }

    /// Invalidate all cached entries.
    pub fn invalidate_all(&self) {
        self.lines.invalidate_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    use crate::feeds::{MockFailure, MockTransport, payload_from_json};

    fn timetable_payload() -> serde_json::Value {
        json!([{
            "StationID": "BL12",
            "StationName": "台北車站",
            "DestinationStaName": "頂埔",
            "LineID": "BL",
            "Timetables": ["06:00", "06:12"]
        }])
    }

    #[tokio::test]
    async fn fetches_and_caches_per_line() {
        let transport = Arc::new(MockTransport::new());
        transport
            .set_schedule("BL", payload_from_json(timetable_payload()))
            .await;

        let feed = CachedScheduleFeed::new(transport.clone(), &ScheduleCacheConfig::default());

        let first = feed.get_line("BL").await.unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].times.len(), 2);

        // A transport failure after caching does not evict the entry
        transport.fail_schedule(Some(MockFailure::ErrorPage)).await;
        let second = feed.get_line("BL").await.unwrap();
        assert_eq!(second, first);
    }

    #[tokio::test]
    async fn failures_are_not_cached() {
        let transport = Arc::new(MockTransport::new());
        transport.fail_schedule(Some(MockFailure::ErrorPage)).await;

        let feed = CachedScheduleFeed::new(transport.clone(), &ScheduleCacheConfig::default());
        assert!(feed.get_line("BL").await.is_err());

        // Once the upstream recovers, the next ask succeeds
        transport.fail_schedule(None).await;
        transport
            .set_schedule("BL", payload_from_json(timetable_payload()))
            .await;
        assert!(feed.get_line("BL").await.is_ok());
    }

    #[tokio::test]
    async fn default_config() {
        let config = ScheduleCacheConfig::default();
        assert_eq!(config.ttl, Duration::from_secs(4 * 60 * 60));
        assert_eq!(config.max_capacity, 64);
    }
}
