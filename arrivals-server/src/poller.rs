//! Feed polling and reconciliation scheduling.
//!
//! One tokio task per feed, each on its own cadence. A cycle fetches,
//! normalizes, and stores its feed's latest records; when the records
//! actually changed, the cycle rebuilds the snapshot from all feeds'
//! latest inputs and publishes it. Failures leave the previous inputs
//! (and therefore the previous snapshot) in place.
//!
//! The track upstream rejects bursts, so its per-line calls run serially
//! with a minimum delay that doubles on a rate-limit response and resets
//! after a clean cycle. The two crowding sub-feeds tolerate concurrency
//! and are fetched together.

use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cache::{CachedScheduleFeed, ScheduleCacheConfig};
use crate::feeds::{
    CrowdNormalizer, FeedTransport, LineFamily, Normalizer, RawCrowdRecord, RawScheduleRecord,
    RawTrackRecord, TrackNormalizer,
};
use crate::reconcile::{ReconcileConfig, ReconcileInputs, reconcile};
use crate::snapshot::SnapshotStore;
use crate::stations::StationTable;

/// Cadences and rate-limit discipline for the polling tasks.
#[derive(Debug, Clone)]
pub struct PollerConfig {
    /// Live position feed cadence.
    pub track_interval: Duration,

    /// Crowding feed cadence.
    pub crowd_interval: Duration,

    /// Timetable feed cadence.
    pub schedule_interval: Duration,

    /// Minimum delay between successive per-line calls to the same
    /// upstream within one cycle.
    pub line_call_delay: Duration,

    /// Ceiling for the delay after repeated rate-limit responses.
    pub line_call_delay_max: Duration,

    /// Lines to poll, by line id.
    pub lines: Vec<String>,
}

impl PollerConfig {
    /// Config polling every line present in the station table.
    pub fn for_table(table: &StationTable) -> Self {
        let mut lines: Vec<String> = Vec::new();
        for station in table.iter() {
            if !lines.contains(&station.line) {
                lines.push(station.line.clone());
            }
        }

        Self {
            track_interval: Duration::from_secs(25),
            crowd_interval: Duration::from_secs(40),
            schedule_interval: Duration::from_secs(6 * 60 * 60),
            line_call_delay: Duration::from_millis(500),
            line_call_delay_max: Duration::from_secs(15),
            lines,
        }
    }
}

/// Latest successfully normalized records per feed.
///
/// Reconciliation always consumes the most recent value of each slot;
/// there is no cross-feed transaction, which is fine because the slow
/// feeds change slowly.
#[derive(Default)]
struct FeedInputs {
    track: tokio::sync::RwLock<Vec<RawTrackRecord>>,
    crowd: tokio::sync::RwLock<Vec<RawCrowdRecord>>,
    schedule: tokio::sync::RwLock<Vec<RawScheduleRecord>>,
}

/// Drives the fetch-normalize-reconcile-publish cycles.
pub struct Poller<T> {
    transport: Arc<T>,
    schedule_feed: CachedScheduleFeed<T>,
    stations: Arc<StationTable>,
    store: Arc<SnapshotStore>,
    config: PollerConfig,
    reconcile_config: ReconcileConfig,
    inputs: FeedInputs,
}

impl<T: FeedTransport + 'static> Poller<T> {
    pub fn new(
        transport: Arc<T>,
        stations: Arc<StationTable>,
        store: Arc<SnapshotStore>,
        config: PollerConfig,
        reconcile_config: ReconcileConfig,
        cache_config: &ScheduleCacheConfig,
    ) -> Self {
        Self {
            schedule_feed: CachedScheduleFeed::new(transport.clone(), cache_config),
            transport,
            stations,
            store,
            config,
            reconcile_config,
            inputs: FeedInputs::default(),
        }
    }

    /// One track cycle: fetch every line serially, respecting the
    /// current inter-call delay. Returns whether the stored records
    /// changed.
    ///
    /// A rate-limit response truncates the cycle (whatever was already
    /// fetched still counts) and doubles the delay; a cycle that reaches
    /// the last line resets it. A cycle in which no line succeeded is
    /// skipped entirely so the previous records survive.
    pub async fn poll_track_once(&self, delay: &mut Duration) -> bool {
        let mut collected = Vec::new();
        let mut any_success = false;
        let mut truncated = false;

        for (i, line) in self.config.lines.iter().enumerate() {
            if i > 0 {
                tokio::time::sleep(*delay).await;
            }

            match self.transport.fetch_track(line).await {
                Ok(payload) => {
                    let batch = TrackNormalizer.normalize(&payload);
                    if batch.skipped > 0 {
                        warn!(%line, skipped = batch.skipped, "track records skipped");
                    }
                    collected.extend(batch.records);
                    any_success = true;
                }
                Err(e) if e.is_rate_limit() => {
                    *delay = (*delay * 2).min(self.config.line_call_delay_max);
                    warn!(
                        %line,
                        next_delay_ms = delay.as_millis() as u64,
                        "rate limited, truncating track cycle"
                    );
                    truncated = true;
                    break;
                }
                Err(e) => {
                    warn!(%line, error = %e, "track fetch failed, skipping line");
                }
            }
        }

        if !truncated {
            *delay = self.config.line_call_delay;
        }

        if !any_success {
            debug!("track cycle produced nothing, keeping previous records");
            return false;
        }

        let mut slot = self.inputs.track.write().await;
        if *slot == collected {
            return false;
        }
        *slot = collected;
        true
    }

    /// One crowding cycle: both sub-feeds concurrently, output fanned in.
    /// Returns whether the stored records changed.
    pub async fn poll_crowd_once(&self) -> bool {
        let (standard, directional) = tokio::join!(
            self.transport.fetch_crowd_standard(),
            self.transport.fetch_crowd_directional()
        );

        if standard.is_err() && directional.is_err() {
            warn!("both crowding sub-feeds failed, keeping previous records");
            return false;
        }

        let mut collected = Vec::new();
        match standard {
            Ok(payload) => {
                let batch = CrowdNormalizer::new(LineFamily::Standard).normalize(&payload);
                if batch.skipped > 0 {
                    warn!(skipped = batch.skipped, "standard crowd records skipped");
                }
                collected.extend(batch.records);
            }
            Err(e) => warn!(error = %e, "standard crowding fetch failed"),
        }
        match directional {
            Ok(payload) => {
                let batch = CrowdNormalizer::new(LineFamily::DirectionKeyed).normalize(&payload);
                if batch.skipped > 0 {
                    warn!(skipped = batch.skipped, "directional crowd records skipped");
                }
                collected.extend(batch.records);
            }
            Err(e) => warn!(error = %e, "directional crowding fetch failed"),
        }

        let mut slot = self.inputs.crowd.write().await;
        if *slot == collected {
            return false;
        }
        *slot = collected;
        true
    }

    /// One timetable cycle: every line through the schedule cache.
    /// Returns whether the stored records changed.
    ///
    /// The timetable upstream tolerates concurrency (hours between
    /// cycles, and the client's semaphore bounds the burst), so the
    /// per-line fetches run together.
    pub async fn poll_schedule_once(&self) -> bool {
        let results = futures::future::join_all(self.config.lines.iter().map(|line| async move {
            (line.as_str(), self.schedule_feed.get_line(line).await)
        }))
        .await;

        let mut collected = Vec::new();
        let mut any_success = false;

        for (line, result) in results {
            match result {
                Ok(records) => {
                    collected.extend(records.iter().cloned());
                    any_success = true;
                }
                Err(e) => warn!(line, error = %e, "schedule fetch failed, skipping line"),
            }
        }

        if !any_success {
            debug!("schedule cycle produced nothing, keeping previous records");
            return false;
        }

        let mut slot = self.inputs.schedule.write().await;
        if *slot == collected {
            return false;
        }
        *slot = collected;
        true
    }

    /// Rebuild the snapshot from the latest inputs and publish it.
    pub async fn rebuild_and_publish(&self) {
        let now = Local::now().naive_local();

        let track = self.inputs.track.read().await.clone();
        let crowd = self.inputs.crowd.read().await.clone();
        let schedule = self.inputs.schedule.read().await.clone();

        let outcome = reconcile(
            ReconcileInputs {
                track: &track,
                crowd: &crowd,
                schedule: &schedule,
            },
            &self.stations,
            &self.reconcile_config,
            now,
        );

        if outcome.drops.total() > 0 {
            warn!(
                unknown_station = outcome.drops.unknown_station,
                duplicate_live = outcome.drops.duplicate_live,
                crowd_unresolved = outcome.drops.crowd_unresolved,
                "records dropped during reconciliation"
            );
        }

        info!(
            arrivals = outcome.arrivals.len(),
            suppressed_scheduled = outcome.drops.suppressed_scheduled,
            "publishing snapshot"
        );
        self.store.publish(outcome.arrivals, now).await;
    }

    /// Spawn the three polling tasks. They run until the process exits;
    /// nothing persisted depends on them, so shutdown just drops them.
    pub fn spawn(self: Arc<Self>) -> Vec<JoinHandle<()>> {
        let track = {
            let poller = self.clone();
            tokio::spawn(async move {
                let mut delay = poller.config.line_call_delay;
                let mut interval = tokio::time::interval(poller.config.track_interval);
                loop {
                    interval.tick().await;
                    if poller.poll_track_once(&mut delay).await {
                        poller.rebuild_and_publish().await;
                    }
                }
            })
        };

        let crowd = {
            let poller = self.clone();
            tokio::spawn(async move {
                let mut interval = tokio::time::interval(poller.config.crowd_interval);
                loop {
                    interval.tick().await;
                    if poller.poll_crowd_once().await {
                        poller.rebuild_and_publish().await;
                    }
                }
            })
        };

        let schedule = {
            let poller = self;
            tokio::spawn(async move {
                let mut interval = tokio::time::interval(poller.config.schedule_interval);
                loop {
                    interval.tick().await;
                    if poller.poll_schedule_once().await {
                        poller.rebuild_and_publish().await;
                    }
                }
            })
        };

        vec![track, crowd, schedule]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    use crate::feeds::{MockFailure, MockTransport, payload_from_json};

    fn poller(transport: Arc<MockTransport>) -> Poller<MockTransport> {
        let stations = Arc::new(StationTable::network());
        let config = PollerConfig {
            lines: vec!["BL".to_string(), "BR".to_string()],
            ..PollerConfig::for_table(&stations)
        };
        Poller::new(
            transport,
            stations,
            Arc::new(SnapshotStore::new(Duration::from_secs(90))),
            config,
            ReconcileConfig::default(),
            &ScheduleCacheConfig::default(),
        )
    }

    fn track_payload() -> serde_json::Value {
        json!([{
            "StationName": "台北車站",
            "DestinationName": "頂埔",
            "TrainNumber": "132",
            "CountDown": "01:28",
            "LineID": "BL"
        }])
    }

    #[test]
    fn config_covers_every_line_once() {
        let config = PollerConfig::for_table(&StationTable::network());
        assert_eq!(config.lines, vec!["BL", "R", "G", "O", "BR"]);
    }

    #[tokio::test(start_paused = true)]
    async fn track_cycle_stores_and_detects_change() {
        let transport = Arc::new(MockTransport::new());
        transport
            .set_track("BL", payload_from_json(track_payload()))
            .await;

        let poller = poller(transport.clone());
        let mut delay = poller.config.line_call_delay;

        // First cycle changes the inputs
        assert!(poller.poll_track_once(&mut delay).await);
        // An identical second cycle does not
        assert!(!poller.poll_track_once(&mut delay).await);

        poller.rebuild_and_publish().await;
        let snapshot = poller.store.current().await;
        assert_eq!(snapshot.arrivals.len(), 1);
        assert_eq!(snapshot.arrivals[0].eta_seconds, Some(88));
    }

    #[tokio::test(start_paused = true)]
    async fn rate_limit_backs_off_and_keeps_previous_records() {
        let transport = Arc::new(MockTransport::new());
        transport
            .set_track("BL", payload_from_json(track_payload()))
            .await;

        let poller = poller(transport.clone());
        let mut delay = poller.config.line_call_delay;
        assert!(poller.poll_track_once(&mut delay).await);

        // Upstream starts rejecting: the cycle is skipped and the delay doubles
        transport.fail_track(Some(MockFailure::RateLimited)).await;
        let before = delay;
        assert!(!poller.poll_track_once(&mut delay).await);
        assert_eq!(delay, before * 2);
        assert_eq!(poller.inputs.track.read().await.len(), 1);

        // Recovery resets the delay
        transport.fail_track(None).await;
        poller.poll_track_once(&mut delay).await;
        assert_eq!(delay, poller.config.line_call_delay);
    }

    #[tokio::test(start_paused = true)]
    async fn backoff_is_capped() {
        let transport = Arc::new(MockTransport::new());
        transport.fail_track(Some(MockFailure::RateLimited)).await;

        let poller = poller(transport);
        let mut delay = poller.config.line_call_delay;
        for _ in 0..10 {
            poller.poll_track_once(&mut delay).await;
        }
        assert_eq!(delay, poller.config.line_call_delay_max);
    }

    #[tokio::test]
    async fn crowd_cycle_fans_in_both_sub_feeds() {
        let transport = Arc::new(MockTransport::new());
        transport
            .set_crowd_standard(payload_from_json(json!([{
                "TrainNumber": "132",
                "CarLoads": [2, 2, 3, 1]
            }])))
            .await;
        transport
            .set_crowd_directional(payload_from_json(json!([{
                "StationName": "大安",
                "Direction": "上行",
                "CarLoads": [1, 2, 1, 1]
            }])))
            .await;

        let poller = poller(transport);
        assert!(poller.poll_crowd_once().await);

        let crowd = poller.inputs.crowd.read().await;
        assert_eq!(crowd.len(), 2);
        assert!(crowd.iter().any(|r| r.family == LineFamily::Standard));
        assert!(crowd.iter().any(|r| r.family == LineFamily::DirectionKeyed));
    }

    #[tokio::test]
    async fn crowd_total_failure_keeps_previous_records() {
        let transport = Arc::new(MockTransport::new());
        transport
            .set_crowd_standard(payload_from_json(json!([{
                "TrainNumber": "132",
                "CarLoads": [2]
            }])))
            .await;

        let poller = poller(transport.clone());
        assert!(poller.poll_crowd_once().await);

        transport.fail_crowd(Some(MockFailure::ErrorPage)).await;
        assert!(!poller.poll_crowd_once().await);
        assert_eq!(poller.inputs.crowd.read().await.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn schedule_cycle_collects_lines() {
        let transport = Arc::new(MockTransport::new());
        transport
            .set_schedule(
                "BL",
                payload_from_json(json!([{
                    "StationID": "BL12",
                    "DestinationStaName": "頂埔",
                    "LineID": "BL",
                    "Timetables": ["06:00"]
                }])),
            )
            .await;

        let poller = poller(transport);
        assert!(poller.poll_schedule_once().await);
        assert_eq!(poller.inputs.schedule.read().await.len(), 1);

        // Unchanged on refetch (served from cache)
        assert!(!poller.poll_schedule_once().await);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_feed_never_clears_the_snapshot() {
        let transport = Arc::new(MockTransport::new());
        transport
            .set_track("BL", payload_from_json(track_payload()))
            .await;

        let poller = poller(transport.clone());
        let mut delay = poller.config.line_call_delay;
        poller.poll_track_once(&mut delay).await;
        poller.rebuild_and_publish().await;
        assert_eq!(poller.store.current().await.arrivals.len(), 1);

        // Total upstream failure: cycle is skipped, snapshot intact
        transport.fail_track(Some(MockFailure::Unauthorized)).await;
        assert!(!poller.poll_track_once(&mut delay).await);
        assert_eq!(poller.store.current().await.arrivals.len(), 1);
    }
}
