//! The published arrival snapshot.
//!
//! A single shared reference to an immutable snapshot. The reconciler
//! builds a complete new list and swaps the reference wholesale; readers
//! clone the reference and see either the previous complete snapshot or
//! the new one, never a mix. Nothing is ever mutated after publication.

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDateTime;
use tokio::sync::RwLock;

use crate::domain::CanonicalArrival;

/// One complete published reconciliation result.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub arrivals: Vec<CanonicalArrival>,
    /// `None` until the first successful reconciliation.
    pub published_at: Option<NaiveDateTime>,
}

impl Snapshot {
    fn empty() -> Self {
        Self {
            arrivals: Vec::new(),
            published_at: None,
        }
    }
}

/// Holder of the current snapshot.
///
/// Reads are a lock-guarded pointer clone: they never wait on a
/// reconciliation in progress, because the write side also only swaps a
/// pointer. When every feed is down the store simply keeps serving the
/// last good snapshot, and [`SnapshotStore::is_stale`] reports its age.
pub struct SnapshotStore {
    current: RwLock<Arc<Snapshot>>,
    stale_after: chrono::Duration,
}

impl SnapshotStore {
    /// Create a store with the given staleness threshold.
    ///
    /// The threshold is derived from the live feed's cadence by the
    /// caller; a snapshot older than a few missed cycles is stale.
    pub fn new(stale_after: Duration) -> Self {
        Self {
            current: RwLock::new(Arc::new(Snapshot::empty())),
            stale_after: chrono::Duration::from_std(stale_after)
                .unwrap_or(chrono::Duration::MAX),
        }
    }

    /// Publish a complete new arrival list, replacing the snapshot.
    pub async fn publish(&self, arrivals: Vec<CanonicalArrival>, now: NaiveDateTime) {
        let snapshot = Arc::new(Snapshot {
            arrivals,
            published_at: Some(now),
        });
        *self.current.write().await = snapshot;
    }

    /// The current snapshot. Never blocks on a publish in progress
    /// beyond the pointer swap itself.
    pub async fn current(&self) -> Arc<Snapshot> {
        self.current.read().await.clone()
    }

    /// Whether a snapshot is stale as of `now`.
    ///
    /// A store that has never published is stale from the start.
    pub fn is_stale(&self, snapshot: &Snapshot, now: NaiveDateTime) -> bool {
        match snapshot.published_at {
            Some(published_at) => now - published_at > self.stale_after,
            None => true,
        }
    }
}
