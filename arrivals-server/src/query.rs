//! Read-only query interface over the published snapshot.
//!
//! This is the only surface the HTTP layer touches. Queries filter the
//! current snapshot and never trigger a fetch: a query during total
//! upstream failure answers from the last good snapshot with `stale`
//! set, it does not wait on the network.

use std::sync::Arc;

use chrono::NaiveDateTime;

use crate::domain::CanonicalArrival;
use crate::snapshot::{Snapshot, SnapshotStore};
use crate::stations::{CanonicalStation, StationTable};

/// The whole board: every reconciled arrival.
#[derive(Debug)]
pub struct BoardView {
    pub snapshot: Arc<Snapshot>,
    pub stale: bool,
}

/// One station's slice of the board.
#[derive(Debug)]
pub struct StationView {
    pub station: CanonicalStation,
    pub arrivals: Vec<CanonicalArrival>,
    pub published_at: Option<NaiveDateTime>,
    pub stale: bool,
}

/// Read-only accessor over the snapshot store.
#[derive(Clone)]
pub struct ArrivalsQuery {
    store: Arc<SnapshotStore>,
    stations: Arc<StationTable>,
}

impl ArrivalsQuery {
    pub fn new(store: Arc<SnapshotStore>, stations: Arc<StationTable>) -> Self {
        Self { store, stations }
    }

    /// All arrivals in the current snapshot.
    pub async fn get_all(&self, now: NaiveDateTime) -> BoardView {
        let snapshot = self.store.current().await;
        let stale = self.store.is_stale(&snapshot, now);
        BoardView { snapshot, stale }
    }

    /// Arrivals for one station.
    ///
    /// Accepts a station code or a raw (unnormalized) name; returns
    /// `None` when neither resolves. The arrivals keep the snapshot's
    /// order, which is already eta-ascending within a station.
    pub async fn get_by_station(&self, raw: &str, now: NaiveDateTime) -> Option<StationView> {
        let station = self.stations.resolve(raw, None)?.clone();

        let snapshot = self.store.current().await;
        let arrivals = snapshot
            .arrivals
            .iter()
            .filter(|a| a.station_id == station.code)
            .cloned()
            .collect();

        Some(StationView {
            arrivals,
            published_at: snapshot.published_at,
            stale: self.store.is_stale(&snapshot, now),
            station,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;

    use chrono::NaiveDate;

    use crate::domain::{SourceKind, StationCode};

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, 1)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn arrival(code: &str, name: &str, eta: u32) -> CanonicalArrival {
        let station_id = StationCode::parse(code).unwrap();
        CanonicalArrival {
            station_id,
            station_name: name.to_string(),
            line_id: station_id.line_prefix().to_string(),
            destination_name: "頂埔".to_string(),
            train_id: None,
            eta_seconds: Some(eta),
            crowd_level: None,
            car_levels: Vec::new(),
            source: SourceKind::Live,
            observed_at: at(8, 0),
        }
    }

    fn query() -> ArrivalsQuery {
        ArrivalsQuery::new(
            Arc::new(SnapshotStore::new(Duration::from_secs(90))),
            Arc::new(StationTable::network()),
        )
    }

    #[tokio::test]
    async fn get_all_reflects_snapshot_and_staleness() {
        let q = query();

        let view = q.get_all(at(8, 0)).await;
        assert!(view.snapshot.arrivals.is_empty());
        assert!(view.stale);

        q.store
            .publish(vec![arrival("BL12", "台北車站", 60)], at(8, 0))
            .await;

        let view = q.get_all(at(8, 1)).await;
        assert_eq!(view.snapshot.arrivals.len(), 1);
        assert!(!view.stale);

        let view = q.get_all(at(8, 10)).await;
        assert!(view.stale);
    }

    #[tokio::test]
    async fn get_by_station_filters() {
        let q = query();
        q.store
            .publish(
                vec![
                    arrival("BL11", "西門", 30),
                    arrival("BL12", "台北車站", 60),
                    arrival("BL12", "台北車站", 300),
                    arrival("R10", "台北車站", 90),
                ],
                at(8, 0),
            )
            .await;

        let view = q.get_by_station("BL12", at(8, 0)).await.unwrap();
        assert_eq!(view.station.name, "台北車站");
        assert_eq!(view.arrivals.len(), 2);
        assert!(view.arrivals.iter().all(|a| a.station_id.as_str() == "BL12"));
        assert_eq!(view.published_at, Some(at(8, 0)));
    }

    #[tokio::test]
    async fn get_by_station_accepts_raw_names() {
        let q = query();
        q.store
            .publish(vec![arrival("R05", "大安", 45)], at(8, 0))
            .await;

        // Name with suffix resolves like a code does; without a line
        // hint the first registered entry for the name wins (R05)
        let view = q.get_by_station("大安站", at(8, 0)).await.unwrap();
        assert_eq!(view.station.code.as_str(), "R05");
        assert_eq!(view.arrivals.len(), 1);
    }

    #[tokio::test]
    async fn unknown_station_is_none() {
        let q = query();
        assert!(q.get_by_station("不存在的站", at(8, 0)).await.is_none());
        assert!(q.get_by_station("ZZ99", at(8, 0)).await.is_none());
    }
}
