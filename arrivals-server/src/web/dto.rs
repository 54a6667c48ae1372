//! Data transfer objects for web responses.

use serde::Serialize;

use crate::domain::{CanonicalArrival, CrowdLevel, SourceKind, StationCode, TrainId};
use crate::query::{BoardView, StationView};

/// Timestamp rendering for API output.
fn format_timestamp(ts: chrono::NaiveDateTime) -> String {
    ts.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// One arrival on the board.
#[derive(Debug, Serialize)]
pub struct ArrivalDto {
    /// Station code
    pub station_id: StationCode,

    /// Station display name
    pub station_name: String,

    /// Line id
    pub line_id: String,

    /// Destination as reported by the feed
    pub destination_name: String,

    /// Train number, absent for the unnumbered line family
    pub train_id: Option<TrainId>,

    /// Whole seconds to arrival; absent means unknown timing
    pub eta_seconds: Option<u32>,

    /// Aggregated (worst-car) crowding level
    pub crowd_level: Option<CrowdLevel>,

    /// Per-car crowding ordinals
    pub car_levels: Vec<u8>,

    /// Which feed produced this arrival
    pub source: SourceKind,

    /// When the upstream observed it
    pub observed_at: String,
}

impl From<&CanonicalArrival> for ArrivalDto {
    fn from(a: &CanonicalArrival) -> Self {
        Self {
            station_id: a.station_id,
            station_name: a.station_name.clone(),
            line_id: a.line_id.clone(),
            destination_name: a.destination_name.clone(),
            train_id: a.train_id.clone(),
            eta_seconds: a.eta_seconds,
            crowd_level: a.crowd_level,
            car_levels: a.car_levels.clone(),
            source: a.source,
            observed_at: format_timestamp(a.observed_at),
        }
    }
}

/// Response for the whole board.
#[derive(Debug, Serialize)]
pub struct BoardResponse {
    pub arrivals: Vec<ArrivalDto>,
    pub published_at: Option<String>,
    pub stale: bool,
}

impl From<&BoardView> for BoardResponse {
    fn from(view: &BoardView) -> Self {
        Self {
            arrivals: view.snapshot.arrivals.iter().map(ArrivalDto::from).collect(),
            published_at: view.snapshot.published_at.map(format_timestamp),
            stale: view.stale,
        }
    }
}

/// Response for one station's board.
#[derive(Debug, Serialize)]
pub struct StationBoardResponse {
    pub station_id: String,
    pub station_name: String,
    pub line_id: String,
    pub arrivals: Vec<ArrivalDto>,
    pub published_at: Option<String>,
    pub stale: bool,
}

impl From<&StationView> for StationBoardResponse {
    fn from(view: &StationView) -> Self {
        Self {
            station_id: view.station.code.as_str().to_string(),
            station_name: view.station.name.clone(),
            line_id: view.station.line.clone(),
            arrivals: view.arrivals.iter().map(ArrivalDto::from).collect(),
            published_at: view.published_at.map(format_timestamp),
            stale: view.stale,
        }
    }
}

/// JSON error body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}
