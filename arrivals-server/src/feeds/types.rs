//! Feed payload types.
//!
//! Upstream transports hand over loosely-typed JSON records: the same
//! logical field appears under different names depending on the feed
//! variant, so records are probed with a priority-ordered candidate list
//! rather than deserialized into a fixed shape.

use chrono::NaiveDateTime;
use serde_json::{Map, Value};

use crate::domain::{Direction, TrainId};

/// What a transport returns on success: one loosely-typed record per
/// reported train/station/timetable row.
pub type Payload = Vec<LooseRecord>;

/// One loosely-typed upstream record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LooseRecord(Map<String, Value>);

impl LooseRecord {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    /// First non-null value among the candidate field names.
    pub fn probe<'a>(&'a self, candidates: &[&str]) -> Option<&'a Value> {
        candidates
            .iter()
            .filter_map(|name| self.0.get(*name))
            .find(|v| !v.is_null())
    }

    /// First candidate field rendered as trimmed text.
    ///
    /// Accepts strings and numbers; feeds are inconsistent about whether
    /// numeric fields are quoted.
    pub fn probe_text(&self, candidates: &[&str]) -> Option<String> {
        match self.probe(candidates)? {
            Value::String(s) => {
                let s = s.trim();
                (!s.is_empty()).then(|| s.to_string())
            }
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    /// First candidate field that is a JSON array.
    pub fn probe_array<'a>(&'a self, candidates: &[&str]) -> Option<&'a [Value]> {
        match self.probe(candidates)? {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }
}

impl From<Map<String, Value>> for LooseRecord {
    fn from(fields: Map<String, Value>) -> Self {
        Self(fields)
    }
}

/// Which crowding sub-feed a record came from.
///
/// The high-capacity lines report crowding per numbered train; the
/// driverless line family has no usable numbering and reports per
/// station and direction instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineFamily {
    Standard,
    DirectionKeyed,
}

impl LineFamily {
    /// Family of a line id. Only the driverless BR line is
    /// direction-keyed on this network.
    pub fn of_line(line: &str) -> Self {
        if line.eq_ignore_ascii_case("BR") {
            LineFamily::DirectionKeyed
        } else {
            LineFamily::Standard
        }
    }
}

/// Normalized record from the live train-position feed.
///
/// Units are already canonical: `eta_seconds` is whole seconds, `None`
/// when the countdown was unparseable (unknown timing).
#[derive(Debug, Clone, PartialEq)]
pub struct RawTrackRecord {
    pub station_name: String,
    pub destination_name: String,
    pub train_id: Option<TrainId>,
    pub eta_seconds: Option<u32>,
    pub line_hint: Option<String>,
    /// Server-side observation timestamp, when the feed provided one.
    pub observed_at: Option<NaiveDateTime>,
}

/// Normalized record from a crowding feed.
#[derive(Debug, Clone, PartialEq)]
pub struct RawCrowdRecord {
    pub family: LineFamily,
    /// Train identity; absent for the direction-keyed family.
    pub train_id: Option<TrainId>,
    /// Station code or raw name, depending on the sub-feed.
    pub station: Option<String>,
    /// Running direction; present only for the direction-keyed family.
    pub direction: Option<Direction>,
    /// Per-car occupancy ordinals, 1-4, one per physical car.
    pub car_levels: Vec<u8>,
}

/// Normalized record from the scheduled-timetable feed: all timetabled
/// arrival clock times for one (station, destination, line).
#[derive(Debug, Clone, PartialEq)]
pub struct RawScheduleRecord {
    /// Station code or raw name as the feed sent it.
    pub station_id: String,
    pub station_name: String,
    pub destination_name: String,
    pub line_id: String,
    pub times: Vec<chrono::NaiveTime>,
}
