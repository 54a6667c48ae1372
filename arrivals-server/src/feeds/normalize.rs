//! Feed normalizers.
//!
//! One normalizer per feed family. Each turns a loosely-typed upstream
//! payload into canonical records with consistent field names and units
//! (countdowns in whole seconds, car levels as small ordinals). Records
//! missing their identity fields are skipped and counted, never fatal.

use chrono::NaiveDateTime;
use tracing::debug;

use crate::domain::{CountdownUnit, Direction, TrainId, normalize_countdown, parse_clock};

use super::types::{LineFamily, LooseRecord, RawCrowdRecord, RawScheduleRecord, RawTrackRecord};

/// Produce canonical records from one upstream payload.
///
/// The returned batch keeps the records that normalized cleanly and
/// counts the ones that did not.
pub trait Normalizer {
    type Record;

    fn normalize(&self, payload: &[LooseRecord]) -> NormalizedBatch<Self::Record>;
}

/// Result of normalizing one payload.
#[derive(Debug)]
pub struct NormalizedBatch<R> {
    pub records: Vec<R>,
    /// Records dropped for missing/unusable identity fields.
    pub skipped: u32,
}

impl<R> NormalizedBatch<R> {
    fn new() -> Self {
        Self {
            records: Vec::new(),
            skipped: 0,
        }
    }
}

/// True if a body that should have been JSON is actually an HTML error
/// page. Upstreams serve these with status 200 during maintenance.
pub fn looks_like_error_page(body: &str) -> bool {
    let head = body.trim_start();
    let lower: String = head.chars().take(16).collect::<String>().to_lowercase();
    lower.starts_with("<!doctype") || lower.starts_with("<html")
}

// Candidate field names per logical field. Order is priority: feed
// variants disagree on naming, the first present field wins.
const STATION_FIELDS: &[&str] = &["StationName", "StationName_Zh", "Station"];
const DESTINATION_FIELDS: &[&str] = &["DestinationName", "Destination", "TerminalStationName"];
const TRAIN_FIELDS: &[&str] = &["TrainNumber", "TrainNo"];
const LINE_FIELDS: &[&str] = &["LineID", "LineNo"];
const OBSERVED_FIELDS: &[&str] = &["NowDateTime", "SrvTime", "UpdateTime"];
const DIRECTION_FIELDS: &[&str] = &["Direction", "RunDirection"];
const CAR_ARRAY_FIELDS: &[&str] = &["CarLoads", "Cars"];
const CAR_TEXT_FIELDS: &[&str] = &["CarLoad", "CarWeights"];
const STATION_ID_FIELDS: &[&str] = &["StationID", "StationCode"];
const SCHEDULE_DEST_FIELDS: &[&str] = &["DestinationStaName", "DestinationName"];
const TIMETABLE_FIELDS: &[&str] = &["Timetables", "Schedules", "ArrivalTimes"];
const TIMETABLE_ENTRY_FIELDS: &[&str] = &["ArrivalTime", "Time"];

/// Countdown candidates with the unit each field is known to carry.
const COUNTDOWN_FIELDS: &[(&str, CountdownUnit)] = &[
    ("CountDown", CountdownUnit::Seconds),
    ("EstimateTime", CountdownUnit::Seconds),
    ("EstimateMin", CountdownUnit::Minutes),
];

/// Timestamp formats seen across feed variants.
const OBSERVED_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y/%m/%d %H:%M:%S"];

fn parse_observed(raw: &str) -> Option<NaiveDateTime> {
    OBSERVED_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
}

/// Normalize the countdown by probing the candidate fields in priority
/// order, interpreting each under its unit.
fn probe_countdown(record: &LooseRecord) -> Option<u32> {
    for &(field, unit) in COUNTDOWN_FIELDS {
        if let Some(raw) = record.probe_text(&[field]) {
            return normalize_countdown(&raw, unit);
        }
    }
    None
}

/// Normalizer for the live train-position feed.
#[derive(Debug, Default)]
pub struct TrackNormalizer;

impl Normalizer for TrackNormalizer {
    type Record = RawTrackRecord;

    fn normalize(&self, payload: &[LooseRecord]) -> NormalizedBatch<RawTrackRecord> {
        let mut batch = NormalizedBatch::new();

        for record in payload {
            let Some(station_name) = record.probe_text(STATION_FIELDS) else {
                debug!("track record without station name, skipping");
                batch.skipped += 1;
                continue;
            };
            let Some(destination_name) = record.probe_text(DESTINATION_FIELDS) else {
                debug!(station = %station_name, "track record without destination, skipping");
                batch.skipped += 1;
                continue;
            };

            batch.records.push(RawTrackRecord {
                station_name,
                destination_name,
                train_id: record
                    .probe_text(TRAIN_FIELDS)
                    .and_then(|s| TrainId::parse(&s)),
                eta_seconds: probe_countdown(record),
                line_hint: record.probe_text(LINE_FIELDS),
                observed_at: record
                    .probe_text(OBSERVED_FIELDS)
                    .and_then(|s| parse_observed(&s)),
            });
        }

        batch
    }
}

/// Parse a record's per-car occupancy readings.
///
/// Accepts a JSON array of numbers or a comma-separated string. A value
/// that is not numeric reads as level 1 (best case) rather than
/// discarding the whole record.
fn parse_car_levels(record: &LooseRecord) -> Option<Vec<u8>> {
    if let Some(items) = record.probe_array(CAR_ARRAY_FIELDS) {
        let levels = items
            .iter()
            .map(|v| v.as_u64().map_or(1, |n| n.min(u8::MAX as u64) as u8))
            .collect::<Vec<u8>>();
        return (!levels.is_empty()).then_some(levels);
    }

    let text = record.probe_text(CAR_TEXT_FIELDS)?;
    let levels = text
        .split(',')
        .map(|part| part.trim().parse::<u8>().unwrap_or(1))
        .collect::<Vec<u8>>();
    (!levels.is_empty()).then_some(levels)
}

/// Normalizer for one crowding sub-feed.
///
/// The standard family keys by train number; the direction-keyed family
/// keys by station and running direction. Both produce `RawCrowdRecord`s
/// tagged with their family, so the two sub-feeds concatenate cleanly.
#[derive(Debug)]
pub struct CrowdNormalizer {
    family: LineFamily,
}

impl CrowdNormalizer {
    pub fn new(family: LineFamily) -> Self {
        Self { family }
    }
}

impl Normalizer for CrowdNormalizer {
    type Record = RawCrowdRecord;

    fn normalize(&self, payload: &[LooseRecord]) -> NormalizedBatch<RawCrowdRecord> {
        let mut batch = NormalizedBatch::new();

        for record in payload {
            let Some(car_levels) = parse_car_levels(record) else {
                debug!("crowd record without car readings, skipping");
                batch.skipped += 1;
                continue;
            };

            let train_id = record
                .probe_text(TRAIN_FIELDS)
                .and_then(|s| TrainId::parse(&s));
            let station = record
                .probe_text(STATION_ID_FIELDS)
                .or_else(|| record.probe_text(STATION_FIELDS));

            match self.family {
                LineFamily::Standard => {
                    // Train identity is the whole point of this sub-feed
                    if train_id.is_none() {
                        debug!("standard crowd record without train id, skipping");
                        batch.skipped += 1;
                        continue;
                    }
                }
                LineFamily::DirectionKeyed => {
                    if station.is_none() {
                        debug!("direction-keyed crowd record without station, skipping");
                        batch.skipped += 1;
                        continue;
                    }
                }
            }

            let direction = record
                .probe_text(DIRECTION_FIELDS)
                .and_then(|s| Direction::parse_indicator(&s));

            batch.records.push(RawCrowdRecord {
                family: self.family,
                train_id,
                station,
                direction,
                car_levels,
            });
        }

        batch
    }
}

/// Normalizer for the scheduled-timetable feed.
#[derive(Debug, Default)]
pub struct ScheduleNormalizer;

impl Normalizer for ScheduleNormalizer {
    type Record = RawScheduleRecord;

    fn normalize(&self, payload: &[LooseRecord]) -> NormalizedBatch<RawScheduleRecord> {
        let mut batch = NormalizedBatch::new();

        for record in payload {
            // Either field can stand in for the other; a record with
            // neither has no station identity at all
            let id_field = record.probe_text(STATION_ID_FIELDS);
            let name_field = record.probe_text(STATION_FIELDS);
            let Some(station_id) = id_field.or_else(|| name_field.clone()) else {
                debug!("schedule record without station identity, skipping");
                batch.skipped += 1;
                continue;
            };
            let station_name = name_field.unwrap_or_else(|| station_id.clone());

            let Some(destination_name) = record.probe_text(SCHEDULE_DEST_FIELDS) else {
                debug!(station = %station_id, "schedule record without destination, skipping");
                batch.skipped += 1;
                continue;
            };

            let times: Vec<_> = record
                .probe_array(TIMETABLE_FIELDS)
                .into_iter()
                .flatten()
                .filter_map(|entry| match entry {
                    serde_json::Value::String(s) => parse_clock(s),
                    serde_json::Value::Object(map) => LooseRecord::new(map.clone())
                        .probe_text(TIMETABLE_ENTRY_FIELDS)
                        .and_then(|s| parse_clock(&s)),
                    _ => None,
                })
                .collect();

            if times.is_empty() {
                debug!(station = %station_id, "schedule record without any parseable times, skipping");
                batch.skipped += 1;
                continue;
            }

            batch.records.push(RawScheduleRecord {
                station_id,
                station_name,
                destination_name,
                line_id: record.probe_text(LINE_FIELDS).unwrap_or_default(),
                times,
            });
        }

        batch
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn records(v: serde_json::Value) -> Vec<LooseRecord> {
        match v {
            serde_json::Value::Array(items) => items
                .into_iter()
                .map(|item| match item {
                    serde_json::Value::Object(map) => LooseRecord::new(map),
                    _ => panic!("test records must be objects"),
                })
                .collect(),
            _ => panic!("test payload must be an array"),
        }
    }

    #[test]
    fn track_mmss_countdown() {
        let payload = records(json!([{
            "StationName": "台北車站",
            "DestinationName": "頂埔",
            "TrainNumber": "132",
            "CountDown": "01:28",
            "NowDateTime": "2024-06-01 08:00:00"
        }]));

        let batch = TrackNormalizer.normalize(&payload);
        assert_eq!(batch.skipped, 0);
        let r = &batch.records[0];
        assert_eq!(r.eta_seconds, Some(88));
        assert_eq!(r.train_id.as_ref().unwrap().as_str(), "132");
        assert!(r.observed_at.is_some());
    }

    #[test]
    fn track_field_name_variants() {
        // Second feed variant: different keys, integer-minute countdown
        let payload = records(json!([{
            "Station": "大安",
            "Destination": "動物園",
            "TrainNo": "044",
            "EstimateMin": 3,
            "LineNo": "BR"
        }]));

        let batch = TrackNormalizer.normalize(&payload);
        let r = &batch.records[0];
        assert_eq!(r.eta_seconds, Some(180));
        assert_eq!(r.train_id.as_ref().unwrap().as_str(), "044");
        assert_eq!(r.line_hint.as_deref(), Some("BR"));
    }

    #[test]
    fn track_arriving_sentinel() {
        let payload = records(json!([{
            "StationName": "西門",
            "DestinationName": "南港展覽館",
            "CountDown": "進站中"
        }]));

        let batch = TrackNormalizer.normalize(&payload);
        assert_eq!(batch.records[0].eta_seconds, Some(0));
    }

    #[test]
    fn track_unparseable_countdown_is_unknown_timing() {
        let payload = records(json!([{
            "StationName": "西門",
            "DestinationName": "頂埔",
            "CountDown": "--"
        }]));

        let batch = TrackNormalizer.normalize(&payload);
        assert_eq!(batch.skipped, 0);
        assert_eq!(batch.records[0].eta_seconds, None);
    }

    #[test]
    fn track_missing_identity_skipped() {
        let payload = records(json!([
            {"DestinationName": "頂埔", "CountDown": "01:00"},
            {"StationName": "西門", "CountDown": "01:00"},
            {"StationName": "西門", "DestinationName": "頂埔"}
        ]));

        let batch = TrackNormalizer.normalize(&payload);
        assert_eq!(batch.skipped, 2);
        assert_eq!(batch.records.len(), 1);
    }

    #[test]
    fn crowd_standard_by_train() {
        let payload = records(json!([{
            "TrainNumber": "132",
            "CarLoads": [2, 2, 3, 1]
        }]));

        let batch = CrowdNormalizer::new(LineFamily::Standard).normalize(&payload);
        let r = &batch.records[0];
        assert_eq!(r.car_levels, vec![2, 2, 3, 1]);
        assert_eq!(r.train_id.as_ref().unwrap().as_str(), "132");
        assert_eq!(r.family, LineFamily::Standard);
    }

    #[test]
    fn crowd_standard_requires_train() {
        let payload = records(json!([{"CarLoads": [1, 1]}]));
        let batch = CrowdNormalizer::new(LineFamily::Standard).normalize(&payload);
        assert_eq!(batch.skipped, 1);
        assert!(batch.records.is_empty());
    }

    #[test]
    fn crowd_direction_keyed() {
        let payload = records(json!([{
            "StationName": "大安",
            "Direction": "上行",
            "CarLoads": [1, 2, 1, 1]
        }]));

        let batch = CrowdNormalizer::new(LineFamily::DirectionKeyed).normalize(&payload);
        let r = &batch.records[0];
        assert_eq!(r.direction, Some(Direction::Inbound));
        assert_eq!(r.station.as_deref(), Some("大安"));
        assert!(r.train_id.is_none());
    }

    #[test]
    fn crowd_malformed_level_reads_best_case() {
        let payload = records(json!([{
            "TrainNumber": "7",
            "CarLoad": "2,x,3"
        }]));

        let batch = CrowdNormalizer::new(LineFamily::Standard).normalize(&payload);
        assert_eq!(batch.records[0].car_levels, vec![2, 1, 3]);
    }

    #[test]
    fn crowd_without_readings_skipped() {
        let payload = records(json!([{"TrainNumber": "7"}]));
        let batch = CrowdNormalizer::new(LineFamily::Standard).normalize(&payload);
        assert_eq!(batch.skipped, 1);
    }

    #[test]
    fn schedule_times_parse_both_shapes() {
        let payload = records(json!([{
            "StationID": "BL12",
            "StationName": "台北車站",
            "DestinationStaName": "頂埔",
            "LineID": "BL",
            "Timetables": ["06:00", {"ArrivalTime": "06:12:30"}, "nonsense"]
        }]));

        let batch = ScheduleNormalizer.normalize(&payload);
        let r = &batch.records[0];
        assert_eq!(r.times.len(), 2);
        assert_eq!(r.station_id, "BL12");
        assert_eq!(r.line_id, "BL");
    }

    #[test]
    fn schedule_name_stands_in_for_missing_id() {
        let payload = records(json!([{
            "StationName": "大安",
            "DestinationName": "動物園",
            "Schedules": ["07:30"]
        }]));

        let batch = ScheduleNormalizer.normalize(&payload);
        assert_eq!(batch.records[0].station_id, "大安");
    }

    #[test]
    fn schedule_without_times_skipped() {
        let payload = records(json!([{
            "StationID": "BL12",
            "DestinationName": "頂埔",
            "Timetables": []
        }]));

        let batch = ScheduleNormalizer.normalize(&payload);
        assert_eq!(batch.skipped, 1);
    }

    #[test]
    fn error_page_detection() {
        assert!(looks_like_error_page("<!DOCTYPE html><html>..."));
        assert!(looks_like_error_page("  <html><body>503</body></html>"));
        assert!(looks_like_error_page("<HTML>"));
        assert!(!looks_like_error_page("[]"));
        assert!(!looks_like_error_page("{\"a\": 1}"));
    }
}
