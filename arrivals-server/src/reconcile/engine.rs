//! The reconciliation engine.
//!
//! Takes one cycle's normalized feed records and rebuilds the complete
//! arrival list from scratch: resolves identities, attaches crowding,
//! suppresses scheduled entries already covered live, and sorts the
//! result for publication. Pure function of (inputs, table, config, now),
//! so every rule here is testable without a poller or a transport.

use std::collections::{HashMap, HashSet};

use chrono::NaiveDateTime;

use crate::domain::{
    CanonicalArrival, Direction, SourceKind, StationCode, TrainId, eta_from_clock,
};
use crate::feeds::{LineFamily, RawCrowdRecord, RawScheduleRecord, RawTrackRecord};
use crate::stations::{StationTable, normalize_name};

use super::config::ReconcileConfig;
use super::crowd_index::CrowdIndex;

/// One cycle's normalized records, most recent per feed.
#[derive(Debug, Clone, Copy)]
pub struct ReconcileInputs<'a> {
    pub track: &'a [RawTrackRecord],
    pub crowd: &'a [RawCrowdRecord],
    pub schedule: &'a [RawScheduleRecord],
}

/// Count-only diagnostics for records the cycle could not use.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DropStats {
    /// Track/schedule records whose station resolved to nothing.
    pub unknown_station: u32,
    /// Live records collapsed by the uniqueness invariant.
    pub duplicate_live: u32,
    /// Crowd records with unresolvable identity.
    pub crowd_unresolved: u32,
    /// Scheduled entries suppressed by a nearby live arrival.
    pub suppressed_scheduled: u32,
}

impl DropStats {
    /// Total records that did not surface.
    pub fn total(&self) -> u32 {
        self.unknown_station + self.duplicate_live + self.crowd_unresolved
    }
}

/// Result of one reconciliation pass.
#[derive(Debug)]
pub struct ReconcileOutcome {
    pub arrivals: Vec<CanonicalArrival>,
    pub drops: DropStats,
}

/// Uniqueness key for an emitted arrival.
///
/// With a train id the invariant is one arrival per (station, train);
/// without one it is one arrival per (station, destination, eta bucket).
#[derive(Debug, PartialEq, Eq, Hash)]
enum ArrivalKey {
    Train(StationCode, String),
    Slot(StationCode, String, Option<u32>),
}

/// Padding-insensitive spelling of a train id for uniqueness keys.
fn train_key(id: &TrainId) -> String {
    let s = id.as_str();
    if s.bytes().all(|b| b.is_ascii_digit()) {
        let stripped = s.trim_start_matches('0');
        if stripped.is_empty() { "0" } else { stripped }.to_string()
    } else {
        s.to_string()
    }
}

/// Rebuild the canonical arrival list from one cycle's inputs.
///
/// `now` is service-local time; schedule clock arithmetic happens in the
/// service day, not UTC.
pub fn reconcile(
    inputs: ReconcileInputs<'_>,
    stations: &StationTable,
    config: &ReconcileConfig,
    now: NaiveDateTime,
) -> ReconcileOutcome {
    let mut drops = DropStats::default();
    let mut arrivals: Vec<CanonicalArrival> = Vec::with_capacity(inputs.track.len());
    let mut seen: HashSet<ArrivalKey> = HashSet::new();

    let crowd_index = CrowdIndex::build(inputs.crowd, stations);
    drops.crowd_unresolved = crowd_index.dropped;

    // Live pass: one arrival per track record. Crowding is matched by
    // train id first; the direction-keyed family falls back to the
    // station+direction key. A record with no crowd match keeps null
    // crowding, and a record with no countdown keeps null timing -- data
    // is never borrowed from another station to fill either.
    for record in inputs.track {
        let Some(station) = stations.resolve(&record.station_name, record.line_hint.as_deref())
        else {
            drops.unknown_station += 1;
            continue;
        };
        let normalized_dest = normalize_name(&record.destination_name);

        let crowd = match &record.train_id {
            Some(id) => crowd_index.for_train(id),
            None if LineFamily::of_line(&station.line) == LineFamily::DirectionKeyed => {
                Direction::from_destination(&normalized_dest).and_then(|direction| {
                    crowd_index
                        .for_station_direction(&normalize_name(&station.name), direction)
                })
            }
            None => None,
        };

        let key = match &record.train_id {
            Some(id) => ArrivalKey::Train(station.code, train_key(id)),
            None => ArrivalKey::Slot(
                station.code,
                normalized_dest,
                record.eta_seconds.map(|eta| config.eta_bucket(eta)),
            ),
        };
        if !seen.insert(key) {
            drops.duplicate_live += 1;
            continue;
        }

        arrivals.push(CanonicalArrival {
            station_id: station.code,
            station_name: station.name.clone(),
            line_id: station.line.clone(),
            destination_name: record.destination_name.clone(),
            train_id: record.train_id.clone(),
            eta_seconds: record.eta_seconds,
            crowd_level: crowd.map(|c| c.level),
            car_levels: crowd.map(|c| c.car_levels.clone()).unwrap_or_default(),
            source: SourceKind::Live,
            observed_at: record.observed_at.unwrap_or(now),
        });
    }

    // Index the live etas per (station, destination) for schedule dedup
    let mut live_etas: HashMap<(StationCode, String), Vec<u32>> = HashMap::new();
    for arrival in &arrivals {
        if let Some(eta) = arrival.eta_seconds {
            live_etas
                .entry((arrival.station_id, normalize_name(&arrival.destination_name)))
                .or_default()
                .push(eta);
        }
    }

    // Schedule pass: surface timetabled entries inside the lookahead
    // window unless a live arrival already covers the same slot.
    for record in inputs.schedule {
        let line_hint = (!record.line_id.is_empty()).then_some(record.line_id.as_str());
        let station = stations
            .resolve(&record.station_id, line_hint)
            .or_else(|| stations.resolve(&record.station_name, line_hint));
        let Some(station) = station else {
            drops.unknown_station += 1;
            continue;
        };
        let normalized_dest = normalize_name(&record.destination_name);

        for &clock in &record.times {
            let eta = eta_from_clock(clock, now.time());
            if eta > config.lookahead_secs() {
                continue;
            }

            let covered_live = live_etas
                .get(&(station.code, normalized_dest.clone()))
                .is_some_and(|etas| {
                    etas.iter()
                        .any(|&live| live.abs_diff(eta) < config.dedup_tolerance_secs)
                });
            if covered_live {
                drops.suppressed_scheduled += 1;
                continue;
            }

            let key = ArrivalKey::Slot(
                station.code,
                normalized_dest.clone(),
                Some(config.eta_bucket(eta)),
            );
            if !seen.insert(key) {
                continue;
            }

            arrivals.push(CanonicalArrival {
                station_id: station.code,
                station_name: station.name.clone(),
                line_id: station.line.clone(),
                destination_name: record.destination_name.clone(),
                train_id: None,
                eta_seconds: Some(eta),
                crowd_level: None,
                car_levels: Vec::new(),
                source: SourceKind::Scheduled,
                observed_at: now,
            });
        }
    }

    // Deterministic publication order: grouped by station, soonest
    // first, unknown timing last
    arrivals.sort_by(|a, b| {
        a.station_id
            .cmp(&b.station_id)
            .then(a.eta_sort_key().cmp(&b.eta_sort_key()))
            .then_with(|| a.destination_name.cmp(&b.destination_name))
            .then_with(|| {
                let ta = a.train_id.as_ref().map(TrainId::as_str);
                let tb = b.train_id.as_ref().map(TrainId::as_str);
                ta.cmp(&tb)
            })
    });

    ReconcileOutcome { arrivals, drops }
}
