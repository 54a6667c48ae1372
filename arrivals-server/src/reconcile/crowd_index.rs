//! Crowd record indexes.
//!
//! Reconciliation matches crowding onto track records two ways: by train
//! id for the numbered lines, and by station+direction composite key for
//! the direction-keyed family. Building both indexes up front makes each
//! track-record lookup O(1).

use std::collections::HashMap;

use crate::domain::{CrowdLevel, Direction, TrainId, composite_key};
use crate::feeds::{LineFamily, RawCrowdRecord};
use crate::stations::{StationTable, normalize_name};

/// Crowding data attached to one train (or one station+direction).
#[derive(Debug, Clone, PartialEq)]
pub struct CrowdInfo {
    pub car_levels: Vec<u8>,
    /// Worst car, mapped to a level.
    pub level: CrowdLevel,
}

/// Index of one cycle's crowd records.
#[derive(Debug, Default)]
pub struct CrowdIndex {
    /// Standard family, keyed by every padding variant of the train id.
    by_train: HashMap<String, CrowdInfo>,

    /// Direction-keyed family, keyed by `<normalized station>_<direction>`.
    by_station_direction: HashMap<String, CrowdInfo>,

    /// Records dropped for unresolvable identity (unknown station,
    /// missing direction). Count-only diagnostic.
    pub dropped: u32,
}

impl CrowdIndex {
    /// Build the indexes from one cycle's normalized crowd records.
    pub fn build(records: &[RawCrowdRecord], stations: &StationTable) -> Self {
        let mut index = CrowdIndex::default();

        for record in records {
            let Some(level) = CrowdLevel::aggregate(&record.car_levels) else {
                index.dropped += 1;
                continue;
            };
            let info = CrowdInfo {
                car_levels: record.car_levels.clone(),
                level,
            };

            match record.family {
                LineFamily::Standard => {
                    let Some(train_id) = &record.train_id else {
                        index.dropped += 1;
                        continue;
                    };
                    // First report per train wins; later duplicates are
                    // stale retransmissions
                    for variant in train_id.lookup_variants() {
                        index.by_train.entry(variant).or_insert_with(|| info.clone());
                    }
                }
                LineFamily::DirectionKeyed => {
                    let (Some(station_raw), Some(direction)) =
                        (&record.station, record.direction)
                    else {
                        index.dropped += 1;
                        continue;
                    };
                    // The station field may be a code or a raw name; the
                    // composite key always uses the canonical name
                    let Some(station) = stations.resolve(station_raw, None) else {
                        index.dropped += 1;
                        continue;
                    };
                    let key = composite_key(&normalize_name(&station.name), direction);
                    index.by_station_direction.entry(key).or_insert(info);
                }
            }
        }

        index
    }

    /// Crowding for a numbered train, tolerant of padding differences.
    pub fn for_train(&self, id: &TrainId) -> Option<&CrowdInfo> {
        id.lookup_variants()
            .iter()
            .find_map(|variant| self.by_train.get(variant))
    }

    /// Crowding for one station and direction on the direction-keyed
    /// family. Never matches across stations.
    pub fn for_station_direction(
        &self,
        normalized_station: &str,
        direction: Direction,
    ) -> Option<&CrowdInfo> {
        self.by_station_direction
            .get(&composite_key(normalized_station, direction))
    }
}
