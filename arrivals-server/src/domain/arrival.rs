//! The canonical arrival record served to clients.

use chrono::NaiveDateTime;

use super::{CrowdLevel, StationCode, TrainId};

/// Which feed produced an arrival.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Live train-position feed.
    Live,
    /// Static timetable, surfaced only where no live report exists.
    Scheduled,
}

/// One reconciled arrival: a train (or timetabled service) approaching a
/// station, with whatever timing and crowding data the feeds provided.
///
/// Rebuilt from scratch every reconciliation cycle; never mutated after
/// publication.
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalArrival {
    pub station_id: StationCode,
    pub station_name: String,
    pub line_id: String,
    pub destination_name: String,
    /// Absent for the unnumbered line family.
    pub train_id: Option<TrainId>,
    /// `None` means unknown timing (crowding-only record); sorts last.
    pub eta_seconds: Option<u32>,
    pub crowd_level: Option<CrowdLevel>,
    /// Per-car readings, emptiest-to-front ordering as reported. Empty
    /// when no crowd record matched.
    pub car_levels: Vec<u8>,
    pub source: SourceKind,
    pub observed_at: NaiveDateTime,
}

impl CanonicalArrival {
    /// Sort key for eta: unknown timing sorts after any known figure.
    pub fn eta_sort_key(&self) -> u32 {
        self.eta_seconds.unwrap_or(u32::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn arrival(eta: Option<u32>) -> CanonicalArrival {
        CanonicalArrival {
            station_id: StationCode::parse("BL12").unwrap(),
            station_name: "台北車站".to_string(),
            line_id: "BL".to_string(),
            destination_name: "頂埔".to_string(),
            train_id: TrainId::parse("132"),
            eta_seconds: eta,
            crowd_level: None,
            car_levels: Vec::new(),
            source: SourceKind::Live,
            observed_at: NaiveDate::from_ymd_opt(2024, 6, 1)
                .unwrap()
                .and_hms_opt(8, 0, 0)
                .unwrap(),
        }
    }

    #[test]
    fn unknown_eta_sorts_last() {
        assert!(arrival(Some(3600)).eta_sort_key() < arrival(None).eta_sort_key());
        assert_eq!(arrival(Some(0)).eta_sort_key(), 0);
    }
}
