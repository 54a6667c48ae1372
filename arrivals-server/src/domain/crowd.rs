//! Car crowding levels.

use std::fmt;

use serde::Serialize;

/// Crowding level for a train, aggregated from its per-car readings.
///
/// Upstream reports each physical car as a small ordinal, 1 (emptiest)
/// through 4 (no standing room). The train-level figure is the worst car:
/// a passenger choosing whether to board cares about the car they end up
/// standing in, not the average.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CrowdLevel {
    Low,
    Moderate,
    High,
    Full,
}

impl CrowdLevel {
    /// Map a raw per-car ordinal to a level.
    ///
    /// Ordinals above 4 clamp to `Full`; 0 (seen when upstream has no
    /// reading for a car) clamps to `Low`.
    pub fn from_ordinal(n: u8) -> Self {
        match n {
            0 | 1 => CrowdLevel::Low,
            2 => CrowdLevel::Moderate,
            3 => CrowdLevel::High,
            _ => CrowdLevel::Full,
        }
    }

    /// Aggregate a train's per-car readings into one level.
    ///
    /// Returns `None` when there are no readings at all.
    pub fn aggregate(car_levels: &[u8]) -> Option<Self> {
        car_levels
            .iter()
            .max()
            .map(|&worst| CrowdLevel::from_ordinal(worst))
    }

    /// Stable lowercase label for API output.
    pub fn as_str(&self) -> &'static str {
        match self {
            CrowdLevel::Low => "low",
            CrowdLevel::Moderate => "moderate",
            CrowdLevel::High => "high",
            CrowdLevel::Full => "full",
        }
    }
}

impl fmt::Display for CrowdLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
