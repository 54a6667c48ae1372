//! Travel direction for the direction-keyed line family.
//!
//! The driverless medium-capacity line reports crowding per station and
//! direction instead of per train, because its trains carry no usable
//! numbering. Direction is derived either from the feed's two-character
//! running-direction indicator or from which terminus a destination name
//! points at.

use std::fmt;

/// Terminus reached travelling inbound on the direction-keyed line.
pub const INBOUND_TERMINUS: &str = "南港展覽館";

/// Terminus reached travelling outbound on the direction-keyed line.
pub const OUTBOUND_TERMINUS: &str = "動物園";

/// Running direction on the direction-keyed line family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Toward [`INBOUND_TERMINUS`].
    Inbound,
    /// Toward [`OUTBOUND_TERMINUS`].
    Outbound,
}

impl Direction {
    /// Parse the feed's two-character running-direction indicator.
    ///
    /// `上行` runs inbound, `下行` runs outbound. Anything else is an
    /// unresolvable direction and the record will be dropped upstream.
    pub fn parse_indicator(s: &str) -> Option<Self> {
        match s.trim() {
            "上行" => Some(Direction::Inbound),
            "下行" => Some(Direction::Outbound),
            _ => None,
        }
    }

    /// Resolve a direction from a destination name.
    ///
    /// The caller passes the normalized form (see `stations::normalize_name`);
    /// the terminus constants contain no variant characters or suffixes, so
    /// containment on the normalized name is exact.
    pub fn from_destination(normalized_dest: &str) -> Option<Self> {
        if normalized_dest.contains(INBOUND_TERMINUS) {
            Some(Direction::Inbound)
        } else if normalized_dest.contains(OUTBOUND_TERMINUS) {
            Some(Direction::Outbound)
        } else {
            None
        }
    }

    /// Stable lowercase label, used in composite keys and API output.
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Inbound => "inbound",
            Direction::Outbound => "outbound",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Composite crowd-index key for the direction-keyed family:
/// `<normalized station>_<direction>`.
pub fn composite_key(normalized_station: &str, direction: Direction) -> String {
    format!("{}_{}", normalized_station, direction.as_str())
}
