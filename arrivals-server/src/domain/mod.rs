//! Domain types for the arrivals board.
//!
//! This module contains the core domain model types that represent
//! validated transit data. All types enforce their invariants at
//! construction time, so code that receives these types can trust their
//! validity.

mod arrival;
mod crowd;
mod direction;
mod station;
mod time;
mod train;

pub use arrival::{CanonicalArrival, SourceKind};
pub use crowd::CrowdLevel;
pub use direction::{
    Direction, INBOUND_TERMINUS, OUTBOUND_TERMINUS, composite_key,
};
pub use station::{InvalidStationCode, StationCode};
pub use time::{
    CountdownUnit, eta_from_clock, is_arriving_sentinel, normalize_countdown, parse_clock,
};
pub use train::TrainId;
