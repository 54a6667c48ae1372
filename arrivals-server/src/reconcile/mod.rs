//! Reconciliation: merging normalized feed records into canonical arrivals.

mod config;
mod crowd_index;
mod engine;

pub use config::ReconcileConfig;
pub use crowd_index::{CrowdIndex, CrowdInfo};
pub use engine::{DropStats, ReconcileInputs, ReconcileOutcome, reconcile};
