//! Web layer for the arrivals board.
//!
//! Thin JSON plumbing over the query interface; all reconciliation
//! happens before a request ever arrives.

mod dto;
mod routes;
mod state;

pub use dto::*;
pub use routes::create_router;
pub use state::AppState;
