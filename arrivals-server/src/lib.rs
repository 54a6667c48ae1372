//! Metro arrivals board server.
//!
//! Polls the live position, crowding, and timetable feeds, reconciles
//! them into one canonical per-station arrival view, and serves that
//! view from an in-memory snapshot.

pub mod cache;
pub mod domain;
pub mod feeds;
pub mod poller;
pub mod query;
pub mod reconcile;
pub mod snapshot;
pub mod stations;
pub mod web;
