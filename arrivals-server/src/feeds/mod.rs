//! Upstream feed handling: transport seam, loose payloads, normalizers.

mod client;
mod error;
mod mock;
mod normalize;
mod types;

pub use client::{FeedTransport, MetroClient, MetroConfig};
pub use error::FeedError;
pub use mock::{MockFailure, MockTransport, payload_from_json};
pub use normalize::{
    CrowdNormalizer, NormalizedBatch, Normalizer, ScheduleNormalizer, TrackNormalizer,
    looks_like_error_page,
};
pub use types::{LineFamily, LooseRecord, Payload, RawCrowdRecord, RawScheduleRecord, RawTrackRecord};
