//! Countdown and service-clock handling.
//!
//! The live feed expresses time-to-arrival three different ways depending
//! on the feed variant: a "MM:SS" string, a whole number of seconds, or a
//! whole number of minutes. Everything is normalized to whole seconds
//! here. The schedule feed expresses times as clock times in the service
//! day, which must tolerate crossing midnight.

use chrono::{NaiveTime, Timelike};

/// Seconds in a service day.
const DAY_SECS: u32 = 24 * 60 * 60;

/// Unit of an integer countdown field, determined by which field the
/// normalizer probed it from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountdownUnit {
    Seconds,
    Minutes,
}

/// Sentinel strings the live feed uses for a train currently arriving.
const ARRIVING_SENTINELS: &[&str] = &["進站中", "列車進站"];

/// True if the raw countdown is the arriving sentinel (normalizes to 0).
pub fn is_arriving_sentinel(raw: &str) -> bool {
    ARRIVING_SENTINELS.contains(&raw.trim())
}

/// Normalize a raw countdown value to whole seconds.
///
/// Accepted shapes:
/// - the arriving sentinel → `Some(0)`
/// - `"MM:SS"` → minutes and seconds
/// - a bare non-negative integer, interpreted per `unit`
///
/// Anything else returns `None`: the record has unknown timing, which is
/// sorted last and surfaced as null, never as a fabricated figure.
pub fn normalize_countdown(raw: &str, unit: CountdownUnit) -> Option<u32> {
    let raw = raw.trim();

    if is_arriving_sentinel(raw) {
        return Some(0);
    }

    if raw.contains(':') {
        return parse_mmss(raw);
    }

    let n: u32 = raw.parse().ok()?;
    Some(match unit {
        CountdownUnit::Seconds => n,
        CountdownUnit::Minutes => n.checked_mul(60)?,
    })
}

/// Parse a "MM:SS" countdown into seconds.
///
/// The minute part may exceed 59 (long headways on the schedule boundary);
/// the second part must be 0-59.
fn parse_mmss(s: &str) -> Option<u32> {
    let (mins, secs) = s.split_once(':')?;

    if mins.is_empty() || mins.len() > 3 || !mins.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if secs.len() != 2 || !secs.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let mins: u32 = mins.parse().ok()?;
    let secs: u32 = secs.parse().ok()?;
    if secs > 59 {
        return None;
    }

    Some(mins * 60 + secs)
}

/// Parse a schedule clock time: "HH:MM" or "HH:MM:SS".
pub fn parse_clock(s: &str) -> Option<NaiveTime> {
    let s = s.trim();
    NaiveTime::parse_from_str(s, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M"))
        .ok()
}

/// Seconds from `now` until the next occurrence of `clock` in the
/// service day.
///
/// A clock time earlier than `now` belongs to tomorrow's service day, so
/// the result is always in `0..86400` and never negative.
pub fn eta_from_clock(clock: NaiveTime, now: NaiveTime) -> u32 {
    let clock_secs = clock.num_seconds_from_midnight();
    let now_secs = now.num_seconds_from_midnight();

    if clock_secs >= now_secs {
        clock_secs - now_secs
    } else {
        DAY_SECS - now_secs + clock_secs
    }
}
