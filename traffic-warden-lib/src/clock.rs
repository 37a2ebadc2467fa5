//! Wall-clock access and calendar bucket keys.
//!
//! Every component of the engine reads time through a [`Clock`] so that day
//! rollovers, the rate window and the maintenance intervals can be driven
//! deterministically in tests with [`ManualClock`].
//!
//! Bucket keys are UTC calendar strings: days are `YYYY-MM-DD` and months are
//! the first seven characters of the day key (`YYYY-MM`). Both sort
//! lexicographically in chronological order.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Milliseconds in one day.
pub const DAY_MS: u64 = 86_400_000;

/// Source of the current time in milliseconds since the Unix epoch.
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> u64;
}

/// Clock backed by the operating system time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
            .unwrap_or_default()
    }
}

/// Clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    pub fn new(start_ms: u64) -> Self {
        Self { now: AtomicU64::new(start_ms) }
    }

    pub fn set(&self, ms: u64) {
        self.now.store(ms, Ordering::SeqCst);
    }

    pub fn advance(&self, ms: u64) {
        self.now.fetch_add(ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}

fn utc(ms: u64) -> Option<DateTime<Utc>> {
    i64::try_from(ms)
        .ok()
        .and_then(DateTime::<Utc>::from_timestamp_millis)
}

/// Day bucket key (`YYYY-MM-DD`, UTC) for a timestamp.
pub fn day_key(ms: u64) -> String {
    match utc(ms) {
        Some(dt) => dt.format("%Y-%m-%d").to_string(),
        None => "1970-01-01".to_string(),
    }
}

/// Month bucket key derived from a day key.
pub fn month_key(day_key: &str) -> String {
    day_key.get(..7).unwrap_or(day_key).to_string()
}

/// Midnight (UTC) of a day key, in epoch milliseconds.
pub fn parse_day_key(key: &str) -> Option<u64> {
    let date = NaiveDate::parse_from_str(key, "%Y-%m-%d").ok()?;
    let midnight = date.and_hms_opt(0, 0, 0)?.and_utc();
    u64::try_from(midnight.timestamp_millis()).ok()
}

/// Year and 1-based month of a month key.
pub fn parse_month_key(key: &str) -> Option<(i32, u32)> {
    let date = NaiveDate::parse_from_str(&format!("{key}-01"), "%Y-%m-%d").ok()?;
    Some((date.year(), date.month()))
}

/// Calendar-month difference between `now_ms` and a month key.
///
/// `2025-01` seen from any instant in `2025-03` is two months old, whatever
/// the day of the month.
pub fn months_since(now_ms: u64, month_key: &str) -> Option<i64> {
    let (year, month) = parse_month_key(month_key)?;
    let now = utc(now_ms)?;
    let now_index = i64::from(now.year()) * 12 + i64::from(now.month0());
    let then_index = i64::from(year) * 12 + i64::from(month) - 1;
    Some(now_index - then_index)
}

#[cfg(test)]
mod tests {
    use super::*;

    // 2025-09-04T12:00:00Z
    const SEP_4_NOON: u64 = 1_756_987_200_000;

    #[test]
    fn day_and_month_keys() {
        let day = day_key(SEP_4_NOON);
        assert_eq!(day, "2025-09-04");
        assert_eq!(month_key(&day), "2025-09");
    }

    #[test]
    fn day_key_round_trips_to_midnight() {
        let midnight = parse_day_key("2025-09-04");
        assert_eq!(midnight, Some(SEP_4_NOON - 12 * 3_600_000));
        assert_eq!(parse_day_key("not-a-date"), None);
    }

    #[test]
    fn month_difference_is_calendar_based() {
        assert_eq!(months_since(SEP_4_NOON, "2025-09"), Some(0));
        assert_eq!(months_since(SEP_4_NOON, "2025-06"), Some(3));
        assert_eq!(months_since(SEP_4_NOON, "2024-12"), Some(9));
        assert_eq!(months_since(SEP_4_NOON, "garbage"), None);
    }

    #[test]
    fn manual_clock_moves_only_when_told() {
        let clock = ManualClock::new(1_000);
        assert_eq!(clock.now_ms(), 1_000);
        clock.advance(500);
        assert_eq!(clock.now_ms(), 1_500);
        clock.set(42);
        assert_eq!(clock.now_ms(), 42);
    }
}
