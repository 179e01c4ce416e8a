use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Local, NaiveDate, NaiveTime, TimeZone};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of days covered by the trailing dashboard window, today included.
pub const WINDOW_DAYS: usize = 7;

/// One local calendar day, formatted and sorted as `YYYY-MM-DD`.
///
/// Derived from the server-local calendar, so two timestamps on the same
/// local day always map to the same key regardless of time-of-day.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct DayKey(NaiveDate);

impl DayKey {
    pub fn from_timestamp(timestamp: i64) -> Option<Self> {
        Local
            .timestamp_opt(timestamp, 0)
            .single()
            .map(|datetime| Self(datetime.date_naive()))
    }

    pub fn from_datetime(datetime: DateTime<Local>) -> Self {
        Self(datetime.date_naive())
    }

    pub fn parse(value: &str) -> Result<Self> {
        NaiveDate::parse_from_str(value, "%Y-%m-%d")
            .map(Self)
            .with_context(|| format!("Invalid day key: {value}. Example: 2024-06-10"))
    }

    pub fn add_days(self, days: i64) -> Self {
        Self(self.0 + Duration::days(days))
    }

    /// Signed day count from `self` to `other`.
    pub fn days_until(self, other: Self) -> i64 {
        (other.0 - self.0).num_days()
    }

    /// Earliest valid local instant of this day. A midnight made nonexistent
    /// by a DST transition falls forward to the next representable hour.
    pub fn start_timestamp(self) -> Option<i64> {
        let midnight = self.0.and_time(NaiveTime::MIN);

        Local
            .from_local_datetime(&midnight)
            .earliest()
            .or_else(|| {
                Local
                    .from_local_datetime(&(midnight + Duration::hours(1)))
                    .earliest()
            })
            .map(|datetime| datetime.timestamp())
    }
}

impl fmt::Display for DayKey {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}", self.0.format("%Y-%m-%d"))
    }
}

/// A fixed sequence of seven consecutive days, index 0 = today minus six
/// days and index 6 = today. Computed once per request and never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeeklyWindow {
    days: [DayKey; WINDOW_DAYS],
}

impl WeeklyWindow {
    pub fn ending_at(today: DayKey) -> Self {
        let mut days = [today; WINDOW_DAYS];

        for (offset, slot) in days.iter_mut().enumerate() {
            *slot = today.add_days(offset as i64 - (WINDOW_DAYS as i64 - 1));
        }

        Self { days }
    }

    pub fn for_now(now: DateTime<Local>) -> Self {
        Self::ending_at(DayKey::from_datetime(now))
    }

    pub fn days(&self) -> &[DayKey; WINDOW_DAYS] {
        &self.days
    }

    pub fn labels(&self) -> Vec<String> {
        self.days.iter().map(ToString::to_string).collect()
    }

    /// Index of the window day exactly equal to `key`. Exact key equality
    /// keeps the lookup immune to daylight-saving offset arithmetic.
    pub fn index_of(&self, key: DayKey) -> Option<usize> {
        self.days.iter().position(|day| *day == key)
    }

    pub fn index_for_timestamp(&self, timestamp: i64) -> Option<usize> {
        DayKey::from_timestamp(timestamp).and_then(|key| self.index_of(key))
    }
}
