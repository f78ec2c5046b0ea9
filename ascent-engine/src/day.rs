//! Logical day resolution.
//!
//! A logical day is a calendar date shifted by the configured day-start hour,
//! so activity logged at 02:00 with a 04:00 day start still belongs to the
//! previous day.
use chrono::{Local, NaiveDate, NaiveDateTime, TimeDelta};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::constants::DAY_START_HOUR_MAX;

/// Canonical key for one logical day, serialized as `YYYY-MM-DD`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LogicalDay(NaiveDate);

impl LogicalDay {
    #[must_use]
    pub const fn from_date(date: NaiveDate) -> Self {
        Self(date)
    }

    /// Build a day key from calendar components, returning `None` for invalid dates.
    #[must_use]
    pub fn from_ymd(year: i32, month: u32, day: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, day).map(Self)
    }

    #[must_use]
    pub const fn date(self) -> NaiveDate {
        self.0
    }

    /// The logical day immediately before this one (saturates at the calendar minimum).
    #[must_use]
    pub fn previous(self) -> Self {
        self.0.pred_opt().map_or(self, Self)
    }

    /// The logical day immediately after this one (saturates at the calendar maximum).
    #[must_use]
    pub fn next(self) -> Self {
        self.0.succ_opt().map_or(self, Self)
    }

    /// Signed number of days from `earlier` to `self`.
    #[must_use]
    pub fn days_since(self, earlier: Self) -> i64 {
        (self.0 - earlier.0).num_days()
    }
}

impl fmt::Display for LogicalDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}

impl FromStr for LogicalDay {
    type Err = chrono::ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").map(Self)
    }
}

/// Clamp a configured day-start hour into `0..=23`.
#[must_use]
pub const fn clamp_day_start_hour(hour: i32) -> i32 {
    if hour < 0 {
        0
    } else if hour > DAY_START_HOUR_MAX {
        DAY_START_HOUR_MAX
    } else {
        hour
    }
}

/// Resolve the logical day an instant belongs to.
#[must_use]
pub fn resolve_logical_day(instant: NaiveDateTime, day_start_hour: i32) -> LogicalDay {
    let hours = i64::from(clamp_day_start_hour(day_start_hour));
    let shifted = instant
        .checked_sub_signed(TimeDelta::hours(hours))
        .unwrap_or(instant);
    LogicalDay(shifted.date())
}

/// Wall clock with an optional debug override.
///
/// When an override instant is present it always wins over the real clock.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Clock {
    #[serde(default)]
    debug_override: Option<NaiveDateTime>,
}

impl Clock {
    /// Clock backed by the local wall clock.
    #[must_use]
    pub const fn system() -> Self {
        Self {
            debug_override: None,
        }
    }

    /// Clock pinned to a fixed instant.
    #[must_use]
    pub const fn fixed(instant: NaiveDateTime) -> Self {
        Self {
            debug_override: Some(instant),
        }
    }

    /// Install or clear the debug override instant.
    pub fn set_override(&mut self, instant: Option<NaiveDateTime>) {
        self.debug_override = instant;
    }

    #[must_use]
    pub const fn debug_override(&self) -> Option<NaiveDateTime> {
        self.debug_override
    }

    #[must_use]
    pub const fn is_overridden(&self) -> bool {
        self.debug_override.is_some()
    }

    /// Shift the clock forward, pinning it to `now + delta` if it was live.
    pub fn advance(&mut self, delta: TimeDelta) {
        let base = self.now();
        self.debug_override = Some(base.checked_add_signed(delta).unwrap_or(base));
    }

    #[must_use]
    pub fn now(&self) -> NaiveDateTime {
        self.debug_override
            .unwrap_or_else(|| Local::now().naive_local())
    }

    #[must_use]
    pub fn logical_today(&self, day_start_hour: i32) -> LogicalDay {
        resolve_logical_day(self.now(), day_start_hour)
    }
}
