//! Honor ledger and redemption.
//!
//! Honor is never stored on its own: it is always the average of the per-day
//! log, recomputed on read.
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::constants::{HONOR_EMPTY_AVERAGE, HONOR_MAX};
use crate::day::LogicalDay;
use crate::declined::Declined;
use crate::numbers::{floor_f64_to_u8, round_f64_to_u8, u64_to_f64, usize_to_f64};

/// Per-logical-day honor scores in `0..=100`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HonorLedger {
    entries: BTreeMap<LogicalDay, u8>,
}

/// A forgiven ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Redemption {
    pub day: LogicalDay,
    pub previous_score: u8,
    pub new_average: u8,
}

impl HonorLedger {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Build a ledger from raw entries, clamping every score into range.
    #[must_use]
    pub fn from_entries(entries: impl IntoIterator<Item = (LogicalDay, u8)>) -> Self {
        let mut ledger = Self::new();
        for (day, score) in entries {
            ledger.record_day(day, score);
        }
        ledger
    }

    /// Insert or overwrite a day's score.
    pub fn record_day(&mut self, day: LogicalDay, score: u8) {
        self.entries.insert(day, score.min(HONOR_MAX));
    }

    #[must_use]
    pub fn score(&self, day: LogicalDay) -> Option<u8> {
        self.entries.get(&day).copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (LogicalDay, u8)> + '_ {
        self.entries.iter().map(|(day, score)| (*day, *score))
    }

    /// Rounded average of every logged score; an empty ledger reads as full honor.
    #[must_use]
    pub fn average(&self) -> u8 {
        if self.entries.is_empty() {
            return HONOR_EMPTY_AVERAGE;
        }
        let sum: u64 = self.entries.values().map(|score| u64::from(*score)).sum();
        round_f64_to_u8(u64_to_f64(sum) / usize_to_f64(self.entries.len()))
    }

    /// Forgive the single lowest entry strictly before `today` (earliest day on ties).
    ///
    /// # Errors
    ///
    /// Returns [`Declined::NothingToRedeem`] when no past entry is below 100.
    pub fn redeem_lowest(&mut self, today: LogicalDay) -> Result<Redemption, Declined> {
        let (day, previous_score) = self
            .entries
            .range(..today)
            .filter(|(_, score)| **score < HONOR_MAX)
            .min_by_key(|(day, score)| (**score, **day))
            .map(|(day, score)| (*day, *score))
            .ok_or(Declined::NothingToRedeem)?;
        self.entries.insert(day, HONOR_MAX);
        Ok(Redemption {
            day,
            previous_score,
            new_average: self.average(),
        })
    }
}

/// Score a closed day: full marks when the target is met, proportional otherwise.
#[must_use]
pub fn day_score(daily_xp: u64, daily_target: u64) -> u8 {
    if daily_target == 0 || daily_xp >= daily_target {
        return HONOR_MAX;
    }
    floor_f64_to_u8(u64_to_f64(daily_xp) * f64::from(HONOR_MAX) / u64_to_f64(daily_target))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> LogicalDay {
        LogicalDay::from_ymd(2024, 5, d).unwrap()
    }

    #[test]
    fn average_is_recomputed_from_log() {
        let mut ledger = HonorLedger::new();
        assert_eq!(ledger.average(), 100);
        ledger.record_day(day(1), 100);
        ledger.record_day(day(2), 40);
        assert_eq!(ledger.average(), 70);
        ledger.record_day(day(2), 60);
        assert_eq!(ledger.average(), 80);
        assert_eq!(ledger.len(), 2);
    }

    #[test]
    fn scores_are_clamped() {
        let ledger = HonorLedger::from_entries([(day(1), 250)]);
        assert_eq!(ledger.score(day(1)), Some(100));
    }

    #[test]
    fn redemption_forgives_single_worst_past_day() {
        let mut ledger = HonorLedger::from_entries([
            (day(1), 70),
            (day(2), 20),
            (day(3), 20),
            (day(4), 0),
        ]);
        // day 4 is today and is excluded; days 2 and 3 tie, earliest wins.
        let redemption = ledger.redeem_lowest(day(4)).unwrap();
        assert_eq!(redemption.day, day(2));
        assert_eq!(redemption.previous_score, 20);
        assert_eq!(ledger.score(day(2)), Some(100));
        assert_eq!(ledger.score(day(3)), Some(20));
        assert_eq!(ledger.score(day(4)), Some(0));
        assert_eq!(redemption.new_average, ledger.average());
    }

    #[test]
    fn redemption_declines_when_nothing_eligible() {
        let mut empty = HonorLedger::new();
        assert_eq!(empty.redeem_lowest(day(9)), Err(Declined::NothingToRedeem));

        let mut perfect = HonorLedger::from_entries([(day(1), 100), (day(2), 100)]);
        let before = perfect.average();
        assert_eq!(perfect.redeem_lowest(day(9)), Err(Declined::NothingToRedeem));
        assert_eq!(perfect.average(), before);
    }

    #[test]
    fn day_score_is_proportional_below_target() {
        assert_eq!(day_score(500, 500), 100);
        assert_eq!(day_score(900, 500), 100);
        assert_eq!(day_score(200, 500), 40);
        assert_eq!(day_score(499, 500), 99);
        assert_eq!(day_score(0, 500), 0);
        assert_eq!(day_score(0, 0), 100);
    }
}
