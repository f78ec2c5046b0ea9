//! Streak survival ladder.
//!
//! The streak rises by one for every day the daily target is met. A missed day
//! either burns a shield or drops the streak to the last checkpoint cleared,
//! so sustained effort is never wiped out by a single failure.
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::constants::{SHIELD_CAP, STREAK_GATES};
use crate::declined::Declined;
use crate::numbers::u64_to_f64;

/// Verdict for one closed logical day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreakOutcome {
    /// Daily target met.
    Success,
    /// Target missed, a shield absorbed it.
    Shield,
    /// Target missed with no shield left.
    Fail,
}

impl StreakOutcome {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Shield => "shield",
            Self::Fail => "fail",
        }
    }
}

impl fmt::Display for StreakOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Progress between the last cleared checkpoint and the next one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StreakPhase {
    pub prev_checkpoint: u32,
    pub next_checkpoint: Option<u32>,
    pub progress_percent: f64,
}

/// Ascending checkpoint table plus the shield cap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreakLadder {
    #[serde(default = "StreakLadder::default_gates")]
    gates: Vec<u32>,
    #[serde(default = "StreakLadder::default_shield_cap")]
    shield_cap: u8,
}

impl Default for StreakLadder {
    fn default() -> Self {
        Self {
            gates: Self::default_gates(),
            shield_cap: Self::default_shield_cap(),
        }
    }
}

impl StreakLadder {
    fn default_gates() -> Vec<u32> {
        STREAK_GATES.to_vec()
    }

    const fn default_shield_cap() -> u8 {
        SHIELD_CAP
    }

    /// Build a ladder from arbitrary gates; zero entries are dropped and the rest
    /// sorted and deduplicated so the table is always strictly ascending.
    #[must_use]
    pub fn new(gates: impl IntoIterator<Item = u32>, shield_cap: u8) -> Self {
        let mut gates: Vec<u32> = gates.into_iter().filter(|gate| *gate > 0).collect();
        gates.sort_unstable();
        gates.dedup();
        Self { gates, shield_cap }
    }

    #[must_use]
    pub fn gates(&self) -> &[u32] {
        &self.gates
    }

    #[must_use]
    pub const fn shield_cap(&self) -> u8 {
        self.shield_cap
    }

    pub(crate) fn is_strictly_ascending(&self) -> bool {
        self.gates.windows(2).all(|pair| pair[0] < pair[1])
            && self.gates.first().is_none_or(|first| *first > 0)
    }

    /// The value a broken streak collapses to: the highest gate strictly below it.
    #[must_use]
    pub fn fall_value(&self, streak: u32) -> u32 {
        self.gates
            .iter()
            .copied()
            .take_while(|gate| *gate < streak)
            .last()
            .unwrap_or(0)
    }

    #[must_use]
    pub fn phase(&self, streak: u32) -> StreakPhase {
        let prev_checkpoint = self
            .gates
            .iter()
            .copied()
            .take_while(|gate| *gate <= streak)
            .last()
            .unwrap_or(0);
        let next_checkpoint = self.gates.iter().copied().find(|gate| *gate > streak);
        let progress_percent = next_checkpoint.map_or(100.0, |next| {
            let span = u64::from(next - prev_checkpoint);
            let done = u64::from(streak - prev_checkpoint);
            u64_to_f64(done) * 100.0 / u64_to_f64(span)
        });
        StreakPhase {
            prev_checkpoint,
            next_checkpoint,
            progress_percent,
        }
    }

    /// Apply a verdict, returning the next `(streak, shields)` pair.
    #[must_use]
    pub fn apply(&self, outcome: StreakOutcome, streak: u32, shields: u8) -> (u32, u8) {
        match outcome {
            StreakOutcome::Success => (streak.saturating_add(1), shields),
            StreakOutcome::Shield => (streak, shields.saturating_sub(1)),
            StreakOutcome::Fail => (self.fall_value(streak), shields),
        }
    }

    /// Add one shield, refusing once the cap is reached.
    ///
    /// # Errors
    ///
    /// Returns [`Declined::ShieldCapReached`] when `shields` is already at the cap.
    pub const fn acquire_shield(&self, shields: u8) -> Result<u8, Declined> {
        if shields >= self.shield_cap {
            return Err(Declined::ShieldCapReached {
                cap: self.shield_cap,
            });
        }
        Ok(shields + 1)
    }
}

/// Judge a closed day against its target.
#[must_use]
pub const fn judge(daily_xp: u64, daily_target: u64, shields: u8) -> StreakOutcome {
    if daily_xp >= daily_target {
        StreakOutcome::Success
    } else if shields > 0 {
        StreakOutcome::Shield
    } else {
        StreakOutcome::Fail
    }
}
