//! Daily rollover: the once-per-logical-day transaction.
//!
//! A rollover judges the closing day, moves the streak, records honor, resets
//! the daily counters, promotes the pending mode and pays salary. It reads a
//! snapshot and returns a new one; nothing is written until the caller commits.
use chrono::NaiveDateTime;
use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::constants::{LOG_ROLLOVER_COMMITTED, LOG_ROLLOVER_FORCED};
use crate::day::{LogicalDay, resolve_logical_day};
use crate::honor::day_score;
use crate::state::{AuditAction, AuditEntry, AuditOrigin, EconomyState};
use crate::streak::{StreakOutcome, judge};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RolloverPhase {
    #[default]
    Idle,
    Processing,
}

/// What asked for the rollover.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum RolloverTrigger {
    /// A detected day-boundary crossing. Guarded against same-day repeats.
    Scheduled,
    /// Operator override that skips the same-day guard.
    Forced { reason: String },
}

impl RolloverTrigger {
    #[must_use]
    pub const fn is_forced(&self) -> bool {
        matches!(self, Self::Forced { .. })
    }
}

/// User-facing outcome of a committed rollover.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RolloverSummary {
    /// The day that was judged.
    pub day: LogicalDay,
    pub streak_outcome: StreakOutcome,
    pub new_streak: u32,
    pub honor_delta: i16,
    pub salary_paid: u64,
    pub forced: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RolloverResult {
    /// First run for this state: anchored to today without judging anything.
    Initialized { state: EconomyState },
    /// Today was already processed; nothing changed.
    AlreadyProcessed,
    /// Another rollover is still in flight on this orchestrator; nothing changed.
    Busy,
    Committed {
        state: EconomyState,
        summary: RolloverSummary,
    },
}

/// Runs rollovers and tracks whether one is in flight.
#[derive(Debug, Clone, Default)]
pub struct Orchestrator {
    phase: RolloverPhase,
}

impl Orchestrator {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            phase: RolloverPhase::Idle,
        }
    }

    #[must_use]
    pub const fn phase(&self) -> RolloverPhase {
        self.phase
    }

    /// Run a rollover for the logical day containing `now`.
    ///
    /// A gap of several days is judged as a single closing day, so a long
    /// absence costs one failure step rather than one per missed day. That
    /// judgment is keyed on the last processed day, the only day whose
    /// activity the daily counters actually hold.
    pub fn run(
        &mut self,
        state: &EconomyState,
        now: NaiveDateTime,
        trigger: &RolloverTrigger,
        cfg: &EngineConfig,
    ) -> RolloverResult {
        let today = resolve_logical_day(now, cfg.day_start_hour);
        let Some(last) = state.last_processed_date else {
            let mut next = state.clone();
            next.last_processed_date = Some(today);
            return RolloverResult::Initialized { state: next };
        };
        if last >= today && !trigger.is_forced() {
            return RolloverResult::AlreadyProcessed;
        }
        if self.phase == RolloverPhase::Processing {
            warn!("rollover for {today} refused: previous rollover never finished");
            return RolloverResult::Busy;
        }

        self.phase = RolloverPhase::Processing;
        let closing = last.min(today.previous());
        let (mut next, summary) = close_day(state, closing, today.max(last), cfg, trigger);

        if let RolloverTrigger::Forced { reason } = trigger {
            warn!("{LOG_ROLLOVER_FORCED}: closing {} ({reason})", summary.day);
            next.record_audit(AuditEntry {
                at: now,
                origin: AuditOrigin::Operator,
                action: AuditAction::ForcedRollover,
                amount: 0,
                reason: reason.clone(),
            });
        }
        info!(
            "{LOG_ROLLOVER_COMMITTED}: {} {} streak={} honor_delta={} salary={}",
            summary.day,
            summary.streak_outcome,
            summary.new_streak,
            summary.honor_delta,
            summary.salary_paid
        );
        self.phase = RolloverPhase::Idle;
        RolloverResult::Committed {
            state: next,
            summary,
        }
    }
}

fn close_day(
    state: &EconomyState,
    closing: LogicalDay,
    processed: LogicalDay,
    cfg: &EngineConfig,
    trigger: &RolloverTrigger,
) -> (EconomyState, RolloverSummary) {
    let mut next = state.clone();

    let outcome = judge(state.daily_xp, state.daily_target, state.shields);
    let (streak, shields) = cfg.streak.apply(outcome, state.streak, state.shields);
    next.streak = streak;
    next.shields = shields;
    next.sync_best_streak();
    next.streak_history.insert(closing, outcome);

    let honor_before = state.honor();
    next.honor_daily_log
        .record_day(closing, day_score(state.daily_xp, state.daily_target));
    next.sync_honor();
    let honor_delta = i16::from(next.honor()) - i16::from(honor_before);

    next.daily_xp = 0;
    next.current_mode = next.pending_mode;
    next.daily_target = cfg.daily_target(next.current_mode);

    let salary_paid = cfg.salary(next.current_mode, next.streak);
    next.gold = next.gold.saturating_add(salary_paid);

    next.last_processed_date = Some(processed);

    let summary = RolloverSummary {
        day: closing,
        streak_outcome: outcome,
        new_streak: next.streak,
        honor_delta,
        salary_paid,
        forced: trigger.is_forced(),
    };
    (next, summary)
}
