use ascent_engine::{
    Clock, DifficultyMode, EconomyState, EngineConfig, EngineEvent, ProgressSources,
    ProgressionSession, StreakOutcome,
};
use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// Player behavior for a seeded multi-day run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimulationPlan {
    pub mode: DifficultyMode,
    pub days: u32,
    /// Chance that a given day meets its XP target.
    pub diligence: f64,
    /// Keep one shield in reserve whenever gold allows.
    pub buys_shields: bool,
    /// Redeem the worst honor day every this many days (0 disables).
    pub redeem_every: u32,
}

impl Default for SimulationPlan {
    fn default() -> Self {
        Self {
            mode: DifficultyMode::Standard,
            days: 30,
            diligence: 0.8,
            buys_shields: true,
            redeem_every: 0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeTally {
    pub success: u32,
    pub shield: u32,
    pub fail: u32,
}

impl OutcomeTally {
    fn record(&mut self, outcome: StreakOutcome) {
        match outcome {
            StreakOutcome::Success => self.success += 1,
            StreakOutcome::Shield => self.shield += 1,
            StreakOutcome::Fail => self.fail += 1,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SimulationSummary {
    pub rollovers: u32,
    pub unlocks: u32,
    pub outcomes: OutcomeTally,
    pub final_state: EconomyState,
    /// Invariant breaches, one line each, tagged with the simulated day.
    pub violations: Vec<String>,
}

/// Morning of the first simulated day; seeds never move it so runs compare.
#[must_use]
pub fn simulation_start() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 1, 6)
        .and_then(|date| date.and_hms_opt(9, 30, 0))
        .unwrap_or_default()
}

#[must_use]
pub fn new_session(mode: DifficultyMode, config: &EngineConfig) -> ProgressionSession {
    ProgressionSession::onboard(mode, config.clone(), Clock::fixed(simulation_start()))
}

/// Drive one session through `plan.days` rollovers.
#[must_use]
pub fn run_plan(plan: &SimulationPlan, config: &EngineConfig, seed: u64) -> SimulationSummary {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut session = new_session(plan.mode, config);
    let mut summary = SimulationSummary {
        rollovers: 0,
        unlocks: 0,
        outcomes: OutcomeTally::default(),
        final_state: EconomyState::default(),
        violations: Vec::new(),
    };
    let mut habit_streak = 0_u32;

    for day in 1..=plan.days {
        let target = session.state().daily_target;
        let earned = if rng.gen_bool(plan.diligence.clamp(0.0, 1.0)) {
            habit_streak += 1;
            target + rng.gen_range(0..=target / 2)
        } else {
            habit_streak = 0;
            rng.gen_range(0..target.max(1))
        };
        let chunks = rng.gen_range(1..=3_u64);
        let per_chunk = earned / chunks;
        for chunk in 0..chunks {
            let xp = if chunk + 1 == chunks {
                earned - per_chunk * (chunks - 1)
            } else {
                per_chunk
            };
            session.record_activity(i64::try_from(xp).unwrap_or(i64::MAX), rng.gen_range(0..20));
        }

        if plan.buys_shields && session.state().shields == 0 {
            let _ = session.purchase_shield();
        }
        if plan.redeem_every > 0 && day % plan.redeem_every == 0 {
            let _ = session.redeem_honor();
        }

        session.update_sources(
            ProgressSources::new()
                .with_habit("habit-run", "Morning Run", habit_streak)
                .with_stat("willpower", f64::from(day) / 3.0)
                .with_skill("focus", "Focus", day / 10),
        );

        session.advance_clock(TimeDelta::days(1));
        for event in session.drain_events() {
            match event {
                EngineEvent::Rollover(rollover) => {
                    summary.rollovers += 1;
                    summary.outcomes.record(rollover.streak_outcome);
                }
                EngineEvent::BadgeUnlocked(_) => summary.unlocks += 1,
                EngineEvent::LevelUp { .. } => {}
            }
        }
        summary.violations.extend(
            check_invariants(&session)
                .into_iter()
                .map(|breach| format!("day {day}: {breach}")),
        );
    }

    summary.final_state = session.into_state();
    summary
}

/// Every cross-field rule a committed economy must satisfy.
#[must_use]
pub fn check_invariants(session: &ProgressionSession) -> Vec<String> {
    let state = session.state();
    let cfg = session.config();
    let mut breaches = Vec::new();

    if state.shields > cfg.streak.shield_cap() {
        breaches.push(format!("shields {} above cap", state.shields));
    }
    if state.level < 1 {
        breaches.push("level dropped below 1".to_string());
    }
    if state.current_xp >= state.target_xp {
        breaches.push(format!(
            "xp {} not below target {}",
            state.current_xp, state.target_xp
        ));
    }
    if state.target_xp != cfg.xp_curve.target_xp(state.level) {
        breaches.push(format!("target xp stale for level {}", state.level));
    }
    if state.honor != state.honor() {
        breaches.push(format!("persisted honor {} out of sync", state.honor));
    }
    if state.best_streak < state.streak {
        breaches.push("best streak behind current streak".to_string());
    }
    if state.last_processed_date != Some(session.today()) {
        breaches.push("current day not processed".to_string());
    }
    for (badge, tier) in &state.badge_tiers {
        let recorded = state
            .badge_history
            .get(badge)
            .and_then(|history| history.keys().max());
        if recorded != Some(tier) {
            breaches.push(format!("{badge} tier {tier} disagrees with history"));
        }
        if !state.badges.contains(badge) {
            breaches.push(format!("{badge} missing from unlocked list"));
        }
    }
    breaches
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diligent_player_never_fails_a_day() {
        let plan = SimulationPlan {
            diligence: 1.0,
            days: 20,
            ..SimulationPlan::default()
        };
        let summary = run_plan(&plan, &EngineConfig::default(), 3);
        assert!(summary.violations.is_empty(), "{:?}", summary.violations);
        assert_eq!(summary.rollovers, 20);
        assert_eq!(summary.outcomes.success, 20);
        assert_eq!(summary.final_state.streak, 20);
    }

    #[test]
    fn idle_player_fails_every_day() {
        let plan = SimulationPlan {
            diligence: 0.0,
            days: 10,
            buys_shields: false,
            ..SimulationPlan::default()
        };
        let summary = run_plan(&plan, &EngineConfig::default(), 9);
        assert!(summary.violations.is_empty(), "{:?}", summary.violations);
        assert_eq!(summary.outcomes.fail, 10);
        assert_eq!(summary.final_state.streak, 0);
        assert!(summary.final_state.honor() < 100);
    }

    #[test]
    fn runs_replay_per_seed() {
        let plan = SimulationPlan::default();
        let cfg = EngineConfig::default();
        let left = run_plan(&plan, &cfg, 77);
        let right = run_plan(&plan, &cfg, 77);
        assert_eq!(left.outcomes, right.outcomes);
        assert_eq!(left.final_state.streak_history, right.final_state.streak_history);
    }
}
