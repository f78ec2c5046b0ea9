use std::collections::BTreeSet;

use anyhow::{Context, Result, bail, ensure};
use ascent_engine::{
    AuditAction, AuditOrigin, Clock, Declined, DifficultyMode, EngineConfig, EngineEvent,
    LoadOutcome, LogicalDay, OperatorAction, ProgressSources, ProgressionSession, StreakOutcome,
    Tier, Trigger, load_state,
};
use chrono::TimeDelta;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde_json::json;

use super::simulation::{SimulationPlan, new_session, run_plan, simulation_start};

type ScenarioFn = fn(&EngineConfig, u64) -> Result<()>;

/// A named check run once per seed.
#[derive(Clone, Copy)]
pub struct Scenario {
    pub name: &'static str,
    pub description: &'static str,
    check: ScenarioFn,
}

impl Scenario {
    /// # Errors
    ///
    /// Returns the first expectation the run violated.
    pub fn run(&self, config: &EngineConfig, seed: u64) -> Result<()> {
        (self.check)(config, seed)
    }
}

const SCENARIOS: &[Scenario] = &[
    Scenario {
        name: "smoke",
        description: "Thirty seeded days with a mostly diligent player",
        check: smoke,
    },
    Scenario {
        name: "streak-ladder",
        description: "A broken streak falls to the checkpoint below it",
        check: streak_ladder,
    },
    Scenario {
        name: "shield-absorb",
        description: "Shields cap out and absorb a missed day",
        check: shield_absorb,
    },
    Scenario {
        name: "badge-cascade",
        description: "One large jump unlocks every tier it crosses, once",
        check: badge_cascade,
    },
    Scenario {
        name: "honor-redemption",
        description: "Redeeming forgives the worst past day",
        check: honor_redemption,
    },
    Scenario {
        name: "idempotent-rollover",
        description: "A day closes once unless an operator forces it",
        check: idempotent_rollover,
    },
    Scenario {
        name: "migration-backfill",
        description: "A v1 record loads with legacy badge history backfilled",
        check: migration_backfill,
    },
    Scenario {
        name: "operator-audit",
        description: "Operator tools require a reason and leave an audit trail",
        check: operator_audit,
    },
    Scenario {
        name: "long-campaign",
        description: "Half a year of seeded play with periodic redemptions",
        check: long_campaign,
    },
];

#[must_use]
pub fn all_scenarios() -> &'static [Scenario] {
    SCENARIOS
}

#[must_use]
pub fn get_scenario(name: &str) -> Option<&'static Scenario> {
    SCENARIOS.iter().find(|scenario| scenario.name == name)
}

fn meet_target(session: &mut ProgressionSession) {
    let target = session.state().daily_target;
    session.record_activity(i64::try_from(target).unwrap_or(i64::MAX), 0);
}

fn close_day(session: &mut ProgressionSession) -> Result<StreakOutcome> {
    session
        .advance_clock(TimeDelta::days(1))
        .map(|summary| summary.streak_outcome)
        .context("advancing a day did not roll over")
}

fn smoke(config: &EngineConfig, seed: u64) -> Result<()> {
    let plan = SimulationPlan::default();
    let summary = run_plan(&plan, config, seed);
    if let Some(first) = summary.violations.first() {
        bail!("{} invariant breaches, first: {first}", summary.violations.len());
    }
    ensure!(
        summary.rollovers == plan.days,
        "expected {} rollovers, saw {}",
        plan.days,
        summary.rollovers
    );
    ensure!(
        summary.final_state.streak_history.len() == plan.days as usize,
        "streak history has {} days",
        summary.final_state.streak_history.len()
    );
    Ok(())
}

fn streak_ladder(config: &EngineConfig, seed: u64) -> Result<()> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let run = rng.gen_range(2..60_u32);
    let mut session = new_session(DifficultyMode::Standard, config);

    for _ in 0..run {
        meet_target(&mut session);
        ensure!(close_day(&mut session)? == StreakOutcome::Success, "met day not a success");
    }
    ensure!(session.state().streak == run, "streak {} after {run} days", session.state().streak);
    ensure!(session.state().shields == 0, "no shields were bought");

    let expected = config.streak.fall_value(run);
    ensure!(close_day(&mut session)? == StreakOutcome::Fail, "missed day not a failure");
    let state = session.state();
    ensure!(
        state.streak == expected,
        "streak {run} fell to {} instead of {expected}",
        state.streak
    );
    ensure!(state.best_streak == run, "best streak lost on fall");
    Ok(())
}

fn shield_absorb(config: &EngineConfig, seed: u64) -> Result<()> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut session = new_session(DifficultyMode::Standard, config);
    let cap = config.streak.shield_cap();
    ensure!(cap > 0, "shields are disabled in this config");
    let funding = config.prices.shield * u64::from(cap) + rng.gen_range(0..100);
    session
        .operator(OperatorAction::CreditGold { amount: funding }, "fund shield check")
        .map_err(anyhow::Error::new)?;

    for expected in 1..=cap {
        let held = session.purchase_shield().map_err(anyhow::Error::new)?;
        ensure!(held == expected, "held {held} shields, expected {expected}");
    }
    match session.purchase_shield() {
        Err(Declined::ShieldCapReached { cap: reported }) if reported == cap => {}
        other => bail!("purchase past the cap returned {other:?}"),
    }

    let run = rng.gen_range(3..10_u32);
    for _ in 0..run {
        meet_target(&mut session);
        close_day(&mut session)?;
    }
    let gold_before = session.state().gold;
    ensure!(close_day(&mut session)? == StreakOutcome::Shield, "shield did not absorb miss");
    let state = session.state();
    ensure!(state.streak == run, "shielded streak moved to {}", state.streak);
    ensure!(state.shields == cap - 1, "shield not consumed");
    ensure!(state.gold >= gold_before, "shielded day cost gold");
    Ok(())
}

fn badge_cascade(config: &EngineConfig, _seed: u64) -> Result<()> {
    let mut session = new_session(DifficultyMode::Standard, config);
    let badge = session
        .catalog()
        .iter()
        .find(|badge| badge.trigger.kind() == "stat")
        .cloned()
        .context("catalog has no stat badge")?;
    let Some(top) = badge.levels.last() else {
        bail!("{} has no levels", badge.id);
    };
    let Trigger::Stat { name } = &badge.trigger else {
        bail!("{} is not stat driven", badge.id);
    };

    session.drain_events();
    let sources = ProgressSources::new().with_stat(name, top.target + 1.0);
    session.update_sources(sources.clone());
    let unlocked: Vec<Tier> = session
        .drain_events()
        .into_iter()
        .filter_map(|event| match event {
            EngineEvent::BadgeUnlocked(unlock) if unlock.badge_id == badge.id => Some(unlock.tier),
            _ => None,
        })
        .collect();
    let expected: Vec<Tier> = badge.levels.iter().map(|level| level.tier).collect();
    ensure!(unlocked == expected, "unlocked {unlocked:?}, expected {expected:?}");

    let codes = &session.state().badge_history[&badge.id];
    let distinct: BTreeSet<&String> = codes.values().collect();
    ensure!(distinct.len() == expected.len(), "unlock codes collide");

    session.update_sources(sources);
    let repeats = session
        .drain_events()
        .into_iter()
        .filter(|event| matches!(event, EngineEvent::BadgeUnlocked(_)))
        .count();
    ensure!(repeats == 0, "re-evaluation unlocked {repeats} badges again");
    Ok(())
}

fn honor_redemption(config: &EngineConfig, seed: u64) -> Result<()> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut session = new_session(DifficultyMode::Standard, config);

    match session.redeem_honor() {
        Err(Declined::NothingToRedeem) => {}
        other => bail!("empty ledger redemption returned {other:?}"),
    }

    let target = session.state().daily_target;
    for _ in 0..5 {
        meet_target(&mut session);
        close_day(&mut session)?;
    }
    let partial = rng.gen_range(0..target / 2);
    session.record_activity(i64::try_from(partial).unwrap_or(0), 0);
    close_day(&mut session)?;
    let before = session.state().honor();
    ensure!(before < 100, "partial day left honor at {before}");

    session
        .operator(
            OperatorAction::CreditGold {
                amount: config.prices.redemption,
            },
            "fund redemption check",
        )
        .map_err(anyhow::Error::new)?;
    let gold = session.state().gold;
    let redemption = session.redeem_honor().map_err(anyhow::Error::new)?;
    let state = session.state();
    ensure!(redemption.new_average == 100, "average {} after redemption", redemption.new_average);
    ensure!(state.honor() == 100, "honor {} after redemption", state.honor());
    ensure!(
        state.gold == gold - config.prices.redemption,
        "redemption charged {}",
        gold - state.gold
    );
    Ok(())
}

fn idempotent_rollover(config: &EngineConfig, _seed: u64) -> Result<()> {
    let mut session = new_session(DifficultyMode::Standard, config);
    meet_target(&mut session);
    let summary = session
        .advance_clock(TimeDelta::days(1))
        .context("first boundary did not roll over")?;
    ensure!(!summary.forced, "scheduled rollover marked forced");
    let processed = session.state().last_processed_date;

    ensure!(session.tick().is_none(), "second tick rolled over again");
    ensure!(
        session.advance_clock(TimeDelta::hours(6)).is_none(),
        "same-day advance rolled over"
    );

    session.drain_events();
    session
        .operator(OperatorAction::ForceRollover, "replay yesterday")
        .map_err(anyhow::Error::new)?;
    let forced = session
        .drain_events()
        .into_iter()
        .find_map(|event| match event {
            EngineEvent::Rollover(summary) => Some(summary),
            _ => None,
        })
        .context("forced rollover produced no event")?;
    ensure!(forced.forced, "forced rollover not flagged");
    ensure!(
        session.state().last_processed_date == processed,
        "forced rollover moved the processed day"
    );
    ensure!(
        processed.map(LogicalDay::previous) == Some(forced.day),
        "forced rollover judged {} instead of yesterday",
        forced.day
    );
    let audited = session
        .state()
        .audit_log
        .iter()
        .any(|entry| entry.action == AuditAction::ForcedRollover);
    ensure!(audited, "forced rollover left no audit entry");
    Ok(())
}

fn migration_backfill(config: &EngineConfig, seed: u64) -> Result<()> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let streak = rng.gen_range(1..40_u32);
    let record = json!({
        "level": 4,
        "current_xp": 12,
        "gold": 300,
        "streak": streak,
        "shields": 9,
        "honor_daily_log": [
            { "day": "2024-11-02", "score": 70 },
            { "day": "2024-11-03", "score": 100 }
        ],
        "streak_history": [
            { "day": "2024-11-02", "outcome": "fail" },
            { "day": "2024-11-03", "outcome": "success" }
        ],
        "badges": ["survivor", "survivor"],
        "badge_tiers": { "survivor": "gold" },
        "last_processed_date": "2024-11-03"
    });
    let LoadOutcome {
        state,
        source_version,
        migrated,
        diagnostics,
    } = load_state(&record.to_string(), config);

    ensure!(source_version == 1 && migrated, "record not treated as v1");
    ensure!(!diagnostics.is_empty(), "repairs produced no diagnostics");
    ensure!(state.streak == streak, "streak {} after load", state.streak);
    ensure!(state.shields == config.streak.shield_cap(), "shields not clamped");
    ensure!(state.honor() == 85, "honor {} rebuilt from log", state.honor());
    ensure!(state.streak_history.len() == 2, "streak history not keyed by day");
    ensure!(state.badges == vec!["survivor".to_string()], "badge list not deduplicated");
    let history = state
        .badge_history
        .get("survivor")
        .context("no history backfilled")?;
    ensure!(
        history.keys().copied().collect::<Vec<_>>() == vec![Tier::Silver, Tier::Gold],
        "backfilled tiers {:?}",
        history.keys().collect::<Vec<_>>()
    );

    // paid legacy tiers never pay out again
    let mut session =
        ProgressionSession::new(state, config.clone(), Clock::fixed(simulation_start()));
    session.drain_events();
    session.update_sources(ProgressSources::new());
    let repaid = session.drain_events().into_iter().any(|event| {
        matches!(
            event,
            EngineEvent::BadgeUnlocked(ref unlock)
                if unlock.badge_id == "survivor" && unlock.tier <= Tier::Gold
        )
    });
    ensure!(!repaid, "legacy tier paid twice");
    Ok(())
}

fn operator_audit(config: &EngineConfig, seed: u64) -> Result<()> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut session = new_session(DifficultyMode::Standard, config);
    let entries = session.state().audit_log.len();

    match session.operator(OperatorAction::CreditXp { amount: 10 }, "   ") {
        Err(Declined::MissingReason) => {}
        other => bail!("blank reason returned {other:?}"),
    }
    ensure!(session.state().audit_log.len() == entries, "declined action was audited");

    let amount = rng.gen_range(1..5_000_u64);
    session
        .operator(OperatorAction::CreditXp { amount }, "support ticket")
        .map_err(anyhow::Error::new)?;
    let entry = session
        .state()
        .audit_log
        .back()
        .context("credit left no audit entry")?;
    ensure!(
        entry.origin == AuditOrigin::Operator && entry.action == AuditAction::XpCredit,
        "credit audited as {:?}/{:?}",
        entry.origin,
        entry.action
    );
    ensure!(
        entry.amount == i64::try_from(amount).unwrap_or(i64::MAX),
        "audited amount {}",
        entry.amount
    );
    ensure!(session.state().total_xp_earned >= amount, "credit not counted");

    let gold = session.state().gold;
    session
        .operator(
            OperatorAction::DebitGold {
                amount: gold + 1_000,
            },
            "clawback",
        )
        .map_err(anyhow::Error::new)?;
    ensure!(session.state().gold == 0, "gold debit went below zero");

    let pinned = simulation_start() + TimeDelta::days(3);
    session
        .operator(OperatorAction::SetInstant { at: pinned }, "replay weekend")
        .map_err(anyhow::Error::new)?;
    ensure!(session.clock().is_overridden(), "clock not pinned");
    ensure!(
        session.state().last_processed_date == Some(session.today()),
        "pinned instant did not roll over"
    );
    Ok(())
}

fn long_campaign(config: &EngineConfig, seed: u64) -> Result<()> {
    let plan = SimulationPlan {
        days: 180,
        diligence: 0.75,
        redeem_every: 30,
        ..SimulationPlan::default()
    };
    let summary = run_plan(&plan, config, seed);
    if let Some(first) = summary.violations.first() {
        bail!("{} invariant breaches, first: {first}", summary.violations.len());
    }
    let tally = &summary.outcomes;
    ensure!(
        tally.success + tally.shield + tally.fail == plan.days,
        "tally {tally:?} does not cover {} days",
        plan.days
    );
    ensure!(summary.unlocks > 0, "half a year unlocked nothing");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scenario_names_are_unique() {
        let mut names: Vec<&str> = all_scenarios().iter().map(|scenario| scenario.name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), all_scenarios().len());
    }

    #[test]
    fn every_scenario_passes_on_default_config() {
        let config = EngineConfig::default();
        for scenario in all_scenarios() {
            for seed in [1, 2024] {
                if let Err(err) = scenario.run(&config, seed) {
                    panic!("{} failed on seed {seed}: {err:#}", scenario.name);
                }
            }
        }
    }

    #[test]
    fn unknown_scenario_is_none() {
        assert!(get_scenario("smoke").is_some());
        assert!(get_scenario("does-not-exist").is_none());
    }
}
