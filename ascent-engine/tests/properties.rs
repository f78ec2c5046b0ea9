use ascent_engine::{
    BadgeCatalog, Clock, DifficultyMode, EconomyState, EngineConfig, HonorLedger, LogicalDay,
    Orchestrator, ProgressSources, RolloverResult, RolloverTrigger, StreakLadder, StreakOutcome,
    Tier, XpCurve, XpProgress, apply_xp, evaluate,
};
use chrono::{NaiveDate, NaiveDateTime};

fn day(d: u32) -> LogicalDay {
    LogicalDay::from_ymd(2025, 1, d).unwrap()
}

fn at(d: u32, hour: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 1, d)
        .and_then(|date| date.and_hms_opt(hour, 0, 0))
        .unwrap()
}

fn ladder_badge(trigger: &str, key: &str, targets: &[u32]) -> BadgeCatalog {
    let tiers = ["silver", "gold", "diamond", "crimson"];
    let levels: Vec<serde_json::Value> = targets
        .iter()
        .zip(tiers)
        .map(|(target, tier)| {
            serde_json::json!({ "tier": tier, "target": target, "rewards": { "xp": 5, "gold": 5 } })
        })
        .collect();
    let json = serde_json::json!([{
        "id": "probe",
        "name": "Probe",
        "triggerType": trigger,
        "metricKey": key,
        "levels": levels,
    }]);
    BadgeCatalog::from_json(&json.to_string()).unwrap()
}

fn committed(result: RolloverResult) -> EconomyState {
    match result {
        RolloverResult::Committed { state, .. } => state,
        other => panic!("expected commit, got {other:?}"),
    }
}

#[test]
fn fall_value_never_exceeds_streak_and_never_decreases() {
    for ladder in [
        StreakLadder::default(),
        StreakLadder::new([1, 2, 3, 5, 8, 13], 3),
        StreakLadder::new([7, 30, 90], 1),
    ] {
        let mut previous = 0;
        for streak in 0..=2_000 {
            let fallen = ladder.fall_value(streak);
            assert!(fallen <= streak);
            assert!(fallen >= previous);
            previous = fallen;
        }
    }
}

#[test]
fn evaluation_is_idempotent() {
    let catalog = ladder_badge("stat", "focus", &[10, 50, 100]);
    let sources = ProgressSources::new().with_stat("focus", 70.0);
    let curve = XpCurve::default();
    let first = evaluate(&catalog, &sources, &EconomyState::default(), at(1, 9), &curve);
    assert_eq!(first.unlocks.len(), 2);
    let second = evaluate(&catalog, &sources, &first.state, at(1, 10), &curve);
    assert!(second.unlocks.is_empty());
    assert_eq!(second.state, first.state);
}

#[test]
fn large_jump_fires_every_tier_in_one_pass() {
    let catalog = ladder_badge("stat", "focus", &[10, 50, 100, 500]);
    let sources = ProgressSources::new().with_stat("focus", 600.0);
    let eval = evaluate(
        &catalog,
        &sources,
        &EconomyState::default(),
        at(1, 9),
        &XpCurve::default(),
    );
    let tiers: Vec<Tier> = eval.unlocks.iter().map(|unlock| unlock.tier).collect();
    assert_eq!(
        tiers,
        vec![Tier::Silver, Tier::Gold, Tier::Diamond, Tier::Crimson]
    );
}

#[test]
fn oversized_penalty_floors_at_level_one() {
    let curve = XpCurve::default();
    let start = XpProgress {
        level: 1,
        current_xp: 40,
        target_xp: curve.target_xp(1),
    };
    let outcome = apply_xp(start, -41, &curve);
    assert_eq!(outcome.progress.level, 1);
    assert_eq!(outcome.progress.current_xp, 0);

    let higher = XpProgress {
        level: 6,
        current_xp: 10,
        target_xp: curve.target_xp(6),
    };
    let outcome = apply_xp(higher, -11, &curve);
    assert_eq!(outcome.progress.level, 6);
    assert_eq!(outcome.progress.current_xp, 0);
}

#[test]
fn double_rollover_on_one_day_mutates_once() {
    let cfg = EngineConfig::default();
    let mut orchestrator = Orchestrator::new();
    let mut state = EconomyState::onboard(day(1), DifficultyMode::Standard, &cfg);
    state.daily_xp = 650;

    let once = committed(orchestrator.run(&state, at(2, 8), &RolloverTrigger::Scheduled, &cfg));
    let twice = orchestrator.run(&once, at(2, 23), &RolloverTrigger::Scheduled, &cfg);
    assert_eq!(twice, RolloverResult::AlreadyProcessed);
    assert_eq!(once.last_processed_date, Some(day(2)));
    assert_eq!(once.streak, 1);
    assert_eq!(once.daily_xp, 0);
}

#[test]
fn met_target_scenario() {
    let cfg = EngineConfig::default();
    let mut state = EconomyState::onboard(day(1), DifficultyMode::Standard, &cfg);
    state.streak = 2;
    state.daily_xp = 500;
    assert_eq!(state.daily_target, 500);
    let next = committed(Orchestrator::new().run(&state, at(2, 9), &RolloverTrigger::Scheduled, &cfg));
    assert_eq!(next.streak_history[&day(1)], StreakOutcome::Success);
    assert_eq!(next.streak, 3);
    assert_eq!(next.honor_daily_log.score(day(1)), Some(100));
}

#[test]
fn shielded_miss_scenario() {
    let cfg = EngineConfig::default();
    let mut state = EconomyState::onboard(day(1), DifficultyMode::Standard, &cfg);
    state.streak = 5;
    state.shields = 1;
    state.daily_xp = 200;
    let next = committed(Orchestrator::new().run(&state, at(2, 9), &RolloverTrigger::Scheduled, &cfg));
    assert_eq!(next.streak_history[&day(1)], StreakOutcome::Shield);
    assert_eq!(next.shields, 0);
    assert_eq!(next.streak, 5);
}

#[test]
fn checkpoint_fall_scenario() {
    let cfg = EngineConfig {
        streak: StreakLadder::new([1, 2, 3, 5, 8, 13], 3),
        ..EngineConfig::default()
    };
    let mut state = EconomyState::onboard(day(1), DifficultyMode::Standard, &cfg);
    state.streak = 13;
    let next = committed(Orchestrator::new().run(&state, at(2, 9), &RolloverTrigger::Scheduled, &cfg));
    assert_eq!(next.streak_history[&day(1)], StreakOutcome::Fail);
    assert_eq!(next.streak, 8);
}

#[test]
fn redeeming_a_perfect_log_is_a_no_op() {
    let mut ledger = HonorLedger::from_entries([(day(1), 100), (day(2), 100), (day(3), 100)]);
    let before = ledger.clone();
    assert!(ledger.redeem_lowest(day(4)).is_err());
    assert_eq!(ledger, before);
    assert_eq!(ledger.average(), 100);
}

#[test]
fn habit_badge_resolves_by_title_substring_or_zero() {
    let catalog = ladder_badge("habit", "Run", &[3]);
    let curve = XpCurve::default();

    let with_runner = ProgressSources::new().with_habit("habit-91", "Evening Run", 4);
    let eval = evaluate(&catalog, &with_runner, &EconomyState::default(), at(1, 9), &curve);
    assert_eq!(eval.unlocks.len(), 1);

    let without = ProgressSources::new().with_habit("habit-12", "Read", 40);
    let eval = evaluate(&catalog, &without, &EconomyState::default(), at(1, 9), &curve);
    assert!(eval.unlocks.is_empty());
}

#[test]
fn clock_override_always_wins() {
    let clock = Clock::fixed(at(9, 3));
    assert!(clock.is_overridden());
    // 03:00 with a 04:00 day start belongs to the 8th
    assert_eq!(clock.logical_today(4), day(8));
    assert_eq!(clock.logical_today(0), day(9));
}
