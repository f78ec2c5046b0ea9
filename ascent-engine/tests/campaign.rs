use ascent_engine::{
    Clock, Declined, DifficultyMode, EngineConfig, EngineEvent, ProgressSources,
    ProgressionSession, StreakOutcome,
};
use chrono::{NaiveDate, TimeDelta};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

const CAMPAIGN_DAYS: u32 = 180;

fn start_session() -> ProgressionSession {
    let start = NaiveDate::from_ymd_opt(2025, 3, 1)
        .and_then(|date| date.and_hms_opt(10, 0, 0))
        .unwrap();
    ProgressionSession::onboard(
        DifficultyMode::Standard,
        EngineConfig::default(),
        Clock::fixed(start),
    )
}

struct CampaignLog {
    rollovers: u32,
    unlocks: u32,
    level_ups: u32,
}

fn run_campaign(seed: u64) -> (ProgressionSession, CampaignLog) {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut session = start_session();
    let mut log = CampaignLog {
        rollovers: 0,
        unlocks: 0,
        level_ups: 0,
    };
    let mut run_streak = 0_u32;

    for day in 0..CAMPAIGN_DAYS {
        let sessions = rng.gen_range(0..4);
        for _ in 0..sessions {
            let xp = rng.gen_range(50..400);
            let gold = rng.gen_range(0..30);
            session.record_activity(xp, gold);
        }
        if rng.gen_bool(0.05) {
            session.record_activity(-rng.gen_range(10..120), 0);
        }
        if session.state().shields == 0 && session.state().gold > 400 {
            let _ = session.purchase_shield();
        }
        if day % 30 == 29 {
            match session.redeem_honor() {
                Ok(_) | Err(Declined::NothingToRedeem | Declined::InsufficientGold { .. }) => {}
                Err(other) => panic!("unexpected decline {other}"),
            }
        }
        if day == 60 {
            session.set_pending_mode(DifficultyMode::Intense);
        }
        if rng.gen_bool(0.8) {
            run_streak += 1;
        }
        session.update_sources(
            ProgressSources::new()
                .with_habit("habit-run", "Morning Run", run_streak)
                .with_stat("willpower", f64::from(day / 4))
                .with_skill("writing", "Writing", day / 9),
        );

        session.advance_clock(TimeDelta::days(1));

        for event in session.drain_events() {
            match event {
                EngineEvent::Rollover(_) => log.rollovers += 1,
                EngineEvent::BadgeUnlocked(_) => log.unlocks += 1,
                EngineEvent::LevelUp { levels_gained, .. } => log.level_ups += levels_gained,
            }
        }
        assert_invariants(&session);
    }
    (session, log)
}

fn assert_invariants(session: &ProgressionSession) {
    let state = session.state();
    let cfg = session.config();
    assert!(state.shields <= cfg.streak.shield_cap());
    assert!(state.level >= 1);
    assert!(state.current_xp < state.target_xp);
    assert_eq!(state.target_xp, cfg.xp_curve.target_xp(state.level));
    assert_eq!(state.honor, state.honor_daily_log.average());
    assert!(state.best_streak >= state.streak);
    assert_eq!(state.daily_xp, 0, "daily xp resets at every rollover");
    assert_eq!(state.last_processed_date, Some(session.today()));
    for (badge, tier) in &state.badge_tiers {
        let history = &state.badge_history[badge];
        assert_eq!(history.keys().max(), Some(tier));
        assert!(state.badges.contains(badge));
    }
}

#[test]
fn seeded_campaign_holds_invariants() {
    let (session, log) = run_campaign(0x5EED_A5C3);
    let state = session.state();
    assert_eq!(log.rollovers, CAMPAIGN_DAYS);
    assert_eq!(state.streak_history.len(), CAMPAIGN_DAYS as usize);
    assert_eq!(state.honor_daily_log.len(), CAMPAIGN_DAYS as usize);
    assert_eq!(state.current_mode, DifficultyMode::Intense);
    assert!(log.unlocks > 0, "a long campaign unlocks at least one badge");
    assert!(log.level_ups + 1 >= state.level);
    let unlocked_tiers: usize = state.badge_history.values().map(|tiers| tiers.len()).sum();
    assert_eq!(unlocked_tiers, log.unlocks as usize);
}

#[test]
fn campaign_is_deterministic_per_seed() {
    let (left, left_log) = run_campaign(42);
    let (right, right_log) = run_campaign(42);
    assert_eq!(left.state().streak_history, right.state().streak_history);
    assert_eq!(left.state().gold, right.state().gold);
    assert_eq!(left.state().badge_tiers, right.state().badge_tiers);
    assert_eq!(left_log.unlocks, right_log.unlocks);
}

#[test]
fn streak_history_matches_streak_movement() {
    let (session, _) = run_campaign(7);
    let state = session.state();
    let ladder = &session.config().streak;
    let mut streak = 0_u32;
    for outcome in state.streak_history.values() {
        streak = match outcome {
            StreakOutcome::Success => streak + 1,
            StreakOutcome::Shield => streak,
            StreakOutcome::Fail => ladder.fall_value(streak),
        };
    }
    assert_eq!(streak, state.streak);
}
