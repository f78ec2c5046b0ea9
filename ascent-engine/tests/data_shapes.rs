use std::collections::BTreeMap;
use std::hash::Hasher;

use ascent_engine::{
    BadgeCatalog, DifficultyMode, EconomyState, EngineConfig, EngineEvent, LogicalDay,
    PersistedEnvelope, RolloverSummary, SkillSelector, StreakOutcome, Tier, Trigger,
    builtin_catalog, load_state,
};
use serde_json::{Map, Value, json};
use twox_hash::XxHash64;

fn snapshot_hash(bytes: &[u8]) -> u64 {
    let mut hasher = XxHash64::with_seed(0);
    hasher.write(bytes);
    hasher.finish()
}

fn canonicalize_value(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let sorted: BTreeMap<String, Value> = map
                .into_iter()
                .map(|(key, value)| (key, canonicalize_value(value)))
                .collect();
            Value::Object(sorted.into_iter().collect::<Map<String, Value>>())
        }
        Value::Array(items) => Value::Array(items.into_iter().map(canonicalize_value).collect()),
        other => other,
    }
}

fn canonical_text(state: &EconomyState) -> String {
    let value = serde_json::to_value(PersistedEnvelope::wrap(state)).unwrap();
    serde_json::to_string_pretty(&canonicalize_value(value)).unwrap()
}

fn sample_state() -> EconomyState {
    let cfg = EngineConfig::default();
    let day = LogicalDay::from_ymd(2025, 5, 4).unwrap();
    let mut state = EconomyState::onboard(day, DifficultyMode::Extreme, &cfg);
    state.gold = 880;
    state.streak = 21;
    state.best_streak = 34;
    state.shields = 2;
    state.honor_daily_log.record_day(day.previous(), 64);
    state.sync_honor();
    state.streak_history.insert(day.previous(), StreakOutcome::Shield);
    state.badges.push("survivor".into());
    state.badge_tiers.insert("survivor".into(), Tier::Gold);
    state.badge_history.insert(
        "survivor".into(),
        BTreeMap::from([
            (Tier::Silver, "20250401T080000-0000000000000001".to_string()),
            (Tier::Gold, "20250420T080000-0000000000000002".to_string()),
        ]),
    );
    state.add_item("redemption_token", 1);
    state
}

#[test]
fn builtin_catalog_covers_every_trigger_kind() {
    let catalog = builtin_catalog();
    let mut kinds: Vec<&str> = catalog.iter().map(|badge| badge.trigger.kind()).collect();
    kinds.sort_unstable();
    kinds.dedup();
    assert_eq!(kinds, vec!["habit", "manual", "metric", "raid", "skill", "stat"]);

    for badge in catalog {
        assert!(!badge.levels.is_empty(), "{} has no levels", badge.id);
        assert!(
            badge
                .levels
                .windows(2)
                .all(|pair| pair[0].tier < pair[1].tier && pair[0].target < pair[1].target),
            "{} levels are not ascending",
            badge.id
        );
    }
}

#[test]
fn builtin_metric_badges_point_at_economy_keys() {
    let economy = EconomyState::default().metrics_snapshot();
    for badge in builtin_catalog() {
        if let Trigger::Metric { path } = &badge.trigger {
            let key = path
                .strip_prefix("economy.")
                .unwrap_or_else(|| panic!("{} reads outside economy", badge.id));
            assert!(economy.get(key).is_some(), "{} reads unknown {key}", badge.id);
        }
    }
}

#[test]
fn catalog_accepts_wrapped_documents_and_sentinel_skill() {
    let catalog = BadgeCatalog::from_json(
        &json!({
            "badges": [{
                "id": "renaissance",
                "triggerType": "SKILL",
                "metricKey": "ANY",
                "levels": [{ "tier": "silver", "target": 3, "quote": "", "rewards": { "xp": 1, "gold": 1 } }]
            }]
        })
        .to_string(),
    )
    .unwrap();
    assert_eq!(
        catalog.get("renaissance").map(|badge| &badge.trigger),
        Some(&Trigger::Skill {
            selector: SkillSelector::Any
        })
    );
}

#[test]
fn persisted_envelope_layout() {
    let envelope = PersistedEnvelope::wrap(&sample_state());
    let value = serde_json::to_value(&envelope).unwrap();
    assert_eq!(value["version"], 2);
    let state = &value["state"];
    assert_eq!(state["current_mode"], "extreme");
    assert_eq!(state["honor_daily_log"]["2025-05-03"], 64);
    assert_eq!(state["streak_history"]["2025-05-03"], "shield");
    assert_eq!(state["badge_tiers"]["survivor"], "gold");
    assert!(state["badge_history"]["survivor"]["silver"].is_string());
    assert_eq!(state["last_processed_date"], "2025-05-04");
    assert_eq!(state["inventory"]["redemption_token"], 1);
    assert_eq!(PersistedEnvelope::STORAGE_KEY, "ascent.economy.v2");
}

#[test]
fn persisted_state_snapshot_is_stable() {
    let first = canonical_text(&sample_state());
    let second = canonical_text(&sample_state());
    assert_eq!(snapshot_hash(first.as_bytes()), snapshot_hash(second.as_bytes()));

    let mut changed = sample_state();
    changed.gold += 1;
    let changed = canonical_text(&changed);
    assert_ne!(snapshot_hash(first.as_bytes()), snapshot_hash(changed.as_bytes()));
}

#[test]
fn saved_state_reloads_unchanged() {
    let state = sample_state();
    let payload = PersistedEnvelope::wrap(&state).to_json().unwrap();
    let outcome = load_state(&payload, &EngineConfig::default());
    assert!(outcome.diagnostics.is_empty(), "{:?}", outcome.diagnostics);
    assert_eq!(outcome.state, state);
}

#[test]
fn event_wire_format() {
    let summary = RolloverSummary {
        day: LogicalDay::from_ymd(2025, 5, 3).unwrap(),
        streak_outcome: StreakOutcome::Success,
        new_streak: 9,
        honor_delta: 2,
        salary_paid: 45,
        forced: false,
    };
    let value = serde_json::to_value(EngineEvent::Rollover(summary)).unwrap();
    assert_eq!(value["type"], "rollover");
    assert_eq!(value["day"], "2025-05-03");
    assert_eq!(value["streak_outcome"], "success");

    let level_up = serde_json::to_value(EngineEvent::LevelUp {
        levels_gained: 2,
        new_level: 7,
    })
    .unwrap();
    assert_eq!(level_up, json!({ "type": "level_up", "levels_gained": 2, "new_level": 7 }));
}
