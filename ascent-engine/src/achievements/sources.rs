//! Read-only value bundle that badge triggers resolve against.
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use super::catalog::{SkillSelector, Trigger};
use crate::numbers::finite_or_zero;
use crate::state::EconomyState;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillSnapshot {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub level: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HabitSnapshot {
    pub id: String,
    #[serde(default)]
    pub title: String,
    pub streak: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RaidSnapshot {
    pub id: String,
    #[serde(default)]
    pub title: String,
    /// Completion in `0..=100`.
    pub completion_percent: f64,
}

/// Everything a trigger may read. Entities supplied by collaborators may be
/// missing or renamed; every lookup degrades to zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgressSources {
    pub stats: BTreeMap<String, f64>,
    pub metrics: Value,
    pub skills: Vec<SkillSnapshot>,
    pub habits: Vec<HabitSnapshot>,
    pub raids: Vec<RaidSnapshot>,
}

impl Default for ProgressSources {
    fn default() -> Self {
        Self {
            stats: BTreeMap::new(),
            metrics: Value::Object(Map::new()),
            skills: Vec::new(),
            habits: Vec::new(),
            raids: Vec::new(),
        }
    }
}

impl ProgressSources {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_stat(mut self, name: impl Into<String>, value: f64) -> Self {
        self.stats.insert(name.into(), value);
        self
    }

    /// Set a top-level metrics entry. Nested objects are addressed with dotted paths.
    #[must_use]
    pub fn with_metric(mut self, key: impl Into<String>, value: Value) -> Self {
        if !self.metrics.is_object() {
            self.metrics = Value::Object(Map::new());
        }
        if let Value::Object(map) = &mut self.metrics {
            map.insert(key.into(), value);
        }
        self
    }

    #[must_use]
    pub fn with_skill(mut self, id: impl Into<String>, name: impl Into<String>, level: u32) -> Self {
        self.skills.push(SkillSnapshot {
            id: id.into(),
            name: name.into(),
            level,
        });
        self
    }

    #[must_use]
    pub fn with_habit(mut self, id: impl Into<String>, title: impl Into<String>, streak: u32) -> Self {
        self.habits.push(HabitSnapshot {
            id: id.into(),
            title: title.into(),
            streak,
        });
        self
    }

    #[must_use]
    pub fn with_raid(
        mut self,
        id: impl Into<String>,
        title: impl Into<String>,
        completion_percent: f64,
    ) -> Self {
        self.raids.push(RaidSnapshot {
            id: id.into(),
            title: title.into(),
            completion_percent,
        });
        self
    }

    /// Refresh the `economy` metrics entry from the live state.
    #[must_use]
    pub fn with_economy(self, state: &EconomyState) -> Self {
        self.with_metric("economy", state.metrics_snapshot())
    }

    /// Current value for a trigger. Manual badges always read zero.
    #[must_use]
    pub fn resolve(&self, trigger: &Trigger) -> f64 {
        let value = match trigger {
            Trigger::Metric { path } => self.resolve_metric(path),
            Trigger::Stat { name } => self.resolve_stat(name),
            Trigger::Skill { selector } => self.resolve_skill(selector),
            Trigger::Habit { key } => self.resolve_habit(key),
            Trigger::Raid { key } => self.resolve_raid(key),
            Trigger::Manual => 0.0,
        };
        finite_or_zero(value)
    }

    fn resolve_metric(&self, path: &str) -> f64 {
        let mut cursor = &self.metrics;
        for segment in path.split('.').filter(|segment| !segment.is_empty()) {
            match cursor.get(segment) {
                Some(next) => cursor = next,
                None => return 0.0,
            }
        }
        match cursor {
            Value::Number(number) => number.as_f64().unwrap_or(0.0),
            Value::String(text) => text.trim().parse().unwrap_or(0.0),
            Value::Bool(flag) => f64::from(u8::from(*flag)),
            _ => 0.0,
        }
    }

    fn resolve_stat(&self, name: &str) -> f64 {
        self.stats
            .get(name)
            .or_else(|| {
                self.stats
                    .iter()
                    .find(|(key, _)| key.eq_ignore_ascii_case(name))
                    .map(|(_, value)| value)
            })
            .copied()
            .unwrap_or(0.0)
    }

    fn resolve_skill(&self, selector: &SkillSelector) -> f64 {
        let level = match selector {
            SkillSelector::Any => self.skills.iter().map(|skill| skill.level).max(),
            SkillSelector::Id(id) => self
                .skills
                .iter()
                .find(|skill| skill.id == *id)
                .map(|skill| skill.level),
        };
        f64::from(level.unwrap_or(0))
    }

    fn resolve_habit(&self, key: &str) -> f64 {
        find_entity(&self.habits, key, |habit| (&habit.id, &habit.title))
            .map_or(0.0, |habit| f64::from(habit.streak))
    }

    fn resolve_raid(&self, key: &str) -> f64 {
        find_entity(&self.raids, key, |raid| (&raid.id, &raid.title))
            .map_or(0.0, |raid| raid.completion_percent)
    }
}

/// Exact id match first, then the first case-insensitive title substring match.
fn find_entity<'a, T>(
    entities: &'a [T],
    key: &str,
    fields: impl Fn(&T) -> (&String, &String),
) -> Option<&'a T> {
    if key.is_empty() {
        return None;
    }
    entities
        .iter()
        .find(|entity| fields(entity).0 == key)
        .or_else(|| {
            let needle = key.to_lowercase();
            entities
                .iter()
                .find(|entity| fields(entity).1.to_lowercase().contains(&needle))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn metric_paths_resolve_with_zero_fallback() {
        let sources = ProgressSources::new()
            .with_metric("tasks", json!({ "completed": 42, "label": "12.5", "nested": { "ok": true } }));
        let metric = |path: &str| sources.resolve(&Trigger::Metric { path: path.into() });
        assert_eq!(metric("tasks.completed"), 42.0);
        assert_eq!(metric("tasks.label"), 12.5);
        assert_eq!(metric("tasks.nested.ok"), 1.0);
        assert_eq!(metric("tasks.missing"), 0.0);
        assert_eq!(metric("tasks.nested"), 0.0);
        assert_eq!(metric("nowhere.at.all"), 0.0);
    }

    #[test]
    fn stats_fall_back_to_case_insensitive_name() {
        let sources = ProgressSources::new().with_stat("Willpower", 12.0);
        assert_eq!(sources.resolve(&Trigger::Stat { name: "willpower".into() }), 12.0);
        assert_eq!(sources.resolve(&Trigger::Stat { name: "charisma".into() }), 0.0);
    }

    #[test]
    fn skill_any_takes_maximum() {
        let sources = ProgressSources::new()
            .with_skill("cooking", "Cooking", 4)
            .with_skill("rust", "Rust", 11);
        let any = Trigger::Skill {
            selector: SkillSelector::Any,
        };
        let one = Trigger::Skill {
            selector: SkillSelector::Id("cooking".into()),
        };
        let missing = Trigger::Skill {
            selector: SkillSelector::Id("juggling".into()),
        };
        assert_eq!(sources.resolve(&any), 11.0);
        assert_eq!(sources.resolve(&one), 4.0);
        assert_eq!(sources.resolve(&missing), 0.0);
        assert_eq!(ProgressSources::new().resolve(&any), 0.0);
    }

    #[test]
    fn habit_matches_title_substring_when_id_differs() {
        let sources = ProgressSources::new()
            .with_habit("h-1", "Meditate", 3)
            .with_habit("h-2", "Morning Run", 9);
        assert_eq!(sources.resolve(&Trigger::Habit { key: "Run".into() }), 9.0);
        assert_eq!(sources.resolve(&Trigger::Habit { key: "h-1".into() }), 3.0);
        assert_eq!(sources.resolve(&Trigger::Habit { key: "Swim".into() }), 0.0);
    }

    #[test]
    fn exact_id_beats_title_match() {
        let sources = ProgressSources::new()
            .with_raid("spring", "Spring Cleaning", 40.0)
            .with_raid("other", "spring", 90.0);
        assert_eq!(sources.resolve(&Trigger::Raid { key: "spring".into() }), 40.0);
        assert_eq!(sources.resolve(&Trigger::Raid { key: "CLEANING".into() }), 40.0);
    }

    #[test]
    fn manual_and_non_finite_read_zero() {
        let sources = ProgressSources::new().with_stat("broken", f64::NAN);
        assert_eq!(sources.resolve(&Trigger::Manual), 0.0);
        assert_eq!(sources.resolve(&Trigger::Stat { name: "broken".into() }), 0.0);
    }

    #[test]
    fn economy_snapshot_is_addressable() {
        let mut state = EconomyState::default();
        state.streak = 7;
        let sources = ProgressSources::new().with_economy(&state);
        assert_eq!(
            sources.resolve(&Trigger::Metric {
                path: "economy.streak".into()
            }),
            7.0
        );
    }
}
