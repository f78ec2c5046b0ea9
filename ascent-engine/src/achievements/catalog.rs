//! Badge catalog: raw JSON schema, validation, and merging.
use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use smallvec::SmallVec;
use std::sync::OnceLock;
use thiserror::Error;

use super::Tier;
use crate::constants::{LOG_BADGE_SKIPPED, SKILL_ANY_SENTINEL};

const DEFAULT_BADGES_DATA: &str = include_str!("../../assets/badges.json");

/// Rewards paid once when a tier unlocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Reward {
    #[serde(default)]
    pub xp: u64,
    #[serde(default)]
    pub gold: u64,
}

/// Badge definition exactly as it appears in a catalog document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawBadgeDefinition {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    pub trigger_type: String,
    #[serde(default)]
    pub metric_key: Option<String>,
    #[serde(default)]
    pub levels: Option<Vec<RawBadgeLevel>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawBadgeLevel {
    pub tier: String,
    pub target: f64,
    #[serde(default)]
    pub quote: String,
    #[serde(default)]
    pub rewards: Reward,
}

/// Which skill a skill-triggered badge watches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SkillSelector {
    /// Highest level across every skill.
    Any,
    Id(String),
}

/// How a badge's current value is sourced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Trigger {
    Metric { path: String },
    Stat { name: String },
    Skill { selector: SkillSelector },
    Habit { key: String },
    Raid { key: String },
    Manual,
}

impl Trigger {
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Metric { .. } => "metric",
            Self::Stat { .. } => "stat",
            Self::Skill { .. } => "skill",
            Self::Habit { .. } => "habit",
            Self::Raid { .. } => "raid",
            Self::Manual => "manual",
        }
    }

    #[must_use]
    pub const fn is_manual(&self) -> bool {
        matches!(self, Self::Manual)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BadgeLevel {
    pub tier: Tier,
    pub target: f64,
    pub quote: String,
    pub reward: Reward,
}

/// Validated catalog entry. Levels are in ascending tier order with strictly
/// increasing targets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BadgeDefinition {
    pub id: String,
    pub name: String,
    pub icon: String,
    pub description: String,
    pub category: String,
    pub trigger: Trigger,
    pub levels: SmallVec<[BadgeLevel; 4]>,
}

impl BadgeDefinition {
    #[must_use]
    pub fn level(&self, tier: Tier) -> Option<&BadgeLevel> {
        self.levels.iter().find(|level| level.tier == tier)
    }
}

/// Reasons a catalog entry is rejected.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("catalog document is not valid JSON: {0}")]
    Document(#[from] serde_json::Error),
    #[error("catalog document must be an array of badges or an object with a `badges` array")]
    Shape,
    #[error("catalog entry {index} is malformed: {source}")]
    Entry {
        index: usize,
        #[source]
        source: serde_json::Error,
    },
    #[error("badge has an empty id")]
    EmptyId,
    #[error("badge {badge} has no levels")]
    MissingLevels { badge: String },
    #[error("badge {badge} has unknown trigger type `{trigger}`")]
    UnknownTrigger { badge: String, trigger: String },
    #[error("badge {badge} with trigger `{trigger}` needs a metricKey")]
    MissingMetricKey { badge: String, trigger: String },
    #[error("badge {badge} has unknown tier `{tier}`")]
    UnknownTier { badge: String, tier: String },
    #[error("badge {badge} lists tiers out of order")]
    TiersOutOfOrder { badge: String },
    #[error("badge {badge} target {target} is not finite and non-negative")]
    InvalidTarget { badge: String, target: f64 },
    #[error("badge {badge} target {target} does not exceed previous target {previous}")]
    NonIncreasingTargets {
        badge: String,
        previous: f64,
        target: f64,
    },
}

fn required_key(raw: &RawBadgeDefinition) -> Result<String, CatalogError> {
    raw.metric_key
        .as_deref()
        .map(str::trim)
        .filter(|key| !key.is_empty())
        .map(str::to_string)
        .ok_or_else(|| CatalogError::MissingMetricKey {
            badge: raw.id.clone(),
            trigger: raw.trigger_type.clone(),
        })
}

fn parse_trigger(raw: &RawBadgeDefinition) -> Result<Trigger, CatalogError> {
    match raw.trigger_type.trim().to_ascii_lowercase().as_str() {
        "metric" => Ok(Trigger::Metric {
            path: required_key(raw)?,
        }),
        "stat" => Ok(Trigger::Stat {
            name: required_key(raw)?,
        }),
        "skill" => {
            let key = required_key(raw)?;
            let selector = if key.eq_ignore_ascii_case(SKILL_ANY_SENTINEL) {
                SkillSelector::Any
            } else {
                SkillSelector::Id(key)
            };
            Ok(Trigger::Skill { selector })
        }
        "habit" => Ok(Trigger::Habit {
            key: required_key(raw)?,
        }),
        "raid" => Ok(Trigger::Raid {
            key: required_key(raw)?,
        }),
        "manual" => Ok(Trigger::Manual),
        _ => Err(CatalogError::UnknownTrigger {
            badge: raw.id.clone(),
            trigger: raw.trigger_type.clone(),
        }),
    }
}

fn parse_levels(
    badge: &str,
    raw_levels: &[RawBadgeLevel],
) -> Result<SmallVec<[BadgeLevel; 4]>, CatalogError> {
    if raw_levels.is_empty() {
        return Err(CatalogError::MissingLevels {
            badge: badge.to_string(),
        });
    }
    let mut levels: SmallVec<[BadgeLevel; 4]> = SmallVec::with_capacity(raw_levels.len());
    for raw in raw_levels {
        let tier: Tier = raw.tier.parse().map_err(|()| CatalogError::UnknownTier {
            badge: badge.to_string(),
            tier: raw.tier.clone(),
        })?;
        if !raw.target.is_finite() || raw.target < 0.0 {
            return Err(CatalogError::InvalidTarget {
                badge: badge.to_string(),
                target: raw.target,
            });
        }
        if let Some(previous) = levels.last() {
            if tier <= previous.tier {
                return Err(CatalogError::TiersOutOfOrder {
                    badge: badge.to_string(),
                });
            }
            if raw.target <= previous.target {
                return Err(CatalogError::NonIncreasingTargets {
                    badge: badge.to_string(),
                    previous: previous.target,
                    target: raw.target,
                });
            }
        }
        levels.push(BadgeLevel {
            tier,
            target: raw.target,
            quote: raw.quote.clone(),
            reward: raw.rewards,
        });
    }
    Ok(levels)
}

impl TryFrom<RawBadgeDefinition> for BadgeDefinition {
    type Error = CatalogError;

    fn try_from(raw: RawBadgeDefinition) -> Result<Self, Self::Error> {
        let id = raw.id.trim().to_string();
        if id.is_empty() {
            return Err(CatalogError::EmptyId);
        }
        let trigger = parse_trigger(&raw)?;
        let levels = parse_levels(&id, raw.levels.as_deref().unwrap_or_default())?;
        Ok(Self {
            name: if raw.name.is_empty() {
                id.clone()
            } else {
                raw.name
            },
            id,
            icon: raw.icon,
            description: raw.description,
            category: raw.category,
            trigger,
            levels,
        })
    }
}

/// Ordered set of validated badge definitions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BadgeCatalog {
    definitions: Vec<BadgeDefinition>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    diagnostics: Vec<String>,
}

impl BadgeCatalog {
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            definitions: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    /// Catalog shipped with the engine.
    #[must_use]
    pub fn load_from_static() -> Self {
        Self::from_json(DEFAULT_BADGES_DATA).unwrap_or_default()
    }

    /// Validate raw definitions, skipping (and logging) any that are malformed.
    /// Later duplicates of an id replace earlier ones.
    #[must_use]
    pub fn from_raw(raws: impl IntoIterator<Item = RawBadgeDefinition>) -> Self {
        let mut catalog = Self::empty();
        for raw in raws {
            match BadgeDefinition::try_from(raw) {
                Ok(definition) => catalog.upsert(definition),
                Err(err) => catalog.skip(&err),
            }
        }
        catalog
    }

    /// Parse a catalog document. Only an unreadable document is an error;
    /// individual bad entries are skipped with a diagnostic.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is not JSON or has the wrong shape.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let document: Value = serde_json::from_str(json)?;
        let entries = match document {
            Value::Array(entries) => entries,
            Value::Object(mut map) => match map.remove("badges") {
                Some(Value::Array(entries)) => entries,
                _ => return Err(CatalogError::Shape),
            },
            _ => return Err(CatalogError::Shape),
        };

        let mut catalog = Self::empty();
        for (index, entry) in entries.into_iter().enumerate() {
            let parsed = serde_json::from_value::<RawBadgeDefinition>(entry)
                .map_err(|source| CatalogError::Entry { index, source })
                .and_then(BadgeDefinition::try_from);
            match parsed {
                Ok(definition) => catalog.upsert(definition),
                Err(err) => catalog.skip(&err),
            }
        }
        Ok(catalog)
    }

    fn upsert(&mut self, definition: BadgeDefinition) {
        if let Some(existing) = self
            .definitions
            .iter_mut()
            .find(|existing| existing.id == definition.id)
        {
            *existing = definition;
        } else {
            self.definitions.push(definition);
        }
    }

    fn skip(&mut self, err: &CatalogError) {
        warn!("{LOG_BADGE_SKIPPED}: {err}");
        self.diagnostics.push(err.to_string());
    }

    /// Overlay `injected` on top of this catalog; injected ids win.
    #[must_use]
    pub fn merge(&self, injected: &Self) -> Self {
        let mut merged = self.clone();
        for definition in &injected.definitions {
            merged.upsert(definition.clone());
        }
        merged.diagnostics.extend(injected.diagnostics.iter().cloned());
        merged
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&BadgeDefinition> {
        self.definitions.iter().find(|definition| definition.id == id)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, BadgeDefinition> {
        self.definitions.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Messages for every entry skipped while building this catalog.
    #[must_use]
    pub fn diagnostics(&self) -> &[String] {
        &self.diagnostics
    }
}

impl<'a> IntoIterator for &'a BadgeCatalog {
    type Item = &'a BadgeDefinition;
    type IntoIter = std::slice::Iter<'a, BadgeDefinition>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Shared built-in catalog.
#[must_use]
pub fn builtin_catalog() -> &'static BadgeCatalog {
    static CATALOG: OnceLock<BadgeCatalog> = OnceLock::new();
    CATALOG.get_or_init(BadgeCatalog::load_from_static)
}
