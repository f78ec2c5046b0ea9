//! Achievement engine: tiered badges resolved against live progress sources.
//!
//! `badge_history` is the only record of what has been paid. Evaluation walks
//! each badge's tiers in ascending order and unlocks every met tier that is not
//! in the history yet, stopping at the first unmet one, so repeated calls with
//! unchanged sources are no-ops.
pub mod catalog;
pub mod sources;

use chrono::NaiveDateTime;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::Hasher;
use std::str::FromStr;
use twox_hash::XxHash64;

pub use catalog::{
    BadgeCatalog, BadgeDefinition, BadgeLevel, CatalogError, RawBadgeDefinition, RawBadgeLevel,
    Reward, SkillSelector, Trigger, builtin_catalog,
};
pub use sources::{HabitSnapshot, ProgressSources, RaidSnapshot, SkillSnapshot};

use crate::constants::LOG_BADGE_UNLOCKED;
use crate::declined::Declined;
use crate::leveling::{XpCurve, apply_xp};
use crate::state::EconomyState;

/// Achievement rank within a badge, lowest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Silver,
    Gold,
    Diamond,
    Crimson,
}

impl Tier {
    pub const ALL: &'static [Self] = &[Self::Silver, Self::Gold, Self::Diamond, Self::Crimson];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Silver => "silver",
            Self::Gold => "gold",
            Self::Diamond => "diamond",
            Self::Crimson => "crimson",
        }
    }

    #[must_use]
    pub const fn next(self) -> Option<Self> {
        match self {
            Self::Silver => Some(Self::Gold),
            Self::Gold => Some(Self::Diamond),
            Self::Diamond => Some(Self::Crimson),
            Self::Crimson => None,
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tier {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "silver" => Ok(Self::Silver),
            "gold" => Ok(Self::Gold),
            "diamond" => Ok(Self::Diamond),
            "crimson" => Ok(Self::Crimson),
            _ => Err(()),
        }
    }
}

/// One tier newly unlocked and paid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnlockEvent {
    pub badge_id: String,
    pub badge_name: String,
    pub tier: Tier,
    pub reward: Reward,
    pub code: String,
}

/// Result of an evaluation pass: the new snapshot plus what happened.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub state: EconomyState,
    pub unlocks: Vec<UnlockEvent>,
    /// Levels crossed by reward XP, one level-up notice each.
    pub levels_gained: u32,
}

/// Display-side view of a badge. Derived on demand, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BadgeProgress {
    pub badge_id: String,
    pub current_value: f64,
    pub current_tier: Option<Tier>,
    pub is_unlocked: bool,
    pub next_level: Option<BadgeLevel>,
}

/// Unique, timestamped code stamped into `badge_history` for each unlock.
#[must_use]
pub fn unlock_code(badge_id: &str, tier: Tier, at: NaiveDateTime, nonce: u64) -> String {
    let mut hasher = XxHash64::with_seed(0);
    hasher.write(badge_id.as_bytes());
    hasher.write(tier.as_str().as_bytes());
    hasher.write_i64(at.and_utc().timestamp_micros());
    hasher.write_u64(nonce);
    format!("{}-{:016x}", at.format("%Y%m%dT%H%M%S"), hasher.finish())
}

fn paid_unlock_count(state: &EconomyState) -> u64 {
    state
        .badge_history
        .values()
        .map(|tiers| u64::try_from(tiers.len()).unwrap_or(u64::MAX))
        .fold(0, u64::saturating_add)
}

/// Record one tier and pay its reward. Returns the event and levels crossed.
fn unlock_tier(
    state: &mut EconomyState,
    definition: &BadgeDefinition,
    level: &BadgeLevel,
    at: NaiveDateTime,
    curve: &XpCurve,
) -> (UnlockEvent, u32) {
    let code = unlock_code(&definition.id, level.tier, at, paid_unlock_count(state));
    state
        .badge_history
        .entry(definition.id.clone())
        .or_default()
        .insert(level.tier, code.clone());
    let highest = state
        .badge_tiers
        .get(&definition.id)
        .copied()
        .map_or(level.tier, |current| current.max(level.tier));
    state.badge_tiers.insert(definition.id.clone(), highest);
    if !state.badges.contains(&definition.id) {
        state.badges.push(definition.id.clone());
    }

    let xp = i64::try_from(level.reward.xp).unwrap_or(i64::MAX);
    let outcome = apply_xp(state.xp_progress(), xp, curve);
    state.set_xp_progress(outcome.progress);
    state.total_xp_earned = state.total_xp_earned.saturating_add(level.reward.xp);
    state.gold = state.gold.saturating_add(level.reward.gold);

    info!(
        "{LOG_BADGE_UNLOCKED}: {} {} (+{} xp, +{} gold)",
        definition.id, level.tier, level.reward.xp, level.reward.gold
    );
    let event = UnlockEvent {
        badge_id: definition.id.clone(),
        badge_name: definition.name.clone(),
        tier: level.tier,
        reward: level.reward,
        code,
    };
    (event, outcome.levels_gained)
}

/// Resolve every automatic badge and unlock newly met tiers.
///
/// Manual badges are skipped; see [`award_manual`].
#[must_use]
pub fn evaluate(
    catalog: &BadgeCatalog,
    sources: &ProgressSources,
    state: &EconomyState,
    at: NaiveDateTime,
    curve: &XpCurve,
) -> Evaluation {
    let mut next = state.clone();
    let mut unlocks = Vec::new();
    let mut levels_gained = 0u32;

    for definition in catalog {
        if definition.trigger.is_manual() {
            continue;
        }
        let value = sources.resolve(&definition.trigger);
        debug!(
            "badge {} ({}) resolved to {value}",
            definition.id,
            definition.trigger.kind()
        );
        for level in &definition.levels {
            if next.has_tier(&definition.id, level.tier) {
                continue;
            }
            if value < level.target {
                break;
            }
            let (event, gained) = unlock_tier(&mut next, definition, level, at, curve);
            levels_gained = levels_gained.saturating_add(gained);
            unlocks.push(event);
        }
    }

    Evaluation {
        state: next,
        unlocks,
        levels_gained,
    }
}

/// Hand-award the next unpaid tier of a manual badge.
///
/// # Errors
///
/// Declines unknown badges or tiers, badges that are evaluated automatically,
/// tiers already paid, and tiers requested ahead of an unpaid lower tier.
pub fn award_manual(
    catalog: &BadgeCatalog,
    badge_id: &str,
    tier: Tier,
    state: &EconomyState,
    at: NaiveDateTime,
    curve: &XpCurve,
) -> Result<Evaluation, Declined> {
    let definition = catalog.get(badge_id).ok_or_else(|| Declined::UnknownBadge {
        badge: badge_id.to_string(),
    })?;
    if !definition.trigger.is_manual() {
        return Err(Declined::NotManual {
            badge: badge_id.to_string(),
        });
    }
    let level = definition.level(tier).ok_or_else(|| Declined::UnknownTier {
        badge: badge_id.to_string(),
        tier,
    })?;
    if state.has_tier(badge_id, tier) {
        return Err(Declined::AlreadyUnlocked {
            badge: badge_id.to_string(),
            tier,
        });
    }
    if let Some(expected) = definition
        .levels
        .iter()
        .map(|level| level.tier)
        .find(|candidate| !state.has_tier(badge_id, *candidate))
        && expected != tier
    {
        return Err(Declined::TierOutOfOrder {
            badge: badge_id.to_string(),
            tier,
            expected,
        });
    }

    let mut next = state.clone();
    let (event, levels_gained) = unlock_tier(&mut next, definition, level, at, curve);
    Ok(Evaluation {
        state: next,
        unlocks: vec![event],
        levels_gained,
    })
}

/// Current value and next goal for every badge in the catalog.
#[must_use]
pub fn badge_progress(
    catalog: &BadgeCatalog,
    sources: &ProgressSources,
    state: &EconomyState,
) -> Vec<BadgeProgress> {
    catalog
        .iter()
        .map(|definition| {
            let current_tier = state.highest_tier(&definition.id);
            BadgeProgress {
                badge_id: definition.id.clone(),
                current_value: sources.resolve(&definition.trigger),
                current_tier,
                is_unlocked: current_tier.is_some(),
                next_level: definition
                    .levels
                    .iter()
                    .find(|level| !state.has_tier(&definition.id, level.tier))
                    .cloned(),
            }
        })
        .collect()
}
