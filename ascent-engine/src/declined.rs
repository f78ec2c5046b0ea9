//! Reason codes for operations the engine declines without changing state.
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::achievements::Tier;

/// A declined operation. Never fatal; the caller decides how to surface it.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "code", rename_all = "snake_case")]
pub enum Declined {
    #[error("shield cap of {cap} already reached")]
    ShieldCapReached { cap: u8 },
    #[error("no past honor entry below 100 to redeem")]
    NothingToRedeem,
    #[error("needs {needed} gold but only {available} available")]
    InsufficientGold { needed: u64, available: u64 },
    #[error("badge {badge} cannot unlock {tier} before {expected}")]
    TierOutOfOrder {
        badge: String,
        tier: Tier,
        expected: Tier,
    },
    #[error("badge {badge} already unlocked {tier}")]
    AlreadyUnlocked { badge: String, tier: Tier },
    #[error("badge {badge} has no {tier} level")]
    UnknownTier { badge: String, tier: Tier },
    #[error("badge {badge} is not in the catalog")]
    UnknownBadge { badge: String },
    #[error("badge {badge} is evaluated automatically and cannot be hand-awarded")]
    NotManual { badge: String },
    #[error("operator actions require a non-empty audit reason")]
    MissingReason,
}

impl Declined {
    /// Stable machine-readable code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::ShieldCapReached { .. } => "shield_cap_reached",
            Self::NothingToRedeem => "nothing_to_redeem",
            Self::InsufficientGold { .. } => "insufficient_gold",
            Self::TierOutOfOrder { .. } => "tier_out_of_order",
            Self::AlreadyUnlocked { .. } => "already_unlocked",
            Self::UnknownTier { .. } => "unknown_tier",
            Self::UnknownBadge { .. } => "unknown_badge",
            Self::NotManual { .. } => "not_manual",
            Self::MissingReason => "missing_reason",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_matches_serialized_tag() {
        let declined = Declined::ShieldCapReached { cap: 3 };
        let value = serde_json::to_value(&declined).unwrap();
        assert_eq!(value["code"], declined.code());
        assert_eq!(declined.to_string(), "shield cap of 3 already reached");
    }
}
