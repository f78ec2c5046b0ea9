//! Experience and level ladder.
use serde::{Deserialize, Serialize};

use crate::constants::{MIN_LEVEL, XP_CURVE_BASE, XP_CURVE_EXPONENT};
use crate::numbers::round_f64_to_u64;

/// Polynomial growth curve: `target_xp(level) = round(base * level^exponent)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct XpCurve {
    #[serde(default = "XpCurve::default_base")]
    pub base: f64,
    #[serde(default = "XpCurve::default_exponent")]
    pub exponent: f64,
}

impl XpCurve {
    const fn default_base() -> f64 {
        XP_CURVE_BASE
    }

    const fn default_exponent() -> f64 {
        XP_CURVE_EXPONENT
    }

    /// XP needed to clear `level`. Always at least 1 so the ladder terminates.
    #[must_use]
    pub fn target_xp(&self, level: u32) -> u64 {
        let level = f64::from(level.max(MIN_LEVEL));
        round_f64_to_u64(self.base * level.powf(self.exponent)).max(1)
    }
}

impl Default for XpCurve {
    fn default() -> Self {
        Self {
            base: Self::default_base(),
            exponent: Self::default_exponent(),
        }
    }
}

/// Position on the ladder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct XpProgress {
    pub level: u32,
    pub current_xp: u64,
    pub target_xp: u64,
}

impl XpProgress {
    #[must_use]
    pub fn starting(curve: &XpCurve) -> Self {
        Self {
            level: MIN_LEVEL,
            current_xp: 0,
            target_xp: curve.target_xp(MIN_LEVEL),
        }
    }
}

/// Result of applying an XP delta.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct XpOutcome {
    pub progress: XpProgress,
    pub levels_gained: u32,
}

/// Apply a signed XP delta, carrying overflow through as many levels as it covers.
///
/// Penalties floor `current_xp` at zero and never lower the level.
#[must_use]
pub fn apply_xp(progress: XpProgress, delta: i64, curve: &XpCurve) -> XpOutcome {
    let mut level = progress.level.max(MIN_LEVEL);
    let mut target_xp = curve.target_xp(level);
    let mut current_xp = if delta >= 0 {
        progress.current_xp.saturating_add(delta.unsigned_abs())
    } else {
        progress.current_xp.saturating_sub(delta.unsigned_abs())
    };

    let mut levels_gained = 0_u32;
    while current_xp >= target_xp && level < u32::MAX {
        current_xp -= target_xp;
        level += 1;
        levels_gained += 1;
        target_xp = curve.target_xp(level);
    }

    XpOutcome {
        progress: XpProgress {
            level,
            current_xp,
            target_xp,
        },
        levels_gained,
    }
}
