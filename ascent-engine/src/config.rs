//! Tunable policy parameters for the progression engine.
//!
//! Every field carries a serde default so partial JSON overrides are accepted.
//! `validate` enforces the qualitative properties the rules depend on.
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::constants::{
    CASUAL_DAILY_TARGET, CASUAL_SALARY_RATE, DAY_START_HOUR_MAX, DEFAULT_DAY_START_HOUR,
    EXTREME_DAILY_TARGET, EXTREME_SALARY_RATE, INTENSE_DAILY_TARGET, INTENSE_SALARY_RATE,
    REDEMPTION_PRICE_GOLD, SALARY_STREAK_CAP, SHIELD_PRICE_GOLD, STANDARD_DAILY_TARGET,
    STANDARD_SALARY_RATE,
};
use crate::leveling::XpCurve;
use crate::state::DifficultyMode;
use crate::streak::StreakLadder;

/// Errors raised when engine configuration invariants are violated.
#[derive(Debug, Error, PartialEq)]
pub enum EngineConfigError {
    #[error("day_start_hour must be between 0 and {max} (got {value})")]
    DayStartHour { max: i32, value: i32 },
    #[error("xp curve base must be positive and finite (got {0})")]
    CurveBase(f64),
    #[error("xp curve exponent must be positive and finite (got {0})")]
    CurveExponent(f64),
    #[error("streak gates must be non-empty, positive, and strictly ascending")]
    StreakGates,
    #[error("shield cap must be at least 1")]
    ShieldCap,
    #[error("mode {mode} is missing from the mode table")]
    MissingMode { mode: DifficultyMode },
    #[error("mode {mode} daily target must be positive")]
    ZeroTarget { mode: DifficultyMode },
}

/// Daily target and salary rate for one difficulty preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModeSettings {
    pub daily_target: u64,
    pub salary_rate: u64,
}

/// Gold prices for purchasable safety resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceTable {
    #[serde(default = "PriceTable::default_shield")]
    pub shield: u64,
    #[serde(default = "PriceTable::default_redemption")]
    pub redemption: u64,
}

impl PriceTable {
    const fn default_shield() -> u64 {
        SHIELD_PRICE_GOLD
    }

    const fn default_redemption() -> u64 {
        REDEMPTION_PRICE_GOLD
    }
}

impl Default for PriceTable {
    fn default() -> Self {
        Self {
            shield: Self::default_shield(),
            redemption: Self::default_redemption(),
        }
    }
}

/// Complete engine policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default = "EngineConfig::default_day_start_hour")]
    pub day_start_hour: i32,
    #[serde(default)]
    pub xp_curve: XpCurve,
    #[serde(default)]
    pub streak: StreakLadder,
    #[serde(default = "EngineConfig::default_modes")]
    pub modes: BTreeMap<DifficultyMode, ModeSettings>,
    #[serde(default = "EngineConfig::default_salary_streak_cap")]
    pub salary_streak_cap: u32,
    #[serde(default)]
    pub prices: PriceTable,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            day_start_hour: Self::default_day_start_hour(),
            xp_curve: XpCurve::default(),
            streak: StreakLadder::default(),
            modes: Self::default_modes(),
            salary_streak_cap: Self::default_salary_streak_cap(),
            prices: PriceTable::default(),
        }
    }
}

impl EngineConfig {
    const fn default_day_start_hour() -> i32 {
        DEFAULT_DAY_START_HOUR
    }

    const fn default_salary_streak_cap() -> u32 {
        SALARY_STREAK_CAP
    }

    fn default_modes() -> BTreeMap<DifficultyMode, ModeSettings> {
        BTreeMap::from([
            (
                DifficultyMode::Casual,
                ModeSettings {
                    daily_target: CASUAL_DAILY_TARGET,
                    salary_rate: CASUAL_SALARY_RATE,
                },
            ),
            (
                DifficultyMode::Standard,
                ModeSettings {
                    daily_target: STANDARD_DAILY_TARGET,
                    salary_rate: STANDARD_SALARY_RATE,
                },
            ),
            (
                DifficultyMode::Intense,
                ModeSettings {
                    daily_target: INTENSE_DAILY_TARGET,
                    salary_rate: INTENSE_SALARY_RATE,
                },
            ),
            (
                DifficultyMode::Extreme,
                ModeSettings {
                    daily_target: EXTREME_DAILY_TARGET,
                    salary_rate: EXTREME_SALARY_RATE,
                },
            ),
        ])
    }

    #[must_use]
    pub fn default_config() -> Self {
        Self::default()
    }

    /// Parse a configuration override from JSON and validate it.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or violates a config invariant.
    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        let cfg: Self = serde_json::from_str(json)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Settings for a mode, falling back to the built-in table if the mode was removed.
    #[must_use]
    pub fn mode(&self, mode: DifficultyMode) -> ModeSettings {
        self.modes
            .get(&mode)
            .copied()
            .or_else(|| Self::default_modes().get(&mode).copied())
            .unwrap_or(ModeSettings {
                daily_target: STANDARD_DAILY_TARGET,
                salary_rate: STANDARD_SALARY_RATE,
            })
    }

    #[must_use]
    pub fn daily_target(&self, mode: DifficultyMode) -> u64 {
        self.mode(mode).daily_target
    }

    /// Gold paid at rollover for the given mode and post-rollover streak.
    #[must_use]
    pub fn salary(&self, mode: DifficultyMode, streak: u32) -> u64 {
        let days = u64::from(streak.min(self.salary_streak_cap));
        self.mode(mode).salary_rate.saturating_mul(days)
    }

    /// Check the configuration invariants.
    ///
    /// # Errors
    ///
    /// Returns the first violated invariant.
    pub fn validate(&self) -> Result<(), EngineConfigError> {
        if !(0..=DAY_START_HOUR_MAX).contains(&self.day_start_hour) {
            return Err(EngineConfigError::DayStartHour {
                max: DAY_START_HOUR_MAX,
                value: self.day_start_hour,
            });
        }
        if !self.xp_curve.base.is_finite() || self.xp_curve.base <= 0.0 {
            return Err(EngineConfigError::CurveBase(self.xp_curve.base));
        }
        if !self.xp_curve.exponent.is_finite() || self.xp_curve.exponent <= 0.0 {
            return Err(EngineConfigError::CurveExponent(self.xp_curve.exponent));
        }
        if self.streak.gates().is_empty() || !self.streak.is_strictly_ascending() {
            return Err(EngineConfigError::StreakGates);
        }
        if self.streak.shield_cap() == 0 {
            return Err(EngineConfigError::ShieldCap);
        }
        for mode in DifficultyMode::ALL {
            match self.modes.get(mode) {
                None => return Err(EngineConfigError::MissingMode { mode: *mode }),
                Some(settings) if settings.daily_target == 0 => {
                    return Err(EngineConfigError::ZeroTarget { mode: *mode });
                }
                Some(_) => {}
            }
        }
        Ok(())
    }
}
