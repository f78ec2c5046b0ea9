//! Centralized balance and tuning constants for Ascent progression rules.
//!
//! These are the defaults behind `EngineConfig`; deployments override them
//! through configuration.

// Logging keys -------------------------------------------------------------
pub(crate) const LOG_ROLLOVER_COMMITTED: &str = "log.rollover.committed";
pub(crate) const LOG_ROLLOVER_FORCED: &str = "log.rollover.forced";
pub(crate) const LOG_BADGE_SKIPPED: &str = "log.badge.skipped";
pub(crate) const LOG_BADGE_UNLOCKED: &str = "log.badge.unlocked";
pub(crate) const LOG_STATE_MIGRATED: &str = "log.state.migrated";
pub(crate) const LOG_STATE_CORRUPT: &str = "log.state.corrupt";

// Day boundary -------------------------------------------------------------
pub(crate) const DEFAULT_DAY_START_HOUR: i32 = 4;
pub(crate) const DAY_START_HOUR_MAX: i32 = 23;

// Level ladder -------------------------------------------------------------
pub(crate) const XP_CURVE_BASE: f64 = 100.0;
pub(crate) const XP_CURVE_EXPONENT: f64 = 1.5;
pub(crate) const MIN_LEVEL: u32 = 1;

// Streak ladder ------------------------------------------------------------
pub(crate) const STREAK_GATES: [u32; 13] = [1, 2, 3, 5, 8, 13, 21, 34, 55, 89, 144, 233, 377];
pub(crate) const SHIELD_CAP: u8 = 3;
pub(crate) const SHIELD_PRICE_GOLD: u64 = 150;

// Honor ledger -------------------------------------------------------------
pub(crate) const HONOR_MAX: u8 = 100;
pub(crate) const HONOR_EMPTY_AVERAGE: u8 = 100;
pub(crate) const REDEMPTION_PRICE_GOLD: u64 = 400;
pub(crate) const REDEMPTION_TOKEN_ITEM: &str = "redemption_token";

// Difficulty modes ---------------------------------------------------------
pub(crate) const CASUAL_DAILY_TARGET: u64 = 250;
pub(crate) const STANDARD_DAILY_TARGET: u64 = 500;
pub(crate) const INTENSE_DAILY_TARGET: u64 = 900;
pub(crate) const EXTREME_DAILY_TARGET: u64 = 1_500;

pub(crate) const CASUAL_SALARY_RATE: u64 = 1;
pub(crate) const STANDARD_SALARY_RATE: u64 = 2;
pub(crate) const INTENSE_SALARY_RATE: u64 = 3;
pub(crate) const EXTREME_SALARY_RATE: u64 = 5;
pub(crate) const SALARY_STREAK_CAP: u32 = 30;

// Achievement engine -------------------------------------------------------
pub(crate) const SKILL_ANY_SENTINEL: &str = "any";

// Audit trail --------------------------------------------------------------
pub(crate) const AUDIT_LOG_CAPACITY: usize = 200;

// Persistence --------------------------------------------------------------
pub(crate) const STATE_STORAGE_KEY: &str = "ascent.economy.v2";
pub(crate) const STATE_SCHEMA_VERSION: u32 = 2;

#[cfg(test)]
pub(crate) const FLOAT_EPSILON: f64 = 1e-9;
