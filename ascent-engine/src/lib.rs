//! Ascent Progression Engine
//!
//! Platform-agnostic rules that turn completed activity into experience,
//! levels, a daily survival streak, an honor score and tiered achievements.
//! This crate holds no UI or platform code; hosts supply storage and the
//! external activity snapshot.

pub mod achievements;
pub mod config;
pub mod constants;
pub mod day;
pub mod declined;
pub mod honor;
pub mod leveling;
pub mod numbers;
pub mod persist;
pub mod rollover;
pub mod session;
pub mod state;
pub mod streak;

// Re-export commonly used types
pub use achievements::{
    BadgeCatalog, BadgeDefinition, BadgeLevel, BadgeProgress, CatalogError, Evaluation,
    HabitSnapshot, ProgressSources, RaidSnapshot, RawBadgeDefinition, Reward, SkillSelector,
    SkillSnapshot, Tier, Trigger, UnlockEvent, award_manual, badge_progress, builtin_catalog,
    evaluate,
};
pub use config::{EngineConfig, EngineConfigError, ModeSettings, PriceTable};
pub use day::{Clock, LogicalDay, resolve_logical_day};
pub use declined::Declined;
pub use honor::{HonorLedger, Redemption, day_score};
pub use leveling::{XpCurve, XpOutcome, XpProgress, apply_xp};
pub use persist::{
    LoadOutcome, PersistError, PersistedEnvelope, ProgressionEngine, StateStorage, decode_state,
    load_state,
};
pub use rollover::{
    Orchestrator, RolloverPhase, RolloverResult, RolloverSummary, RolloverTrigger,
};
pub use session::{EngineEvent, OperatorAction, ProgressionSession};
pub use state::{
    AuditAction, AuditEntry, AuditOrigin, DifficultyMode, EconomyState, ResetPolicy,
};
pub use streak::{StreakLadder, StreakOutcome, StreakPhase, judge};
