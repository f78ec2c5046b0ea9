//! The mutable economy root and its supporting types.
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::{BTreeMap, VecDeque};
use std::fmt;
use std::str::FromStr;

use crate::achievements::Tier;
use crate::config::EngineConfig;
use crate::constants::AUDIT_LOG_CAPACITY;
use crate::day::LogicalDay;
use crate::honor::HonorLedger;
use crate::leveling::{XpCurve, XpProgress};
use crate::streak::StreakOutcome;

/// Difficulty preset that sets the daily XP target.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum DifficultyMode {
    Casual,
    #[default]
    Standard,
    Intense,
    Extreme,
}

impl DifficultyMode {
    pub const ALL: &'static [Self] = &[Self::Casual, Self::Standard, Self::Intense, Self::Extreme];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Casual => "casual",
            Self::Standard => "standard",
            Self::Intense => "intense",
            Self::Extreme => "extreme",
        }
    }
}

impl fmt::Display for DifficultyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DifficultyMode {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "casual" => Ok(Self::Casual),
            "standard" => Ok(Self::Standard),
            "intense" => Ok(Self::Intense),
            "extreme" => Ok(Self::Extreme),
            _ => Err(()),
        }
    }
}

/// Who caused an audited change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditOrigin {
    /// Earned through normal play.
    Organic,
    /// Applied through a debug/ops tool.
    Operator,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    XpCredit,
    XpDebit,
    GoldCredit,
    GoldDebit,
    ForcedRollover,
    ClockOverride,
    ShieldPurchase,
    HonorRedemption,
    SystemReset,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub at: NaiveDateTime,
    pub origin: AuditOrigin,
    pub action: AuditAction,
    #[serde(default)]
    pub amount: i64,
    #[serde(default)]
    pub reason: String,
}

/// What survives a system reset. Chosen by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ResetPolicy {
    pub preserve_badges: bool,
    pub preserve_inventory: bool,
}

/// Mutable economy root.
///
/// Every field has a default so older persisted records load with any missing
/// field backfilled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EconomyState {
    pub level: u32,
    pub current_xp: u64,
    pub target_xp: u64,
    pub gold: u64,
    pub streak: u32,
    pub best_streak: u32,
    pub shields: u8,
    pub daily_xp: u64,
    pub daily_target: u64,
    pub current_mode: DifficultyMode,
    pub pending_mode: DifficultyMode,
    /// Persisted mirror of [`EconomyState::honor`], rewritten at every commit
    /// that touches the log. Read honor through the method.
    pub honor: u8,
    pub honor_daily_log: HonorLedger,
    pub streak_history: BTreeMap<LogicalDay, StreakOutcome>,
    pub badges: Vec<String>,
    pub badge_tiers: BTreeMap<String, Tier>,
    pub badge_history: BTreeMap<String, BTreeMap<Tier, String>>,
    pub last_processed_date: Option<LogicalDay>,
    pub total_xp_earned: u64,
    pub inventory: BTreeMap<String, u32>,
    pub audit_log: VecDeque<AuditEntry>,
}

impl Default for EconomyState {
    fn default() -> Self {
        Self::with_config(&EngineConfig::default())
    }
}

impl EconomyState {
    /// Zeroed state for the given policy, not yet anchored to a day.
    #[must_use]
    pub fn with_config(cfg: &EngineConfig) -> Self {
        let progress = XpProgress::starting(&cfg.xp_curve);
        let mode = DifficultyMode::default();
        let ledger = HonorLedger::new();
        Self {
            level: progress.level,
            current_xp: progress.current_xp,
            target_xp: progress.target_xp,
            gold: 0,
            streak: 0,
            best_streak: 0,
            shields: 0,
            daily_xp: 0,
            daily_target: cfg.daily_target(mode),
            current_mode: mode,
            pending_mode: mode,
            honor: ledger.average(),
            honor_daily_log: ledger,
            streak_history: BTreeMap::new(),
            badges: Vec::new(),
            badge_tiers: BTreeMap::new(),
            badge_history: BTreeMap::new(),
            last_processed_date: None,
            total_xp_earned: 0,
            inventory: BTreeMap::new(),
            audit_log: VecDeque::new(),
        }
    }

    /// Fresh state created at onboarding. The onboarding day counts as processed
    /// so the first rollover judges the first full day.
    #[must_use]
    pub fn onboard(today: LogicalDay, mode: DifficultyMode, cfg: &EngineConfig) -> Self {
        let mut state = Self::with_config(cfg);
        state.current_mode = mode;
        state.pending_mode = mode;
        state.daily_target = cfg.daily_target(mode);
        state.last_processed_date = Some(today);
        state
    }

    #[must_use]
    pub const fn xp_progress(&self) -> XpProgress {
        XpProgress {
            level: self.level,
            current_xp: self.current_xp,
            target_xp: self.target_xp,
        }
    }

    pub const fn set_xp_progress(&mut self, progress: XpProgress) {
        self.level = progress.level;
        self.current_xp = progress.current_xp;
        self.target_xp = progress.target_xp;
    }

    /// Current honor, always recomputed from the ledger.
    #[must_use]
    pub fn honor(&self) -> u8 {
        self.honor_daily_log.average()
    }

    /// Rewrite the persisted `honor` mirror from the ledger.
    pub fn sync_honor(&mut self) {
        self.honor = self.honor_daily_log.average();
    }

    /// Keep `best_streak` in step with `streak`.
    pub fn sync_best_streak(&mut self) {
        self.best_streak = self.best_streak.max(self.streak);
    }

    /// Recompute `target_xp` after the curve changes or a record is repaired.
    pub fn sync_target_xp(&mut self, curve: &XpCurve) {
        self.target_xp = curve.target_xp(self.level);
    }

    #[must_use]
    pub fn highest_tier(&self, badge_id: &str) -> Option<Tier> {
        self.badge_tiers.get(badge_id).copied()
    }

    #[must_use]
    pub fn has_tier(&self, badge_id: &str, tier: Tier) -> bool {
        self.badge_history
            .get(badge_id)
            .is_some_and(|tiers| tiers.contains_key(&tier))
    }

    #[must_use]
    pub fn item_count(&self, item: &str) -> u32 {
        self.inventory.get(item).copied().unwrap_or(0)
    }

    /// Remove one unit of an item, returning whether it was present.
    pub fn take_item(&mut self, item: &str) -> bool {
        match self.inventory.get_mut(item) {
            Some(count) if *count > 0 => {
                *count -= 1;
                if *count == 0 {
                    self.inventory.remove(item);
                }
                true
            }
            _ => false,
        }
    }

    pub fn add_item(&mut self, item: &str, count: u32) {
        if count == 0 {
            return;
        }
        let entry = self.inventory.entry(item.to_string()).or_insert(0);
        *entry = entry.saturating_add(count);
    }

    /// Append an audit entry, dropping the oldest once the trail is full.
    pub fn record_audit(&mut self, entry: AuditEntry) {
        while self.audit_log.len() >= AUDIT_LOG_CAPACITY {
            self.audit_log.pop_front();
        }
        self.audit_log.push_back(entry);
    }

    /// Economy figures exposed to metric-triggered badges under the `economy` key.
    #[must_use]
    pub fn metrics_snapshot(&self) -> Value {
        json!({
            "level": self.level,
            "streak": self.streak,
            "bestStreak": self.best_streak,
            "gold": self.gold,
            "honor": self.honor(),
            "shields": self.shields,
            "totalXp": self.total_xp_earned,
            "badgeCount": self.badges.len(),
            "successDays": self
                .streak_history
                .values()
                .filter(|outcome| matches!(outcome, StreakOutcome::Success))
                .count(),
        })
    }

    /// Reinitialize to onboarding defaults, keeping what the policy preserves.
    #[must_use]
    pub fn reset(&self, policy: ResetPolicy, today: LogicalDay, cfg: &EngineConfig) -> Self {
        let mut fresh = Self::onboard(today, self.current_mode, cfg);
        if policy.preserve_badges {
            fresh.badges.clone_from(&self.badges);
            fresh.badge_tiers.clone_from(&self.badge_tiers);
            fresh.badge_history.clone_from(&self.badge_history);
        }
        if policy.preserve_inventory {
            fresh.inventory.clone_from(&self.inventory);
        }
        fresh.audit_log.clone_from(&self.audit_log);
        fresh
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn today() -> LogicalDay {
        LogicalDay::from_ymd(2024, 1, 15).unwrap()
    }

    fn stamp() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 15)
            .and_then(|d| d.and_hms_opt(9, 0, 0))
            .unwrap()
    }

    #[test]
    fn onboarding_zeroes_counters() {
        let cfg = EngineConfig::default();
        let state = EconomyState::onboard(today(), DifficultyMode::Intense, &cfg);
        assert_eq!(state.level, 1);
        assert_eq!(state.current_xp, 0);
        assert_eq!(state.target_xp, 100);
        assert_eq!(state.daily_target, 900);
        assert_eq!(state.honor, 100);
        assert_eq!(state.last_processed_date, Some(today()));
        assert_eq!(state.pending_mode, DifficultyMode::Intense);
    }

    #[test]
    fn honor_reads_the_ledger_not_the_mirror() {
        let mut state = EconomyState::onboard(today(), DifficultyMode::Standard, &EngineConfig::default());
        state.honor_daily_log.record_day(today().previous(), 40);
        assert_eq!(state.honor(), 40);
        assert_eq!(state.metrics_snapshot()["honor"], 40);
        assert_eq!(state.honor, 100);
        state.sync_honor();
        assert_eq!(state.honor, 40);
    }

    #[test]
    fn mode_parses_case_insensitively() {
        assert_eq!("Extreme".parse::<DifficultyMode>(), Ok(DifficultyMode::Extreme));
        assert_eq!(DifficultyMode::Casual.to_string(), "casual");
        assert!("nightmare".parse::<DifficultyMode>().is_err());
    }

    #[test]
    fn inventory_take_and_add() {
        let mut state = EconomyState::default();
        assert!(!state.take_item("redemption_token"));
        state.add_item("redemption_token", 2);
        assert!(state.take_item("redemption_token"));
        assert_eq!(state.item_count("redemption_token"), 1);
        assert!(state.take_item("redemption_token"));
        assert!(!state.inventory.contains_key("redemption_token"));
    }

    #[test]
    fn audit_log_is_bounded() {
        let mut state = EconomyState::default();
        for i in 0..(AUDIT_LOG_CAPACITY + 5) {
            state.record_audit(AuditEntry {
                at: stamp(),
                origin: AuditOrigin::Operator,
                action: AuditAction::GoldCredit,
                amount: i64::try_from(i).unwrap(),
                reason: "load test".into(),
            });
        }
        assert_eq!(state.audit_log.len(), AUDIT_LOG_CAPACITY);
        assert_eq!(state.audit_log.front().map(|e| e.amount), Some(5));
    }

    #[test]
    fn reset_respects_preservation_policy() {
        let cfg = EngineConfig::default();
        let mut state = EconomyState::onboard(today(), DifficultyMode::Standard, &cfg);
        state.gold = 900;
        state.streak = 12;
        state.badges.push("first-steps".into());
        state.badge_tiers.insert("first-steps".into(), Tier::Silver);
        state.add_item("potion", 3);

        let wiped = state.reset(ResetPolicy::default(), today().next(), &cfg);
        assert_eq!(wiped.gold, 0);
        assert_eq!(wiped.streak, 0);
        assert!(wiped.badges.is_empty());
        assert!(wiped.inventory.is_empty());
        assert_eq!(wiped.last_processed_date, Some(today().next()));

        let kept = state.reset(
            ResetPolicy {
                preserve_badges: true,
                preserve_inventory: true,
            },
            today().next(),
            &cfg,
        );
        assert_eq!(kept.gold, 0);
        assert_eq!(kept.badges, vec!["first-steps".to_string()]);
        assert_eq!(kept.item_count("potion"), 3);
    }

    #[test]
    fn metrics_snapshot_exposes_economy_figures() {
        let mut state = EconomyState::default();
        state.streak = 4;
        state.best_streak = 9;
        state.total_xp_earned = 1_234;
        let metrics = state.metrics_snapshot();
        assert_eq!(metrics["streak"], 4);
        assert_eq!(metrics["bestStreak"], 9);
        assert_eq!(metrics["totalXp"], 1_234);
    }
}
