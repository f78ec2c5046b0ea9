//! Session facade binding the economy state to its policy, catalog and clock.
//!
//! Every command follows the same shape: apply the change to a snapshot,
//! commit it, then re-run the achievement engine until nothing new unlocks.
//! Side effects for presentation layers accumulate in an outbox.
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::achievements::{
    BadgeCatalog, BadgeProgress, Evaluation, ProgressSources, Tier, UnlockEvent, award_manual,
    badge_progress, builtin_catalog, evaluate,
};
use crate::config::EngineConfig;
use crate::constants::REDEMPTION_TOKEN_ITEM;
use crate::day::{Clock, LogicalDay};
use crate::declined::Declined;
use crate::honor::Redemption;
use crate::leveling::apply_xp;
use crate::rollover::{Orchestrator, RolloverResult, RolloverSummary, RolloverTrigger};
use crate::state::{AuditAction, AuditEntry, AuditOrigin, DifficultyMode, EconomyState, ResetPolicy};

/// Notification for presentation layers. Each is produced once per cause.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EngineEvent {
    /// One event per XP change: a jump across several levels is reported once,
    /// with `levels_gained` carrying the count.
    LevelUp { levels_gained: u32, new_level: u32 },
    BadgeUnlocked(UnlockEvent),
    Rollover(RolloverSummary),
}

/// Debug/ops tools. Always audited as operator changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum OperatorAction {
    /// Pin the clock to an instant, then process any day boundary it crosses.
    SetInstant { at: NaiveDateTime },
    ClearInstant,
    ForceRollover,
    CreditXp { amount: u64 },
    DebitXp { amount: u64 },
    CreditGold { amount: u64 },
    DebitGold { amount: u64 },
}

fn signed(amount: u64) -> i64 {
    i64::try_from(amount).unwrap_or(i64::MAX)
}

/// Single-writer handle over one player's economy.
#[derive(Debug, Clone)]
pub struct ProgressionSession {
    config: EngineConfig,
    catalog: BadgeCatalog,
    clock: Clock,
    sources: ProgressSources,
    orchestrator: Orchestrator,
    state: EconomyState,
    outbox: Vec<EngineEvent>,
}

impl ProgressionSession {
    /// Wrap an existing state with the built-in badge catalog.
    #[must_use]
    pub fn new(state: EconomyState, config: EngineConfig, clock: Clock) -> Self {
        Self {
            config,
            catalog: builtin_catalog().clone(),
            clock,
            sources: ProgressSources::default(),
            orchestrator: Orchestrator::new(),
            state,
            outbox: Vec::new(),
        }
    }

    /// Fresh player anchored to the clock's current logical day.
    #[must_use]
    pub fn onboard(mode: DifficultyMode, config: EngineConfig, clock: Clock) -> Self {
        let today = clock.logical_today(config.day_start_hour);
        let state = EconomyState::onboard(today, mode, &config);
        Self::new(state, config, clock)
    }

    /// Layer injected definitions over the built-in catalog; injected ids win.
    #[must_use]
    pub fn with_injected_catalog(mut self, injected: &BadgeCatalog) -> Self {
        self.catalog = builtin_catalog().merge(injected);
        self
    }

    /// Replace the catalog entirely.
    #[must_use]
    pub fn with_catalog(mut self, catalog: BadgeCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    #[must_use]
    pub const fn state(&self) -> &EconomyState {
        &self.state
    }

    #[must_use]
    pub fn into_state(self) -> EconomyState {
        self.state
    }

    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[must_use]
    pub const fn catalog(&self) -> &BadgeCatalog {
        &self.catalog
    }

    #[must_use]
    pub const fn clock(&self) -> &Clock {
        &self.clock
    }

    #[must_use]
    pub const fn sources(&self) -> &ProgressSources {
        &self.sources
    }

    #[must_use]
    pub fn today(&self) -> LogicalDay {
        self.clock.logical_today(self.config.day_start_hour)
    }

    /// Take every pending event, oldest first.
    pub fn drain_events(&mut self) -> Vec<EngineEvent> {
        std::mem::take(&mut self.outbox)
    }

    #[must_use]
    pub fn badge_progress(&self) -> Vec<BadgeProgress> {
        let sources = self.sources.clone().with_economy(&self.state);
        badge_progress(&self.catalog, &sources, &self.state)
    }

    /// Apply organic XP and gold from completed activity.
    pub fn record_activity(&mut self, xp: i64, gold: i64) {
        self.apply_xp_delta(xp);
        self.apply_gold_delta(gold);
        self.reevaluate();
    }

    /// Replace the external stats/skills/habits/raids snapshot.
    pub fn update_sources(&mut self, sources: ProgressSources) {
        self.sources = sources;
        self.reevaluate();
    }

    /// Queue a mode change; it takes effect at the next rollover.
    pub const fn set_pending_mode(&mut self, mode: DifficultyMode) {
        self.state.pending_mode = mode;
    }

    /// Process the current day boundary if it has not been processed yet.
    pub fn tick(&mut self) -> Option<RolloverSummary> {
        self.rollover(&RolloverTrigger::Scheduled)
    }

    /// Move the clock forward and process any crossed boundary.
    pub fn advance_clock(&mut self, delta: chrono::TimeDelta) -> Option<RolloverSummary> {
        self.clock.advance(delta);
        self.tick()
    }

    /// Apply a debug/ops action.
    ///
    /// # Errors
    ///
    /// Returns [`Declined::MissingReason`] when `reason` is blank.
    pub fn operator(&mut self, action: OperatorAction, reason: &str) -> Result<(), Declined> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(Declined::MissingReason);
        }
        let (audit_action, amount) = match &action {
            OperatorAction::SetInstant { .. } | OperatorAction::ClearInstant => {
                (AuditAction::ClockOverride, 0)
            }
            OperatorAction::ForceRollover => (AuditAction::ForcedRollover, 0),
            OperatorAction::CreditXp { amount } => (AuditAction::XpCredit, signed(*amount)),
            OperatorAction::DebitXp { amount } => (AuditAction::XpDebit, -signed(*amount)),
            OperatorAction::CreditGold { amount } => (AuditAction::GoldCredit, signed(*amount)),
            OperatorAction::DebitGold { amount } => (AuditAction::GoldDebit, -signed(*amount)),
        };

        match action {
            OperatorAction::SetInstant { at } => {
                self.clock.set_override(Some(at));
                self.audit(AuditOrigin::Operator, audit_action, amount, reason);
                self.tick();
            }
            OperatorAction::ClearInstant => {
                self.clock.set_override(None);
                self.audit(AuditOrigin::Operator, audit_action, amount, reason);
                self.tick();
            }
            OperatorAction::ForceRollover => {
                // the orchestrator records its own audit entry
                self.rollover(&RolloverTrigger::Forced {
                    reason: reason.to_string(),
                });
            }
            OperatorAction::CreditXp { .. } | OperatorAction::DebitXp { .. } => {
                self.apply_xp_delta(amount);
                self.audit(AuditOrigin::Operator, audit_action, amount, reason);
                self.reevaluate();
            }
            OperatorAction::CreditGold { .. } | OperatorAction::DebitGold { .. } => {
                self.apply_gold_delta(amount);
                self.audit(AuditOrigin::Operator, audit_action, amount, reason);
                self.reevaluate();
            }
        }
        Ok(())
    }

    /// Buy one streak shield with gold.
    ///
    /// # Errors
    ///
    /// Declines when the cap is reached or gold is short.
    pub fn purchase_shield(&mut self) -> Result<u8, Declined> {
        let shields = self.config.streak.acquire_shield(self.state.shields)?;
        let price = self.config.prices.shield;
        if self.state.gold < price {
            return Err(Declined::InsufficientGold {
                needed: price,
                available: self.state.gold,
            });
        }
        self.state.gold -= price;
        self.state.shields = shields;
        self.audit(
            AuditOrigin::Organic,
            AuditAction::ShieldPurchase,
            -signed(price),
            "shield purchase",
        );
        self.reevaluate();
        Ok(shields)
    }

    /// Forgive the worst past honor day, spending a redemption token if one is
    /// held and gold otherwise.
    ///
    /// # Errors
    ///
    /// Declines when nothing is eligible or the player cannot pay.
    pub fn redeem_honor(&mut self) -> Result<Redemption, Declined> {
        let today = self.today();
        let mut ledger = self.state.honor_daily_log.clone();
        let redemption = ledger.redeem_lowest(today)?;

        let mut next = self.state.clone();
        let spent_gold = if next.take_item(REDEMPTION_TOKEN_ITEM) {
            0
        } else {
            let price = self.config.prices.redemption;
            if next.gold < price {
                return Err(Declined::InsufficientGold {
                    needed: price,
                    available: next.gold,
                });
            }
            next.gold -= price;
            price
        };
        next.honor_daily_log = ledger;
        next.sync_honor();
        self.state = next;
        self.audit(
            AuditOrigin::Organic,
            AuditAction::HonorRedemption,
            -signed(spent_gold),
            &format!("redeemed {}", redemption.day),
        );
        self.reevaluate();
        Ok(redemption)
    }

    /// Hand-award a manual badge tier.
    ///
    /// # Errors
    ///
    /// See [`award_manual`].
    pub fn award_badge(&mut self, badge_id: &str, tier: Tier) -> Result<(), Declined> {
        let eval = award_manual(
            &self.catalog,
            badge_id,
            tier,
            &self.state,
            self.clock.now(),
            &self.config.xp_curve,
        )?;
        self.commit_evaluation(eval);
        self.reevaluate();
        Ok(())
    }

    /// Reinitialize the economy, keeping what the policy preserves.
    pub fn reset(&mut self, policy: ResetPolicy) {
        let today = self.today();
        self.state = self.state.reset(policy, today, &self.config);
        self.audit(
            AuditOrigin::Operator,
            AuditAction::SystemReset,
            0,
            "system reset",
        );
    }

    fn rollover(&mut self, trigger: &RolloverTrigger) -> Option<RolloverSummary> {
        let now = self.clock.now();
        match self
            .orchestrator
            .run(&self.state, now, trigger, &self.config)
        {
            RolloverResult::Initialized { state } => {
                self.state = state;
                None
            }
            RolloverResult::AlreadyProcessed | RolloverResult::Busy => None,
            RolloverResult::Committed { state, summary } => {
                self.state = state;
                self.outbox.push(EngineEvent::Rollover(summary.clone()));
                self.reevaluate();
                Some(summary)
            }
        }
    }

    fn apply_xp_delta(&mut self, delta: i64) {
        let outcome = apply_xp(self.state.xp_progress(), delta, &self.config.xp_curve);
        self.state.set_xp_progress(outcome.progress);
        let magnitude = delta.unsigned_abs();
        if delta >= 0 {
            self.state.daily_xp = self.state.daily_xp.saturating_add(magnitude);
            self.state.total_xp_earned = self.state.total_xp_earned.saturating_add(magnitude);
        } else {
            self.state.daily_xp = self.state.daily_xp.saturating_sub(magnitude);
        }
        self.push_level_up(outcome.levels_gained);
    }

    fn apply_gold_delta(&mut self, delta: i64) {
        let magnitude = delta.unsigned_abs();
        self.state.gold = if delta >= 0 {
            self.state.gold.saturating_add(magnitude)
        } else {
            self.state.gold.saturating_sub(magnitude)
        };
    }

    fn push_level_up(&mut self, levels_gained: u32) {
        if levels_gained > 0 {
            self.outbox.push(EngineEvent::LevelUp {
                levels_gained,
                new_level: self.state.level,
            });
        }
    }

    fn commit_evaluation(&mut self, eval: Evaluation) {
        self.state = eval.state;
        self.outbox
            .extend(eval.unlocks.into_iter().map(EngineEvent::BadgeUnlocked));
        self.push_level_up(eval.levels_gained);
    }

    /// Re-run evaluation until a pass unlocks nothing. Rewards feed the economy
    /// metrics, so one unlock can satisfy another badge.
    fn reevaluate(&mut self) {
        loop {
            let sources = self.sources.clone().with_economy(&self.state);
            let eval = evaluate(
                &self.catalog,
                &sources,
                &self.state,
                self.clock.now(),
                &self.config.xp_curve,
            );
            if eval.unlocks.is_empty() {
                break;
            }
            self.commit_evaluation(eval);
        }
    }

    fn audit(&mut self, origin: AuditOrigin, action: AuditAction, amount: i64, reason: &str) {
        let at = self.clock.now();
        self.state.record_audit(AuditEntry {
            at,
            origin,
            action,
            amount,
            reason: reason.to_string(),
        });
    }
}
