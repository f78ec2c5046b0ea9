//! Persisted economy records, migration, and the storage seam.
use log::{info, warn};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

use crate::achievements::Tier;
use crate::config::EngineConfig;
use crate::constants::{
    LOG_STATE_CORRUPT, LOG_STATE_MIGRATED, STATE_SCHEMA_VERSION, STATE_STORAGE_KEY,
};
use crate::day::Clock;
use crate::honor::HonorLedger;
use crate::leveling::apply_xp;
use crate::session::ProgressionSession;
use crate::state::{DifficultyMode, EconomyState};

/// Code stamped into history for tiers recorded before unlock codes existed.
const LEGACY_UNLOCK_CODE: &str = "legacy";

/// Versioned wrapper written under [`PersistedEnvelope::STORAGE_KEY`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedEnvelope {
    pub version: u32,
    pub state: EconomyState,
}

impl PersistedEnvelope {
    pub const STORAGE_KEY: &'static str = STATE_STORAGE_KEY;

    #[must_use]
    pub fn wrap(state: &EconomyState) -> Self {
        Self {
            version: STATE_SCHEMA_VERSION,
            state: state.clone(),
        }
    }

    /// # Errors
    ///
    /// Returns an error if the state cannot be serialized.
    pub fn to_json(&self) -> Result<String, PersistError> {
        Ok(serde_json::to_string(self)?)
    }
}

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("persisted state is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("persisted state must be a JSON object")]
    Shape,
    #[error("persisted state version {0} is newer than this engine supports")]
    UnsupportedVersion(u64),
}

/// A loaded record plus what had to be done to it.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadOutcome {
    pub state: EconomyState,
    /// Schema version found in storage (1 for bare legacy records).
    pub source_version: u64,
    pub migrated: bool,
    /// Non-fatal problems encountered while loading.
    pub diagnostics: Vec<String>,
}

/// Parse the stored document, check its version and migrate it to the
/// current record layout without decoding it.
fn read_record(json: &str) -> Result<(Value, u64), PersistError> {
    let document: Value = serde_json::from_str(json)?;
    let Value::Object(mut map) = document else {
        return Err(PersistError::Shape);
    };

    let version = map.get("version").and_then(Value::as_u64);
    let (version, record) = match (version, map.remove("state")) {
        (Some(version), Some(record)) => (version, record),
        // v1 stored the record bare under the key
        _ => (1, Value::Object(map)),
    };
    if version > u64::from(STATE_SCHEMA_VERSION) {
        return Err(PersistError::UnsupportedVersion(version));
    }
    let record = if version < 2 {
        migrate_v1(record)?
    } else {
        record
    };
    if !record.is_object() {
        return Err(PersistError::Shape);
    }
    Ok((record, version))
}

/// Strictly decode a persisted record, migrating older schemas.
///
/// # Errors
///
/// Returns an error for unparseable payloads, unknown future versions, or any
/// field that does not match its type.
pub fn decode_state(json: &str) -> Result<(EconomyState, u64), PersistError> {
    let (record, version) = read_record(json)?;
    Ok((serde_json::from_value(record)?, version))
}

/// Decode field by field: a value that does not fit its field is dropped so
/// the field falls back to its default, and everything else is kept.
fn decode_lenient(
    record: Value,
    diagnostics: &mut Vec<String>,
) -> Result<EconomyState, PersistError> {
    let Value::Object(map) = record else {
        return Err(PersistError::Shape);
    };
    if let Ok(state) = serde_json::from_value(Value::Object(map.clone())) {
        return Ok(state);
    }
    let kept: Map<String, Value> = map
        .into_iter()
        .filter(|(field, value)| {
            let single = Value::Object(Map::from_iter([(field.clone(), value.clone())]));
            match serde_json::from_value::<EconomyState>(single) {
                Ok(_) => true,
                Err(err) => {
                    note(diagnostics, format!("dropped field {field}: {err}"));
                    false
                }
            }
        })
        .collect();
    Ok(serde_json::from_value(Value::Object(kept))?)
}

/// Load a record for play. Never fails: fields that do not decode fall back to
/// their defaults, unreadable documents fall back to a fresh state, and every
/// result is sanitized against `cfg`.
#[must_use]
pub fn load_state(json: &str, cfg: &EngineConfig) -> LoadOutcome {
    let mut diagnostics = Vec::new();
    let decoded = read_record(json).and_then(|(record, version)| {
        decode_lenient(record, &mut diagnostics).map(|state| (state, version))
    });
    let (state, source_version) = match decoded {
        Ok(decoded) => decoded,
        Err(err) => {
            warn!("{LOG_STATE_CORRUPT}: {err}");
            diagnostics.push(err.to_string());
            (EconomyState::with_config(cfg), u64::from(STATE_SCHEMA_VERSION))
        }
    };
    let migrated = source_version < u64::from(STATE_SCHEMA_VERSION);
    if migrated {
        info!("{LOG_STATE_MIGRATED}: v{source_version} -> v{STATE_SCHEMA_VERSION}");
    }
    let state = sanitize(state, cfg, &mut diagnostics);
    LoadOutcome {
        state,
        source_version,
        migrated,
        diagnostics,
    }
}

/// Reshape a v1 record: honor log and streak history were lists of day entries.
fn migrate_v1(record: Value) -> Result<Value, PersistError> {
    let Value::Object(mut map) = record else {
        return Err(PersistError::Shape);
    };
    for (field, value_key) in [("honor_daily_log", "score"), ("streak_history", "outcome")] {
        if let Some(Value::Array(entries)) = map.get(field) {
            let keyed: Map<String, Value> = entries
                .iter()
                .filter_map(|entry| {
                    let day = entry.get("day").and_then(Value::as_str)?;
                    Some((day.to_string(), entry.get(value_key)?.clone()))
                })
                .collect();
            map.insert(field.to_string(), Value::Object(keyed));
        }
    }
    Ok(Value::Object(map))
}

fn note(diagnostics: &mut Vec<String>, message: String) {
    warn!("{LOG_STATE_CORRUPT}: {message}");
    diagnostics.push(message);
}

/// Restore every invariant a hand-edited or outdated record may violate.
#[must_use]
pub fn sanitize(
    mut state: EconomyState,
    cfg: &EngineConfig,
    diagnostics: &mut Vec<String>,
) -> EconomyState {
    let cap = cfg.streak.shield_cap();
    if state.shields > cap {
        note(diagnostics, format!("shields {} clamped to cap {cap}", state.shields));
        state.shields = cap;
    }

    if state.level == 0 {
        state.level = 1;
    }
    state.sync_target_xp(&cfg.xp_curve);
    if state.current_xp >= state.target_xp {
        let outcome = apply_xp(state.xp_progress(), 0, &cfg.xp_curve);
        state.set_xp_progress(outcome.progress);
    }

    state.honor_daily_log = HonorLedger::from_entries(state.honor_daily_log.iter());
    state.sync_honor();
    state.sync_best_streak();

    if state.daily_target == 0 {
        state.daily_target = cfg.daily_target(state.current_mode);
    }

    reconcile_badges(&mut state, diagnostics);
    state
}

/// Make `badge_tiers`, `badge_history` and `badges` agree. History wins; tiers
/// with no history are treated as paid so they are never paid twice.
fn reconcile_badges(state: &mut EconomyState, diagnostics: &mut Vec<String>) {
    for (badge, tier) in state.badge_tiers.clone() {
        let history = state.badge_history.entry(badge.clone()).or_default();
        for lower in Tier::ALL
            .iter()
            .copied()
            .filter(|candidate| *candidate <= tier)
        {
            if !history.contains_key(&lower) {
                history.insert(lower, LEGACY_UNLOCK_CODE.to_string());
                note(
                    diagnostics,
                    format!("backfilled {badge} {lower} history from recorded tier"),
                );
            }
        }
    }

    let derived: BTreeMap<String, _> = state
        .badge_history
        .iter()
        .filter_map(|(badge, tiers)| tiers.keys().max().map(|tier| (badge.clone(), *tier)))
        .collect();
    state.badge_tiers = derived;
    state.badge_history.retain(|_, tiers| !tiers.is_empty());

    let mut seen = BTreeSet::new();
    state.badges.retain(|badge| seen.insert(badge.clone()));
    for badge in state.badge_tiers.keys() {
        if !state.badges.contains(badge) {
            state.badges.push(badge.clone());
        }
    }
}

/// Raw key/value persistence supplied by the host.
pub trait StateStorage {
    type Error: std::error::Error + Send + Sync + 'static;

    /// # Errors
    ///
    /// Returns an error if the payload cannot be written.
    fn save(&self, key: &str, payload: &str) -> Result<(), Self::Error>;

    /// # Errors
    ///
    /// Returns an error if storage cannot be read.
    fn load(&self, key: &str) -> Result<Option<String>, Self::Error>;

    /// # Errors
    ///
    /// Returns an error if the entry cannot be removed.
    fn delete(&self, key: &str) -> Result<(), Self::Error>;
}

/// Loads, migrates and saves one economy record through a [`StateStorage`].
pub struct ProgressionEngine<S>
where
    S: StateStorage,
{
    storage: S,
    config: EngineConfig,
}

impl<S> ProgressionEngine<S>
where
    S: StateStorage,
{
    pub const fn new(storage: S, config: EngineConfig) -> Self {
        Self { storage, config }
    }

    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// # Errors
    ///
    /// Returns an error if serialization or the storage write fails.
    pub fn save(&self, state: &EconomyState) -> anyhow::Result<()>
    where
        S::Error: Into<anyhow::Error>,
    {
        let payload = PersistedEnvelope::wrap(state).to_json()?;
        self.storage
            .save(PersistedEnvelope::STORAGE_KEY, &payload)
            .map_err(Into::into)
    }

    /// Load the stored record, or `None` when nothing has been saved yet.
    ///
    /// # Errors
    ///
    /// Returns an error only if the storage read itself fails.
    pub fn load(&self) -> anyhow::Result<Option<LoadOutcome>>
    where
        S::Error: Into<anyhow::Error>,
    {
        let payload = self
            .storage
            .load(PersistedEnvelope::STORAGE_KEY)
            .map_err(Into::into)?;
        Ok(payload.map(|json| load_state(&json, &self.config)))
    }

    /// # Errors
    ///
    /// Returns an error if the storage delete fails.
    pub fn delete(&self) -> Result<(), S::Error> {
        self.storage.delete(PersistedEnvelope::STORAGE_KEY)
    }

    /// Resume the stored player, or onboard a new one in `mode`.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage read fails.
    pub fn open_session(
        &self,
        mode: DifficultyMode,
        clock: Clock,
    ) -> anyhow::Result<ProgressionSession>
    where
        S::Error: Into<anyhow::Error>,
    {
        let session = match self.load()? {
            Some(outcome) => ProgressionSession::new(outcome.state, self.config.clone(), clock),
            None => ProgressionSession::onboard(mode, self.config.clone(), clock),
        };
        Ok(session)
    }
}
