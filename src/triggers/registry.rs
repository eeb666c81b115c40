//! Trigger registry: keys in state, functions in a side table.
//!
//! Units never store behavior functions. They carry serializable
//! [`TriggerRef`] values whose key is resolved against the
//! [`TriggerRegistry`] at dispatch time. New passive abilities are
//! added purely by registering behaviors; the dispatch engine and the
//! unit model stay unchanged. A ref whose key is missing from the
//! registry is a tagged skip, never a crash.

use std::fmt;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use super::event::{BattleEvent, EventKind};
use crate::core::state::BattleState;
use crate::core::unit::UnitId;
use crate::error::{EngineError, Result};

/// Registry key of a trigger behavior.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TriggerKey(pub String);

impl TriggerKey {
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TriggerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TriggerKey {
    fn from(key: &str) -> Self {
        Self(key.to_owned())
    }
}

/// A unit's handle on a registered behavior.
///
/// Lives in unit state and serializes with it; tuning values travel in
/// `params` so one behavior can back many differently-tuned passives.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TriggerRef {
    pub key: TriggerKey,
    /// Turn the ref was attached, 0 for innate passives.
    pub applied_at: u32,
    /// What granted it.
    pub source: String,
    /// Remaining firings, `None` for unlimited.
    pub uses: Option<u32>,
    /// Behavior tuning values.
    pub params: FxHashMap<String, i64>,
}

impl TriggerRef {
    #[must_use]
    pub fn new(key: impl Into<TriggerKey>) -> Self {
        Self {
            key: key.into(),
            applied_at: 0,
            source: "innate".to_owned(),
            uses: None,
            params: FxHashMap::default(),
        }
    }

    #[must_use]
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    #[must_use]
    pub fn with_uses(mut self, uses: u32) -> Self {
        self.uses = Some(uses);
        self
    }

    #[must_use]
    pub fn with_param(mut self, key: impl Into<String>, value: i64) -> Self {
        self.params.insert(key.into(), value);
        self
    }

    /// A tuning value, defaulted when absent.
    #[must_use]
    pub fn param(&self, key: &str, default: i64) -> i64 {
        self.params.get(key).copied().unwrap_or(default)
    }

    /// Can this ref still fire?
    #[must_use]
    pub fn has_uses_left(&self) -> bool {
        self.uses.map_or(true, |uses| uses > 0)
    }

    /// Spend one firing. Returns `true` when the ref is exhausted.
    pub fn consume_use(&mut self) -> bool {
        if let Some(uses) = self.uses.as_mut() {
            *uses = uses.saturating_sub(1);
            return *uses == 0;
        }
        false
    }
}

/// What a behavior sees when its functions run.
pub struct TriggerScope<'a> {
    /// Unit the ref is attached to.
    pub owner: UnitId,
    /// The event being dispatched.
    pub event: &'a BattleEvent,
    /// The ref that matched, with its tuning params.
    pub reference: &'a TriggerRef,
}

impl TriggerScope<'_> {
    /// Shorthand for the ref's tuning values.
    #[must_use]
    pub fn param(&self, key: &str, default: i64) -> i64 {
        self.reference.param(key, default)
    }
}

/// Decides whether the behavior fires. `Err` counts as "does not
/// fire"; the dispatcher logs and moves on.
pub type ConditionFn = fn(&BattleState, &TriggerScope<'_>) -> Result<bool>;

/// Mutates the state when the behavior fires. Runs against a staged
/// clone; `Err` discards the stage.
pub type ApplyFn = fn(&mut BattleState, &TriggerScope<'_>) -> Result<()>;

/// A registered passive ability.
#[derive(Clone, Debug)]
pub struct TriggerBehavior {
    pub key: TriggerKey,
    /// Display name for notifications.
    pub name: String,
    /// Event kind the behavior listens for.
    pub event: EventKind,
    /// Higher fires first; ties keep gathering order.
    pub priority: i32,
    pub condition: ConditionFn,
    pub apply: ApplyFn,
}

impl TriggerBehavior {
    pub fn new(
        key: impl Into<TriggerKey>,
        name: impl Into<String>,
        event: EventKind,
        condition: ConditionFn,
        apply: ApplyFn,
    ) -> Self {
        Self {
            key: key.into(),
            name: name.into(),
            event,
            priority: 0,
            condition,
            apply,
        }
    }

    #[must_use]
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }
}

/// Behavior side table. Refs are gathered from units at dispatch, so
/// the table only needs key lookup.
#[derive(Clone, Debug, Default)]
pub struct TriggerRegistry {
    behaviors: FxHashMap<TriggerKey, TriggerBehavior>,
}

impl TriggerRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-loaded with the stock behavior library.
    #[must_use]
    pub fn with_stock_behaviors() -> Self {
        let mut registry = Self::new();
        super::library::register_stock(&mut registry);
        registry
    }

    /// Register a behavior; re-registering a key replaces it.
    pub fn register(&mut self, behavior: TriggerBehavior) {
        self.behaviors.insert(behavior.key.clone(), behavior);
    }

    #[must_use]
    pub fn get(&self, key: &TriggerKey) -> Option<&TriggerBehavior> {
        self.behaviors.get(key)
    }

    /// Look a key up or fail with a typed error.
    pub fn resolve(&self, key: &TriggerKey) -> Result<&TriggerBehavior> {
        self.behaviors
            .get(key)
            .ok_or_else(|| EngineError::UnknownTrigger(key.to_string()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.behaviors.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.behaviors.is_empty()
    }

    /// Iterate all registered behaviors.
    pub fn iter(&self) -> impl Iterator<Item = &TriggerBehavior> {
        self.behaviors.values()
    }
}
