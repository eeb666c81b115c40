//! Staged-clone trigger dispatch.
//!
//! One event, many candidate refs. Candidates are gathered in unit
//! spawn order (attachment order within a unit), sorted by behavior
//! priority with gathering order breaking ties, then fired one at a
//! time. Each apply runs against a clone of the state that replaces
//! the live state only on success, so a faulty behavior cannot leave
//! the battle half mutated. Conditions are evaluated right before
//! each apply, against whatever state earlier firings produced.

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::event::BattleEvent;
use super::registry::{TriggerBehavior, TriggerKey, TriggerRef, TriggerRegistry, TriggerScope};
use crate::core::state::BattleState;
use crate::core::unit::{Unit, UnitId};

/// A behavior that fired, for notification fan-out.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FiredTrigger {
    pub key: TriggerKey,
    pub owner: UnitId,
    pub name: String,
    pub priority: i32,
}

struct Candidate<'r> {
    priority: i32,
    seq: usize,
    owner: UnitId,
    key: TriggerKey,
    /// Which same-key ref on the owner this is, in attachment order.
    occurrence: usize,
    behavior: &'r TriggerBehavior,
}

/// Dispatch one event against every matching trigger ref in the battle.
///
/// Refs whose key is not registered are skipped with a warning. A
/// condition or apply error skips that ref and leaves the state as the
/// previous firing left it. Returns the behaviors that actually fired,
/// in firing order.
pub fn handle_event(
    state: &mut BattleState,
    registry: &TriggerRegistry,
    event: &BattleEvent,
) -> Vec<FiredTrigger> {
    let mut candidates = Vec::new();
    let mut seq = 0usize;
    for unit in state.units() {
        for (index, reference) in unit.triggers.iter().enumerate() {
            let Some(behavior) = registry.get(&reference.key) else {
                warn!(key = %reference.key, unit = %unit.id, "trigger key not registered, skipping");
                continue;
            };
            if behavior.event != event.kind || !reference.has_uses_left() {
                continue;
            }
            let occurrence = unit.triggers[..index]
                .iter()
                .filter(|earlier| earlier.key == reference.key)
                .count();
            candidates.push(Candidate {
                priority: behavior.priority,
                seq,
                owner: unit.id,
                key: reference.key.clone(),
                occurrence,
                behavior,
            });
            seq += 1;
        }
    }
    candidates.sort_by(|a, b| b.priority.cmp(&a.priority).then(a.seq.cmp(&b.seq)));

    let mut fired = Vec::new();
    for candidate in candidates {
        // Earlier firings may have removed the owner or the ref.
        let Some(unit) = state.unit(candidate.owner) else {
            continue;
        };
        let Some(reference) = nth_ref(unit, &candidate.key, candidate.occurrence) else {
            continue;
        };
        if !reference.has_uses_left() {
            continue;
        }
        let reference = reference.clone();
        let scope = TriggerScope {
            owner: candidate.owner,
            event,
            reference: &reference,
        };
        match (candidate.behavior.condition)(state, &scope) {
            Ok(true) => {}
            Ok(false) => continue,
            Err(error) => {
                warn!(
                    key = %candidate.key,
                    unit = %candidate.owner,
                    %error,
                    "trigger condition errored, skipping"
                );
                continue;
            }
        }
        let mut staged = state.clone();
        match (candidate.behavior.apply)(&mut staged, &scope) {
            Ok(()) => {
                *state = staged;
                spend_use(state, candidate.owner, &candidate.key, candidate.occurrence);
                fired.push(FiredTrigger {
                    key: candidate.key,
                    owner: candidate.owner,
                    name: candidate.behavior.name.clone(),
                    priority: candidate.priority,
                });
            }
            Err(error) => {
                warn!(
                    key = %candidate.key,
                    unit = %candidate.owner,
                    %error,
                    "trigger apply errored, state unchanged"
                );
            }
        }
    }
    fired
}

fn nth_ref<'a>(unit: &'a Unit, key: &TriggerKey, occurrence: usize) -> Option<&'a TriggerRef> {
    unit.triggers
        .iter()
        .filter(|reference| reference.key == *key)
        .nth(occurrence)
}

/// Burn one use on the committed state, dropping the ref when spent.
/// A no-op when the apply already removed the ref.
fn spend_use(state: &mut BattleState, owner: UnitId, key: &TriggerKey, occurrence: usize) {
    let Some(unit) = state.unit_mut(owner) else {
        return;
    };
    let mut seen = 0usize;
    for index in 0..unit.triggers.len() {
        if unit.triggers[index].key == *key {
            if seen == occurrence {
                if unit.triggers[index].consume_use() {
                    unit.triggers.remove(index);
                }
                return;
            }
            seen += 1;
        }
    }
}
