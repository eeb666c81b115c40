//! Stock trigger behaviors.
//!
//! The passives every campaign gets for free. Each behavior reads its
//! tuning from the ref's params, so "guts that restores 200 HP" and
//! "guts that restores 1 HP" are the same registered key with
//! different refs. Campaign-specific behaviors register alongside
//! these under their own keys.

use super::event::EventKind;
use super::registry::{TriggerBehavior, TriggerRegistry, TriggerScope};
use crate::core::effect::{Archetype, Effect, EffectKind};
use crate::core::state::BattleState;
use crate::error::Result;

/// Register the stock library into a registry.
pub fn register_stock(registry: &mut TriggerRegistry) {
    registry.register(guts());
    registry.register(vengeance());
    registry.register(regeneration());
    registry.register(presence_concealment());
    registry.register(overcharge());
}

/// Revives the owner the moment HP loss would defeat them.
///
/// Params: `restore` (HP after revival, default 1). Grant with
/// `with_uses(1)` for the classic one-shot version.
#[must_use]
pub fn guts() -> TriggerBehavior {
    TriggerBehavior::new("guts", "Guts", EventKind::HpLost, guts_condition, guts_apply)
        .with_priority(100)
}

/// Stacks an attack buff every time the owner takes combat damage.
///
/// Params: `gain` (percent attack per stack, default 10).
#[must_use]
pub fn vengeance() -> TriggerBehavior {
    TriggerBehavior::new(
        "vengeance",
        "Vengeance",
        EventKind::DamageReceived,
        vengeance_condition,
        vengeance_apply,
    )
}

/// Heals the owner at the start of their player's turn.
///
/// Params: `amount` (HP per turn, default 5).
#[must_use]
pub fn regeneration() -> TriggerBehavior {
    TriggerBehavior::new(
        "regeneration",
        "Regeneration",
        EventKind::TurnStart,
        regeneration_condition,
        regeneration_apply,
    )
}

/// A failed attempt to spot the concealed owner exposes the seeker:
/// the owner gains the right to counterattack them.
#[must_use]
pub fn presence_concealment() -> TriggerBehavior {
    TriggerBehavior::new(
        "presence_concealment",
        "Presence Concealment",
        EventKind::DetectionAttempt,
        concealment_condition,
        concealment_apply,
    )
}

/// Short crit-chance surge after the owner unleashes their Noble
/// Phantasm.
///
/// Params: `gain` (crit chance points, default 15), `duration`
/// (turns, default 2).
#[must_use]
pub fn overcharge() -> TriggerBehavior {
    TriggerBehavior::new(
        "overcharge",
        "Overcharge",
        EventKind::NpUsed,
        overcharge_condition,
        overcharge_apply,
    )
}

fn guts_condition(state: &BattleState, scope: &TriggerScope<'_>) -> Result<bool> {
    if scope.event.target != Some(scope.owner) {
        return Ok(false);
    }
    Ok(state.require_unit(scope.owner)?.is_defeated())
}

fn guts_apply(state: &mut BattleState, scope: &TriggerScope<'_>) -> Result<()> {
    let restore = scope.param("restore", 1);
    let unit = state.require_unit_mut(scope.owner)?;
    unit.hp = restore.clamp(1, unit.max_hp);
    Ok(())
}

fn vengeance_condition(state: &BattleState, scope: &TriggerScope<'_>) -> Result<bool> {
    if scope.event.target != Some(scope.owner) {
        return Ok(false);
    }
    Ok(!state.require_unit(scope.owner)?.is_defeated())
}

fn vengeance_apply(state: &mut BattleState, scope: &TriggerScope<'_>) -> Result<()> {
    let gain = scope.param("gain", 10) as f64;
    let effect = Effect::new("Vengeance", EffectKind::AttackPercent, gain)
        .with_archetype(Archetype::Buff)
        .with_source("vengeance");
    state.grant_effect(scope.owner, effect)?;
    Ok(())
}

fn regeneration_condition(state: &BattleState, scope: &TriggerScope<'_>) -> Result<bool> {
    let unit = state.require_unit(scope.owner)?;
    if scope.event.player != Some(unit.player) || unit.is_defeated() {
        return Ok(false);
    }
    Ok(unit.hp < unit.max_hp)
}

fn regeneration_apply(state: &mut BattleState, scope: &TriggerScope<'_>) -> Result<()> {
    let amount = scope.param("amount", 5);
    state.require_unit_mut(scope.owner)?.heal(amount);
    Ok(())
}

fn concealment_condition(state: &BattleState, scope: &TriggerScope<'_>) -> Result<bool> {
    if scope.event.target != Some(scope.owner) || scope.event.source.is_none() {
        return Ok(false);
    }
    Ok(!state.require_unit(scope.owner)?.is_defeated())
}

fn concealment_apply(state: &mut BattleState, scope: &TriggerScope<'_>) -> Result<()> {
    let seeker = scope.event.source;
    let unit = state.require_unit_mut(scope.owner)?;
    unit.can_counter = true;
    unit.countering_against = seeker;
    Ok(())
}

fn overcharge_condition(_: &BattleState, scope: &TriggerScope<'_>) -> Result<bool> {
    Ok(scope.event.source == Some(scope.owner))
}

fn overcharge_apply(state: &mut BattleState, scope: &TriggerScope<'_>) -> Result<()> {
    let gain = scope.param("gain", 15) as f64;
    let duration = scope.param("duration", 2).max(1) as u32;
    let effect = Effect::new("Overcharge", EffectKind::CritChanceUp, gain)
        .with_archetype(Archetype::Buff)
        .with_duration(duration)
        .with_source("overcharge");
    state.grant_effect(scope.owner, effect)?;
    Ok(())
}
