//! Attack lifecycle orchestration.
//!
//! Free functions over [`BattleState`]; each call is a complete,
//! synchronous transform that either commits or returns a typed error
//! with the state untouched. The lifecycle:
//!
//! 1. [`initiate`]: attacker composes force, collects buckets, and a
//!    record lands in `combat_sent` per target.
//! 2. [`receive`]: defender acknowledges, freezes their own buckets,
//!    and a copy lands in `combat_received`.
//! 3. Negotiation calls ([`choose_defense`], the luck attempts, seal
//!    and declines) mutate the response and mirror it to both copies.
//! 4. [`finalize`]: crit and damage are computed once and mirrored.
//! 5. [`confirm_received`] / [`confirm_sent`]: each side retires its
//!    copy; damage applies exactly once, on the defender's confirm.
//!
//! Confirmations are idempotent: a replayed confirm for an already
//! processed combat reports `replayed` and changes nothing.

use tracing::warn;

use super::damage::{self, AttackProfile, Composition};
use super::modifiers;
use super::negotiation::{
    roll_check, CombatOutcome, DefenseChoice, NegotiationStep, ResponseRecord,
};
use super::record::{CombatId, CombatPhase, CombatRecord};
use crate::core::state::BattleState;
use crate::core::unit::UnitId;
use crate::error::{EngineError, Result};
use crate::triggers::event::BattleEvent;

/// What an initiation produced: one record per target, already pushed
/// into the attacker's outgoing mailbox.
#[derive(Clone, Debug)]
pub struct InitiateReport {
    pub records: Vec<CombatRecord>,
    pub events: Vec<BattleEvent>,
}

/// Which mailbox a confirmation settled.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConfirmSide {
    Attacker,
    Defender,
}

/// What a confirmation did.
#[derive(Clone, Debug)]
pub struct ConfirmReport {
    pub combat: CombatId,
    pub side: ConfirmSide,
    /// The combat was already processed; nothing changed.
    pub replayed: bool,
    pub damage_applied: i64,
    pub defeated: bool,
    pub counter_granted: bool,
    pub events: Vec<BattleEvent>,
}

impl ConfirmReport {
    fn new(combat: CombatId, side: ConfirmSide) -> Self {
        Self {
            combat,
            side,
            replayed: false,
            damage_applied: 0,
            defeated: false,
            counter_granted: false,
            events: Vec::new(),
        }
    }

    fn replayed(combat: CombatId, side: ConfirmSide) -> Self {
        Self {
            replayed: true,
            ..Self::new(combat, side)
        }
    }
}

/// Start an attack against one or more targets.
pub fn initiate(
    state: &mut BattleState,
    attacker_id: UnitId,
    targets: &[UnitId],
    profile: AttackProfile,
) -> Result<InitiateReport> {
    initiate_inner(state, attacker_id, targets, profile, None)
}

/// Start the counter attack a processed combat granted.
///
/// The target is the unit recorded at grant time; eligibility is
/// cleared only after the initiation succeeds.
pub fn initiate_counter(
    state: &mut BattleState,
    attacker_id: UnitId,
    profile: AttackProfile,
) -> Result<InitiateReport> {
    let target = {
        let attacker = state.require_unit(attacker_id)?;
        if !attacker.can_counter {
            return Err(EngineError::InvalidAction(
                "unit has no counter available".into(),
            ));
        }
        attacker.countering_against.ok_or_else(|| {
            EngineError::InvalidAction("no counter target recorded".into())
        })?
    };

    let report = initiate_inner(state, attacker_id, &[target], profile, Some(target))?;
    if let Some(unit) = state.unit_mut(attacker_id) {
        unit.can_counter = false;
        unit.countering_against = None;
    }
    Ok(report)
}

fn initiate_inner(
    state: &mut BattleState,
    attacker_id: UnitId,
    targets: &[UnitId],
    profile: AttackProfile,
    counter_target: Option<UnitId>,
) -> Result<InitiateReport> {
    if targets.is_empty() {
        return Err(EngineError::InvalidAction(
            "attack needs at least one target".into(),
        ));
    }
    if profile.is_np() && state.round < state.config.np_unlock_round {
        return Err(EngineError::NoblePhantasmLocked {
            round: state.round,
            unlock: state.config.np_unlock_round,
        });
    }

    let attacker = state.require_unit(attacker_id)?;
    if attacker.is_defeated() {
        return Err(EngineError::InvalidAction(
            "defeated units cannot attack".into(),
        ));
    }
    for &target in targets {
        state.require_unit(target)?;
    }

    let composition = Composition::derive(
        attacker.parameters.magic.value,
        attacker.parameters.strength.value,
        &profile,
    );
    let (mods, plan) = modifiers::collect_attacker(attacker, state.turn, profile.is_np());
    let snapshot = attacker.snapshot();

    // One attack action reads the buckets once, so finite uses burn
    // once even when the action fans out to several targets.
    if let Some(unit) = state.unit_mut(attacker_id) {
        plan.apply(unit);
    }

    let mut report = InitiateReport {
        records: Vec::new(),
        events: Vec::new(),
    };
    for &target in targets {
        let id = state.alloc_combat_id();
        let mut record = CombatRecord::new(id, snapshot.clone(), target, profile, composition)
            .with_attacker_mods(mods);
        if counter_target == Some(target) {
            record = record.as_counter(target);
        }

        let event = BattleEvent::combat_initiated(attacker_id, target, id);
        state.record_event(event.clone());
        report.events.push(event);
        report.records.push(record.clone());
        state.require_unit_mut(attacker_id)?.combat_sent.push(record);
    }
    Ok(report)
}

/// Defender acknowledges the incoming attack.
///
/// Freezes the defender's vitals and modifier buckets into the record
/// and places the copy in the incoming mailbox. Acknowledging the same
/// combat again just echoes the current record.
pub fn receive(
    state: &mut BattleState,
    defender_id: UnitId,
    combat_id: CombatId,
) -> Result<CombatRecord> {
    let (attacker_id, record) =
        find_sent(state, combat_id).ok_or(EngineError::CombatNotFound(combat_id))?;
    if record.defender_id != defender_id {
        return Err(EngineError::InvalidAction(format!(
            "combat {} is aimed at {}, not {}",
            combat_id, record.defender_id, defender_id
        )));
    }

    let defender = state.require_unit(defender_id)?;
    if let Some(existing) = &defender.combat_received {
        if existing.id == combat_id {
            return Ok(existing.clone());
        }
        return Err(EngineError::IncomingCombatOccupied(defender_id));
    }
    if record.phase != CombatPhase::Initiated {
        return Err(EngineError::InvalidAction(format!(
            "combat {} was already acknowledged",
            combat_id
        )));
    }

    let (mods, plan) = modifiers::collect_defender(
        defender,
        &record.attacker,
        &record.profile,
        &record.composition,
        state.turn,
    );
    let snapshot = defender.snapshot();

    let mut record = record;
    record.mark_received(snapshot, mods);
    record.defender_consumption = plan;

    replace_sent(state, attacker_id, &record);
    state.require_unit_mut(defender_id)?.receive_combat(record.clone())?;
    Ok(record)
}

/// Defender picks a stance. `Evade` rolls the agility check.
pub fn choose_defense(
    state: &mut BattleState,
    defender_id: UnitId,
    combat_id: CombatId,
    choice: DefenseChoice,
) -> Result<ResponseRecord> {
    let (holder, mut record) =
        find_received(state, combat_id).ok_or(EngineError::CombatNotFound(combat_id))?;
    if holder != defender_id {
        return Err(EngineError::InvalidAction(
            "only the defender may choose a response".into(),
        ));
    }

    let agility = if choice == DefenseChoice::Evade {
        // The window is verified before the die is cast, so a rejected
        // message never advances the stream.
        ensure_open(&record.response, NegotiationStep::ChooseResponse, false)?;
        let rank = state.require_unit(defender_id)?.parameters.agility.rank;
        Some(roll_check(rank, &mut state.rng, &state.config))
    } else {
        None
    };

    record.response.choose(choice, agility)?;
    let attacker_id = record.attacker.id;
    mirror(state, attacker_id, defender_id, &record);
    Ok(record.response)
}

/// Attacker rolls luck to land the hit after a successful dodge.
pub fn attempt_luck_hit(
    state: &mut BattleState,
    unit_id: UnitId,
    combat_id: CombatId,
) -> Result<ResponseRecord> {
    let (defender_id, mut record) =
        find_received(state, combat_id).ok_or(EngineError::CombatNotFound(combat_id))?;
    if record.attacker.id != unit_id {
        return Err(EngineError::InvalidAction(
            "only the attacker may attempt a luck hit".into(),
        ));
    }

    ensure_open(&record.response, NegotiationStep::LuckWindow, true)?;
    let rank = state.require_unit(unit_id)?.parameters.luck.rank;
    let outcome = roll_check(rank, &mut state.rng, &state.config);

    record.response.record_luck_hit(outcome)?;
    mirror(state, unit_id, defender_id, &record);
    Ok(record.response)
}

/// Defender rolls luck to slip the hit.
pub fn attempt_luck_evade(
    state: &mut BattleState,
    unit_id: UnitId,
    combat_id: CombatId,
) -> Result<ResponseRecord> {
    let (defender_id, mut record) =
        find_received(state, combat_id).ok_or(EngineError::CombatNotFound(combat_id))?;
    if defender_id != unit_id {
        return Err(EngineError::InvalidAction(
            "only the defender may attempt a luck evade".into(),
        ));
    }

    ensure_open(&record.response, NegotiationStep::LuckWindow, false)?;
    let rank = state.require_unit(unit_id)?.parameters.luck.rank;
    let outcome = roll_check(rank, &mut state.rng, &state.config);

    record.response.record_luck_evade(outcome)?;
    let attacker_id = record.attacker.id;
    mirror(state, attacker_id, defender_id, &record);
    Ok(record.response)
}

/// Defender burns a command seal for a guaranteed evade.
pub fn evade_with_seal(
    state: &mut BattleState,
    unit_id: UnitId,
    combat_id: CombatId,
) -> Result<ResponseRecord> {
    let (defender_id, mut record) =
        find_received(state, combat_id).ok_or(EngineError::CombatNotFound(combat_id))?;
    if defender_id != unit_id {
        return Err(EngineError::InvalidAction(
            "only the defender may spend a command seal".into(),
        ));
    }

    // Window first, seal second: a rejected message must not cost one.
    ensure_open(&record.response, NegotiationStep::LuckWindow, false)?;
    {
        let unit = state.require_unit_mut(unit_id)?;
        if !unit.spend_command_seal() {
            return Err(EngineError::NoCommandSeals(unit_id));
        }
    }

    record.response.record_seal_evade()?;
    let attacker_id = record.attacker.id;
    mirror(state, attacker_id, defender_id, &record);
    Ok(record.response)
}

/// Attacker passes on the luck-hit window.
pub fn decline_luck_hit(
    state: &mut BattleState,
    unit_id: UnitId,
    combat_id: CombatId,
) -> Result<ResponseRecord> {
    let (defender_id, mut record) =
        find_received(state, combat_id).ok_or(EngineError::CombatNotFound(combat_id))?;
    if record.attacker.id != unit_id {
        return Err(EngineError::InvalidAction(
            "only the attacker may decline the luck hit".into(),
        ));
    }

    record.response.decline_luck_hit()?;
    mirror(state, unit_id, defender_id, &record);
    Ok(record.response)
}

/// Defender passes on the luck-evade window.
pub fn decline_luck_evade(
    state: &mut BattleState,
    unit_id: UnitId,
    combat_id: CombatId,
) -> Result<ResponseRecord> {
    let (defender_id, mut record) =
        find_received(state, combat_id).ok_or(EngineError::CombatNotFound(combat_id))?;
    if defender_id != unit_id {
        return Err(EngineError::InvalidAction(
            "only the defender may decline the luck evade".into(),
        ));
    }

    record.response.decline_luck_evade()?;
    let attacker_id = record.attacker.id;
    mirror(state, attacker_id, defender_id, &record);
    Ok(record.response)
}

/// Resolve the settled negotiation into crit and damage.
///
/// A hit rolls the critical once and computes the breakdown against
/// the defense-choice-adjusted buckets; an evade settles at zero.
/// Finalizing an already finalized combat echoes the record.
pub fn finalize(state: &mut BattleState, combat_id: CombatId) -> Result<CombatRecord> {
    let (defender_id, mut record) =
        find_received(state, combat_id).ok_or(EngineError::CombatNotFound(combat_id))?;
    if record.phase == CombatPhase::Finalized {
        return Ok(record);
    }
    if !record.response.is_confirmable() {
        return Err(EngineError::WrongNegotiationStep {
            expected: NegotiationStep::Confirm.number(),
            actual: record.response.step.number(),
        });
    }

    match record.response.resolve_outcome() {
        CombatOutcome::Evaded => record.mark_evaded(),
        CombatOutcome::Hit => {
            let defender_mods = record.effective_defender_mods();
            let critical = damage::roll_critical(
                &state.config,
                &record.attacker_mods,
                &defender_mods,
                &mut state.rng,
            );
            let breakdown = damage::compute_breakdown(
                &record.composition,
                &record.profile,
                &record.attacker_mods,
                &defender_mods,
                &critical,
            );
            record.mark_finalized(critical, breakdown);
        }
    }

    let attacker_id = record.attacker.id;
    mirror(state, attacker_id, defender_id, &record);
    Ok(record)
}

/// Defender confirms the finalized combat.
///
/// Applies the damage (once), consumes the defender's finite-use
/// effects when the hit landed, optionally grants counter eligibility,
/// and retires the incoming copy.
pub fn confirm_received(
    state: &mut BattleState,
    unit_id: UnitId,
    combat_id: CombatId,
    wants_counter: bool,
) -> Result<ConfirmReport> {
    let record = {
        let unit = state.require_unit(unit_id)?;
        if unit.has_processed(combat_id) {
            return Ok(ConfirmReport::replayed(combat_id, ConfirmSide::Defender));
        }
        unit.combat_received
            .as_ref()
            .filter(|r| r.id == combat_id)
            .cloned()
            .ok_or(EngineError::CombatNotFound(combat_id))?
    };

    if record.phase != CombatPhase::Finalized {
        return Err(EngineError::InvalidAction(format!(
            "combat {} is not finalized",
            combat_id
        )));
    }
    if wants_counter && record.counter_target == Some(unit_id) {
        return Err(EngineError::DoubleCounter(unit_id));
    }

    let attacker_id = record.attacker.id;
    let outcome = record.outcome();
    let damage = record.damage_total();

    let mut report = ConfirmReport::new(combat_id, ConfirmSide::Defender);
    let mut events = Vec::new();
    {
        let unit = state.require_unit_mut(unit_id)?;
        if outcome == CombatOutcome::Hit {
            let applied = unit.apply_damage(damage);
            record.defender_consumption.apply(unit);
            report.damage_applied = applied;
            events.push(BattleEvent::attack_landed(
                attacker_id,
                unit_id,
                combat_id,
                applied,
            ));
            events.push(BattleEvent::damage_received(
                unit_id,
                attacker_id,
                combat_id,
                applied,
            ));
            if applied > 0 {
                events.push(BattleEvent::hp_lost(unit_id, applied));
            }
            if unit.is_defeated() {
                report.defeated = true;
                events.push(BattleEvent::unit_defeated(unit_id));
            }
        }
        if wants_counter && !unit.is_defeated() {
            unit.can_counter = true;
            unit.countering_against = Some(attacker_id);
            report.counter_granted = true;
        }
        unit.retire_received(combat_id);
    }

    for event in &events {
        state.record_event(event.clone());
    }
    report.events = events;
    Ok(report)
}

/// Attacker confirms the finalized combat and retires their copy.
pub fn confirm_sent(
    state: &mut BattleState,
    unit_id: UnitId,
    combat_id: CombatId,
) -> Result<ConfirmReport> {
    let unit = state.require_unit_mut(unit_id)?;
    if unit.has_processed(combat_id) {
        return Ok(ConfirmReport::replayed(combat_id, ConfirmSide::Attacker));
    }
    let record = unit
        .sent_record(combat_id)
        .ok_or(EngineError::CombatNotFound(combat_id))?;
    if record.phase != CombatPhase::Finalized {
        return Err(EngineError::InvalidAction(format!(
            "combat {} is not finalized",
            combat_id
        )));
    }
    unit.retire_sent(combat_id);
    Ok(ConfirmReport::new(combat_id, ConfirmSide::Attacker))
}

/// Abandon a combat: discard every copy without applying anything.
pub fn fail_combat(state: &mut BattleState, combat_id: CombatId) -> Result<()> {
    let ids: Vec<UnitId> = state.units().iter().map(|unit| unit.id).collect();
    let mut found = false;
    for id in ids {
        let Some(unit) = state.unit_mut(id) else { continue };
        found |= unit.discard_sent(combat_id).is_some();
        found |= unit.discard_received(combat_id).is_some();
    }
    if !found {
        return Err(EngineError::CombatNotFound(combat_id));
    }
    warn!(combat = %combat_id, "combat failed and discarded without resolution");
    Ok(())
}

// === Record plumbing ===

fn find_sent(state: &BattleState, id: CombatId) -> Option<(UnitId, CombatRecord)> {
    state
        .units()
        .iter()
        .find_map(|unit| unit.sent_record(id).map(|record| (unit.id, record.clone())))
}

fn find_received(state: &BattleState, id: CombatId) -> Option<(UnitId, CombatRecord)> {
    state.units().iter().find_map(|unit| {
        unit.combat_received
            .as_ref()
            .filter(|record| record.id == id)
            .map(|record| (unit.id, record.clone()))
    })
}

fn replace_sent(state: &mut BattleState, owner: UnitId, record: &CombatRecord) {
    if let Some(slot) = state
        .unit_mut(owner)
        .and_then(|unit| unit.sent_record_mut(record.id))
    {
        *slot = record.clone();
    }
}

/// Write the updated record into both sides' mailboxes.
fn mirror(state: &mut BattleState, attacker_id: UnitId, defender_id: UnitId, record: &CombatRecord) {
    replace_sent(state, attacker_id, record);
    if let Some(slot) = state
        .unit_mut(defender_id)
        .and_then(|unit| unit.combat_received.as_mut())
    {
        if slot.id == record.id {
            *slot = record.clone();
        }
    }
}

/// Mirror of the response record's own guards, checked before any die
/// is cast so a rejected message never advances the RNG stream.
fn ensure_open(response: &ResponseRecord, step: NegotiationStep, attacker_side: bool) -> Result<()> {
    if response.step != step {
        return Err(EngineError::WrongNegotiationStep {
            expected: step.number(),
            actual: response.step.number(),
        });
    }
    let (open, side) = if attacker_side {
        (response.awaiting_attacker, "attacker")
    } else {
        (response.awaiting_defender, "defender")
    };
    if !open {
        return Err(EngineError::WindowClosed { side });
    }
    Ok(())
}
