//! Status effect application.
//!
//! Landing an effect on a unit is a chance-based pipeline: the caster's
//! chance-up and power-up effects raise the odds and the payload, the
//! target's resist effects lower the odds, and a single percent roll
//! decides. Immunities and wards are only consulted after a successful
//! roll, so a shrugged-off effect never burns a finite-use ward.
//!
//! Collection-phase consumption is unconditional: an enabling or
//! resisting effect that contributed to the chance spends its use even
//! when the roll then fails. Blocking consumption is separate and hits
//! exactly one defensive effect, the first one that matched.

use serde::{Deserialize, Serialize};

use crate::combat::ConsumptionPlan;
use crate::core::effect::{Archetype, Effect, EffectId, EffectKind};
use crate::core::state::BattleState;
use crate::core::unit::{Unit, UnitId};
use crate::error::Result;

/// How the application ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApplicationOutcome {
    /// The effect is now on the target.
    Applied,
    /// The roll missed.
    Failed,
    /// The roll landed but an immunity or ward stopped it.
    Blocked,
}

/// Trace of one application attempt, for observers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ApplicationReport {
    pub outcome: ApplicationOutcome,
    pub chance: i32,
    pub roll: i32,
    /// ID of the stored effect when applied.
    pub effect_id: Option<EffectId>,
    /// Caster effects whose uses were spent enabling the attempt.
    pub caster_spent: Vec<EffectId>,
    /// Target effects whose uses were spent resisting the attempt.
    pub target_spent: Vec<EffectId>,
    /// The immunity or ward that blocked, when one did.
    pub blocker: Option<EffectId>,
}

struct CasterSide {
    chance_bonus: f64,
    power_up: f64,
    plan: ConsumptionPlan,
}

struct TargetSide {
    resistance: f64,
    plan: ConsumptionPlan,
    /// First matching immunity, then first matching ward.
    blocker: Option<EffectId>,
}

/// Attempt to put `candidate` on the target.
///
/// The stored effect's value is scaled by the caster's accumulated
/// power-up; `source` names what applied it.
pub fn apply(
    state: &mut BattleState,
    caster_id: UnitId,
    target_id: UnitId,
    candidate: Effect,
    source: impl Into<String>,
) -> Result<ApplicationReport> {
    let archetype = candidate.classify();
    let turn = state.turn;

    let caster_side = {
        let caster = state.require_unit(caster_id)?;
        collect_caster(caster, &candidate, archetype, turn)
    };
    let target_side = {
        let target = state.require_unit(target_id)?;
        collect_target(target, &candidate, archetype, turn)
    };

    let chance = (f64::from(state.config.base_effect_chance) + caster_side.chance_bonus
        - target_side.resistance)
        .round() as i32;
    let chance = chance.clamp(0, 100);
    let roll = state.rng.percent();

    // Contributing effects spend their uses no matter how the roll
    // went.
    let caster_spent: Vec<EffectId> = caster_side.plan.ids().collect();
    let target_spent: Vec<EffectId> = target_side.plan.ids().collect();
    if let Some(unit) = state.unit_mut(caster_id) {
        caster_side.plan.apply(unit);
    }
    if let Some(unit) = state.unit_mut(target_id) {
        target_side.plan.apply(unit);
    }

    let mut report = ApplicationReport {
        outcome: ApplicationOutcome::Failed,
        chance,
        roll,
        effect_id: None,
        caster_spent,
        target_spent,
        blocker: None,
    };

    if roll > chance {
        return Ok(report);
    }

    if let Some(blocker_id) = target_side.blocker {
        // The block itself spends a use of the defensive effect.
        if let Some(unit) = state.unit_mut(target_id) {
            let mut plan = ConsumptionPlan::default();
            plan.mark(blocker_id);
            plan.apply(unit);
        }
        report.outcome = ApplicationOutcome::Blocked;
        report.blocker = Some(blocker_id);
        return Ok(report);
    }

    let factor = 1.0 + caster_side.power_up / 100.0;
    let mut stored = candidate.with_source(source);
    stored.value *= factor;
    if let Some(np_value) = stored.np_value.as_mut() {
        *np_value *= factor;
    }

    let effect_id = state.grant_effect(target_id, stored)?;
    report.outcome = ApplicationOutcome::Applied;
    report.effect_id = Some(effect_id);
    Ok(report)
}

fn filter_allows(effect: &Effect, candidate: &Effect) -> bool {
    effect
        .filter
        .as_ref()
        .map_or(true, |filter| filter.matches(candidate))
}

fn collect_caster(
    caster: &Unit,
    candidate: &Effect,
    archetype: Archetype,
    turn: u32,
) -> CasterSide {
    let mut side = CasterSide {
        chance_bonus: 0.0,
        power_up: 0.0,
        plan: ConsumptionPlan::default(),
    };

    for effect in caster.active_effects(turn) {
        let contributes = match effect.kind {
            EffectKind::BuffChanceUp => archetype == Archetype::Buff,
            EffectKind::DebuffChanceUp => archetype == Archetype::Debuff,
            EffectKind::EffectPowerUp => true,
            _ => false,
        };
        if !contributes || !filter_allows(effect, candidate) {
            continue;
        }

        match effect.kind {
            EffectKind::EffectPowerUp => side.power_up += effect.value,
            _ => side.chance_bonus += effect.value,
        }
        if effect.uses.is_some() {
            side.plan.mark(effect.id);
        }
    }
    side
}

fn collect_target(
    target: &Unit,
    candidate: &Effect,
    archetype: Archetype,
    turn: u32,
) -> TargetSide {
    let mut side = TargetSide {
        resistance: 0.0,
        plan: ConsumptionPlan::default(),
        blocker: None,
    };

    for effect in target.active_effects(turn) {
        let resists = match effect.kind {
            EffectKind::BuffResist => archetype == Archetype::Buff,
            EffectKind::DebuffResist => archetype == Archetype::Debuff,
            _ => false,
        };
        if resists && filter_allows(effect, candidate) {
            side.resistance += effect.value;
            if effect.uses.is_some() {
                side.plan.mark(effect.id);
            }
        }
    }

    // Immunities outrank wards; within each kind the first match wins.
    for effect in target.active_effects(turn) {
        if effect.kind == EffectKind::Immunity && filter_allows(effect, candidate) {
            side.blocker = Some(effect.id);
            return side;
        }
    }
    for effect in target.active_effects(turn) {
        if effect.kind == EffectKind::Ward && filter_allows(effect, candidate) {
            side.blocker = Some(effect.id);
            return side;
        }
    }
    side
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::BattleConfig;
    use crate::core::effect::EffectFilter;
    use crate::core::unit::PlayerId;

    fn battle(base_effect_chance: i32) -> (BattleState, UnitId, UnitId) {
        let config = BattleConfig::default().with_base_effect_chance(base_effect_chance);
        let mut state = BattleState::new(config, 11);
        let caster = state.spawn(|id| Unit::new(id, "caster", PlayerId::new(0)));
        let target = state.spawn(|id| Unit::new(id, "target", PlayerId::new(1)));
        (state, caster, target)
    }

    fn poison() -> Effect {
        Effect::new("Poison", EffectKind::Marker, -10.0).with_archetype(Archetype::Debuff)
    }

    fn blessing() -> Effect {
        Effect::new("Blessing", EffectKind::AttackPercent, 20.0)
    }

    #[test]
    fn test_guaranteed_application() {
        let (mut state, caster, target) = battle(100);
        let report = apply(&mut state, caster, target, blessing(), "test").unwrap();

        assert_eq!(report.outcome, ApplicationOutcome::Applied);
        assert_eq!(report.chance, 100);
        let id = report.effect_id.unwrap();
        let stored = state.unit(target).unwrap().effect(id).unwrap();
        assert_eq!(stored.name, "Blessing");
        assert_eq!(stored.value, 20.0);
        assert_eq!(stored.source, "test");
        assert_eq!(stored.applied_at, state.turn);
    }

    #[test]
    fn test_impossible_application_fails_cleanly() {
        let (mut state, caster, target) = battle(0);
        let report = apply(&mut state, caster, target, blessing(), "test").unwrap();

        assert_eq!(report.outcome, ApplicationOutcome::Failed);
        assert!(report.effect_id.is_none());
        assert!(state.unit(target).unwrap().effects.is_empty());
    }

    #[test]
    fn test_chance_up_matches_archetype() {
        // Base 0: only the matching chance-up can push a debuff in.
        let (mut state, caster, target) = battle(0);
        state
            .grant_effect(
                caster,
                Effect::new("Hexcraft", EffectKind::DebuffChanceUp, 100.0),
            )
            .unwrap();

        let report = apply(&mut state, caster, target, poison(), "skill").unwrap();
        assert_eq!(report.outcome, ApplicationOutcome::Applied);

        // The same bonus does nothing for a buff.
        let report = apply(&mut state, caster, target, blessing(), "skill").unwrap();
        assert_eq!(report.outcome, ApplicationOutcome::Failed);
        assert_eq!(report.chance, 0);
    }

    #[test]
    fn test_resistance_lowers_chance() {
        let (mut state, caster, target) = battle(100);
        state
            .grant_effect(
                target,
                Effect::new("Iron Will", EffectKind::DebuffResist, 100.0),
            )
            .unwrap();

        let report = apply(&mut state, caster, target, poison(), "skill").unwrap();
        assert_eq!(report.outcome, ApplicationOutcome::Failed);
        assert_eq!(report.chance, 0);
    }

    #[test]
    fn test_power_up_scales_stored_value() {
        let (mut state, caster, target) = battle(100);
        state
            .grant_effect(
                caster,
                Effect::new("Amplify", EffectKind::EffectPowerUp, 50.0),
            )
            .unwrap();

        let report = apply(&mut state, caster, target, blessing(), "skill").unwrap();
        let stored = state
            .unit(target)
            .unwrap()
            .effect(report.effect_id.unwrap())
            .unwrap()
            .clone();
        assert_eq!(stored.value, 30.0);
    }

    #[test]
    fn test_immunity_blocks_and_spends_a_use() {
        let (mut state, caster, target) = battle(100);
        state
            .grant_effect(
                target,
                Effect::new("Poison Immunity", EffectKind::Immunity, 0.0)
                    .with_filter(EffectFilter::Name("Poison".into()))
                    .with_uses(1),
            )
            .unwrap();

        let report = apply(&mut state, caster, target, poison(), "skill").unwrap();
        assert_eq!(report.outcome, ApplicationOutcome::Blocked);
        assert!(report.blocker.is_some());
        assert!(state.unit(target).unwrap().effects.is_empty());

        // Non-matching candidate sails past the (now spent) immunity.
        let report = apply(&mut state, caster, target, blessing(), "skill").unwrap();
        assert_eq!(report.outcome, ApplicationOutcome::Applied);
    }

    #[test]
    fn test_failed_roll_never_consumes_a_ward() {
        let (mut state, caster, target) = battle(0);
        let ward_id = state
            .grant_effect(
                target,
                Effect::new("Seal of Purity", EffectKind::Ward, 0.0)
                    .with_filter(EffectFilter::Archetype(Archetype::Debuff))
                    .with_uses(1),
            )
            .unwrap();

        let report = apply(&mut state, caster, target, poison(), "skill").unwrap();
        assert_eq!(report.outcome, ApplicationOutcome::Failed);
        assert!(report.blocker.is_none());
        assert!(state.unit(target).unwrap().effect(ward_id).is_some());
    }

    #[test]
    fn test_first_matching_ward_wins() {
        let (mut state, caster, target) = battle(100);
        let first = state
            .grant_effect(
                target,
                Effect::new("Outer Ward", EffectKind::Ward, 0.0)
                    .with_filter(EffectFilter::Archetype(Archetype::Debuff))
                    .with_uses(1),
            )
            .unwrap();
        let second = state
            .grant_effect(
                target,
                Effect::new("Inner Ward", EffectKind::Ward, 0.0)
                    .with_filter(EffectFilter::Archetype(Archetype::Debuff))
                    .with_uses(1),
            )
            .unwrap();

        let report = apply(&mut state, caster, target, poison(), "skill").unwrap();
        assert_eq!(report.outcome, ApplicationOutcome::Blocked);
        assert_eq!(report.blocker, Some(first));
        let target_unit = state.unit(target).unwrap();
        assert!(target_unit.effect(first).is_none());
        assert!(target_unit.effect(second).is_some());
    }

    #[test]
    fn test_contributing_bonus_spends_use_even_on_failure() {
        // Chance-up contributes but the floor still clamps to zero.
        let (mut state, caster, target) = battle(-200);
        let bonus = state
            .grant_effect(
                caster,
                Effect::new("Last Push", EffectKind::BuffChanceUp, 100.0).with_uses(1),
            )
            .unwrap();

        let report = apply(&mut state, caster, target, blessing(), "skill").unwrap();
        assert_eq!(report.outcome, ApplicationOutcome::Failed);
        assert_eq!(report.chance, 0);
        assert_eq!(report.caster_spent, vec![bonus]);
        assert!(state.unit(caster).unwrap().effects.is_empty());
    }

    #[test]
    fn test_filtered_bonus_applies_only_to_matching_candidates() {
        let (mut state, caster, target) = battle(0);
        state
            .grant_effect(
                caster,
                Effect::new("Poisoncraft", EffectKind::DebuffChanceUp, 100.0)
                    .with_filter(EffectFilter::Name("Poison".into())),
            )
            .unwrap();

        let report = apply(&mut state, caster, target, poison(), "skill").unwrap();
        assert_eq!(report.outcome, ApplicationOutcome::Applied);

        let curse = Effect::new("Curse", EffectKind::Marker, -5.0).with_archetype(Archetype::Debuff);
        let report = apply(&mut state, caster, target, curse, "skill").unwrap();
        assert_eq!(report.outcome, ApplicationOutcome::Failed);
    }

    #[test]
    fn test_self_application() {
        let (mut state, caster, _) = battle(100);
        let report = apply(&mut state, caster, caster, blessing(), "skill").unwrap();
        assert_eq!(report.outcome, ApplicationOutcome::Applied);
        assert_eq!(state.unit(caster).unwrap().effects.len(), 1);
    }
}
