//! Two-pass combat modifier collection.
//!
//! Collection reads a unit's active effects into numeric buckets
//! without touching them; consumption is a separate pass driven by the
//! returned [`ConsumptionPlan`]. The split means a collection that gets
//! discarded (failed guard, preview) never burns a finite-use effect,
//! and a kept collection burns each one exactly once.
//!
//! Defender collection also resolves rank-based resistance per damage
//! type: a Noble Phantasm attack compares its fixed rank against the
//! resistance effect's stored rank, an ordinary attack compares the two
//! units' parameter ranks. A dominating defense rank marks the type
//! completely negated. A type with zero force is skipped entirely, so
//! its resistance effects are neither read nor consumed.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use super::damage::{AttackProfile, Composition, DamageType};
use crate::core::{EffectId, EffectKind, Rank, Unit, UnitSnapshot};

/// Attacker-side buckets.
#[derive(Clone, Copy, Debug, PartialEq, Default, Serialize, Deserialize)]
pub struct AttackerMods {
    /// Flat attack bonus.
    pub flat: f64,
    /// Percent attack bonus.
    pub percent: f64,
    /// Critical chance bonus.
    pub crit_chance: f64,
    /// Critical damage bonus.
    pub crit_damage: f64,
    /// Flat shaving of resistance negation.
    pub nullify_flat: f64,
    /// Percent shaving of resistance negation.
    pub nullify_percent: f64,
}

/// One damage type's resolved resistance.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TypeResistance {
    /// Rank the attack brought to the comparison.
    pub attack_rank: Rank,
    /// Strongest defense rank among the matching resistance effects.
    pub defense_rank: Rank,
    /// Defense rank dominated: the type is fully resisted.
    pub negated: bool,
    /// Accumulated flat reduction (used when not negated).
    pub flat: f64,
    /// Accumulated percent reduction (used when not negated).
    pub percent: f64,
}

/// Defender-side buckets.
#[derive(Clone, Copy, Debug, PartialEq, Default, Serialize, Deserialize)]
pub struct DefenderMods {
    /// Flat damage reduction from bracing.
    pub flat: f64,
    /// Percent damage reduction from bracing.
    pub percent: f64,
    /// Critical chance reduction.
    pub crit_resist: f64,
    /// Magical resistance, when any matching effect was read.
    pub magic: Option<TypeResistance>,
    /// Physical resistance, when any matching effect was read.
    pub strength: Option<TypeResistance>,
}

impl DefenderMods {
    /// Resistance for one damage type.
    #[must_use]
    pub fn resistance(&self, damage_type: DamageType) -> Option<&TypeResistance> {
        match damage_type {
            DamageType::Magic => self.magic.as_ref(),
            DamageType::Strength => self.strength.as_ref(),
        }
    }

    /// The same mods with the bracing buckets withheld.
    ///
    /// Used when the defender chose not to defend: stat-based flat and
    /// percent defense need a braced stance, while resistances and
    /// critical resistance are passive and always apply.
    #[must_use]
    pub fn unbraced(&self) -> Self {
        Self {
            flat: 0.0,
            percent: 0.0,
            ..*self
        }
    }
}

/// Effects to consume once a collection is committed.
#[derive(Clone, Debug, PartialEq, Default, Serialize, Deserialize)]
pub struct ConsumptionPlan {
    ids: SmallVec<[EffectId; 4]>,
}

impl ConsumptionPlan {
    /// Record a finite-use effect that was read.
    pub fn mark(&mut self, id: EffectId) {
        if !self.ids.contains(&id) {
            self.ids.push(id);
        }
    }

    /// Fold another plan into this one.
    pub fn merge(&mut self, other: &ConsumptionPlan) {
        for &id in &other.ids {
            self.mark(id);
        }
    }

    /// Nothing to consume?
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Number of marked effects.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// The marked effect IDs.
    pub fn ids(&self) -> impl Iterator<Item = EffectId> + '_ {
        self.ids.iter().copied()
    }

    /// Decrement every marked effect's uses, removing the exhausted
    /// ones. Returns the IDs that were removed.
    pub fn apply(&self, unit: &mut Unit) -> Vec<EffectId> {
        let mut removed = Vec::new();
        for &id in &self.ids {
            let exhausted = match unit.effect_mut(id) {
                Some(effect) => effect.consume_use(),
                None => continue,
            };
            if exhausted {
                unit.remove_effect(id);
                removed.push(id);
            }
        }
        removed
    }
}

/// Read the attacker's buckets. Pure; consumption goes into the plan.
#[must_use]
pub fn collect_attacker(unit: &Unit, turn: u32, versus_np: bool) -> (AttackerMods, ConsumptionPlan) {
    let mut mods = AttackerMods::default();
    let mut plan = ConsumptionPlan::default();

    for effect in unit.active_effects(turn) {
        let value = effect.magnitude(versus_np);
        match effect.kind {
            EffectKind::AttackFlat => mods.flat += value,
            EffectKind::AttackPercent => mods.percent += value,
            EffectKind::CritChanceUp => mods.crit_chance += value,
            EffectKind::CritDamageUp => mods.crit_damage += value,
            EffectKind::NullifyFlat => mods.nullify_flat += value,
            EffectKind::NullifyPercent => mods.nullify_percent += value,
            _ => continue,
        }
        if effect.uses.is_some() {
            plan.mark(effect.id);
        }
    }

    (mods, plan)
}

/// Read the defender's buckets and resolve per-type resistance.
/// Pure; consumption goes into the plan.
#[must_use]
pub fn collect_defender(
    unit: &Unit,
    attacker: &UnitSnapshot,
    profile: &AttackProfile,
    composition: &Composition,
    turn: u32,
) -> (DefenderMods, ConsumptionPlan) {
    let versus_np = profile.is_np();
    let mut mods = DefenderMods::default();
    let mut plan = ConsumptionPlan::default();

    for effect in unit.active_effects(turn) {
        let value = effect.magnitude(versus_np);
        match effect.kind {
            EffectKind::DefenseFlat => mods.flat += value,
            EffectKind::DefensePercent => mods.percent += value,
            EffectKind::CritResistUp => mods.crit_resist += value,
            _ => continue,
        }
        if effect.uses.is_some() {
            plan.mark(effect.id);
        }
    }

    if composition.force_magic > 0.0 {
        let attack_rank = if versus_np {
            profile.np_rank.unwrap_or(attacker.parameters.magic.rank)
        } else {
            attacker.parameters.magic.rank
        };
        mods.magic = resolve_type_resistance(
            unit,
            turn,
            versus_np,
            DamageType::Magic,
            attack_rank,
            unit.parameters.magic.rank,
            &mut plan,
        );
    }

    if composition.force_strength > 0.0 {
        let attack_rank = if versus_np {
            profile.np_rank.unwrap_or(attacker.parameters.strength.rank)
        } else {
            attacker.parameters.strength.rank
        };
        mods.strength = resolve_type_resistance(
            unit,
            turn,
            versus_np,
            DamageType::Strength,
            attack_rank,
            unit.parameters.strength.rank,
            &mut plan,
        );
    }

    (mods, plan)
}

fn resolve_type_resistance(
    unit: &Unit,
    turn: u32,
    versus_np: bool,
    damage_type: DamageType,
    attack_rank: Rank,
    fallback_defense_rank: Rank,
    plan: &mut ConsumptionPlan,
) -> Option<TypeResistance> {
    let (flat_kind, percent_kind) = match damage_type {
        DamageType::Magic => (EffectKind::MagicResistFlat, EffectKind::MagicResistPercent),
        DamageType::Strength => (
            EffectKind::StrengthResistFlat,
            EffectKind::StrengthResistPercent,
        ),
    };

    let mut flat = 0.0;
    let mut percent = 0.0;
    let mut defense_rank: Option<Rank> = None;
    let mut found = false;

    for effect in unit.active_effects(turn) {
        let value = effect.magnitude(versus_np);
        if effect.kind == flat_kind {
            flat += value;
        } else if effect.kind == percent_kind {
            percent += value;
        } else {
            continue;
        }
        found = true;

        let rank = effect.rank.unwrap_or(fallback_defense_rank);
        defense_rank = Some(match defense_rank {
            Some(best) => best.max(rank),
            None => rank,
        });

        if effect.uses.is_some() {
            plan.mark(effect.id);
        }
    }

    if !found {
        return None;
    }

    let defense_rank = defense_rank.unwrap_or(fallback_defense_rank);
    Some(TypeResistance {
        attack_rank,
        defense_rank,
        negated: defense_rank.dominates(attack_rank),
        flat,
        percent,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::effect::Effect;
    use crate::core::rank::RankLetter;
    use crate::core::unit::{Parameters, PlayerId, UnitId};

    fn unit_with_effects(effects: Vec<Effect>) -> Unit {
        let mut unit = Unit::new(UnitId::new(1), "test", PlayerId::new(0))
            .with_parameters(Parameters::uniform(100, Rank::new(RankLetter::C)));
        for (index, mut effect) in effects.into_iter().enumerate() {
            effect.id = EffectId::new(index as u64 + 1);
            unit.attach_effect(effect);
        }
        unit
    }

    fn attacker_snapshot(rank: Rank) -> UnitSnapshot {
        Unit::new(UnitId::new(9), "attacker", PlayerId::new(1))
            .with_parameters(Parameters::uniform(100, rank))
            .snapshot()
    }

    #[test]
    fn test_attacker_buckets_accumulate() {
        let unit = unit_with_effects(vec![
            Effect::new("Blessing", EffectKind::AttackFlat, 20.0),
            Effect::new("Mana Burst", EffectKind::AttackPercent, 30.0),
            Effect::new("Mana Burst II", EffectKind::AttackPercent, 10.0),
            Effect::new("Eagle Eye", EffectKind::CritChanceUp, 15.0),
            Effect::new("Pierce", EffectKind::NullifyFlat, 40.0),
        ]);

        let (mods, plan) = collect_attacker(&unit, 1, false);
        assert_eq!(mods.flat, 20.0);
        assert_eq!(mods.percent, 40.0);
        assert_eq!(mods.crit_chance, 15.0);
        assert_eq!(mods.nullify_flat, 40.0);
        assert!(plan.is_empty(), "no finite-use effects were read");
    }

    #[test]
    fn test_collection_is_read_only() {
        let mut unit = unit_with_effects(vec![Effect::new(
            "One Shot",
            EffectKind::AttackFlat,
            50.0,
        )
        .with_uses(1)]);

        let (first, plan) = collect_attacker(&unit, 1, false);
        let (second, _) = collect_attacker(&unit, 1, false);
        assert_eq!(first, second, "collecting twice reads the same buckets");
        assert_eq!(plan.len(), 1);
        assert_eq!(unit.effects.len(), 1, "nothing consumed yet");

        let removed = plan.apply(&mut unit);
        assert_eq!(removed.len(), 1);
        assert!(unit.effects.is_empty(), "exhausted effect removed");

        let (third, _) = collect_attacker(&unit, 1, false);
        assert_eq!(third.flat, 0.0);
    }

    #[test]
    fn test_plan_apply_decrements_without_removing() {
        let mut unit = unit_with_effects(vec![Effect::new(
            "Twice",
            EffectKind::AttackFlat,
            10.0,
        )
        .with_uses(2)]);

        let (_, plan) = collect_attacker(&unit, 1, false);
        let removed = plan.apply(&mut unit);
        assert!(removed.is_empty());
        assert_eq!(unit.effects[0].uses, Some(1));
    }

    #[test]
    fn test_expired_effects_ignored() {
        let mut effect = Effect::new("Old Buff", EffectKind::AttackFlat, 99.0).with_duration(1);
        effect.applied_at = 0;
        let unit = unit_with_effects(vec![effect]);

        let (mods, _) = collect_attacker(&unit, 5, false);
        assert_eq!(mods.flat, 0.0);
    }

    #[test]
    fn test_ordinary_attack_compares_parameter_ranks() {
        // Defender C-rank magic, resist effect without stored rank;
        // attacker brings B-rank magic, so no negation.
        let defender = unit_with_effects(vec![Effect::new(
            "Magic Resistance",
            EffectKind::MagicResistPercent,
            20.0,
        )]);
        let attacker = attacker_snapshot(Rank::new(RankLetter::B));
        let profile = AttackProfile::new(1.0, 0.0);
        let composition = Composition::derive(100, 0, &profile);

        let (mods, _) = collect_defender(&defender, &attacker, &profile, &composition, 1);
        let resist = mods.magic.expect("magic resistance resolved");
        assert!(!resist.negated);
        assert_eq!(resist.percent, 20.0);
        assert_eq!(resist.attack_rank, Rank::new(RankLetter::B));
        assert_eq!(resist.defense_rank, Rank::new(RankLetter::C));
    }

    #[test]
    fn test_np_attack_compares_stored_rank() {
        // Resist effect stores rank A; NP rank B is dominated, negated.
        let defender = unit_with_effects(vec![Effect::new(
            "Magic Resistance",
            EffectKind::MagicResistPercent,
            20.0,
        )
        .with_rank(Rank::new(RankLetter::A))]);
        let attacker = attacker_snapshot(Rank::new(RankLetter::Ex));
        let profile = AttackProfile::new(1.0, 0.0).with_np_rank(Rank::new(RankLetter::B));
        let composition = Composition::derive(100, 0, &profile);

        let (mods, _) = collect_defender(&defender, &attacker, &profile, &composition, 1);
        let resist = mods.magic.expect("magic resistance resolved");
        assert!(resist.negated);
        assert_eq!(resist.attack_rank, Rank::new(RankLetter::B));
        assert_eq!(resist.defense_rank, Rank::new(RankLetter::A));
    }

    #[test]
    fn test_strongest_stored_rank_decides_negation() {
        let defender = unit_with_effects(vec![
            Effect::new("Weak Ward", EffectKind::MagicResistFlat, 5.0)
                .with_rank(Rank::new(RankLetter::D)),
            Effect::new("Strong Ward", EffectKind::MagicResistPercent, 10.0)
                .with_rank(Rank::new(RankLetter::A)),
        ]);
        let attacker = attacker_snapshot(Rank::new(RankLetter::B));
        let profile = AttackProfile::new(1.0, 0.0);
        let composition = Composition::derive(100, 0, &profile);

        let (mods, _) = collect_defender(&defender, &attacker, &profile, &composition, 1);
        let resist = mods.magic.expect("magic resistance resolved");
        assert!(resist.negated, "rank A among the effects dominates B");
        assert_eq!(resist.flat, 5.0);
        assert_eq!(resist.percent, 10.0);
    }

    #[test]
    fn test_zero_force_type_skips_resistance_entirely() {
        // Pure magic attack: the strength resistance is neither read
        // nor marked for consumption.
        let defender = unit_with_effects(vec![Effect::new(
            "Stone Skin",
            EffectKind::StrengthResistFlat,
            50.0,
        )
        .with_uses(1)]);
        let attacker = attacker_snapshot(Rank::new(RankLetter::B));
        let profile = AttackProfile::new(1.0, 0.0);
        let composition = Composition::derive(100, 100, &profile);

        let (mods, plan) = collect_defender(&defender, &attacker, &profile, &composition, 1);
        assert!(mods.strength.is_none());
        assert!(plan.is_empty());
    }

    #[test]
    fn test_unbraced_keeps_resistances() {
        let defender = unit_with_effects(vec![
            Effect::new("Shield", EffectKind::DefenseFlat, 30.0),
            Effect::new("Magic Resistance", EffectKind::MagicResistPercent, 20.0),
        ]);
        let attacker = attacker_snapshot(Rank::new(RankLetter::B));
        let profile = AttackProfile::new(1.0, 0.0);
        let composition = Composition::derive(100, 0, &profile);

        let (mods, _) = collect_defender(&defender, &attacker, &profile, &composition, 1);
        let unbraced = mods.unbraced();
        assert_eq!(unbraced.flat, 0.0);
        assert_eq!(unbraced.percent, 0.0);
        assert!(unbraced.magic.is_some());
        assert_eq!(unbraced.crit_resist, mods.crit_resist);
    }

    #[test]
    fn test_plan_merge_dedups() {
        let mut a = ConsumptionPlan::default();
        a.mark(EffectId::new(1));
        a.mark(EffectId::new(2));

        let mut b = ConsumptionPlan::default();
        b.mark(EffectId::new(2));
        b.mark(EffectId::new(3));

        a.merge(&b);
        assert_eq!(a.len(), 3);
    }
}
