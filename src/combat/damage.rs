//! Force and damage computation.
//!
//! An attack's raw power is split into a magical force and a physical
//! force by the declared ratios. Per damage type, the final damage is
//!
//! ```text
//! ((force + crit_share) * multiplier + flat_share)
//!     * (1 + (attack% - defense%) / 100)
//!     + (attack_flat - defense_flat) * portion
//! ```
//!
//! followed by resistance: complete negation removes the entire type
//! (attacker nullification shrinks the removed amount, magical side
//! only), partial resistance applies its percent then flat reduction.
//! Flat bonuses are split by each type's share of the total force, so a
//! type with a zero ratio contributes exactly zero damage no matter
//! what flat bonuses ride on the attack.

use serde::{Deserialize, Serialize};

use super::modifiers::{AttackerMods, DefenderMods};
use crate::core::{BattleConfig, BattleRng, Rank};

/// The two damage flavors.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DamageType {
    /// Magic-scaled component.
    Magic,
    /// Strength-scaled (physical) component.
    Strength,
}

impl std::fmt::Display for DamageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Magic => write!(f, "magic"),
            Self::Strength => write!(f, "strength"),
        }
    }
}

/// How an attack draws on the attacker's parameters.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct AttackProfile {
    /// Fraction of the magic parameter contributing force.
    pub magic_ratio: f64,

    /// Fraction of the strength parameter contributing force.
    pub strength_ratio: f64,

    /// Integrated attack multiplier (skill/NP supplied).
    pub multiplier: f64,

    /// Integrated flat bonus, split across types by force share.
    pub flat_bonus: f64,

    /// Fixed rank letter when the attack is a Noble Phantasm.
    pub np_rank: Option<Rank>,
}

impl AttackProfile {
    /// Create a profile with the given ratios, multiplier 1 and no bonus.
    #[must_use]
    pub const fn new(magic_ratio: f64, strength_ratio: f64) -> Self {
        Self {
            magic_ratio,
            strength_ratio,
            multiplier: 1.0,
            flat_bonus: 0.0,
            np_rank: None,
        }
    }

    /// Set the integrated multiplier (builder pattern).
    #[must_use]
    pub const fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier;
        self
    }

    /// Set the integrated flat bonus (builder pattern).
    #[must_use]
    pub const fn with_flat_bonus(mut self, bonus: f64) -> Self {
        self.flat_bonus = bonus;
        self
    }

    /// Mark the attack as a Noble Phantasm with a fixed rank (builder pattern).
    #[must_use]
    pub const fn with_np_rank(mut self, rank: Rank) -> Self {
        self.np_rank = Some(rank);
        self
    }

    /// Is this a Noble Phantasm attack?
    #[must_use]
    pub const fn is_np(&self) -> bool {
        self.np_rank.is_some()
    }
}

/// The attack's force split, derived once at initiation.
#[derive(Clone, Copy, Debug, PartialEq, Default, Serialize, Deserialize)]
pub struct Composition {
    /// Magic-scaled force.
    pub force_magic: f64,

    /// Strength-scaled force.
    pub force_strength: f64,

    /// Magic share of the total force, 0 when the total is 0.
    pub magic_portion: f64,

    /// Strength share of the total force, 0 when the total is 0.
    pub strength_portion: f64,
}

impl Composition {
    /// Split the attacker's parameters by the profile's ratios.
    ///
    /// Negative ratios are treated as zero. When both forces are zero
    /// the portions are zero too rather than dividing by zero.
    #[must_use]
    pub fn derive(magic: i64, strength: i64, profile: &AttackProfile) -> Self {
        let force_magic = profile.magic_ratio.max(0.0) * magic as f64;
        let force_strength = profile.strength_ratio.max(0.0) * strength as f64;
        let total = force_magic + force_strength;

        let (magic_portion, strength_portion) = if total > 0.0 {
            (force_magic / total, force_strength / total)
        } else {
            (0.0, 0.0)
        };

        Self {
            force_magic,
            force_strength,
            magic_portion,
            strength_portion,
        }
    }

    /// Total force.
    #[must_use]
    pub fn force(&self) -> f64 {
        self.force_magic + self.force_strength
    }

    /// Force of one type.
    #[must_use]
    pub fn force_of(&self, damage_type: DamageType) -> f64 {
        match damage_type {
            DamageType::Magic => self.force_magic,
            DamageType::Strength => self.force_strength,
        }
    }

    /// Share of one type.
    #[must_use]
    pub fn portion_of(&self, damage_type: DamageType) -> f64 {
        match damage_type {
            DamageType::Magic => self.magic_portion,
            DamageType::Strength => self.strength_portion,
        }
    }
}

/// Outcome of the critical hit roll.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CriticalRoll {
    /// Final chance after attacker and defender modifiers.
    pub chance: i32,
    /// The percentile roll, 1..=100.
    pub roll: i32,
    /// Did the attack crit?
    pub is_critical: bool,
}

/// Roll for a critical hit.
///
/// `chance = base + attacker crit chance - defender crit resistance`;
/// one percentile roll, `roll <= chance` crits. A chance of 100 or more
/// always crits, 0 or less never does.
pub fn roll_critical(
    config: &BattleConfig,
    attacker: &AttackerMods,
    defender: &DefenderMods,
    rng: &mut BattleRng,
) -> CriticalRoll {
    let chance =
        config.base_crit_chance + (attacker.crit_chance - defender.crit_resist).round() as i32;
    let roll = rng.percent();
    CriticalRoll {
        chance,
        roll,
        is_critical: roll <= chance,
    }
}

/// Per-type and total damage of a finalized combat.
#[derive(Clone, Copy, Debug, PartialEq, Default, Serialize, Deserialize)]
pub struct DamageBreakdown {
    /// Magical component after resistance.
    pub magical: f64,

    /// Physical component after resistance.
    pub physical: f64,

    /// Sum of the components.
    pub total: f64,
}

impl DamageBreakdown {
    /// Total as HP to subtract, rounded, never negative.
    #[must_use]
    pub fn rounded_total(&self) -> i64 {
        self.total.round().max(0.0) as i64
    }
}

/// Compose the final damage from forces, modifiers and the crit roll.
///
/// The defender mods passed here must already reflect the defense
/// choice (see [`DefenderMods::unbraced`]); this function only does
/// arithmetic.
#[must_use]
pub fn compute_breakdown(
    composition: &Composition,
    profile: &AttackProfile,
    attacker: &AttackerMods,
    defender: &DefenderMods,
    critical: &CriticalRoll,
) -> DamageBreakdown {
    let magical = damage_of_type(
        DamageType::Magic,
        composition,
        profile,
        attacker,
        defender,
        critical,
    );
    let physical = damage_of_type(
        DamageType::Strength,
        composition,
        profile,
        attacker,
        defender,
        critical,
    );

    DamageBreakdown {
        magical,
        physical,
        total: magical + physical,
    }
}

fn damage_of_type(
    damage_type: DamageType,
    composition: &Composition,
    profile: &AttackProfile,
    attacker: &AttackerMods,
    defender: &DefenderMods,
    critical: &CriticalRoll,
) -> f64 {
    let force = composition.force_of(damage_type);
    let portion = composition.portion_of(damage_type);

    // A type with no force contributes nothing; flats never leak in.
    if portion <= 0.0 {
        return 0.0;
    }

    let crit_share = if critical.is_critical {
        attacker.crit_damage * portion
    } else {
        0.0
    };

    let raw = (force + crit_share) * profile.multiplier + profile.flat_bonus * portion;
    let scaled = raw * (1.0 + (attacker.percent - defender.percent) / 100.0);
    let mut damage = (scaled + (attacker.flat - defender.flat) * portion).max(0.0);

    if let Some(resistance) = defender.resistance(damage_type) {
        if resistance.negated {
            let mut reduction = damage;
            // Nullification shaves negation on the magical side only.
            if damage_type == DamageType::Magic {
                reduction = (reduction * (1.0 - attacker.nullify_percent / 100.0)
                    - attacker.nullify_flat)
                    .max(0.0);
            }
            damage = (damage - reduction).max(0.0);
        } else {
            damage = (damage * (1.0 - resistance.percent / 100.0) - resistance.flat).max(0.0);
        }
    }

    damage
}
