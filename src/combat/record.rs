//! One attack's full paper trail.
//!
//! A combat record is created on the attacker when targeting resolves;
//! a copy lands in the defender's incoming mailbox when the attack is
//! acknowledged. From then on the negotiation mutates the record, and
//! both sides' copies are replaced whole on every update so they stay
//! identical. Once both parties confirm, each side retires its copy
//! into the processed lists, which double as the replay guard against
//! duplicate confirmations.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::damage::{AttackProfile, Composition, CriticalRoll, DamageBreakdown};
use super::modifiers::{AttackerMods, ConsumptionPlan, DefenderMods};
use super::negotiation::{CombatOutcome, ResponseRecord};
use crate::core::unit::{UnitId, UnitSnapshot};

/// Unique identifier for one attack resolution.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CombatId(pub u64);

impl CombatId {
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for CombatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Combat({})", self.0)
    }
}

/// How far the attack has progressed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CombatPhase {
    /// Created on the attacker; the defender has not acknowledged yet.
    Initiated,
    /// Defender acknowledged; negotiation is live.
    Received,
    /// Crit and damage are computed; waiting on confirmations.
    Finalized,
}

/// Everything known about one pending attack.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CombatRecord {
    pub id: CombatId,
    /// Attacker vitals frozen at initiation.
    pub attacker: UnitSnapshot,
    pub defender_id: UnitId,
    /// Defender vitals, frozen at acknowledgement.
    pub defender: Option<UnitSnapshot>,
    pub profile: AttackProfile,
    pub composition: Composition,
    pub attacker_mods: AttackerMods,
    pub defender_mods: Option<DefenderMods>,
    /// Finite-use defender effects, consumed only if the hit lands.
    pub defender_consumption: ConsumptionPlan,
    pub critical: Option<CriticalRoll>,
    pub damage: Option<DamageBreakdown>,
    pub response: ResponseRecord,
    pub phase: CombatPhase,
    /// Set when this attack is a counter: the countered unit may not
    /// counter back.
    pub counter_target: Option<UnitId>,
}

impl CombatRecord {
    /// New record at the moment of initiation.
    #[must_use]
    pub fn new(
        id: CombatId,
        attacker: UnitSnapshot,
        defender_id: UnitId,
        profile: AttackProfile,
        composition: Composition,
    ) -> Self {
        Self {
            id,
            attacker,
            defender_id,
            defender: None,
            profile,
            composition,
            attacker_mods: AttackerMods::default(),
            defender_mods: None,
            defender_consumption: ConsumptionPlan::default(),
            critical: None,
            damage: None,
            response: ResponseRecord::new(),
            phase: CombatPhase::Initiated,
            counter_target: None,
        }
    }

    /// Attach the attacker's collected buckets.
    #[must_use]
    pub fn with_attacker_mods(mut self, mods: AttackerMods) -> Self {
        self.attacker_mods = mods;
        self
    }

    /// Is the attack a Noble Phantasm?
    #[must_use]
    pub fn is_np(&self) -> bool {
        self.profile.is_np()
    }

    /// Defender acknowledged: freeze their vitals and buckets.
    pub fn mark_received(&mut self, defender: UnitSnapshot, mods: DefenderMods) {
        self.defender = Some(defender);
        self.defender_mods = Some(mods);
        self.phase = CombatPhase::Received;
    }

    /// Mark this attack as somebody's counter.
    #[must_use]
    pub fn as_counter(mut self, target: UnitId) -> Self {
        self.counter_target = Some(target);
        self
    }

    /// Damage computed: nothing left but confirmations.
    pub fn mark_finalized(&mut self, critical: CriticalRoll, damage: DamageBreakdown) {
        self.critical = Some(critical);
        self.damage = Some(damage);
        self.phase = CombatPhase::Finalized;
    }

    /// Attack evaded: settle with zero damage and no crit roll.
    pub fn mark_evaded(&mut self) {
        self.critical = None;
        self.damage = Some(DamageBreakdown::default());
        self.phase = CombatPhase::Finalized;
    }

    /// The negotiated outcome so far.
    #[must_use]
    pub fn outcome(&self) -> CombatOutcome {
        self.response.resolve_outcome()
    }

    /// Does the attack connect?
    #[must_use]
    pub fn landed(&self) -> bool {
        self.outcome() == CombatOutcome::Hit
    }

    /// Total damage once finalized, zero before.
    #[must_use]
    pub fn damage_total(&self) -> i64 {
        self.damage.map(|breakdown| breakdown.rounded_total()).unwrap_or(0)
    }

    /// Defender buckets as they apply to the final damage.
    ///
    /// Only a braced defender keeps the stat-based flat and percent
    /// defense; resistances and crit resistance always apply.
    #[must_use]
    pub fn effective_defender_mods(&self) -> DefenderMods {
        let mods = self.defender_mods.unwrap_or_default();
        if self.response.braced() {
            mods
        } else {
            mods.unbraced()
        }
    }
}
