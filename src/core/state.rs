//! Authoritative battle state.
//!
//! One [`BattleState`] per room, owned by the coordinating session.
//! Every engine call is a synchronous transform of this value; there is
//! no interior locking because message handling for a room is already
//! serialized at the boundary.
//!
//! The event log uses `im::Vector` so cloning the whole state for
//! staged trigger dispatch stays cheap: a faulting trigger's staged
//! clone is dropped, a clean one replaces the original wholesale.
//! Snapshots for persistence or reconnection go through
//! [`BattleState::to_bytes`] / [`BattleState::from_bytes`].

use im::Vector;
use serde::{Deserialize, Serialize};

use super::config::BattleConfig;
use super::effect::{Effect, EffectId};
use super::rng::BattleRng;
use super::unit::{PlayerId, Unit, UnitId};
use crate::combat::CombatId;
use crate::error::{EngineError, Result};
use crate::triggers::event::BattleEvent;

/// One logged event with the clock it happened on.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub turn: u32,
    pub round: u32,
    pub event: BattleEvent,
}

/// What a turn boundary produced.
///
/// The events are already logged; they are returned so the caller can
/// route them through trigger dispatch. Expired effects are listed per
/// owner for expiry notifications.
#[derive(Clone, Debug, Default)]
pub struct TurnTransition {
    pub events: Vec<BattleEvent>,
    pub expired: Vec<(UnitId, Effect)>,
}

/// Full battle state for one room.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BattleState {
    /// Tuning constants.
    pub config: BattleConfig,

    /// All units in spawn order. Spawn order is also the tie-break
    /// order wherever iteration order matters.
    units: Vec<Unit>,

    /// Turn number, starts at 1 and increments on every hand-over.
    pub turn: u32,

    /// Round number, starts at 1 and increments when the turn wraps
    /// back to player 0.
    pub round: u32,

    /// Whose turn it is.
    pub active_player: PlayerId,

    /// Deterministic RNG; all engine rolls come from here.
    pub rng: BattleRng,

    /// Append-only event log.
    pub log: Vector<EventRecord>,

    next_unit_id: u32,
    next_effect_id: u64,
    next_combat_id: u64,
}

impl BattleState {
    /// Fresh state: turn 1, round 1, player 0 to act.
    #[must_use]
    pub fn new(config: BattleConfig, seed: u64) -> Self {
        Self {
            config,
            units: Vec::new(),
            turn: 1,
            round: 1,
            active_player: PlayerId::new(0),
            rng: BattleRng::new(seed),
            log: Vector::new(),
            next_unit_id: 1,
            next_effect_id: 1,
            next_combat_id: 1,
        }
    }

    // === Units ===

    /// Add a unit built around a freshly allocated ID.
    pub fn spawn(&mut self, build: impl FnOnce(UnitId) -> Unit) -> UnitId {
        let id = UnitId::new(self.next_unit_id);
        self.next_unit_id += 1;
        self.units.push(build(id));
        id
    }

    /// Add a master-class unit: spawns and grants the configured
    /// command-seal allowance, overriding whatever the builder set.
    pub fn spawn_master(&mut self, build: impl FnOnce(UnitId) -> Unit) -> UnitId {
        let seals = self.config.default_command_seals;
        let id = self.spawn(build);
        if let Some(unit) = self.unit_mut(id) {
            unit.command_seals = seals;
        }
        id
    }

    /// Look a unit up by ID.
    #[must_use]
    pub fn unit(&self, id: UnitId) -> Option<&Unit> {
        self.units.iter().find(|unit| unit.id == id)
    }

    /// Look a unit up by ID, mutably.
    pub fn unit_mut(&mut self, id: UnitId) -> Option<&mut Unit> {
        self.units.iter_mut().find(|unit| unit.id == id)
    }

    /// Look a unit up or fail with a typed error.
    pub fn require_unit(&self, id: UnitId) -> Result<&Unit> {
        self.unit(id).ok_or(EngineError::UnitNotFound(id))
    }

    /// Mutable variant of [`BattleState::require_unit`].
    pub fn require_unit_mut(&mut self, id: UnitId) -> Result<&mut Unit> {
        self.units
            .iter_mut()
            .find(|unit| unit.id == id)
            .ok_or(EngineError::UnitNotFound(id))
    }

    /// All units in spawn order.
    #[must_use]
    pub fn units(&self) -> &[Unit] {
        &self.units
    }

    /// One player's units in spawn order.
    pub fn units_of(&self, player: PlayerId) -> impl Iterator<Item = &Unit> {
        self.units.iter().filter(move |unit| unit.player == player)
    }

    /// Does either player have no unit left standing?
    #[must_use]
    pub fn defeated_player(&self) -> Option<PlayerId> {
        for player in [PlayerId::new(0), PlayerId::new(1)] {
            let mut any = false;
            let mut all_down = true;
            for unit in self.units_of(player) {
                any = true;
                all_down &= unit.is_defeated();
            }
            if any && all_down {
                return Some(player);
            }
        }
        None
    }

    // === ID allocation ===

    /// Allocate the next effect ID.
    pub fn alloc_effect_id(&mut self) -> EffectId {
        let id = EffectId::new(self.next_effect_id);
        self.next_effect_id += 1;
        id
    }

    /// Allocate the next combat ID.
    pub fn alloc_combat_id(&mut self) -> CombatId {
        let id = CombatId::new(self.next_combat_id);
        self.next_combat_id += 1;
        id
    }

    /// Attach an effect to a unit, stamping ID and application turn.
    pub fn grant_effect(&mut self, unit_id: UnitId, mut effect: Effect) -> Result<EffectId> {
        let id = self.alloc_effect_id();
        let turn = self.turn;
        let unit = self.require_unit_mut(unit_id)?;
        effect.id = id;
        effect.applied_at = turn;
        unit.attach_effect(effect);
        Ok(id)
    }

    // === Event log ===

    /// Append an event with the current clock.
    pub fn record_event(&mut self, event: BattleEvent) {
        self.log.push_back(EventRecord {
            turn: self.turn,
            round: self.round,
            event,
        });
    }

    // === Turn clock ===

    /// Hand the turn to the opponent.
    ///
    /// Emits `TurnEnd` for the leaving player, `RoundEnd`/`RoundStart`
    /// when the turn wraps back to player 0, then `TurnStart` for the
    /// incoming player. Expired effects are pruned from every unit at
    /// the boundary.
    pub fn advance_turn(&mut self) -> TurnTransition {
        let mut transition = TurnTransition::default();

        let leaving = self.active_player;
        self.push_boundary_event(BattleEvent::turn_end(leaving), &mut transition);

        self.turn += 1;
        self.active_player = leaving.opponent();
        if self.active_player == PlayerId::new(0) {
            self.push_boundary_event(BattleEvent::round_end(self.round), &mut transition);
            self.round += 1;
            self.push_boundary_event(BattleEvent::round_start(self.round), &mut transition);
        }

        let turn = self.turn;
        for unit in &mut self.units {
            let owner = unit.id;
            for effect in unit.prune_expired_effects(turn) {
                transition.expired.push((owner, effect));
            }
        }

        self.push_boundary_event(BattleEvent::turn_start(self.active_player), &mut transition);
        transition
    }

    fn push_boundary_event(&mut self, event: BattleEvent, transition: &mut TurnTransition) {
        self.record_event(event.clone());
        transition.events.push(event);
    }

    // === Snapshots ===

    /// Serialize the whole state.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    /// Restore a state serialized by [`BattleState::to_bytes`].
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(bincode::deserialize(bytes)?)
    }
}
