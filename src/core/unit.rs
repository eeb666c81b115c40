//! Units and their battle-facing state.
//!
//! A unit carries identity, grid position, vital stats with parameter
//! ranks, attached effects, trigger refs, and the combat mailboxes the
//! negotiation protocol works through: `combat_sent` (outgoing records,
//! one per target), `combat_received` (at most one unresolved incoming
//! record, enforced structurally) and the processed lists that make
//! confirmation replays detectable.

use serde::{Deserialize, Serialize};

use super::effect::{Effect, EffectId};
use super::rank::Rank;
use crate::combat::{CombatId, CombatRecord};
use crate::error::{EngineError, Result};
use crate::triggers::TriggerRef;

/// Unique identifier for a unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UnitId(pub u32);

impl UnitId {
    /// Create a new unit ID.
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get the raw ID value.
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for UnitId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Unit({})", self.0)
    }
}

/// Player identifier. Rooms are two-player.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlayerId(pub u8);

impl PlayerId {
    /// Create a new player ID.
    #[must_use]
    pub const fn new(id: u8) -> Self {
        Self(id)
    }

    /// Index for array access.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// The other player in a two-player room.
    #[must_use]
    pub const fn opponent(self) -> Self {
        Self(1 - (self.0 % 2))
    }
}

impl std::fmt::Display for PlayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Player({})", self.0)
    }
}

/// Cell coordinates on the 3D battle grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl Position {
    /// Create a position.
    #[must_use]
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

/// One vital stat: a numeric value plus its letter rank.
///
/// The value feeds force computation; the rank feeds comparisons
/// (resistance negation, luck and agility checks).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    /// Numeric magnitude.
    pub value: i64,
    /// Letter rank.
    pub rank: Rank,
}

impl Parameter {
    /// Create a parameter.
    #[must_use]
    pub const fn new(value: i64, rank: Rank) -> Self {
        Self { value, rank }
    }
}

impl Default for Parameter {
    fn default() -> Self {
        Self {
            value: 0,
            rank: Rank::default(),
        }
    }
}

/// Which parameter a check or comparison reads.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ParameterKind {
    Strength,
    Magic,
    Agility,
    Luck,
}

/// The four vital parameters.
#[derive(Clone, Copy, Debug, PartialEq, Default, Serialize, Deserialize)]
pub struct Parameters {
    pub strength: Parameter,
    pub magic: Parameter,
    pub agility: Parameter,
    pub luck: Parameter,
}

impl Parameters {
    /// All four parameters share one value and rank. Test convenience.
    #[must_use]
    pub const fn uniform(value: i64, rank: Rank) -> Self {
        let p = Parameter::new(value, rank);
        Self {
            strength: p,
            magic: p,
            agility: p,
            luck: p,
        }
    }

    /// Read a parameter by kind.
    #[must_use]
    pub const fn get(&self, kind: ParameterKind) -> Parameter {
        match kind {
            ParameterKind::Strength => self.strength,
            ParameterKind::Magic => self.magic,
            ParameterKind::Agility => self.agility,
            ParameterKind::Luck => self.luck,
        }
    }
}

/// Immutable identity/vitals snapshot embedded in combat records.
///
/// Records keep snapshots instead of cloning whole units; the live unit
/// stays in the arena and only these fields are frozen at combat time.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UnitSnapshot {
    pub id: UnitId,
    pub name: String,
    pub player: PlayerId,
    pub position: Position,
    pub hp: i64,
    pub max_hp: i64,
    pub parameters: Parameters,
    pub np_rank: Option<Rank>,
}

/// A combatant.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Unit {
    /// Unique identifier.
    pub id: UnitId,

    /// Display name.
    pub name: String,

    /// Owning player.
    pub player: PlayerId,

    /// Grid cell.
    pub position: Position,

    /// Current hit points.
    pub hp: i64,

    /// Hit point ceiling.
    pub max_hp: i64,

    /// Vital parameters.
    pub parameters: Parameters,

    /// Rank of this unit's Noble Phantasm, if it has one.
    pub np_rank: Option<Rank>,

    /// Command seals available for forced evades.
    pub command_seals: u8,

    /// Attached effects.
    pub effects: Vec<Effect>,

    /// Trigger refs (keys into the behavior registry).
    pub triggers: Vec<TriggerRef>,

    /// Outgoing unresolved combat records, one per target.
    pub combat_sent: Vec<CombatRecord>,

    /// Incoming unresolved combat record. At most one.
    pub combat_received: Option<CombatRecord>,

    /// Confirmed outgoing combats, kept for replay detection and audit.
    pub processed_combat_sent: Vec<CombatRecord>,

    /// Confirmed incoming combats.
    pub processed_combat_received: Vec<CombatRecord>,

    /// Granted right to riposte after a confirmed incoming combat.
    pub can_counter: bool,

    /// Who the pending counter is aimed at.
    pub countering_against: Option<UnitId>,
}

impl Unit {
    /// Create a unit with sane defaults (full HP, no effects).
    pub fn new(id: UnitId, name: impl Into<String>, player: PlayerId) -> Self {
        Self {
            id,
            name: name.into(),
            player,
            position: Position::default(),
            hp: 100,
            max_hp: 100,
            parameters: Parameters::default(),
            np_rank: None,
            command_seals: 0,
            effects: Vec::new(),
            triggers: Vec::new(),
            combat_sent: Vec::new(),
            combat_received: None,
            processed_combat_sent: Vec::new(),
            processed_combat_received: Vec::new(),
            can_counter: false,
            countering_against: None,
        }
    }

    /// Set the position (builder pattern).
    #[must_use]
    pub fn with_position(mut self, position: Position) -> Self {
        self.position = position;
        self
    }

    /// Set current and max HP together (builder pattern).
    #[must_use]
    pub fn with_hp(mut self, hp: i64) -> Self {
        self.hp = hp;
        self.max_hp = hp;
        self
    }

    /// Set the parameters (builder pattern).
    #[must_use]
    pub fn with_parameters(mut self, parameters: Parameters) -> Self {
        self.parameters = parameters;
        self
    }

    /// Set the Noble Phantasm rank (builder pattern).
    #[must_use]
    pub fn with_np_rank(mut self, rank: Rank) -> Self {
        self.np_rank = Some(rank);
        self
    }

    /// Set available command seals (builder pattern).
    #[must_use]
    pub fn with_command_seals(mut self, seals: u8) -> Self {
        self.command_seals = seals;
        self
    }

    /// Attach a trigger ref (builder pattern).
    #[must_use]
    pub fn with_trigger(mut self, reference: TriggerRef) -> Self {
        self.triggers.push(reference);
        self
    }

    // === Vitals ===

    /// Has this unit been defeated?
    #[must_use]
    pub fn is_defeated(&self) -> bool {
        self.hp <= 0
    }

    /// Apply damage, flooring HP at zero. Returns HP actually lost.
    pub fn apply_damage(&mut self, amount: i64) -> i64 {
        let lost = amount.max(0).min(self.hp);
        self.hp -= lost;
        lost
    }

    /// Restore HP up to the ceiling. Returns HP actually gained.
    pub fn heal(&mut self, amount: i64) -> i64 {
        let gained = amount.max(0).min(self.max_hp - self.hp);
        self.hp += gained;
        gained
    }

    /// Spend one command seal. Returns `false` when none remain.
    pub fn spend_command_seal(&mut self) -> bool {
        if self.command_seals == 0 {
            return false;
        }
        self.command_seals -= 1;
        true
    }

    // === Effects ===

    /// Attach an effect. The caller is responsible for assigning the ID
    /// and `applied_at` turn (normally via `BattleState::grant_effect`).
    pub fn attach_effect(&mut self, effect: Effect) {
        self.effects.push(effect);
    }

    /// Effects that are live on the given turn.
    pub fn active_effects(&self, turn: u32) -> impl Iterator<Item = &Effect> {
        self.effects.iter().filter(move |e| e.is_active(turn))
    }

    /// Find an effect by ID.
    #[must_use]
    pub fn effect(&self, id: EffectId) -> Option<&Effect> {
        self.effects.iter().find(|e| e.id == id)
    }

    /// Find an effect by ID, mutably.
    pub fn effect_mut(&mut self, id: EffectId) -> Option<&mut Effect> {
        self.effects.iter_mut().find(|e| e.id == id)
    }

    /// Remove an effect by ID.
    pub fn remove_effect(&mut self, id: EffectId) -> Option<Effect> {
        let index = self.effects.iter().position(|e| e.id == id)?;
        Some(self.effects.remove(index))
    }

    /// Drop effects whose duration has lapsed. Returns the removed ones.
    pub fn prune_expired_effects(&mut self, turn: u32) -> Vec<Effect> {
        let mut expired = Vec::new();
        let mut index = 0;
        while index < self.effects.len() {
            if self.effects[index].is_active(turn) {
                index += 1;
            } else {
                expired.push(self.effects.remove(index));
            }
        }
        expired
    }

    // === Combat mailboxes ===

    /// Accept an incoming combat record.
    ///
    /// Fails while an earlier incoming combat is still unresolved; the
    /// attacker must wait or the stale combat must be failed first.
    pub fn receive_combat(&mut self, record: CombatRecord) -> Result<()> {
        if self.combat_received.is_some() {
            return Err(EngineError::IncomingCombatOccupied(self.id));
        }
        self.combat_received = Some(record);
        Ok(())
    }

    /// Find an outgoing record by combat ID.
    #[must_use]
    pub fn sent_record(&self, id: CombatId) -> Option<&CombatRecord> {
        self.combat_sent.iter().find(|r| r.id == id)
    }

    /// Find an outgoing record by combat ID, mutably.
    pub fn sent_record_mut(&mut self, id: CombatId) -> Option<&mut CombatRecord> {
        self.combat_sent.iter_mut().find(|r| r.id == id)
    }

    /// Move an outgoing record into the processed list.
    /// Returns `false` when no such unresolved record exists.
    pub fn retire_sent(&mut self, id: CombatId) -> bool {
        let Some(index) = self.combat_sent.iter().position(|r| r.id == id) else {
            return false;
        };
        let record = self.combat_sent.remove(index);
        self.processed_combat_sent.push(record);
        true
    }

    /// Move the incoming record into the processed list.
    /// Returns `false` when the incoming slot holds a different combat.
    pub fn retire_received(&mut self, id: CombatId) -> bool {
        if !self.combat_received.as_ref().is_some_and(|r| r.id == id) {
            return false;
        }
        if let Some(record) = self.combat_received.take() {
            self.processed_combat_received.push(record);
        }
        true
    }

    /// Clear the incoming record without processing (combat failed).
    pub fn discard_received(&mut self, id: CombatId) -> Option<CombatRecord> {
        match &self.combat_received {
            Some(record) if record.id == id => self.combat_received.take(),
            _ => None,
        }
    }

    /// Drop an outgoing record without processing (combat failed).
    pub fn discard_sent(&mut self, id: CombatId) -> Option<CombatRecord> {
        let index = self.combat_sent.iter().position(|r| r.id == id)?;
        Some(self.combat_sent.remove(index))
    }

    /// Was this combat already confirmed, on either side?
    #[must_use]
    pub fn has_processed(&self, id: CombatId) -> bool {
        self.processed_combat_sent.iter().any(|r| r.id == id)
            || self.processed_combat_received.iter().any(|r| r.id == id)
    }

    /// Freeze identity and vitals for embedding in a combat record.
    #[must_use]
    pub fn snapshot(&self) -> UnitSnapshot {
        UnitSnapshot {
            id: self.id,
            name: self.name.clone(),
            player: self.player,
            position: self.position,
            hp: self.hp,
            max_hp: self.max_hp,
            parameters: self.parameters,
            np_rank: self.np_rank,
        }
    }
}
