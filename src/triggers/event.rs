//! Battle events.
//!
//! Events are the named points where passive abilities may intercept
//! state: movement, turn and round boundaries, the combat lifecycle,
//! skill use and detection attempts. Unlike a free-form event bus the
//! taxonomy is closed; behaviors register against an [`EventKind`] and
//! receive the full [`BattleEvent`] with its payload.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::combat::CombatId;
use crate::core::{PlayerId, UnitId};

/// The closed taxonomy of interception points.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    /// A unit is about to leave its cell.
    MoveStart,
    /// A unit arrived in a new cell.
    MoveEnd,
    /// A player's turn began.
    TurnStart,
    /// A player's turn ended.
    TurnEnd,
    /// A new round began.
    RoundStart,
    /// A round ended.
    RoundEnd,
    /// An attack was declared and combat records were created.
    CombatInitiated,
    /// A confirmed combat resolved as a hit.
    AttackLanded,
    /// A unit is taking damage from a confirmed combat.
    DamageReceived,
    /// A unit's HP dropped.
    HpLost,
    /// A unit reached zero HP.
    UnitDefeated,
    /// A skill was used.
    SkillUsed,
    /// A Noble Phantasm was unleashed.
    NpUsed,
    /// A basic action was performed.
    ActionUsed,
    /// Something tried to spot a concealed unit.
    DetectionAttempt,
}

/// An event instance with contextual data.
///
/// Events carry:
/// - `kind`: which interception point this is
/// - `source`/`target`: the units involved (attacker/defender, mover)
/// - `player`: the player concerned (turn boundaries)
/// - `combat`: the combat record the event belongs to
/// - `values`: numeric payload (damage amounts, round numbers)
/// - `tags`: string payload (skill keys, labels)
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BattleEvent {
    /// What happened.
    pub kind: EventKind,

    /// Unit that caused the event.
    pub source: Option<UnitId>,

    /// Unit the event happened to.
    pub target: Option<UnitId>,

    /// Player the event concerns.
    pub player: Option<PlayerId>,

    /// Combat this event belongs to.
    pub combat: Option<CombatId>,

    /// Numeric payload. Meaning of each index depends on `kind`.
    pub values: SmallVec<[i64; 4]>,

    /// String payload.
    pub tags: Vec<String>,
}

impl BattleEvent {
    /// Create a bare event.
    #[must_use]
    pub fn new(kind: EventKind) -> Self {
        Self {
            kind,
            source: None,
            target: None,
            player: None,
            combat: None,
            values: SmallVec::new(),
            tags: Vec::new(),
        }
    }

    /// Set the source unit (builder pattern).
    #[must_use]
    pub fn with_source(mut self, unit: UnitId) -> Self {
        self.source = Some(unit);
        self
    }

    /// Set the target unit (builder pattern).
    #[must_use]
    pub fn with_target(mut self, unit: UnitId) -> Self {
        self.target = Some(unit);
        self
    }

    /// Set the associated player (builder pattern).
    #[must_use]
    pub fn with_player(mut self, player: PlayerId) -> Self {
        self.player = Some(player);
        self
    }

    /// Set the associated combat (builder pattern).
    #[must_use]
    pub fn with_combat(mut self, combat: CombatId) -> Self {
        self.combat = Some(combat);
        self
    }

    /// Add a numeric value (builder pattern).
    #[must_use]
    pub fn with_value(mut self, value: i64) -> Self {
        self.values.push(value);
        self
    }

    /// Add a tag (builder pattern).
    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// Get a value by index, or a default.
    #[must_use]
    pub fn value(&self, index: usize, default: i64) -> i64 {
        self.values.get(index).copied().unwrap_or(default)
    }

    /// First numeric value, 0 when absent.
    ///
    /// Damage, HP-loss and round events put their amount here.
    #[must_use]
    pub fn amount(&self) -> i64 {
        self.value(0, 0)
    }

    /// First tag, empty when absent. Skill events put the key here.
    #[must_use]
    pub fn label(&self) -> &str {
        self.tags.first().map_or("", String::as_str)
    }

    /// Check if the event has a specific tag.
    #[must_use]
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

/// Named constructors for the taxonomy.
impl BattleEvent {
    /// A player's turn began.
    #[must_use]
    pub fn turn_start(player: PlayerId) -> Self {
        Self::new(EventKind::TurnStart).with_player(player)
    }

    /// A player's turn ended.
    #[must_use]
    pub fn turn_end(player: PlayerId) -> Self {
        Self::new(EventKind::TurnEnd).with_player(player)
    }

    /// A round began. Values[0] = round number.
    #[must_use]
    pub fn round_start(round: u32) -> Self {
        Self::new(EventKind::RoundStart).with_value(i64::from(round))
    }

    /// A round ended. Values[0] = round number.
    #[must_use]
    pub fn round_end(round: u32) -> Self {
        Self::new(EventKind::RoundEnd).with_value(i64::from(round))
    }

    /// A unit is about to move.
    #[must_use]
    pub fn move_start(unit: UnitId) -> Self {
        Self::new(EventKind::MoveStart).with_source(unit)
    }

    /// A unit finished moving.
    #[must_use]
    pub fn move_end(unit: UnitId) -> Self {
        Self::new(EventKind::MoveEnd).with_source(unit)
    }

    /// An attack was declared.
    #[must_use]
    pub fn combat_initiated(attacker: UnitId, defender: UnitId, combat: CombatId) -> Self {
        Self::new(EventKind::CombatInitiated)
            .with_source(attacker)
            .with_target(defender)
            .with_combat(combat)
    }

    /// A confirmed combat hit. Values[0] = total damage.
    #[must_use]
    pub fn attack_landed(attacker: UnitId, defender: UnitId, combat: CombatId, amount: i64) -> Self {
        Self::new(EventKind::AttackLanded)
            .with_source(attacker)
            .with_target(defender)
            .with_combat(combat)
            .with_value(amount)
    }

    /// A unit is taking combat damage. Values[0] = damage amount.
    #[must_use]
    pub fn damage_received(
        defender: UnitId,
        attacker: UnitId,
        combat: CombatId,
        amount: i64,
    ) -> Self {
        Self::new(EventKind::DamageReceived)
            .with_source(attacker)
            .with_target(defender)
            .with_combat(combat)
            .with_value(amount)
    }

    /// A unit lost HP, from combat or otherwise. Values[0] = HP lost.
    #[must_use]
    pub fn hp_lost(unit: UnitId, amount: i64) -> Self {
        Self::new(EventKind::HpLost)
            .with_target(unit)
            .with_value(amount)
    }

    /// A unit reached zero HP.
    #[must_use]
    pub fn unit_defeated(unit: UnitId) -> Self {
        Self::new(EventKind::UnitDefeated).with_target(unit)
    }

    /// A skill was used. Tags[0] = skill key.
    #[must_use]
    pub fn skill_used(unit: UnitId, key: impl Into<String>) -> Self {
        Self::new(EventKind::SkillUsed)
            .with_source(unit)
            .with_tag(key)
    }

    /// A Noble Phantasm was unleashed. Tags[0] = skill key.
    #[must_use]
    pub fn np_used(unit: UnitId, key: impl Into<String>) -> Self {
        Self::new(EventKind::NpUsed).with_source(unit).with_tag(key)
    }

    /// A basic action was performed. Tags[0] = action key.
    #[must_use]
    pub fn action_used(unit: UnitId, key: impl Into<String>) -> Self {
        Self::new(EventKind::ActionUsed)
            .with_source(unit)
            .with_tag(key)
    }

    /// Something tried to spot a concealed unit.
    #[must_use]
    pub fn detection_attempt(seeker: UnitId, target: UnitId) -> Self {
        Self::new(EventKind::DetectionAttempt)
            .with_source(seeker)
            .with_target(target)
    }
}
