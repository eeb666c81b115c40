//! JSON message contract between clients and a battle room.
//!
//! Inbound traffic is a single envelope: `{"type":"GAME_ACTION",
//! "action":<VERB>, ...payload}`. Outbound messages use the same
//! `type` tag. All wire names are SCREAMING_SNAKE_CASE; payload
//! fields stay snake_case.
//!
//! # Protocol Flow
//!
//! 1. Attacker sends `ATTACK`; both sides get a state update.
//! 2. Defender sends `RECEIVE_ATTACK` to load the incoming combat.
//! 3. Zero or more `UPDATE_COMBAT_RESPONSE` messages negotiate the
//!    outcome (stance choice, luck windows, command seal).
//! 4. Defender confirms with `PROCESS_COMBAT_COMPLETE` or
//!    `PROCESS_COMBAT_AND_INITIATE_COUNTER`; attacker confirms their
//!    copy with `PROCESS_COMBAT_COMPLETE`.
//! 5. Either side may abort a stuck negotiation with `COMBAT_FAILED`.
//!
//! # Example Exchange
//!
//! ```text
//! -> {"type":"GAME_ACTION","action":"ATTACK","attacker":1,"targets":[2],
//!     "profile":{"magic_ratio":1.0,"strength_ratio":0.0,"multiplier":5.0,
//!     "flat_bonus":0.0,"np_rank":null}}
//! <- {"type":"GAME_STATE_UPDATE","view":{...}}
//! -> {"type":"GAME_ACTION","action":"RECEIVE_ATTACK","defender":2,"combat":1}
//! -> {"type":"GAME_ACTION","action":"UPDATE_COMBAT_RESPONSE","unit":2,
//!     "combat":1,"update":"CHOOSE","choice":"EVADE"}
//! -> {"type":"GAME_ACTION","action":"PROCESS_COMBAT_COMPLETE","unit":2,"combat":1}
//! <- {"type":"COMBAT_COMPLETION_NOTIFICATION","combat":1,...}
//! ```
//!
//! Profile numbers and verb payloads come straight from the client
//! and are applied as-is; there is no server-side skill table to
//! check them against. The session enforces ownership, negotiation
//! guards and idempotent confirms, nothing more.

use serde::{Deserialize, Serialize};

use crate::combat::{AttackProfile, CombatId, CombatOutcome, DefenseChoice};
use crate::core::{PlayerId, Unit, UnitId};
use crate::triggers::FiredTrigger;

// ============================================================================
// Inbound (client -> room)
// ============================================================================

/// Inbound envelope. Everything a client may send is a `GAME_ACTION`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientMessage {
    #[serde(rename = "GAME_ACTION")]
    GameAction {
        #[serde(flatten)]
        action: GameAction,
    },
}

impl ClientMessage {
    /// Parse one message from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// The action verbs a client may submit.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GameAction {
    /// Declare an attack on one or more targets.
    Attack {
        attacker: UnitId,
        targets: Vec<UnitId>,
        /// Client-supplied attack numbers, applied unvalidated.
        profile: AttackProfile,
    },

    /// Defender loads the pending combat into their mailbox.
    ReceiveAttack { defender: UnitId, combat: CombatId },

    /// Advance the negotiation one transition.
    UpdateCombatResponse {
        unit: UnitId,
        combat: CombatId,
        #[serde(flatten)]
        update: ResponseUpdate,
    },

    /// Defender confirms the outcome and claims the counter right.
    ProcessCombatAndInitiateCounter { defender: UnitId, combat: CombatId },

    /// Either side confirms the outcome without countering.
    ProcessCombatComplete { unit: UnitId, combat: CombatId },

    /// Abort a stuck negotiation, discarding both mailbox copies.
    CombatFailed { unit: UnitId, combat: CombatId },

    /// Use a class or personal skill.
    UseSkill {
        caster: UnitId,
        target: UnitId,
        key: String,
    },

    /// Unleash a (non-attack) Noble Phantasm.
    UseNp {
        caster: UnitId,
        target: UnitId,
        key: String,
    },

    /// Perform a basic action.
    UseAction {
        caster: UnitId,
        target: UnitId,
        key: String,
    },
}

impl GameAction {
    /// Wire name of the verb, for failure reports.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Attack { .. } => "ATTACK",
            Self::ReceiveAttack { .. } => "RECEIVE_ATTACK",
            Self::UpdateCombatResponse { .. } => "UPDATE_COMBAT_RESPONSE",
            Self::ProcessCombatAndInitiateCounter { .. } => "PROCESS_COMBAT_AND_INITIATE_COUNTER",
            Self::ProcessCombatComplete { .. } => "PROCESS_COMBAT_COMPLETE",
            Self::CombatFailed { .. } => "COMBAT_FAILED",
            Self::UseSkill { .. } => "USE_SKILL",
            Self::UseNp { .. } => "USE_NP",
            Self::UseAction { .. } => "USE_ACTION",
        }
    }
}

/// One negotiation transition inside `UPDATE_COMBAT_RESPONSE`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "update", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResponseUpdate {
    /// Step 1, defender: pick the stance.
    Choose { choice: DefenseChoice },
    /// Step 2, attacker: roll luck to force the hit through.
    LuckHit,
    /// Step 2, attacker: wave the luck roll off.
    DeclineLuckHit,
    /// Step 2, defender: roll luck to slip the hit.
    LuckEvade,
    /// Step 2, defender: wave the luck roll off.
    DeclineLuckEvade,
    /// Defender, any open window: spend a command seal for a
    /// guaranteed evade.
    SealEvade,
}

// ============================================================================
// Outbound (room -> clients)
// ============================================================================

/// Messages the room pushes back.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServerMessage {
    /// Authoritative state replacement for one player.
    GameStateUpdate { view: StateView },

    /// Passive abilities fired while handling the last action.
    TriggerEffectNotification { fired: Vec<FiredTrigger> },

    /// A combat fully resolved.
    CombatCompletionNotification {
        combat: CombatId,
        defender: UnitId,
        outcome: CombatOutcome,
        damage: i64,
        defender_defeated: bool,
        counter_granted: bool,
    },

    /// Dismiss the defender-side negotiation UI for this combat.
    CloseCombatMenu { combat: CombatId },

    /// Dismiss the attacker-side negotiation UI for this combat.
    CloseCombatMenuResponse { combat: CombatId },

    /// The submitted action was rejected; state is unchanged.
    ActionFailed { action: String, error: String },
}

/// What one player is shown. Units are full replacements, mailboxes
/// included, so a stale client view is corrected wholesale.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StateView {
    pub player: PlayerId,
    pub turn: u32,
    pub round: u32,
    pub active_player: PlayerId,
    pub units: Vec<Unit>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_attack() {
        let json = r#"{"type":"GAME_ACTION","action":"ATTACK","attacker":1,"targets":[2,3],
            "profile":{"magic_ratio":1.0,"strength_ratio":0.0,"multiplier":5.0,
            "flat_bonus":0.0,"np_rank":null}}"#;
        let ClientMessage::GameAction { action } = ClientMessage::from_json(json).unwrap();
        match action {
            GameAction::Attack {
                attacker, targets, ..
            } => {
                assert_eq!(attacker, UnitId::new(1));
                assert_eq!(targets, vec![UnitId::new(2), UnitId::new(3)]);
            }
            other => panic!("parsed {other:?}"),
        }
    }

    #[test]
    fn test_parse_response_update_choice() {
        let json = r#"{"type":"GAME_ACTION","action":"UPDATE_COMBAT_RESPONSE",
            "unit":2,"combat":7,"update":"CHOOSE","choice":"EVADE"}"#;
        let ClientMessage::GameAction { action } = ClientMessage::from_json(json).unwrap();
        assert_eq!(
            action,
            GameAction::UpdateCombatResponse {
                unit: UnitId::new(2),
                combat: CombatId::new(7),
                update: ResponseUpdate::Choose {
                    choice: DefenseChoice::Evade,
                },
            }
        );
    }

    #[test]
    fn test_parse_bare_window_updates() {
        let json = r#"{"type":"GAME_ACTION","action":"UPDATE_COMBAT_RESPONSE",
            "unit":1,"combat":7,"update":"LUCK_HIT"}"#;
        let ClientMessage::GameAction { action } = ClientMessage::from_json(json).unwrap();
        assert!(matches!(
            action,
            GameAction::UpdateCombatResponse {
                update: ResponseUpdate::LuckHit,
                ..
            }
        ));

        let json = r#"{"type":"GAME_ACTION","action":"UPDATE_COMBAT_RESPONSE",
            "unit":2,"combat":7,"update":"SEAL_EVADE"}"#;
        let ClientMessage::GameAction { action } = ClientMessage::from_json(json).unwrap();
        assert!(matches!(
            action,
            GameAction::UpdateCombatResponse {
                update: ResponseUpdate::SealEvade,
                ..
            }
        ));
    }

    #[test]
    fn test_verb_names_round_trip() {
        let action = GameAction::ProcessCombatAndInitiateCounter {
            defender: UnitId::new(2),
            combat: CombatId::new(1),
        };
        assert_eq!(action.name(), "PROCESS_COMBAT_AND_INITIATE_COUNTER");

        let json = serde_json::to_string(&ClientMessage::GameAction { action }).unwrap();
        assert!(json.contains(r#""type":"GAME_ACTION""#));
        assert!(json.contains(r#""action":"PROCESS_COMBAT_AND_INITIATE_COUNTER""#));
    }

    #[test]
    fn test_use_skill_round_trip() {
        let message = ClientMessage::GameAction {
            action: GameAction::UseSkill {
                caster: UnitId::new(1),
                target: UnitId::new(1),
                key: "charisma".to_owned(),
            },
        };
        let json = serde_json::to_string(&message).unwrap();
        let back = ClientMessage::from_json(&json).unwrap();
        assert_eq!(message, back);
    }

    #[test]
    fn test_serialize_action_failed() {
        let message = ServerMessage::ActionFailed {
            action: "USE_SKILL".to_owned(),
            error: "unknown skill: gate_of_babylon".to_owned(),
        };
        let json = serde_json::to_string(&message).unwrap();
        assert!(json.contains(r#""type":"ACTION_FAILED""#));
        assert!(json.contains("gate_of_babylon"));
    }

    #[test]
    fn test_unknown_verb_is_parse_error() {
        let json = r#"{"type":"GAME_ACTION","action":"DANCE"}"#;
        assert!(ClientMessage::from_json(json).is_err());
    }
}
