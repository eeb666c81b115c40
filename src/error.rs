//! Error types for the combat engine.
//!
//! Failures fall into a few families: lookups that miss (units, combat
//! records, skill and trigger keys), malformed data strings (ranks, dice
//! formulas), and sequence violations in the combat negotiation. None of
//! them are fatal to a room; the session layer converts every error into
//! an `ACTION_FAILED` message on the same channel it received the action.

use thiserror::Error;

use crate::combat::CombatId;
use crate::core::UnitId;

/// Result type alias using [`EngineError`].
pub type Result<T> = std::result::Result<T, EngineError>;

/// Top-level error type for all combat engine errors.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Unit lookup failed.
    #[error("Unit not found: {0}")]
    UnitNotFound(UnitId),

    /// Combat record lookup failed.
    #[error("Combat not found: {0}")]
    CombatNotFound(CombatId),

    /// Skill/NP/action key has no registered implementation.
    #[error("Unknown skill: '{0}'")]
    UnknownSkill(String),

    /// Trigger ref points at a key the registry does not know.
    #[error("Unknown trigger key: '{0}'")]
    UnknownTrigger(String),

    /// Rank string did not parse.
    #[error("Malformed rank: '{0}'")]
    MalformedRank(String),

    /// Dice formula string did not parse.
    #[error("Malformed dice formula: '{0}'")]
    MalformedFormula(String),

    /// A unit can hold at most one unresolved incoming combat.
    #[error("Unit {0} already has an unresolved incoming combat")]
    IncomingCombatOccupied(UnitId),

    /// Message arrived for the wrong negotiation step.
    #[error("Negotiation is at step {actual}, message requires step {expected}")]
    WrongNegotiationStep {
        /// Step the message is valid for.
        expected: u8,
        /// Step the record is actually at.
        actual: u8,
    },

    /// The acting side has no open response window.
    #[error("No open {side} window in this negotiation")]
    WindowClosed {
        /// Which side tried to act.
        side: &'static str,
    },

    /// Counter grant refused: the attack was itself a counter against this defender.
    #[error("Unit {0} cannot counter a counter aimed at it")]
    DoubleCounter(UnitId),

    /// Noble Phantasm use attempted before its unlock round.
    #[error("Noble Phantasm locked until round {unlock}, current round is {round}")]
    NoblePhantasmLocked {
        /// Current round.
        round: u32,
        /// First round NPs are allowed.
        unlock: u32,
    },

    /// Command-seal evade attempted with no seals left.
    #[error("Unit {0} has no command seals remaining")]
    NoCommandSeals(UnitId),

    /// A trigger behavior faulted while reacting to an event.
    #[error("Trigger '{key}' faulted: {message}")]
    TriggerFault {
        /// Registered key of the faulting behavior.
        key: String,
        /// What went wrong.
        message: String,
    },

    /// Inbound action payload was structurally valid but semantically unusable.
    #[error("Invalid action: {0}")]
    InvalidAction(String),

    /// State snapshot could not be encoded or decoded.
    #[error("Snapshot failed: {0}")]
    Snapshot(String),
}

impl From<bincode::Error> for EngineError {
    fn from(err: bincode::Error) -> Self {
        Self::Snapshot(err.to_string())
    }
}
