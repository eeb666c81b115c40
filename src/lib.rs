//! # skirmish-engine
//!
//! A server-authoritative combat engine for two-player tactical battles.
//!
//! ## Design Principles
//!
//! 1. **Server-Authoritative**: Clients send verbs; every roll, every
//!    resolution, and every hit point lives here. A client that stops
//!    answering forfeits a combat, never corrupts it.
//!
//! 2. **Deterministic**: One seeded RNG stream per battle. Config levers
//!    (`check_base`, `base_crit_chance`, `base_effect_chance`) force
//!    outcomes so tests and replays are exact.
//!
//! 3. **Staged Side Effects**: Passive abilities run against a cloned
//!    state and commit only on success. A faulty trigger is logged and
//!    dropped; the battle keeps going.
//!
//! ## Architecture
//!
//! - **Ranks as Arithmetic**: Parameter grades (E through EX) are a
//!   clamped numeric ladder, so resistance checks and Noble Phantasm
//!   negation reduce to comparisons.
//!
//! - **Negotiated Combat**: An attack is a mailbox record walked through
//!   a three-step defense negotiation by both clients, finalized and
//!   confirmed idempotently.
//!
//! - **Persistent Log**: The battle log is an `im` vector; snapshots
//!   share structure with the live state.
//!
//! ## Modules
//!
//! - `core`: Units, parameters, ranks, dice, effects-as-data, state, RNG
//! - `combat`: Force composition, damage pipeline, combat negotiation
//! - `effects`: Chance-based effect application with resistance and wards
//! - `triggers`: Event-driven passive abilities with staged dispatch
//! - `skills`: Keyed ability specs routed through effect application
//! - `protocol`: Wire messages and per-room session orchestration
//! - `error`: Shared error type

pub mod combat;
pub mod core;
pub mod effects;
pub mod error;
pub mod protocol;
pub mod skills;
pub mod triggers;

// Re-export commonly used types
pub use crate::core::{
    Archetype, BattleConfig, BattleRng, BattleRngState, BattleState, DiceFormula, Effect,
    EffectCategory, EffectFilter, EffectId, EffectKind, EventRecord, Parameter, ParameterKind,
    Parameters, PlayerId, Position, Rank, RankLetter, TurnTransition, Unit, UnitId, UnitSnapshot,
};

pub use crate::combat::{
    AttackProfile, AttackerMods, CheckOutcome, CombatId, CombatOutcome, CombatPhase, CombatRecord,
    Composition, ConfirmReport, ConfirmSide, CriticalRoll, DamageBreakdown, DamageType,
    DefenderMods, DefenseChoice, InitiateReport, NegotiationStep, ResponseRecord,
};

pub use crate::effects::{apply, ApplicationOutcome, ApplicationReport};

pub use crate::triggers::{
    handle_event, register_stock, BattleEvent, EventKind, FiredTrigger, TriggerBehavior,
    TriggerKey, TriggerRef, TriggerRegistry, TriggerScope,
};

pub use crate::skills::{use_skill, SkillKind, SkillRegistry, SkillReport, SkillSpec, TargetRule};

pub use crate::protocol::{
    Audience, ClientMessage, GameAction, Outbound, ResponseUpdate, RoomSession, ServerMessage,
    StateView,
};

pub use crate::error::{EngineError, Result};
