//! Core engine types: units, ranks, dice, state, RNG, configuration.
//!
//! This module contains the fundamental building blocks the combat and
//! trigger layers sit on. Campaigns tune these via `BattleConfig`
//! rather than modifying the core.

pub mod config;
pub mod dice;
pub mod effect;
pub mod rank;
pub mod rng;
pub mod state;
pub mod unit;

pub use config::BattleConfig;
pub use dice::DiceFormula;
pub use effect::{Archetype, Effect, EffectCategory, EffectFilter, EffectId, EffectKind};
pub use rank::{Rank, RankLetter};
pub use rng::{BattleRng, BattleRngState};
pub use state::{BattleState, EventRecord, TurnTransition};
pub use unit::{
    Parameter, ParameterKind, Parameters, PlayerId, Position, Unit, UnitId, UnitSnapshot,
};
