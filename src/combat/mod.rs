//! Combat resolution: force composition, damage, and the negotiation.
//!
//! An attack flows through `engine` as a series of explicit lifecycle
//! calls; `damage` holds the numeric pipeline, `modifiers` the
//! effect-bucket collection, `record` the shared paper trail, and
//! `negotiation` the step machine both clients drive.

pub mod damage;
pub mod engine;
pub mod modifiers;
pub mod negotiation;
pub mod record;

pub use damage::{
    AttackProfile, Composition, CriticalRoll, DamageBreakdown, DamageType,
};
pub use engine::{ConfirmReport, ConfirmSide, InitiateReport};
pub use modifiers::{AttackerMods, ConsumptionPlan, DefenderMods, TypeResistance};
pub use negotiation::{
    CheckOutcome, CombatOutcome, DefenseChoice, NegotiationStep, ResponseRecord,
};
pub use record::{CombatId, CombatPhase, CombatRecord};
