//! Event-driven passive abilities.
//!
//! Units carry serializable [`TriggerRef`] values; the functions they
//! point at live in a [`TriggerRegistry`] side table. When the engine
//! emits a [`BattleEvent`], [`handle_event`] gathers every matching
//! ref, orders the candidates by behavior priority, and fires each one
//! against a staged clone of the battle so a faulty behavior cannot
//! corrupt live state.
//!
//! ## Key Components
//!
//! - [`BattleEvent`] / [`EventKind`]: the closed interception taxonomy
//! - [`TriggerRef`]: a unit's handle on a behavior, with tuning params
//! - [`TriggerBehavior`]: a registered condition + apply function pair
//! - [`TriggerRegistry`]: key to behavior lookup
//! - [`handle_event`]: the dispatch loop
//!
//! ## Example
//!
//! ```
//! use skirmish::core::{BattleConfig, BattleState, PlayerId, Unit};
//! use skirmish::triggers::{handle_event, BattleEvent, TriggerRef, TriggerRegistry};
//!
//! let registry = TriggerRegistry::with_stock_behaviors();
//! let mut state = BattleState::new(BattleConfig::default(), 42);
//! let servant = state.spawn(|id| {
//!     Unit::new(id, "assassin", PlayerId::new(0))
//!         .with_hp(300)
//!         .with_trigger(TriggerRef::new("guts").with_uses(1).with_param("restore", 150))
//! });
//!
//! // A lethal hit lands; Guts turns the defeat into a revival.
//! state.unit_mut(servant).unwrap().apply_damage(300);
//! let fired = handle_event(&mut state, &registry, &BattleEvent::hp_lost(servant, 300));
//!
//! assert_eq!(fired.len(), 1);
//! assert_eq!(fired[0].name, "Guts");
//! assert_eq!(state.unit(servant).unwrap().hp, 150);
//! ```

pub mod dispatch;
pub mod event;
pub mod library;
pub mod registry;

pub use dispatch::{handle_event, FiredTrigger};
pub use event::{BattleEvent, EventKind};
pub use library::register_stock;
pub use registry::{
    ApplyFn, ConditionFn, TriggerBehavior, TriggerKey, TriggerRef, TriggerRegistry, TriggerScope,
};
