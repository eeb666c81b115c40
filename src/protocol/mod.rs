//! The wire surface: typed messages and per-room orchestration.
//!
//! `message` defines the tagged JSON envelope both clients speak;
//! `session` owns the authoritative state behind it and turns each
//! inbound verb into engine calls, trigger dispatch, and a batch of
//! outbound messages.

pub mod message;
pub mod session;

pub use message::{ClientMessage, GameAction, ResponseUpdate, ServerMessage, StateView};
pub use session::{full_visibility, Audience, Outbound, RoomSession, VisibilityFilter};
