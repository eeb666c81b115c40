//! Status effect application onto units.
//!
//! The effect data model lives in `core::effect`; this module holds the
//! chance-based pipeline that actually lands one on a target.

pub mod application;

pub use application::{apply, ApplicationOutcome, ApplicationReport};
