//! Booking coordinator for shared machines (laundry washers and dryers,
//! 3D printers): per-user fairness, time-window conflict prevention, a
//! lead-time cancellation gate and a weekly reset sweep.
//!
//! The surrounding transport resolves identities and parses requests; this
//! crate decides.

pub mod clock;
pub mod engine;
pub mod model;
pub mod observability;
pub mod registry;
pub mod store;
pub mod sweeper;

pub use engine::{Engine, EngineConfig, EngineError, Mode};
