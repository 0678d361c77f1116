//! Port definitions
//!
//! Interfaces the engine depends on but whose implementations live elsewhere.
//!
//! - [`ManualDecider`] - settles plan entries the engine left for manual review

pub mod decider;

pub use decider::ManualDecider;
