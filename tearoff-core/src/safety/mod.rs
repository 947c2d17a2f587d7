//! Safety handling
//!
//! Detects a stuck tilt after the release move and recovers from it.

pub mod unstuck;

pub use unstuck::{StallCheck, StallOutcome, UnstuckProcedure, UnstuckStatus};
