//! Motion primitives
//!
//! Axis identification and the cycle splitting used to pace tilt moves.

pub mod axis;
pub mod split;

pub use axis::Axis;
pub use split::{CycleSplit, SplitStep, MAX_CYCLES};
