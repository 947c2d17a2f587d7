//! Layer separation
//!
//! Tilt-down, tower hop, tilt-up and tower-lower sequence run after each
//! exposed layer.

pub mod error;
pub mod executor;
pub mod phase;
pub mod plan;

pub use error::SeparationError;
pub use executor::{LayerSeparator, SeparationReport};
pub use phase::SeparationPhase;
pub use plan::{Command, Feedback, SeparationPlan, Step};
