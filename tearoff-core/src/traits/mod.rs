//! Hardware abstraction traits
//!
//! These traits define the interface between the separation logic and the
//! motion controller, time source and cancellation source of a machine.

pub mod abort;
pub mod axis;
pub mod clock;

pub use abort::{AbortSignal, NoAbort};
pub use axis::{AxisDriver, AxisError};
pub use clock::Clock;
