//! Motion axis driver trait
//!
//! This trait abstracts over the motion controller that executes tilt and
//! tower moves (a motion MCU on a serial link, a TMC driver behind a step
//! generator, or a simulation).

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::config::Curve;

/// Errors reported by an axis driver
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum AxisError {
    /// Communication error with the motion controller
    #[error("communication with the motion controller failed")]
    CommunicationError,
    /// Axis has not been homed since power on
    #[error("axis is not homed")]
    NotHomed,
    /// Requested position is outside the axis travel
    #[error("position out of bounds")]
    OutOfBounds,
    /// Driver answered with something the caller did not expect
    #[error("unexpected response from the driver")]
    InvalidResponse,
    /// Driver reported a fault (overtemperature, short, ...)
    #[error("driver fault")]
    DriverFault,
}

/// Trait for a single motion axis
///
/// All moves are blocking: a call returns once the axis has stopped.
/// Positions are in the axis' native unit (microsteps for the tilt,
/// nanometers for the tower).
pub trait AxisDriver {
    /// Hardware curve enumeration of this axis
    type Curve: Curve;

    /// Select the speed/current curve used by subsequent moves
    fn set_profile(&mut self, curve: Self::Curve) -> Result<(), AxisError>;

    /// Move by `steps` relative to the current position
    fn move_relative(&mut self, steps: i32) -> Result<(), AxisError>;

    /// Move to an absolute position
    fn move_absolute(&mut self, position: i32) -> Result<(), AxisError>;

    /// Current position
    fn position(&mut self) -> Result<i32, AxisError>;

    /// Check whether the last move ended in a stall
    ///
    /// Reading the flag clears it.
    fn query_stall(&mut self) -> Result<bool, AxisError>;

    /// Run the homing sequence
    ///
    /// Returns `Ok(false)` when homing completed without finding the endstop.
    fn home(&mut self) -> Result<bool, AxisError>;
}

impl<A: AxisDriver + ?Sized> AxisDriver for &mut A {
    type Curve = A::Curve;

    fn set_profile(&mut self, curve: Self::Curve) -> Result<(), AxisError> {
        A::set_profile(self, curve)
    }

    fn move_relative(&mut self, steps: i32) -> Result<(), AxisError> {
        A::move_relative(self, steps)
    }

    fn move_absolute(&mut self, position: i32) -> Result<(), AxisError> {
        A::move_absolute(self, position)
    }

    fn position(&mut self) -> Result<i32, AxisError> {
        A::position(self)
    }

    fn query_stall(&mut self) -> Result<bool, AxisError> {
        A::query_stall(self)
    }

    fn home(&mut self) -> Result<bool, AxisError> {
        A::home(self)
    }
}
