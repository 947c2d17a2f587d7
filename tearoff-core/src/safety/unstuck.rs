//! Tilt stall detection and recovery
//!
//! After tilting down the tilt axis must sit at its calibrated zero, after
//! tilting up at the exposure position. A stall flag from the driver or a
//! position outside the homing tolerance means the tilt got stuck; it is
//! then homed repeatedly until the endstop is found or the attempts run
//! out.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Result of checking the tilt axis after a move
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum StallOutcome {
    /// Axis reached its target
    Clear,
    /// Driver reported a stall or the axis ended too far from the target
    Stalled {
        /// Reported position
        position: i32,
        /// Absolute distance to the target
        deviation: u32,
    },
}

impl StallOutcome {
    pub fn is_clear(&self) -> bool {
        matches!(self, StallOutcome::Clear)
    }
}

/// Position/stall check against a target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StallCheck {
    target: i32,
    tolerance: u32,
}

impl StallCheck {
    pub const fn new(target: i32, tolerance: u32) -> Self {
        Self { target, tolerance }
    }

    pub fn target(&self) -> i32 {
        self.target
    }

    /// Evaluate driver feedback
    pub fn evaluate(&self, stalled: bool, position: i32) -> StallOutcome {
        let deviation = position.abs_diff(self.target);
        if stalled || deviation > self.tolerance {
            StallOutcome::Stalled {
                position,
                deviation,
            }
        } else {
            StallOutcome::Clear
        }
    }
}

/// State after a homing attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum UnstuckStatus {
    /// Homing succeeded
    Recovered { attempts: u8 },
    /// Homing failed, another attempt is allowed
    Retry,
    /// Homing failed and no attempts are left
    Exhausted { attempts: u8 },
}

/// Bounded homing retry counter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct UnstuckProcedure {
    max_attempts: u8,
    attempts: u8,
}

impl UnstuckProcedure {
    pub const fn new(max_attempts: u8) -> Self {
        Self {
            max_attempts,
            attempts: 0,
        }
    }

    /// Attempts made so far
    pub fn attempts(&self) -> u8 {
        self.attempts
    }

    pub fn remaining(&self) -> u8 {
        self.max_attempts.saturating_sub(self.attempts)
    }

    /// No attempts left
    pub fn is_exhausted(&self) -> bool {
        self.remaining() == 0
    }

    /// Record the result of one homing attempt
    pub fn record(&mut self, homed: bool) -> UnstuckStatus {
        self.attempts = self.attempts.saturating_add(1);
        if homed {
            UnstuckStatus::Recovered {
                attempts: self.attempts,
            }
        } else if self.is_exhausted() {
            UnstuckStatus::Exhausted {
                attempts: self.attempts,
            }
        } else {
            UnstuckStatus::Retry
        }
    }
}
