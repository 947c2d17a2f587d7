//! Calibrated tilt geometry

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::error::{check_range, ProfileError};

/// Factory horizontal tilt position (microsteps)
pub const DEFAULT_TILT_HEIGHT_STEPS: i32 = 4928;

/// Top mechanical stop of the tilt (microsteps)
pub const MAX_TILT_HEIGHT_STEPS: i32 = 6016;

/// Tilt positions known from calibration
///
/// Position 0 is the bottom endstop where the layer has been released.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TiltGeometry {
    /// Horizontal (exposure) tilt position
    pub height_steps: i32,
}

impl TiltGeometry {
    /// Calibrated bottom position
    pub const ZERO: i32 = 0;

    pub const fn new(height_steps: i32) -> Self {
        Self { height_steps }
    }

    /// Check that the horizontal position lies between the bottom endstop
    /// and the top stop
    pub fn validate(&self) -> Result<(), ProfileError> {
        check_range(
            "tilt_height_steps",
            self.height_steps as i64,
            1,
            MAX_TILT_HEIGHT_STEPS as i64,
        )
    }
}

impl Default for TiltGeometry {
    fn default() -> Self {
        Self::new(DEFAULT_TILT_HEIGHT_STEPS)
    }
}
