//! Layer separation phases

use core::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Phase of a layer separation
///
/// Phases run in declaration order; tilt phases are skipped when the
/// active parameter set does not use the tilt, the unstuck phases only run
/// after a failed stall check and `TowerLower` only after a tower hop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum SeparationPhase {
    /// No separation running
    Idle,
    /// Waiting `delay_after_exposure_ms`
    SettleAfterExposure,
    /// First tilt-down move by the profile offset
    TiltDownInitial,
    /// Pause after the first tilt-down move
    TiltDownOffsetWait,
    /// Switching to the finish curve
    TiltDownFinish,
    /// Split moves down to the calibrated zero
    TiltDownCycles,
    /// Verifying the tilt reached zero
    StallCheck,
    /// Homing retries after a stall on the way down
    Unstuck,
    /// Tower hop or direct move to the next layer
    TowerPhase,
    /// First tilt-up move to just below the exposure position
    TiltUpInitial,
    /// Pause after the first tilt-up move
    TiltUpOffsetWait,
    /// Switching to the finish curve
    TiltUpFinish,
    /// Split moves up to the exposure position
    TiltUpCycles,
    /// Verifying the tilt reached the exposure position
    TiltUpStallCheck,
    /// Homing retries after a stall on the way up, then back to the
    /// exposure position
    TiltUpUnstuck,
    /// Tower move from the hop height to the next layer
    TowerLower,
    /// Waiting `delay_before_exposure_ms`
    SettleBeforeExposure,
    /// Separation finished
    Done,
}

impl SeparationPhase {
    pub const fn as_str(self) -> &'static str {
        match self {
            SeparationPhase::Idle => "idle",
            SeparationPhase::SettleAfterExposure => "settle after exposure",
            SeparationPhase::TiltDownInitial => "tilt down initial",
            SeparationPhase::TiltDownOffsetWait => "tilt down offset wait",
            SeparationPhase::TiltDownFinish => "tilt down finish",
            SeparationPhase::TiltDownCycles => "tilt down cycles",
            SeparationPhase::StallCheck => "stall check",
            SeparationPhase::Unstuck => "unstuck",
            SeparationPhase::TowerPhase => "tower",
            SeparationPhase::TiltUpInitial => "tilt up initial",
            SeparationPhase::TiltUpOffsetWait => "tilt up offset wait",
            SeparationPhase::TiltUpFinish => "tilt up finish",
            SeparationPhase::TiltUpCycles => "tilt up cycles",
            SeparationPhase::TiltUpStallCheck => "tilt up stall check",
            SeparationPhase::TiltUpUnstuck => "tilt up unstuck",
            SeparationPhase::TowerLower => "tower lower",
            SeparationPhase::SettleBeforeExposure => "settle before exposure",
            SeparationPhase::Done => "done",
        }
    }

    /// Check if the phase moves or checks the tilt axis
    pub fn is_tilt(self) -> bool {
        matches!(
            self,
            SeparationPhase::TiltDownInitial
                | SeparationPhase::TiltDownOffsetWait
                | SeparationPhase::TiltDownFinish
                | SeparationPhase::TiltDownCycles
                | SeparationPhase::StallCheck
                | SeparationPhase::Unstuck
                | SeparationPhase::TiltUpInitial
                | SeparationPhase::TiltUpOffsetWait
                | SeparationPhase::TiltUpFinish
                | SeparationPhase::TiltUpCycles
                | SeparationPhase::TiltUpStallCheck
                | SeparationPhase::TiltUpUnstuck
        )
    }
}

impl fmt::Display for SeparationPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
