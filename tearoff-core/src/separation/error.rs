//! Layer separation errors

use crate::config::ProfileError;
use crate::motion::Axis;
use crate::traits::AxisError;

use super::phase::SeparationPhase;

/// Errors that end a layer separation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SeparationError {
    /// A referenced moving profile or curve does not exist
    #[error(transparent)]
    UnknownProfile(ProfileError),
    /// A profile, the parameter set or the tilt geometry is out of range
    #[error(transparent)]
    InvalidProfile(ProfileError),
    /// The tilt stayed stuck after every homing attempt
    #[error("tilt stall not resolved after {attempts} homing attempts ({phase})")]
    TiltStallUnrecoverable {
        phase: SeparationPhase,
        attempts: u8,
    },
    /// An axis driver command failed
    #[error("{axis} command failed during {phase}: {error}")]
    AxisCommandFailure {
        axis: Axis,
        phase: SeparationPhase,
        error: AxisError,
    },
    /// Separation was aborted on request
    #[error("separation cancelled during {phase}")]
    Cancelled { phase: SeparationPhase },
}

impl From<ProfileError> for SeparationError {
    fn from(error: ProfileError) -> Self {
        if error.is_unknown_profile() {
            SeparationError::UnknownProfile(error)
        } else {
            SeparationError::InvalidProfile(error)
        }
    }
}

impl SeparationError {
    /// Axis involved in the failure, if any
    pub fn axis(&self) -> Option<Axis> {
        match self {
            SeparationError::UnknownProfile(ProfileError::UnknownProfile { axis, .. }) => {
                Some(*axis)
            }
            SeparationError::UnknownProfile(_) | SeparationError::InvalidProfile(_) => None,
            SeparationError::TiltStallUnrecoverable { .. } => Some(Axis::Tilt),
            SeparationError::AxisCommandFailure { axis, .. } => Some(*axis),
            SeparationError::Cancelled { .. } => None,
        }
    }

    /// Phase the failure happened in
    ///
    /// Profile errors are raised before any motion and report `Idle`.
    pub fn phase(&self) -> SeparationPhase {
        match self {
            SeparationError::UnknownProfile(_) | SeparationError::InvalidProfile(_) => {
                SeparationPhase::Idle
            }
            SeparationError::TiltStallUnrecoverable { phase, .. }
            | SeparationError::AxisCommandFailure { phase, .. }
            | SeparationError::Cancelled { phase } => *phase,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProfileRef;

    #[test]
    fn test_profile_errors_are_split() {
        let unknown = SeparationError::from(ProfileError::UnknownProfile {
            axis: Axis::Tilt,
            reference: ProfileRef::Index(9),
        });
        assert!(matches!(unknown, SeparationError::UnknownProfile(_)));
        assert_eq!(unknown.axis(), Some(Axis::Tilt));

        let invalid = SeparationError::from(ProfileError::OutOfRange {
            field: "cycles",
            value: 200,
        });
        assert!(matches!(invalid, SeparationError::InvalidProfile(_)));
        assert_eq!(invalid.axis(), None);
        assert_eq!(invalid.phase(), SeparationPhase::Idle);
    }
}
