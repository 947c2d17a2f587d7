//! Profile lookup and validation errors

use core::fmt;

use heapless::String;

use crate::config::profiles::MovingProfileId;
use crate::motion::Axis;

/// Maximum length of a profile name kept in error reports
pub const MAX_NAME_LEN: usize = 24;

/// How a profile was referenced when the lookup failed
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ProfileRef {
    /// Raw index into a fixed enumeration
    Index(u8),
    /// Name as written in a configuration file (possibly truncated)
    Name(String<MAX_NAME_LEN>),
    /// Typed moving profile id used on the wrong axis
    Moving(MovingProfileId),
}

impl ProfileRef {
    /// Build a name reference, truncating to [`MAX_NAME_LEN`] bytes
    pub fn name(name: &str) -> Self {
        let mut s = String::new();
        for c in name.chars() {
            if s.push(c).is_err() {
                break;
            }
        }
        ProfileRef::Name(s)
    }
}

impl fmt::Display for ProfileRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProfileRef::Index(index) => write!(f, "index {}", index),
            ProfileRef::Name(name) => write!(f, "\"{}\"", name),
            ProfileRef::Moving(id) => f.write_str(id.name()),
        }
    }
}

/// Errors raised while resolving or validating profiles
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ProfileError {
    /// Referenced profile is not part of the axis' fixed enumeration
    #[error("unknown {axis} profile {reference}")]
    UnknownProfile { axis: Axis, reference: ProfileRef },
    /// A profile field is outside its allowed range
    #[error("profile field `{field}` out of range: {value}")]
    OutOfRange { field: &'static str, value: i64 },
    /// Legacy profile row does not have exactly eight values
    #[error("moving profile row needs 8 values, got {count}")]
    MalformedRow { count: usize },
}

impl ProfileError {
    pub(crate) fn unknown_index(axis: Axis, index: u8) -> Self {
        ProfileError::UnknownProfile {
            axis,
            reference: ProfileRef::Index(index),
        }
    }

    pub(crate) fn unknown_name(axis: Axis, name: &str) -> Self {
        ProfileError::UnknownProfile {
            axis,
            reference: ProfileRef::name(name),
        }
    }

    /// Check if this is an unknown profile reference
    pub fn is_unknown_profile(&self) -> bool {
        matches!(self, ProfileError::UnknownProfile { .. })
    }
}

/// Check that `value` lies within `min..=max`
pub(crate) fn check_range(
    field: &'static str,
    value: i64,
    min: i64,
    max: i64,
) -> Result<(), ProfileError> {
    if value < min || value > max {
        return Err(ProfileError::OutOfRange { field, value });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_is_truncated() {
        let reference = ProfileRef::name("a_really_long_profile_name_that_overflows");
        match reference {
            ProfileRef::Name(name) => assert_eq!(name.len(), MAX_NAME_LEN),
            _ => panic!("expected name reference"),
        }
    }

    #[test]
    fn test_check_range() {
        assert!(check_range("cycles", 10, 0, 10).is_ok());
        assert_eq!(
            check_range("cycles", 11, 0, 10),
            Err(ProfileError::OutOfRange {
                field: "cycles",
                value: 11
            })
        );
    }
}
