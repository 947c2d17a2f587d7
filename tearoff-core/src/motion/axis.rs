//! Axis identification

use core::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Motion axis taking part in layer separation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Axis {
    /// Platform tilt (peels the layer off the vat membrane), microsteps
    Tilt,
    /// Tower / Z axis (positions the platform for the next layer), nanometers
    Tower,
}

impl Axis {
    /// Lowercase axis name as used in configuration files
    pub const fn as_str(self) -> &'static str {
        match self {
            Axis::Tilt => "tilt",
            Axis::Tower => "tower",
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
