//! Named layer change and exposure profiles
//!
//! A layer change profile is one complete set of separation parameters.
//! An exposure profile picks one layer change profile for small and one
//! for large layer areas. Both come from fixed enumerations and can be
//! referenced by name or by position.

use std::fmt;

/// Named layer change profiles, fastest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LayerProfileId {
    SuperFast,
    Fast,
    Slow,
    SuperSlow,
}

impl LayerProfileId {
    pub const ALL: [LayerProfileId; 4] = [
        LayerProfileId::SuperFast,
        LayerProfileId::Fast,
        LayerProfileId::Slow,
        LayerProfileId::SuperSlow,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            LayerProfileId::SuperFast => "super_fast",
            LayerProfileId::Fast => "fast",
            LayerProfileId::Slow => "slow",
            LayerProfileId::SuperSlow => "super_slow",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|id| id.name() == name)
    }

    pub fn from_index(index: u8) -> Option<Self> {
        Self::ALL.get(index as usize).copied()
    }
}

impl fmt::Display for LayerProfileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Named exposure profiles
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ExposureProfileId {
    Default,
    Safe,
    HighViscosity,
}

impl ExposureProfileId {
    pub const ALL: [ExposureProfileId; 3] = [
        ExposureProfileId::Default,
        ExposureProfileId::Safe,
        ExposureProfileId::HighViscosity,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            ExposureProfileId::Default => "default",
            ExposureProfileId::Safe => "safe",
            ExposureProfileId::HighViscosity => "high_viscosity",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|id| id.name() == name)
    }

    pub fn from_index(index: u8) -> Option<Self> {
        Self::ALL.get(index as usize).copied()
    }
}

impl fmt::Display for ExposureProfileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
