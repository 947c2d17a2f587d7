//! Raw TOML schema
//!
//! Mirrors the file layout; names are resolved by the loader.

use std::collections::BTreeMap;
use std::fmt;

use serde::Deserialize;
use tearoff_core::config::{Curve, CurveParams, ProfileError};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct ProfileFile {
    #[serde(default)]
    pub geometry: Option<GeometrySection>,
    #[serde(default)]
    pub tilt_curves: BTreeMap<String, CurveParams>,
    #[serde(default)]
    pub tower_curves: BTreeMap<String, CurveParams>,
    #[serde(default)]
    pub moving_profiles: BTreeMap<String, MovingProfileSection>,
    #[serde(default)]
    pub layer_profiles: BTreeMap<String, SeparationSection>,
    #[serde(default)]
    pub exposure_profiles: BTreeMap<String, ExposurePresetSection>,
    pub exposure: ExposureSection,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct GeometrySection {
    pub tilt_height_steps: i32,
}

/// Curve or named profile given by index or by name
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum Reference {
    Index(u8),
    Name(String),
}

impl Reference {
    pub fn resolve<C: Curve>(&self) -> Result<C, ProfileError> {
        match self {
            Reference::Index(index) => C::from_index(*index),
            Reference::Name(name) => C::from_name(name),
        }
    }

    /// Resolve against a fixed enumeration
    pub fn lookup<T>(
        &self,
        from_index: impl Fn(u8) -> Option<T>,
        from_name: impl Fn(&str) -> Option<T>,
    ) -> Option<T> {
        match self {
            Reference::Index(index) => from_index(*index),
            Reference::Name(name) => from_name(name),
        }
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reference::Index(index) => write!(f, "index {}", index),
            Reference::Name(name) => write!(f, "\"{}\"", name),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct MovingProfileSection {
    pub initial_profile: Reference,
    #[serde(default)]
    pub offset_steps: i32,
    #[serde(default)]
    pub offset_delay_ms: u32,
    pub finish_profile: Reference,
    #[serde(default)]
    pub cycles: u8,
    #[serde(default)]
    pub delay_ms: u32,
    #[serde(default)]
    pub homing_tolerance: u32,
    #[serde(default)]
    pub homing_cycles: u8,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct ExposureSection {
    /// Threshold in mm²
    pub area_fill: Option<f32>,
    /// Threshold as percent of `display_area_mm2`
    pub area_fill_percent: Option<u8>,
    pub display_area_mm2: Option<f32>,
    /// Named exposure profile used instead of the inline parameter sets
    pub profile: Option<Reference>,
    pub below_area_fill: Option<SeparationSection>,
    pub above_area_fill: Option<SeparationSection>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct ExposurePresetSection {
    pub small_fill_layer_profile: Reference,
    pub large_fill_layer_profile: Reference,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct SeparationSection {
    #[serde(default)]
    pub delay_before_exposure_ms: u32,
    #[serde(default)]
    pub delay_after_exposure_ms: u32,
    #[serde(default)]
    pub tower_hop_height_nm: u32,
    pub tower_profile: Reference,
    #[serde(default = "default_true")]
    pub use_tilt: bool,
    pub tilt_down: Option<String>,
    pub tilt_up: Option<String>,
    #[serde(default)]
    pub moves_time_ms: u32,
}
