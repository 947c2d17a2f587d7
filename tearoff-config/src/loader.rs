//! TOML profile file loader

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use tearoff_core::config::{
    area_fill_from_percent, Curve, CurveParams, CurveTable, ExposureProfile,
    LayerSeparationParams, MovingProfile, MovingProfileId, MovingProfileTable, ProfileError,
    ProfileRef, TiltGeometry, TiltSequence, TowerCurve,
};
use tearoff_core::motion::Axis;
use tracing::{debug, info};

use crate::error::ConfigError;
use crate::presets::{ExposureProfileId, LayerProfileId};
use crate::schema::{
    ExposurePresetSection, ExposureSection, MovingProfileSection, ProfileFile, Reference,
    SeparationSection,
};

/// Everything the executor needs for a print job
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileBundle {
    pub table: MovingProfileTable,
    /// Exposure profile selected by the `[exposure]` section
    pub exposure: ExposureProfile,
    pub geometry: TiltGeometry,
    /// Layer change profiles defined in the file
    pub layer_profiles: BTreeMap<LayerProfileId, LayerSeparationParams>,
    /// Exposure profiles defined in the file
    pub exposure_profiles: BTreeMap<ExposureProfileId, ExposureProfile>,
}

impl ProfileBundle {
    /// Layer change profile by name
    pub fn layer_profile(&self, name: &str) -> Result<&LayerSeparationParams, ConfigError> {
        LayerProfileId::from_name(name)
            .and_then(|id| self.layer_profiles.get(&id))
            .ok_or_else(|| ConfigError::UnknownReference {
                kind: "layer profile",
                reference: name.to_string(),
            })
    }

    /// Exposure profile by name
    pub fn exposure(&self, name: &str) -> Result<&ExposureProfile, ConfigError> {
        ExposureProfileId::from_name(name)
            .and_then(|id| self.exposure_profiles.get(&id))
            .ok_or_else(|| ConfigError::UnknownReference {
                kind: "exposure profile",
                reference: name.to_string(),
            })
    }
}

/// Parse and validate a TOML profile file
///
/// Moving profiles not present in the file keep their factory values,
/// curves not present are all zero.
pub fn load_profiles(input: &str) -> Result<ProfileBundle, ConfigError> {
    let file: ProfileFile = toml::from_str(input)?;

    let tilt_curves = resolve_curves(&file.tilt_curves)?;
    let tower_curves = resolve_curves(&file.tower_curves)?;

    let mut moving = MovingProfileId::ALL.map(MovingProfileId::factory_profile);
    for (name, section) in &file.moving_profiles {
        let id = MovingProfileId::from_name(name).ok_or_else(|| unknown_name(name))?;
        moving[id.index() as usize] = resolve_moving_profile(section)?;
        debug!(profile = name.as_str(), "moving profile loaded");
    }

    let table = MovingProfileTable::new(tilt_curves, tower_curves, moving);
    table.validate()?;

    let geometry = file
        .geometry
        .map(|g| TiltGeometry::new(g.tilt_height_steps))
        .unwrap_or_default();
    geometry.validate()?;

    let area_fill = resolve_area_fill(&file.exposure)?;

    let mut layer_profiles = BTreeMap::new();
    for (name, section) in &file.layer_profiles {
        let id = LayerProfileId::from_name(name).ok_or_else(|| ConfigError::UnknownReference {
            kind: "layer profile",
            reference: name.clone(),
        })?;
        let params = resolve_separation(section, &table, "layer_profiles")?;
        layer_profiles.insert(id, params);
        debug!(profile = name.as_str(), "layer profile loaded");
    }

    let mut exposure_profiles = BTreeMap::new();
    for (name, section) in &file.exposure_profiles {
        let id =
            ExposureProfileId::from_name(name).ok_or_else(|| ConfigError::UnknownReference {
                kind: "exposure profile",
                reference: name.clone(),
            })?;
        let exposure = resolve_preset(section, area_fill, &layer_profiles)?;
        exposure.validate()?;
        exposure_profiles.insert(id, exposure);
        debug!(profile = name.as_str(), "exposure profile loaded");
    }

    let exposure = resolve_exposure(&file.exposure, area_fill, &table, &exposure_profiles)?;
    exposure.validate()?;

    info!(
        area_fill = exposure.area_fill,
        moving_profiles = file.moving_profiles.len(),
        layer_profiles = layer_profiles.len(),
        exposure_profiles = exposure_profiles.len(),
        tilt_height = geometry.height_steps,
        "profiles loaded"
    );

    Ok(ProfileBundle {
        table,
        exposure,
        geometry,
        layer_profiles,
        exposure_profiles,
    })
}

/// Read and load a TOML profile file from disk
pub fn load_profiles_file(path: impl AsRef<Path>) -> Result<ProfileBundle, ConfigError> {
    let path = path.as_ref();
    let input = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    load_profiles(&input)
}

fn unknown_name(name: &str) -> ProfileError {
    ProfileError::UnknownProfile {
        axis: Axis::Tilt,
        reference: ProfileRef::name(name),
    }
}

fn resolve_curves<C: Curve>(
    sections: &BTreeMap<String, CurveParams>,
) -> Result<CurveTable<C>, ProfileError> {
    sections
        .iter()
        .try_fold(CurveTable::default(), |table, (name, params)| {
            let curve = C::from_name(name)?;
            Ok::<_, ProfileError>(table.with(curve, *params))
        })
}

fn resolve_moving_profile(section: &MovingProfileSection) -> Result<MovingProfile, ProfileError> {
    let profile = MovingProfile {
        initial_profile: section.initial_profile.resolve()?,
        offset_steps: section.offset_steps,
        offset_delay_ms: section.offset_delay_ms,
        finish_profile: section.finish_profile.resolve()?,
        cycles: section.cycles,
        delay_ms: section.delay_ms,
        homing_tolerance: section.homing_tolerance,
        homing_cycles: section.homing_cycles,
    };
    profile.validate()?;
    Ok(profile)
}

fn resolve_area_fill(section: &ExposureSection) -> Result<f32, ConfigError> {
    match (
        section.area_fill,
        section.area_fill_percent,
        section.display_area_mm2,
    ) {
        (Some(area), _, _) => Ok(area),
        (None, Some(percent), Some(display)) => Ok(area_fill_from_percent(percent, display)),
        (None, Some(_), None) => Err(ConfigError::MissingField {
            section: "exposure",
            field: "display_area_mm2",
        }),
        (None, None, _) => Err(ConfigError::MissingField {
            section: "exposure",
            field: "area_fill",
        }),
    }
}

/// Pick the inline parameter sets or a named exposure profile
///
/// Without either, the `default` exposure profile is used if the file
/// defines one.
fn resolve_exposure(
    section: &ExposureSection,
    area_fill: f32,
    table: &MovingProfileTable,
    presets: &BTreeMap<ExposureProfileId, ExposureProfile>,
) -> Result<ExposureProfile, ConfigError> {
    match (
        &section.profile,
        &section.below_area_fill,
        &section.above_area_fill,
    ) {
        (None, Some(below), Some(above)) => Ok(ExposureProfile {
            area_fill,
            below_area_fill: resolve_separation(below, table, "exposure.below_area_fill")?,
            above_area_fill: resolve_separation(above, table, "exposure.above_area_fill")?,
        }),
        (Some(reference), None, None) => {
            let profile = reference
                .lookup(ExposureProfileId::from_index, ExposureProfileId::from_name)
                .and_then(|id| presets.get(&id))
                .ok_or_else(|| ConfigError::UnknownReference {
                    kind: "exposure profile",
                    reference: reference.to_string(),
                })?;
            Ok(*profile)
        }
        (Some(_), Some(_), _) => Err(ConfigError::Conflict {
            section: "exposure",
            first: "profile",
            second: "below_area_fill",
        }),
        (Some(_), None, Some(_)) => Err(ConfigError::Conflict {
            section: "exposure",
            first: "profile",
            second: "above_area_fill",
        }),
        (None, None, None) => presets
            .get(&ExposureProfileId::Default)
            .copied()
            .ok_or(ConfigError::MissingField {
                section: "exposure",
                field: "profile",
            }),
        (None, None, Some(_)) => Err(ConfigError::MissingField {
            section: "exposure",
            field: "below_area_fill",
        }),
        (None, Some(_), None) => Err(ConfigError::MissingField {
            section: "exposure",
            field: "above_area_fill",
        }),
    }
}

fn resolve_preset(
    section: &ExposurePresetSection,
    area_fill: f32,
    layer_profiles: &BTreeMap<LayerProfileId, LayerSeparationParams>,
) -> Result<ExposureProfile, ConfigError> {
    let layer = |reference: &Reference| {
        reference
            .lookup(LayerProfileId::from_index, LayerProfileId::from_name)
            .and_then(|id| layer_profiles.get(&id))
            .copied()
            .ok_or_else(|| ConfigError::UnknownReference {
                kind: "layer profile",
                reference: reference.to_string(),
            })
    };

    Ok(ExposureProfile {
        area_fill,
        below_area_fill: layer(&section.small_fill_layer_profile)?,
        above_area_fill: layer(&section.large_fill_layer_profile)?,
    })
}

fn resolve_separation(
    section: &SeparationSection,
    table: &MovingProfileTable,
    name: &'static str,
) -> Result<LayerSeparationParams, ConfigError> {
    let tilt = if section.use_tilt {
        Some(TiltSequence {
            tilt_down: resolve_tilt_ref(section.tilt_down.as_deref(), table, name, "tilt_down")?,
            tilt_up: resolve_tilt_ref(section.tilt_up.as_deref(), table, name, "tilt_up")?,
            moves_time_ms: section.moves_time_ms,
        })
    } else {
        None
    };

    let params = LayerSeparationParams {
        delay_before_exposure_ms: section.delay_before_exposure_ms,
        delay_after_exposure_ms: section.delay_after_exposure_ms,
        tower_hop_height_nm: section.tower_hop_height_nm,
        tower_profile: section.tower_profile.resolve::<TowerCurve>()?,
        tilt,
    };
    params.validate()?;
    Ok(params)
}

fn resolve_tilt_ref(
    reference: Option<&str>,
    table: &MovingProfileTable,
    section: &'static str,
    field: &'static str,
) -> Result<MovingProfileId, ConfigError> {
    let name = reference.ok_or(ConfigError::MissingField { section, field })?;
    let id = MovingProfileId::from_name(name).ok_or_else(|| unknown_name(name))?;
    table.profile_for(Axis::Tilt, id)?;
    Ok(id)
}
