//! Legacy `config.ini` settings
//!
//! Older printers keep their tilt tuning in a flat `key = value` file with
//! one eight value row per tilt move, e.g.
//!
//! ```text
//! tiltdownlargefill = "5 650 1000 4 1 0 64 3"
//! tiltup = "2 400 0 5 1 0 0 0"
//! limit4fast = 45
//! layertowerhop = 0
//! ```
//!
//! Numeric settings that do not parse keep their default and are clamped
//! to their range. If any row is not eight integers, all tilt rows fall
//! back to their factory values; a row referencing an unknown curve is an
//! error. The calibrated tilt height is not clamped: an implausible value
//! is an error.

use tearoff_core::config::{
    area_fill_from_percent, CurveTable, ExposureProfile, LayerSeparationParams, MovingProfile,
    MovingProfileId, MovingProfileTable, TiltGeometry, TiltSequence, TowerCurve,
    DEFAULT_TILT_HEIGHT_STEPS,
};
use tracing::{debug, warn};

use crate::error::ConfigError;

/// Tower full steps per revolution times microsteps
const TOWER_USTEPS_PER_REV: u64 = 200 * 16;

const NM_PER_MM: u64 = 1_000_000;

/// Settings read from a legacy configuration file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacySettings {
    pub tilt_down_large_fill: MovingProfile,
    pub tilt_down_small_fill: MovingProfile,
    pub tilt_up_large_fill: MovingProfile,
    pub tilt_up_small_fill: MovingProfile,
    /// `tilt`: separate with the tilt
    pub use_tilt: bool,
    /// `limit4fast`: large fill threshold, percent of the display area
    pub limit4fast: u8,
    /// `layertowerhop`: tower hop in tower microsteps
    pub layer_tower_hop_steps: u32,
    /// `tiltheight`: calibrated horizontal tilt position
    pub tilt_height: i32,
    /// `screwmm`: tower lead screw pitch
    pub screw_mm: u32,
    /// `delaybeforeexposure`, stored in ms (file unit is 0.1 s)
    pub delay_before_exposure_ms: u32,
    /// `delayafterexposure`, stored in ms (file unit is 0.1 s)
    pub delay_after_exposure_ms: u32,
}

impl Default for LegacySettings {
    fn default() -> Self {
        Self {
            tilt_down_large_fill: MovingProfileId::TiltDownLargeFill.factory_profile(),
            tilt_down_small_fill: MovingProfileId::TiltDownSmallFill.factory_profile(),
            tilt_up_large_fill: MovingProfileId::TiltUpLargeFill.factory_profile(),
            tilt_up_small_fill: MovingProfileId::TiltUpSmallFill.factory_profile(),
            use_tilt: true,
            limit4fast: 45,
            layer_tower_hop_steps: 0,
            tilt_height: DEFAULT_TILT_HEIGHT_STEPS,
            screw_mm: 4,
            delay_before_exposure_ms: 0,
            delay_after_exposure_ms: 0,
        }
    }
}

impl LegacySettings {
    /// Moving profile table with the parsed rows
    ///
    /// Legacy files carry no curve parameters; those stay with the motion
    /// controller.
    pub fn table(&self) -> MovingProfileTable {
        MovingProfileTable::new(
            CurveTable::default(),
            CurveTable::default(),
            [
                self.tilt_down_large_fill,
                self.tilt_down_small_fill,
                self.tilt_up_large_fill,
                self.tilt_up_small_fill,
            ],
        )
    }

    pub fn geometry(&self) -> TiltGeometry {
        TiltGeometry::new(self.tilt_height)
    }

    /// Tower hop converted to nanometers
    pub fn tower_hop_nm(&self) -> u32 {
        let nm = self.layer_tower_hop_steps as u64 * NM_PER_MM * self.screw_mm as u64
            / TOWER_USTEPS_PER_REV;
        u32::try_from(nm).unwrap_or(u32::MAX)
    }

    /// Exposure profile equivalent to the legacy behaviour
    ///
    /// With the tilt, small areas use the small fill rows without a hop and
    /// large areas the large fill rows with the hop. Without the tilt every
    /// layer hops.
    pub fn exposure_profile(&self, display_area_mm2: f32) -> ExposureProfile {
        let separation = |tilt_down, tilt_up, hop| LayerSeparationParams {
            delay_before_exposure_ms: self.delay_before_exposure_ms,
            delay_after_exposure_ms: self.delay_after_exposure_ms,
            tower_hop_height_nm: hop,
            tower_profile: TowerCurve::Layer,
            tilt: self.use_tilt.then_some(TiltSequence {
                tilt_down,
                tilt_up,
                moves_time_ms: 0,
            }),
        };
        let hop = self.tower_hop_nm();

        ExposureProfile {
            area_fill: area_fill_from_percent(self.limit4fast, display_area_mm2),
            below_area_fill: separation(
                MovingProfileId::TiltDownSmallFill,
                MovingProfileId::TiltUpSmallFill,
                if self.use_tilt { 0 } else { hop },
            ),
            above_area_fill: separation(
                MovingProfileId::TiltDownLargeFill,
                MovingProfileId::TiltUpLargeFill,
                hop,
            ),
        }
    }
}

/// Parse a legacy configuration file
///
/// Keys are case-insensitive, values may be quoted, `#` starts a comment
/// line. Unknown keys are ignored. Missing keys keep their defaults.
pub fn parse_legacy_ini(input: &str) -> Result<LegacySettings, ConfigError> {
    let mut settings = LegacySettings::default();
    let mut tilt_up = None;
    let mut tilt_up_large = None;
    let mut tilt_up_small = None;
    let mut malformed = false;

    for (index, raw) in input.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with('[') {
            continue;
        }

        let Some((key, value)) = line.split_once('=') else {
            return Err(ConfigError::Syntax {
                line: index + 1,
                content: line.to_string(),
            });
        };
        let key = key.trim().to_ascii_lowercase();
        let value = value.trim().trim_matches('"');

        match key.as_str() {
            "tiltdownlargefill" | "tiltdownsmallfill" | "tiltup" | "tiltuplargefill"
            | "tiltupsmallfill" => {
                let Some(row) = parse_row(&key, value)? else {
                    malformed = true;
                    continue;
                };
                match key.as_str() {
                    "tiltdownlargefill" => settings.tilt_down_large_fill = row,
                    "tiltdownsmallfill" => settings.tilt_down_small_fill = row,
                    "tiltup" => tilt_up = Some(row),
                    "tiltuplargefill" => tilt_up_large = Some(row),
                    _ => tilt_up_small = Some(row),
                }
            }
            "tilt" => settings.use_tilt = parse_bool(&key, value, true),
            "limit4fast" => settings.limit4fast = parse_clamped(&key, value, 45, 0, 100) as u8,
            "layertowerhop" => {
                settings.layer_tower_hop_steps = parse_clamped(&key, value, 0, 0, 8000) as u32
            }
            "tiltheight" => {
                settings.tilt_height = parse_int(&key, value, DEFAULT_TILT_HEIGHT_STEPS as i64)
                    .clamp(i32::MIN as i64, i32::MAX as i64) as i32
            }
            "screwmm" => settings.screw_mm = parse_clamped(&key, value, 4, 1, 100) as u32,
            "delaybeforeexposure" => {
                settings.delay_before_exposure_ms =
                    parse_clamped(&key, value, 0, 0, 300) as u32 * 100
            }
            "delayafterexposure" => {
                settings.delay_after_exposure_ms =
                    parse_clamped(&key, value, 0, 0, 300) as u32 * 100
            }
            _ => debug!(key = key.as_str(), "ignoring legacy setting"),
        }
    }

    if let Some(row) = tilt_up {
        settings.tilt_up_large_fill = row;
        settings.tilt_up_small_fill = row;
    }
    if let Some(row) = tilt_up_large {
        settings.tilt_up_large_fill = row;
    }
    if let Some(row) = tilt_up_small {
        settings.tilt_up_small_fill = row;
    }
    if malformed {
        warn!("malformed tilt row, using factory values for all tilt rows");
        let factory = LegacySettings::default();
        settings.tilt_down_large_fill = factory.tilt_down_large_fill;
        settings.tilt_down_small_fill = factory.tilt_down_small_fill;
        settings.tilt_up_large_fill = factory.tilt_up_large_fill;
        settings.tilt_up_small_fill = factory.tilt_up_small_fill;
    }

    settings.geometry().validate()?;
    Ok(settings)
}

/// Parse an eight value row, `None` if it is not eight integers
fn parse_row(key: &str, value: &str) -> Result<Option<MovingProfile>, ConfigError> {
    let row: Result<Vec<i32>, _> = value.split_whitespace().map(str::parse).collect();
    match row {
        Ok(row) if row.len() == 8 => Ok(Some(MovingProfile::from_row(&row)?)),
        _ => {
            warn!(key, value, "malformed tilt row");
            Ok(None)
        }
    }
}

fn parse_int(key: &str, value: &str, default: i64) -> i64 {
    value.parse().unwrap_or_else(|_| {
        warn!(key, value, default, "invalid integer, using default");
        default
    })
}

fn parse_clamped(key: &str, value: &str, default: i64, min: i64, max: i64) -> i64 {
    parse_int(key, value, default).clamp(min, max)
}

fn parse_bool(key: &str, value: &str, default: bool) -> bool {
    match value.to_ascii_lowercase().as_str() {
        "true" | "yes" | "1" => true,
        "false" | "no" | "0" => false,
        _ => {
            warn!(key, value, default, "invalid boolean, using default");
            default
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tearoff_core::config::{Fill, ProfileError, TiltCurve};

    #[test]
    fn test_empty_file_is_factory() {
        let settings = parse_legacy_ini("").unwrap();

        assert_eq!(settings, LegacySettings::default());
        assert_eq!(settings.table(), MovingProfileTable::factory());
        assert_eq!(settings.geometry(), TiltGeometry::default());
    }

    #[test]
    fn test_rows_and_values() {
        let settings = parse_legacy_ini(
            r#"
            # tuned for a sticky resin
            tiltdownlargefill = "5 800 1500 4 2 100 64 3"
            tiltup = "2 300 0 5 1 0 0 0"
            TiltUpSmallFill = "2 200 0 6 1 0 0 0"
            limit4fast = 150
            layertowerhop = 800
            tiltheight = 4900
            delaybeforeexposure = 5
            fan1pwm = 60
            "#,
        )
        .unwrap();

        assert_eq!(
            settings.tilt_down_large_fill.to_row(),
            [5, 800, 1500, 4, 2, 100, 64, 3]
        );
        assert_eq!(settings.tilt_up_large_fill.offset_steps, 300);
        assert_eq!(settings.tilt_up_small_fill.offset_steps, 200);
        assert_eq!(
            settings.tilt_up_small_fill.finish_profile,
            TiltCurve::LayerMoveFast
        );
        assert_eq!(settings.limit4fast, 100);
        assert_eq!(settings.tower_hop_nm(), 1_000_000);
        assert_eq!(settings.tilt_height, 4900);
        assert_eq!(settings.delay_before_exposure_ms, 500);
    }

    #[test]
    fn test_malformed_row_reverts_all_rows() {
        let settings = parse_legacy_ini(
            "tiltdownlargefill = 5 800 1500 4 2 100 64 3\n\
             tiltup = 2 300 0 5 1 0 0 0\n\
             tiltdownsmallfill = 5 0 0\n\
             limit4fast = 30",
        )
        .unwrap();

        assert_eq!(settings.table(), MovingProfileTable::factory());
        assert_eq!(settings.limit4fast, 30);

        let settings = parse_legacy_ini("tiltup = 2 300 x 5 1 0 0 0").unwrap();
        assert_eq!(settings.table(), MovingProfileTable::factory());
    }

    #[test]
    fn test_implausible_tilt_height_is_error() {
        for height in ["0", "-4928", "99999999999"] {
            let err = parse_legacy_ini(&format!("tiltheight = {height}")).unwrap_err();
            assert!(matches!(
                err,
                ConfigError::Profile(ProfileError::OutOfRange {
                    field: "tilt_height_steps",
                    ..
                })
            ));
        }
    }

    #[test]
    fn test_unknown_curve_is_error() {
        let err = parse_legacy_ini("tiltup = 9 400 0 5 1 0 0 0").unwrap_err();

        assert!(err.is_unknown_profile());
    }

    #[test]
    fn test_syntax_error() {
        let err = parse_legacy_ini("limit4fast = 45\nnot a setting").unwrap_err();

        assert!(matches!(err, ConfigError::Syntax { line: 2, .. }));
    }

    #[test]
    fn test_exposure_profile_with_tilt() {
        let settings = parse_legacy_ini("layertowerhop = 400").unwrap();
        let profile = settings.exposure_profile(200.0);

        assert_eq!(profile.area_fill, 90.0);
        assert_eq!(profile.params(Fill::Below).tower_hop_height_nm, 0);
        assert_eq!(profile.params(Fill::Above).tower_hop_height_nm, 500_000);
        assert_eq!(
            profile.params(Fill::Below).tilt.map(|t| t.tilt_down),
            Some(MovingProfileId::TiltDownSmallFill)
        );
        assert!(profile.validate().is_ok());
    }

    #[test]
    fn test_exposure_profile_without_tilt() {
        let settings = parse_legacy_ini("tilt = false\nlayertowerhop = 400").unwrap();
        let profile = settings.exposure_profile(200.0);

        assert!(!profile.params(Fill::Below).use_tilt());
        assert_eq!(profile.params(Fill::Below).tower_hop_height_nm, 500_000);
        assert_eq!(profile.params(Fill::Above).tower_hop_height_nm, 500_000);
    }
}
