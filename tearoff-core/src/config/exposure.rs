//! Area-dependent exposure profile

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::curves::TowerCurve;
use super::error::{check_range, ProfileError};
use super::profiles::MovingProfileId;

/// Maximum settle delay around an exposure (ms)
pub const MAX_EXPOSURE_DELAY_MS: u32 = 30_000;

/// Maximum tower hop (nm)
pub const MAX_TOWER_HOP_NM: u32 = 100_000_000;

/// Maximum advisory tilt move duration (ms)
pub const MAX_MOVES_TIME_MS: u32 = 600_000;

/// Which parameter set was active for a layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Fill {
    /// Layer area below the threshold
    Below,
    /// Layer area at or above the threshold
    Above,
}

/// Tilt part of a layer separation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TiltSequence {
    /// Profile used to tilt down (release)
    pub tilt_down: MovingProfileId,
    /// Profile used to tilt back up to the exposure position
    pub tilt_up: MovingProfileId,
    /// Expected duration of the tilt moves, reported only
    pub moves_time_ms: u32,
}

/// Parameters of one layer separation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LayerSeparationParams {
    /// Settle time after the separation, before the next exposure
    pub delay_before_exposure_ms: u32,
    /// Settle time after the exposure, before the separation
    pub delay_after_exposure_ms: u32,
    /// Tower raise before the next-layer move, 0 moves directly
    pub tower_hop_height_nm: u32,
    /// Tower curve used for every tower move
    pub tower_profile: TowerCurve,
    /// Tilt moves, `None` to separate with the tower only
    pub tilt: Option<TiltSequence>,
}

impl LayerSeparationParams {
    /// Whether the tilt moves are part of the separation
    pub fn use_tilt(&self) -> bool {
        self.tilt.is_some()
    }

    /// Check field ranges
    pub fn validate(&self) -> Result<(), ProfileError> {
        check_range(
            "delay_before_exposure_ms",
            self.delay_before_exposure_ms as i64,
            0,
            MAX_EXPOSURE_DELAY_MS as i64,
        )?;
        check_range(
            "delay_after_exposure_ms",
            self.delay_after_exposure_ms as i64,
            0,
            MAX_EXPOSURE_DELAY_MS as i64,
        )?;
        check_range(
            "tower_hop_height_nm",
            self.tower_hop_height_nm as i64,
            0,
            MAX_TOWER_HOP_NM as i64,
        )?;
        if let Some(tilt) = &self.tilt {
            check_range(
                "moves_time_ms",
                tilt.moves_time_ms as i64,
                0,
                MAX_MOVES_TIME_MS as i64,
            )?;
        }
        Ok(())
    }
}

/// Area-dependent pair of separation parameter sets
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ExposureProfile {
    /// Area threshold (mm²)
    pub area_fill: f32,
    pub below_area_fill: LayerSeparationParams,
    pub above_area_fill: LayerSeparationParams,
}

impl ExposureProfile {
    /// Which side of the threshold `area` falls on
    ///
    /// A single comparison, an area equal to the threshold counts as above.
    pub fn fill_for(&self, area: f32) -> Fill {
        if area < self.area_fill {
            Fill::Below
        } else {
            Fill::Above
        }
    }

    /// Parameters for a layer of `area` mm²
    pub fn select(&self, area: f32) -> &LayerSeparationParams {
        self.params(self.fill_for(area))
    }

    pub fn params(&self, fill: Fill) -> &LayerSeparationParams {
        match fill {
            Fill::Below => &self.below_area_fill,
            Fill::Above => &self.above_area_fill,
        }
    }

    /// Validate both parameter sets and the threshold
    pub fn validate(&self) -> Result<(), ProfileError> {
        if !self.area_fill.is_finite() || self.area_fill < 0.0 {
            return Err(ProfileError::OutOfRange {
                field: "area_fill",
                value: self.area_fill as i64,
            });
        }
        self.below_area_fill.validate()?;
        self.above_area_fill.validate()
    }
}

/// Convert a percentage of the display area into an area threshold
pub fn area_fill_from_percent(percent: u8, display_area_mm2: f32) -> f32 {
    display_area_mm2 * percent as f32 / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(hop: u32) -> LayerSeparationParams {
        LayerSeparationParams {
            delay_before_exposure_ms: 0,
            delay_after_exposure_ms: 0,
            tower_hop_height_nm: hop,
            tower_profile: TowerCurve::Layer,
            tilt: None,
        }
    }

    fn profile() -> ExposureProfile {
        ExposureProfile {
            area_fill: 50.0,
            below_area_fill: params(0),
            above_area_fill: params(5_000),
        }
    }

    #[test]
    fn test_select_boundary() {
        let profile = profile();

        assert_eq!(profile.fill_for(49.9), Fill::Below);
        assert_eq!(profile.fill_for(50.0), Fill::Above);
        assert_eq!(profile.fill_for(50.1), Fill::Above);
        assert_eq!(profile.select(30.0).tower_hop_height_nm, 0);
        assert_eq!(profile.select(50.0).tower_hop_height_nm, 5_000);
    }

    #[test]
    fn test_use_tilt() {
        let mut p = params(0);
        assert!(!p.use_tilt());

        p.tilt = Some(TiltSequence {
            tilt_down: MovingProfileId::TiltDownSmallFill,
            tilt_up: MovingProfileId::TiltUpSmallFill,
            moves_time_ms: 0,
        });
        assert!(p.use_tilt());
    }

    #[test]
    fn test_validate_ranges() {
        assert!(profile().validate().is_ok());

        let mut p = params(MAX_TOWER_HOP_NM + 1);
        assert!(p.validate().is_err());

        p.tower_hop_height_nm = 0;
        p.delay_after_exposure_ms = MAX_EXPOSURE_DELAY_MS + 1;
        assert_eq!(
            p.validate(),
            Err(ProfileError::OutOfRange {
                field: "delay_after_exposure_ms",
                value: 30_001
            })
        );

        let mut profile = profile();
        profile.area_fill = f32::NAN;
        assert!(profile.validate().is_err());
    }

    #[test]
    fn test_area_fill_from_percent() {
        assert_eq!(area_fill_from_percent(45, 200.0), 90.0);
        assert_eq!(area_fill_from_percent(0, 200.0), 0.0);
    }
}
