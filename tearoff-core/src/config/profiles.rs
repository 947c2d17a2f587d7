//! Tilt moving profiles and the moving profile table

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::curves::{Curve, CurveParams, CurveTable, TiltCurve, TowerCurve};
use super::error::{check_range, ProfileError, ProfileRef};
use super::geometry::TiltGeometry;
use crate::motion::{Axis, MAX_CYCLES};

/// Number of named moving profiles
pub const MOVING_PROFILE_COUNT: usize = 4;

/// Maximum offset of the first tilt move (microsteps)
pub const MAX_OFFSET_STEPS: i32 = 10_000;

/// Maximum delay inside a tilt move (ms)
pub const MAX_MOVE_DELAY_MS: u32 = 20_000;

/// Motion segment parameters of one tilt move
///
/// One tilt phase is an initial move of `offset_steps` with the
/// `initial_profile` curve, a pause, and the rest of the way with the
/// `finish_profile` curve split into `cycles` parts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MovingProfile {
    /// Curve for the first move
    pub initial_profile: TiltCurve,
    /// Length of the first move (microsteps)
    pub offset_steps: i32,
    /// Pause after the first move (ms)
    pub offset_delay_ms: u32,
    /// Curve for the remaining moves
    pub finish_profile: TiltCurve,
    /// Number of parts the remaining distance is split into
    pub cycles: u8,
    /// Pause between parts (ms)
    pub delay_ms: u32,
    /// Allowed distance from the target when checking for a stall (microsteps)
    pub homing_tolerance: u32,
    /// Homing attempts before a stall is considered unrecoverable
    pub homing_cycles: u8,
}

impl MovingProfile {
    /// Parse a legacy eight value row
    ///
    /// Order: initial curve, offset, offset delay, finish curve, cycles,
    /// delay, homing tolerance, homing cycles.
    pub fn from_row(row: &[i32]) -> Result<Self, ProfileError> {
        if row.len() != 8 {
            return Err(ProfileError::MalformedRow { count: row.len() });
        }

        let profile = Self {
            initial_profile: tilt_curve(row[0])?,
            offset_steps: row[1],
            offset_delay_ms: non_negative("offset_delay_ms", row[2])?,
            finish_profile: tilt_curve(row[3])?,
            cycles: small("cycles", row[4])?,
            delay_ms: non_negative("delay_ms", row[5])?,
            homing_tolerance: non_negative("homing_tolerance", row[6])?,
            homing_cycles: small("homing_cycles", row[7])?,
        };
        profile.validate()?;
        Ok(profile)
    }

    /// Encode as a legacy eight value row
    pub fn to_row(&self) -> [i32; 8] {
        [
            self.initial_profile.index() as i32,
            self.offset_steps,
            self.offset_delay_ms as i32,
            self.finish_profile.index() as i32,
            self.cycles as i32,
            self.delay_ms as i32,
            self.homing_tolerance as i32,
            self.homing_cycles as i32,
        ]
    }

    /// Check field ranges
    pub fn validate(&self) -> Result<(), ProfileError> {
        check_range(
            "offset_steps",
            self.offset_steps as i64,
            0,
            MAX_OFFSET_STEPS as i64,
        )?;
        check_range(
            "offset_delay_ms",
            self.offset_delay_ms as i64,
            0,
            MAX_MOVE_DELAY_MS as i64,
        )?;
        check_range("cycles", self.cycles as i64, 0, MAX_CYCLES as i64)?;
        check_range("delay_ms", self.delay_ms as i64, 0, MAX_MOVE_DELAY_MS as i64)?;
        Ok(())
    }

    /// Check field ranges and that the first move stays inside the tilt
    /// travel of `geometry`
    pub fn validate_for(&self, geometry: TiltGeometry) -> Result<(), ProfileError> {
        self.validate()?;
        check_range(
            "offset_steps",
            self.offset_steps as i64,
            0,
            geometry.height_steps as i64,
        )
    }
}

fn tilt_curve(value: i32) -> Result<TiltCurve, ProfileError> {
    match u8::try_from(value) {
        Ok(index) => TiltCurve::from_index(index),
        Err(_) => Err(ProfileError::OutOfRange {
            field: "curve index",
            value: value as i64,
        }),
    }
}

fn non_negative(field: &'static str, value: i32) -> Result<u32, ProfileError> {
    u32::try_from(value).map_err(|_| ProfileError::OutOfRange {
        field,
        value: value as i64,
    })
}

fn small(field: &'static str, value: i32) -> Result<u8, ProfileError> {
    u8::try_from(value).map_err(|_| ProfileError::OutOfRange {
        field,
        value: value as i64,
    })
}

/// Named tilt moving profiles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum MovingProfileId {
    TiltDownLargeFill,
    TiltDownSmallFill,
    TiltUpLargeFill,
    TiltUpSmallFill,
}

impl MovingProfileId {
    /// All ids in table order
    pub const ALL: [MovingProfileId; MOVING_PROFILE_COUNT] = [
        MovingProfileId::TiltDownLargeFill,
        MovingProfileId::TiltDownSmallFill,
        MovingProfileId::TiltUpLargeFill,
        MovingProfileId::TiltUpSmallFill,
    ];

    /// Axis the profile drives
    pub const fn axis(self) -> Axis {
        Axis::Tilt
    }

    /// Position in the table
    pub const fn index(self) -> u8 {
        self as u8
    }

    /// Name as used in configuration files
    pub const fn name(self) -> &'static str {
        match self {
            MovingProfileId::TiltDownLargeFill => "tilt_down_large_fill",
            MovingProfileId::TiltDownSmallFill => "tilt_down_small_fill",
            MovingProfileId::TiltUpLargeFill => "tilt_up_large_fill",
            MovingProfileId::TiltUpSmallFill => "tilt_up_small_fill",
        }
    }

    /// Resolve a configuration name
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|id| id.name() == name)
    }

    /// Factory parameters
    pub const fn factory_profile(self) -> MovingProfile {
        match self {
            // 5 650 1000 4 1 0 64 3
            MovingProfileId::TiltDownLargeFill => MovingProfile {
                initial_profile: TiltCurve::LayerRelease,
                offset_steps: 650,
                offset_delay_ms: 1000,
                finish_profile: TiltCurve::LayerMoveSlow,
                cycles: 1,
                delay_ms: 0,
                homing_tolerance: 64,
                homing_cycles: 3,
            },
            // 5 0 0 6 1 0 0 0
            MovingProfileId::TiltDownSmallFill => MovingProfile {
                initial_profile: TiltCurve::LayerRelease,
                offset_steps: 0,
                offset_delay_ms: 0,
                finish_profile: TiltCurve::LayerMoveFast,
                cycles: 1,
                delay_ms: 0,
                homing_tolerance: 0,
                homing_cycles: 0,
            },
            // 2 400 0 5 1 0 0 0
            MovingProfileId::TiltUpLargeFill | MovingProfileId::TiltUpSmallFill => {
                MovingProfile {
                    initial_profile: TiltCurve::MoveFast,
                    offset_steps: 400,
                    offset_delay_ms: 0,
                    finish_profile: TiltCurve::LayerRelease,
                    cycles: 1,
                    delay_ms: 0,
                    homing_tolerance: 0,
                    homing_cycles: 0,
                }
            }
        }
    }
}

/// Process-wide moving profile table
///
/// Holds the raw curves of both axes and the named tilt moving profiles.
/// Built once by the configuration loader and shared by reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MovingProfileTable {
    tilt_curves: CurveTable<TiltCurve>,
    tower_curves: CurveTable<TowerCurve>,
    moving: [MovingProfile; MOVING_PROFILE_COUNT],
}

impl Default for MovingProfileTable {
    fn default() -> Self {
        Self::factory()
    }
}

impl MovingProfileTable {
    /// Create a table; `moving` is in [`MovingProfileId::ALL`] order
    pub fn new(
        tilt_curves: CurveTable<TiltCurve>,
        tower_curves: CurveTable<TowerCurve>,
        moving: [MovingProfile; MOVING_PROFILE_COUNT],
    ) -> Self {
        Self {
            tilt_curves,
            tower_curves,
            moving,
        }
    }

    /// Table with factory moving profiles and unset curves
    pub fn factory() -> Self {
        Self::new(
            CurveTable::default(),
            CurveTable::default(),
            MovingProfileId::ALL.map(MovingProfileId::factory_profile),
        )
    }

    /// Look up a moving profile for an axis
    ///
    /// Fails with `UnknownProfile` if the profile does not drive `axis`.
    pub fn profile_for(
        &self,
        axis: Axis,
        id: MovingProfileId,
    ) -> Result<&MovingProfile, ProfileError> {
        if id.axis() != axis {
            return Err(ProfileError::UnknownProfile {
                axis,
                reference: ProfileRef::Moving(id),
            });
        }
        Ok(self.moving_profile(id))
    }

    /// Look up a moving profile by configuration name
    pub fn profile_by_name(&self, axis: Axis, name: &str) -> Result<&MovingProfile, ProfileError> {
        let id = MovingProfileId::from_name(name)
            .ok_or_else(|| ProfileError::unknown_name(axis, name))?;
        self.profile_for(axis, id)
    }

    /// Look up a moving profile by table index
    pub fn profile_by_index(&self, axis: Axis, index: u8) -> Result<&MovingProfile, ProfileError> {
        let id = MovingProfileId::ALL
            .get(index as usize)
            .copied()
            .ok_or(ProfileError::unknown_index(axis, index))?;
        self.profile_for(axis, id)
    }

    /// Moving profile by typed id
    pub fn moving_profile(&self, id: MovingProfileId) -> &MovingProfile {
        &self.moving[id.index() as usize]
    }

    /// Raw parameters of a tilt curve
    pub fn curve(&self, curve: TiltCurve) -> &CurveParams {
        self.tilt_curves.get(curve)
    }

    /// Raw parameters of a tower curve
    pub fn tower_curve(&self, curve: TowerCurve) -> &CurveParams {
        self.tower_curves.get(curve)
    }

    /// Tilt curve parameters
    pub fn tilt_curves(&self) -> &CurveTable<TiltCurve> {
        &self.tilt_curves
    }

    /// Tower curve parameters
    pub fn tower_curves(&self) -> &CurveTable<TowerCurve> {
        &self.tower_curves
    }

    /// Validate every moving profile
    pub fn validate(&self) -> Result<(), ProfileError> {
        for profile in &self.moving {
            profile.validate()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_factory_rows() {
        let table = MovingProfileTable::factory();

        assert_eq!(
            table
                .moving_profile(MovingProfileId::TiltDownLargeFill)
                .to_row(),
            [5, 650, 1000, 4, 1, 0, 64, 3]
        );
        assert_eq!(
            table
                .moving_profile(MovingProfileId::TiltDownSmallFill)
                .to_row(),
            [5, 0, 0, 6, 1, 0, 0, 0]
        );
        assert_eq!(
            table.moving_profile(MovingProfileId::TiltUpSmallFill).to_row(),
            [2, 400, 0, 5, 1, 0, 0, 0]
        );
        assert!(table.validate().is_ok());
    }

    #[test]
    fn test_from_row() {
        let profile = MovingProfile::from_row(&[0, 100, 0, 1, 2, 50, 96, 3]).unwrap();

        assert_eq!(profile.initial_profile, TiltCurve::HomingFast);
        assert_eq!(profile.offset_steps, 100);
        assert_eq!(profile.finish_profile, TiltCurve::HomingSlow);
        assert_eq!(profile.cycles, 2);
        assert_eq!(profile.delay_ms, 50);
        assert_eq!(profile.homing_tolerance, 96);
        assert_eq!(profile.homing_cycles, 3);
    }

    #[test]
    fn test_from_row_errors() {
        assert_eq!(
            MovingProfile::from_row(&[5, 650, 1000]),
            Err(ProfileError::MalformedRow { count: 3 })
        );

        let err = MovingProfile::from_row(&[9, 0, 0, 1, 1, 0, 0, 0]).unwrap_err();
        assert!(err.is_unknown_profile());

        assert_eq!(
            MovingProfile::from_row(&[5, 0, 0, 1, 11, 0, 0, 0]),
            Err(ProfileError::OutOfRange {
                field: "cycles",
                value: 11
            })
        );
        assert_eq!(
            MovingProfile::from_row(&[5, 0, -1, 1, 1, 0, 0, 0]),
            Err(ProfileError::OutOfRange {
                field: "offset_delay_ms",
                value: -1
            })
        );
    }

    #[test]
    fn test_validate_for_geometry() {
        let profile = MovingProfileId::TiltUpLargeFill.factory_profile();

        assert!(profile.validate_for(TiltGeometry::default()).is_ok());
        assert_eq!(
            profile.validate_for(TiltGeometry::new(300)),
            Err(ProfileError::OutOfRange {
                field: "offset_steps",
                value: 400
            })
        );

        let negative = MovingProfile {
            offset_steps: -500,
            ..profile
        };
        assert!(negative.validate_for(TiltGeometry::default()).is_err());
    }

    #[test]
    fn test_profile_for_axis() {
        let table = MovingProfileTable::factory();

        assert!(table
            .profile_for(Axis::Tilt, MovingProfileId::TiltUpLargeFill)
            .is_ok());
        assert_eq!(
            table.profile_for(Axis::Tower, MovingProfileId::TiltUpLargeFill),
            Err(ProfileError::UnknownProfile {
                axis: Axis::Tower,
                reference: ProfileRef::Moving(MovingProfileId::TiltUpLargeFill)
            })
        );
    }

    #[test]
    fn test_lookup_by_name_and_index() {
        let table = MovingProfileTable::factory();

        let by_name = table
            .profile_by_name(Axis::Tilt, "tilt_down_large_fill")
            .unwrap();
        let by_index = table.profile_by_index(Axis::Tilt, 0).unwrap();
        assert_eq!(by_name, by_index);

        assert!(table
            .profile_by_name(Axis::Tilt, "tilt_sideways")
            .unwrap_err()
            .is_unknown_profile());
        assert_eq!(
            table.profile_by_index(Axis::Tilt, 4),
            Err(ProfileError::UnknownProfile {
                axis: Axis::Tilt,
                reference: ProfileRef::Index(4)
            })
        );
    }
}
