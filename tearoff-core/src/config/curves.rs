//! Hardware speed/current curves
//!
//! Every axis has a fixed table of eight named curves. The motion
//! controller holds the raw values; the layer separation sequence only
//! selects among them by id.

use core::marker::PhantomData;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::error::ProfileError;
use crate::motion::Axis;

/// Number of curves per axis
pub const CURVE_COUNT: usize = 8;

/// Common behaviour of the per-axis curve enumerations
pub trait Curve: Copy + Eq + core::fmt::Debug + 'static {
    /// Axis this curve belongs to
    const AXIS: Axis;

    /// All curves in index order
    fn all() -> &'static [Self; CURVE_COUNT];

    /// Index inside the fixed enumeration
    fn index(self) -> u8;

    /// Name as used in configuration files
    fn name(self) -> &'static str;

    /// Resolve a raw index
    fn from_index(index: u8) -> Result<Self, ProfileError> {
        Self::all()
            .get(index as usize)
            .copied()
            .ok_or(ProfileError::unknown_index(Self::AXIS, index))
    }

    /// Resolve a configuration name
    fn from_name(name: &str) -> Result<Self, ProfileError> {
        Self::all()
            .iter()
            .copied()
            .find(|c| c.name() == name)
            .ok_or_else(|| ProfileError::unknown_name(Self::AXIS, name))
    }
}

/// Tilt axis curves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum TiltCurve {
    HomingFast,
    HomingSlow,
    MoveFast,
    MoveSlow,
    LayerMoveSlow,
    LayerRelease,
    LayerMoveFast,
    Reserved,
}

impl Curve for TiltCurve {
    const AXIS: Axis = Axis::Tilt;

    fn all() -> &'static [Self; CURVE_COUNT] {
        use TiltCurve::*;
        &[
            HomingFast,
            HomingSlow,
            MoveFast,
            MoveSlow,
            LayerMoveSlow,
            LayerRelease,
            LayerMoveFast,
            Reserved,
        ]
    }

    fn index(self) -> u8 {
        self as u8
    }

    fn name(self) -> &'static str {
        match self {
            TiltCurve::HomingFast => "homing_fast",
            TiltCurve::HomingSlow => "homing_slow",
            TiltCurve::MoveFast => "move_fast",
            TiltCurve::MoveSlow => "move_slow",
            TiltCurve::LayerMoveSlow => "layer_move_slow",
            TiltCurve::LayerRelease => "layer_release",
            TiltCurve::LayerMoveFast => "layer_move_fast",
            TiltCurve::Reserved => "reserved",
        }
    }
}

/// Tower axis curves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum TowerCurve {
    HomingFast,
    HomingSlow,
    MoveFast,
    MoveSlow,
    Layer,
    LayerMove,
    SuperSlow,
    ResinSensor,
}

impl Curve for TowerCurve {
    const AXIS: Axis = Axis::Tower;

    fn all() -> &'static [Self; CURVE_COUNT] {
        use TowerCurve::*;
        &[
            HomingFast,
            HomingSlow,
            MoveFast,
            MoveSlow,
            Layer,
            LayerMove,
            SuperSlow,
            ResinSensor,
        ]
    }

    fn index(self) -> u8 {
        self as u8
    }

    fn name(self) -> &'static str {
        match self {
            TowerCurve::HomingFast => "homing_fast",
            TowerCurve::HomingSlow => "homing_slow",
            TowerCurve::MoveFast => "move_fast",
            TowerCurve::MoveSlow => "move_slow",
            TowerCurve::Layer => "layer",
            TowerCurve::LayerMove => "layer_move",
            TowerCurve::SuperSlow => "super_slow",
            TowerCurve::ResinSensor => "resin_sensor",
        }
    }
}

/// Raw stepper parameters of one curve
///
/// Values are passed to the motion controller untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CurveParams {
    /// Step rate at the start of a move (steps/s)
    pub starting_steprate: u16,
    /// Cruise step rate (steps/s)
    pub maximum_steprate: u16,
    /// Acceleration (steps/s², 0 = no ramp)
    pub acceleration: u16,
    /// Deceleration (steps/s², 0 = no ramp)
    pub deceleration: u16,
    /// Run current (driver units)
    pub current: u16,
    /// StallGuard threshold (signed, lower = more sensitive)
    pub stallguard_threshold: i8,
    /// Step rate above which CoolStep is active
    pub coolstep_threshold: u16,
}

/// Curve parameters of one axis, indexed by its curve enumeration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurveTable<C: Curve> {
    params: [CurveParams; CURVE_COUNT],
    _curve: PhantomData<C>,
}

impl<C: Curve> Default for CurveTable<C> {
    fn default() -> Self {
        Self::new([CurveParams::default(); CURVE_COUNT])
    }
}

impl<C: Curve> CurveTable<C> {
    /// Create a table from parameters in index order
    pub const fn new(params: [CurveParams; CURVE_COUNT]) -> Self {
        Self {
            params,
            _curve: PhantomData,
        }
    }

    /// Replace the parameters of one curve
    pub fn with(mut self, curve: C, params: CurveParams) -> Self {
        self.params[curve.index() as usize] = params;
        self
    }

    /// Parameters of a curve
    pub fn get(&self, curve: C) -> &CurveParams {
        &self.params[curve.index() as usize]
    }

    /// Iterate over all curves in index order
    pub fn iter(&self) -> impl Iterator<Item = (C, &CurveParams)> {
        C::all().iter().copied().zip(self.params.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::error::ProfileRef;

    #[test]
    fn test_index_round_trip() {
        for (i, curve) in TiltCurve::all().iter().enumerate() {
            assert_eq!(curve.index() as usize, i);
        }
        assert_eq!(TowerCurve::from_index(4), Ok(TowerCurve::Layer));
    }

    #[test]
    fn test_unknown_index() {
        assert_eq!(
            TiltCurve::from_index(8),
            Err(ProfileError::UnknownProfile {
                axis: Axis::Tilt,
                reference: ProfileRef::Index(8)
            })
        );
    }

    #[test]
    fn test_from_name() {
        assert_eq!(
            TiltCurve::from_name("layer_release"),
            Ok(TiltCurve::LayerRelease)
        );
        assert_eq!(
            TowerCurve::from_name("resin_sensor"),
            Ok(TowerCurve::ResinSensor)
        );

        let err = TowerCurve::from_name("layer_release").unwrap_err();
        assert!(err.is_unknown_profile());
    }

    #[test]
    fn test_curve_table() {
        let fast = CurveParams {
            starting_steprate: 2560,
            maximum_steprate: 2560,
            current: 40,
            stallguard_threshold: 63,
            ..Default::default()
        };
        let table = CurveTable::<TiltCurve>::default().with(TiltCurve::HomingFast, fast);

        assert_eq!(table.get(TiltCurve::HomingFast).starting_steprate, 2560);
        assert_eq!(table.get(TiltCurve::HomingSlow), &CurveParams::default());

        let (first, params) = table.iter().next().unwrap();
        assert_eq!(first, TiltCurve::HomingFast);
        assert_eq!(params.stallguard_threshold, 63);
        assert_eq!(table.iter().count(), CURVE_COUNT);
    }
}
