//! Profile configuration types
//!
//! Moving profile tables and exposure profiles are loaded once before a
//! print job starts and stay read-only for the whole job. Parsing them is
//! left to the host tooling; this module only defines the resolved
//! in-memory structures and their validation.

pub mod curves;
pub mod error;
pub mod exposure;
pub mod geometry;
pub mod profiles;

pub use curves::{Curve, CurveParams, CurveTable, TiltCurve, TowerCurve, CURVE_COUNT};
pub use error::{ProfileError, ProfileRef, MAX_NAME_LEN};
pub use exposure::{
    area_fill_from_percent, ExposureProfile, Fill, LayerSeparationParams, TiltSequence,
};
pub use geometry::{TiltGeometry, DEFAULT_TILT_HEIGHT_STEPS, MAX_TILT_HEIGHT_STEPS};
pub use profiles::{MovingProfile, MovingProfileId, MovingProfileTable, MOVING_PROFILE_COUNT};
