//! Profile configuration loading
//!
//! Produces the resolved moving profile table, exposure profile and tilt
//! geometry consumed by the layer separation executor. Two formats are
//! supported:
//!
//! - TOML profile files with one section per curve, moving profile and
//!   named layer change or exposure profile
//! - Legacy `config.ini` key/value files with single-line tilt rows

pub mod error;
pub mod legacy;
pub mod loader;
pub mod presets;
mod schema;

pub use error::ConfigError;
pub use legacy::{parse_legacy_ini, LegacySettings};
pub use loader::{load_profiles, load_profiles_file, ProfileBundle};
pub use presets::{ExposureProfileId, LayerProfileId};
