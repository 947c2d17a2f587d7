use std::path::Path;

use tearoff_config::{
    load_profiles, load_profiles_file, parse_legacy_ini, ConfigError, ExposureProfileId,
    LayerProfileId,
};
use tearoff_core::config::{
    Fill, MovingProfileId, ProfileError, TiltCurve, TowerCurve, MOVING_PROFILE_COUNT,
};
use tearoff_core::motion::Axis;

const SL1: &str = include_str!("fixtures/sl1.toml");
const PRESETS: &str = include_str!("fixtures/presets.toml");

#[test]
fn test_load_fixture() {
    let bundle = load_profiles(SL1).unwrap();

    assert_eq!(bundle.geometry.height_steps, 4928);
    assert!((bundle.exposure.area_fill - 3861.0).abs() < 0.01);

    let curve = bundle.table.curve(TiltCurve::LayerRelease);
    assert_eq!(curve.current, 29);
    assert_eq!(curve.stallguard_threshold, 63);
    assert_eq!(bundle.table.tower_curve(TowerCurve::Layer).maximum_steprate, 1600);
    assert_eq!(bundle.table.curve(TiltCurve::MoveSlow).current, 0);

    let down = bundle
        .table
        .profile_by_name(Axis::Tilt, "tilt_down_large_fill")
        .unwrap();
    assert_eq!(down.to_row(), [5, 650, 1000, 4, 3, 150, 64, 3]);

    let above = bundle.exposure.select(5000.0);
    assert_eq!(above.delay_after_exposure_ms, 200);
    assert_eq!(above.tower_hop_height_nm, 1_000_000);
    assert_eq!(above.tilt.map(|t| t.moves_time_ms), Some(5000));
    assert_eq!(bundle.exposure.fill_for(100.0), Fill::Below);
}

#[test]
fn test_load_fixture_from_disk() {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/sl1.toml");

    let bundle = load_profiles_file(&path).unwrap();
    assert_eq!(bundle, load_profiles(SL1).unwrap());
}

#[test]
fn test_missing_file() {
    let err = load_profiles_file("does/not/exist.toml").unwrap_err();

    assert!(matches!(err, ConfigError::Io { .. }));
    assert!(err.to_string().contains("does/not/exist.toml"));
}

#[test]
fn test_unknown_moving_profile() {
    let input = SL1.replace(
        "[moving_profiles.tilt_up_large_fill]",
        "[moving_profiles.tilt_sideways]",
    );

    let err = load_profiles(&input).unwrap_err();
    assert!(err.is_unknown_profile());
}

#[test]
fn test_out_of_range_profile() {
    let input = SL1.replace("cycles = 3", "cycles = 11");

    let err = load_profiles(&input).unwrap_err();
    assert!(matches!(
        err,
        ConfigError::Profile(ProfileError::OutOfRange {
            field: "cycles",
            value: 11
        })
    ));
}

#[test]
fn test_invalid_toml() {
    let err = load_profiles("[exposure\narea_fill = ").unwrap_err();

    assert!(matches!(err, ConfigError::Toml(_)));
}

#[test]
fn test_unknown_key_rejected() {
    let input = SL1.replace("moves_time_ms = 2000", "moves_time = 2000");

    assert!(matches!(
        load_profiles(&input).unwrap_err(),
        ConfigError::Toml(_)
    ));
}

#[test]
fn test_legacy_matches_factory_toml() {
    let legacy = parse_legacy_ini("limit4fast = 45\nlayertowerhop = 0").unwrap();
    let table = legacy.table();

    for id in MovingProfileId::ALL {
        assert_eq!(table.moving_profile(id), &id.factory_profile());
    }
    assert_eq!(MovingProfileId::ALL.len(), MOVING_PROFILE_COUNT);
}

#[test]
fn test_implausible_tilt_height() {
    let input = SL1.replace("tilt_height_steps = 4928", "tilt_height_steps = -2147483648");

    let err = load_profiles(&input).unwrap_err();
    assert!(matches!(
        err,
        ConfigError::Profile(ProfileError::OutOfRange {
            field: "tilt_height_steps",
            ..
        })
    ));
}

#[test]
fn test_named_exposure_profiles() {
    let bundle = load_profiles(PRESETS).unwrap();

    assert_eq!(bundle.layer_profiles.len(), 3);
    assert_eq!(bundle.exposure_profiles.len(), 2);
    assert_eq!(&bundle.exposure, bundle.exposure("high_viscosity").unwrap());
    assert!((bundle.exposure.area_fill - 3861.0).abs() < 0.01);

    // small fill by index
    assert_eq!(
        bundle.exposure.params(Fill::Below),
        bundle.layer_profile("slow").unwrap()
    );
    let above = bundle.exposure.params(Fill::Above);
    assert!(!above.use_tilt());
    assert_eq!(above.tower_hop_height_nm, 5_000_000);

    let default = bundle.exposure("default").unwrap();
    assert_eq!(default.select(10.0).tilt.map(|t| t.moves_time_ms), Some(2000));
    assert_eq!(
        default.select(5000.0).tilt.map(|t| t.tilt_down),
        Some(MovingProfileId::TiltDownLargeFill)
    );
    assert!(bundle
        .exposure_profiles
        .contains_key(&ExposureProfileId::Default));
    assert!(bundle.layer_profiles.contains_key(&LayerProfileId::SuperSlow));
}

#[test]
fn test_undefined_named_profiles() {
    let bundle = load_profiles(PRESETS).unwrap();

    assert!(bundle.exposure("safe").unwrap_err().is_unknown_profile());
    assert!(bundle.exposure("turbo").unwrap_err().is_unknown_profile());
    assert!(bundle.layer_profile("super_fast").unwrap_err().is_unknown_profile());
}

#[test]
fn test_default_exposure_profile_is_fallback() {
    let input = PRESETS.replace("profile = \"high_viscosity\"", "");

    let bundle = load_profiles(&input).unwrap();
    assert_eq!(&bundle.exposure, bundle.exposure("default").unwrap());
}

#[test]
fn test_exposure_profile_by_index() {
    let input = PRESETS.replace("profile = \"high_viscosity\"", "profile = 0");

    let bundle = load_profiles(&input).unwrap();
    assert_eq!(&bundle.exposure, bundle.exposure("default").unwrap());
}

#[test]
fn test_exposure_references_missing_layer_profile() {
    let input = PRESETS.replace(
        "large_fill_layer_profile = \"slow\"",
        "large_fill_layer_profile = \"super_fast\"",
    );

    let err = load_profiles(&input).unwrap_err();
    assert!(matches!(
        err,
        ConfigError::UnknownReference {
            kind: "layer profile",
            ..
        }
    ));
}

#[test]
fn test_unknown_layer_profile_name() {
    let input = PRESETS.replace("[layer_profiles.super_slow]", "[layer_profiles.glacial]");

    let err = load_profiles(&input).unwrap_err();
    assert!(err.is_unknown_profile());
    assert!(err.to_string().contains("glacial"));
}

#[test]
fn test_named_and_inline_exposure_conflict() {
    let input = format!(
        "{}\n[exposure.below_area_fill]\ntower_profile = \"layer\"\nuse_tilt = false\n",
        PRESETS
    );

    let err = load_profiles(&input).unwrap_err();
    assert!(matches!(
        err,
        ConfigError::Conflict {
            section: "exposure",
            first: "profile",
            second: "below_area_fill"
        }
    ));
}
