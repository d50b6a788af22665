use std::path::PathBuf;

use lightsheet_core::pipeline::config::{
    InterestPointConfig, PipelineConfig, ReaderVariant, RegistrationMethod,
};
use lightsheet_core::pipeline::{Stage, StageResult, StageStatus};
use lightsheet_core::resources::{
    FusionOutput, FusionStrategy, ResourceTier, SlowFusionPolicy,
};

// ---------------------------------------------------------------------------
// Display
// ---------------------------------------------------------------------------

#[test]
fn test_reader_display() {
    assert_eq!(ReaderVariant::ZenTiling.to_string(), "LightSheet 7 (Zen tiling)");
    assert_eq!(
        ReaderVariant::TileScanMacro.to_string(),
        "LightSheet Z.1 / 7 (Tile scan macro)"
    );
}

#[test]
fn test_fusion_display() {
    assert_eq!(FusionStrategy::InMemory.to_string(), "In Memory");
    assert_eq!(FusionStrategy::Virtual.to_string(), "Virtual");
    assert_eq!(FusionOutput::Container.to_string(), "HDF5");
    assert_eq!(ResourceTier::DiskBacked.to_string(), "Disk Backed");
}

#[test]
fn test_stage_status_display() {
    let skipped = StageResult::skipped(Stage::ConvertFormat, "no installation found");
    assert_eq!(skipped.status.to_string(), "skipped (no installation found)");
    assert!(!skipped.is_failure());
    assert!(!skipped.is_success());
    assert_eq!(StageStatus::Succeeded.to_string(), "succeeded");
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

#[test]
fn test_defaults() {
    let config = PipelineConfig::default();
    assert_eq!(config.reader, ReaderVariant::ZenTiling);
    assert_eq!(config.registration, RegistrationMethod::PhaseCorrelation);
    assert!(!config.autoselect_illumination);
    assert!(config.fuse);
    assert!(config.convert_to_final_format);
    assert!(config.delete_intermediate);
    assert_eq!(config.downsampling, 1);
    assert_eq!(config.notification_target, None);
    assert_eq!(config.resources.slow_fusion, SlowFusionPolicy::Ask);
    assert_eq!(config.reclaim.passes, 3);
    assert!(config.validate().is_ok());
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

#[test]
fn test_rejects_zero_downsampling() {
    let config = PipelineConfig {
        downsampling: 0,
        ..PipelineConfig::default()
    };
    assert!(config.validate().is_err());
}

#[test]
fn test_rejects_bad_notification_target() {
    let config = PipelineConfig {
        notification_target: Some("not-an-address".into()),
        ..PipelineConfig::default()
    };
    assert!(config.validate().is_err());
}

#[test]
fn test_blank_notification_target_means_none() {
    let config = PipelineConfig {
        notification_target: Some("  ".into()),
        ..PipelineConfig::default()
    };
    assert!(config.validate().is_ok());
    assert_eq!(config.notification_recipient(), None);
}

#[test]
fn test_rejects_empty_temp_directory() {
    let config = PipelineConfig {
        temp_directory: Some(PathBuf::new()),
        ..PipelineConfig::default()
    };
    assert!(config.validate().is_err());
}

#[test]
fn test_rejects_bad_interest_point_parameters() {
    let config = PipelineConfig {
        registration: RegistrationMethod::InterestPoints(InterestPointConfig {
            threshold: -1.0,
            ..InterestPointConfig::default()
        }),
        ..PipelineConfig::default()
    };
    assert!(config.validate().is_err());
}

// ---------------------------------------------------------------------------
// TOML
// ---------------------------------------------------------------------------

#[test]
fn test_partial_toml_uses_defaults() {
    let config: PipelineConfig = toml::from_str(
        r#"
        reader = "TileScanMacro"
        autoselect_illumination = true
        downsampling = 4
        notification_target = "owner@example.org"

        [resources]
        slow_fusion = "Refuse"
        disk_backed_strategy = "Cached"
        "#,
    )
    .unwrap();
    assert_eq!(config.reader, ReaderVariant::TileScanMacro);
    assert!(config.autoselect_illumination);
    assert_eq!(config.downsampling, 4);
    assert_eq!(config.notification_recipient(), Some("owner@example.org"));
    assert_eq!(config.resources.slow_fusion, SlowFusionPolicy::Refuse);
    assert_eq!(config.resources.disk_backed_strategy, FusionStrategy::Cached);
    assert!(config.fuse);
    assert_eq!(config.reclaim.pause_secs, 10);
}

#[test]
fn test_interest_point_registration_from_toml() {
    let config: PipelineConfig = toml::from_str(
        r#"
        [registration.InterestPoints]
        sigma = 2.0
        "#,
    )
    .unwrap();
    match config.registration {
        RegistrationMethod::InterestPoints(params) => {
            assert_eq!(params.sigma, 2.0);
            assert_eq!(params.max_detections, 3000);
        }
        other => panic!("expected interest points, got {other:?}"),
    }
}

#[test]
fn test_default_config_round_trips_through_toml() {
    let text = toml::to_string_pretty(&PipelineConfig::default()).unwrap();
    let parsed: PipelineConfig = toml::from_str(&text).unwrap();
    assert_eq!(parsed.downsampling, 1);
    assert_eq!(parsed.converter.output_format, "Imaris5");
}
