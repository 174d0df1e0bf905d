// SPDX-License-Identifier: GPL-3.0-only

//! Integration tests for configuration module

use panorama::Config;
use panorama::config::{FileNaming, RotationDirection};
use panorama::constants::{drive, panorama as sweep, sensor};
use std::path::PathBuf;

#[test]
fn test_config_default() {
    let config = Config::default();

    assert_eq!(config.panorama.max_rotations, sweep::MAX_ROTATIONS);
    assert_eq!(config.panorama.direction, RotationDirection::Clockwise);
    assert_eq!(config.drive.baud_rate, drive::BAUD_RATE);
    assert_eq!(config.drive.rotate_duration_ms, 200);
    assert_eq!(config.drive.move_duration_ms, 400);
    assert_eq!(config.sensor.depth_scale, sensor::DEPTH_SCALE);
    assert_eq!(config.output.naming, FileNaming::Sequence);
    assert!(!config.output.dump_raw);
}

#[test]
fn test_config_save_and_load() {
    let dir = std::env::temp_dir().join(format!("panorama-config-{}", std::process::id()));
    let path = dir.join("nested").join("config.json");

    let mut config = Config::default();
    config.panorama.max_rotations = 12;
    config.output.directory = Some(PathBuf::from("/tmp/panorama-out"));
    config.output.naming = FileNaming::Timestamp;
    config.save(&path).unwrap();

    let loaded = Config::load(&path).unwrap();
    assert_eq!(loaded, config);

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn test_missing_config_uses_defaults() {
    let path = std::env::temp_dir().join("panorama-config-does-not-exist.json");
    let config = Config::load_or_default(Some(&path)).unwrap();
    assert_eq!(config, Config::default());
}

#[test]
fn test_malformed_config_is_error() {
    let dir = std::env::temp_dir().join(format!("panorama-bad-config-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("config.json");
    std::fs::write(&path, "{ not json").unwrap();

    assert!(matches!(
        Config::load_or_default(Some(&path)),
        Err(panorama::AppError::Config(_))
    ));

    let _ = std::fs::remove_dir_all(&dir);
}
