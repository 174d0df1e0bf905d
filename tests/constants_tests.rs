// SPDX-License-Identifier: GPL-3.0-only

//! Integration tests for constants module

use panorama::constants::{drive, output, panorama as sweep, sensor};

#[test]
fn test_sensor_geometry() {
    assert_eq!((sensor::DEPTH_WIDTH, sensor::DEPTH_HEIGHT), (512, 424));
    assert_eq!((sensor::COLOR_WIDTH, sensor::COLOR_HEIGHT), (1920, 1080));
    assert!(sensor::MIN_RELIABLE_DISTANCE_MM < sensor::MAX_RELIABLE_DISTANCE_MM);
}

#[test]
fn test_serial_protocol_constants() {
    assert_eq!(drive::BAUD_RATE, 57_600);
    assert_eq!(drive::DRIVE_OPCODE, 0x89);
    assert_eq!(drive::START_OPCODE, 128);
    assert_eq!(drive::CONTROL_OPCODE, 132);
}

#[test]
fn test_sweep_defaults() {
    assert_eq!(sweep::MAX_ROTATIONS, 30);
    assert_eq!(sweep::STABILIZE_TIME_MS, 2000);
    assert!(drive::ROTATE_DURATION_MS < sweep::STABILIZE_TIME_MS);
}

#[test]
fn test_output_names() {
    assert!(output::CALIBRATION_FILE.ends_with(".bin"));
    assert!(output::CONFIG_FILE.ends_with(".json"));
}
