// SPDX-License-Identifier: GPL-3.0-only

//! Application-wide constants

use std::time::Duration;

/// Sensor geometry and depth conversion
pub mod sensor {
    /// Depth sensor width (pixels)
    pub const DEPTH_WIDTH: u32 = 512;
    /// Depth sensor height (pixels)
    pub const DEPTH_HEIGHT: u32 = 424;
    /// Color sensor width (pixels)
    pub const COLOR_WIDTH: u32 = 1920;
    /// Color sensor height (pixels)
    pub const COLOR_HEIGHT: u32 = 1080;

    /// Contrast multiplier applied to canonical depth pixels
    pub const DEPTH_SCALE: u16 = 8;

    /// Default reliable range reported by the sensor (millimeters)
    pub const MIN_RELIABLE_DISTANCE_MM: u16 = 500;
    pub const MAX_RELIABLE_DISTANCE_MM: u16 = 4500;

    /// Deepest value the sensor reports (millimeters)
    pub const DEPTH_MAX_VALID_MM: u16 = 8000;

    /// Divisor that maps depth in millimeters onto a byte
    pub const MAP_DEPTH_TO_BYTE: u16 = DEPTH_MAX_VALID_MM / 256;

    /// Interval between synthetic frame arrivals (~30fps)
    pub const SYNTHETIC_FRAME_INTERVAL_MS: u64 = 33;

    /// Capacity of the arrival queue between the sensor thread and the worker
    pub const ARRIVAL_QUEUE_DEPTH: usize = 2;
}

/// Drive base serial protocol
pub mod drive {
    /// Serial baud rate
    pub const BAUD_RATE: u32 = 57_600;
    /// Write timeout
    pub const WRITE_TIMEOUT_MS: u64 = 1000;

    /// Opcode that starts the open interface
    pub const START_OPCODE: u8 = 128;
    /// Opcode that grants full control of the actuators
    pub const CONTROL_OPCODE: u8 = 132;
    /// Drive opcode, followed by velocity and radius (i16 big-endian)
    pub const DRIVE_OPCODE: u8 = 137;
    /// LED opcode
    pub const LEDS_OPCODE: u8 = 139;
    /// Song definition opcode
    pub const SONG_OPCODE: u8 = 140;
    /// Song playback opcode
    pub const PLAY_OPCODE: u8 = 141;

    /// Default duration of a manual forward/backward move
    pub const MOVE_DURATION_MS: u64 = 400;
    /// Default duration of one rotation step
    pub const ROTATE_DURATION_MS: u64 = 200;

    /// Default serial device
    pub const DEFAULT_PORT: &str = "/dev/ttyUSB0";
}

/// Panorama sweep parameters
pub mod panorama {
    /// Rotation steps per sweep
    pub const MAX_ROTATIONS: u32 = 30;
    /// Settle delay after each rotation
    pub const STABILIZE_TIME_MS: u64 = 2000;
}

/// Output file naming and formats
pub mod output {
    /// Default folder (under the user's pictures directory)
    pub const DEFAULT_SAVE_FOLDER: &str = "Panorama";
    /// Default calibration dump file name
    pub const CALIBRATION_FILE: &str = "Depth2Color.bin";
    /// Config directory name
    pub const CONFIG_DIR: &str = "panorama";
    /// Config file name
    pub const CONFIG_FILE: &str = "config.json";
}

/// Worker timing
pub mod timing {
    use super::Duration;

    /// How long the worker waits on the arrival queue before checking for shutdown
    pub const ARRIVAL_POLL_INTERVAL: Duration = Duration::from_millis(100);
    /// Log frame statistics every N delivered pairs
    pub const FRAME_LOG_INTERVAL: u64 = 30;
}

/// Application information utilities
pub mod app_info {
    /// Get the application version from build-time environment
    pub fn version() -> &'static str {
        env!("GIT_VERSION")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_depth_byte_mapping() {
        assert_eq!(sensor::MAP_DEPTH_TO_BYTE, 31);
        // Deepest valid reading still fits in a byte
        assert!(sensor::DEPTH_MAX_VALID_MM / sensor::MAP_DEPTH_TO_BYTE <= 258);
    }

    #[test]
    fn test_scaled_reliable_range_fits_u16() {
        let max = sensor::MAX_RELIABLE_DISTANCE_MM as u32 * sensor::DEPTH_SCALE as u32;
        assert!(max <= u16::MAX as u32);
    }
}
