// SPDX-License-Identifier: GPL-3.0-only

//! Persistent configuration
//!
//! Stored as JSON under the user's config directory. Every section carries
//! `#[serde(default)]` so older files keep loading when fields are added.

use crate::constants::{drive, output, panorama, sensor};
use crate::errors::{AppError, AppResult};
use crate::registration::ColorRegistration;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Sensor geometry expected by the frame synchronizer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorSettings {
    pub depth_width: u32,
    pub depth_height: u32,
    pub color_width: u32,
    pub color_height: u32,
    /// Contrast multiplier for the canonical depth image
    pub depth_scale: u16,
    /// Interval between synthetic arrivals
    pub frame_interval_ms: u64,
}

impl Default for SensorSettings {
    fn default() -> Self {
        Self {
            depth_width: sensor::DEPTH_WIDTH,
            depth_height: sensor::DEPTH_HEIGHT,
            color_width: sensor::COLOR_WIDTH,
            color_height: sensor::COLOR_HEIGHT,
            depth_scale: sensor::DEPTH_SCALE,
            frame_interval_ms: sensor::SYNTHETIC_FRAME_INTERVAL_MS,
        }
    }
}

/// Serial link and manual motion settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriveSettings {
    /// Serial device path (e.g. "/dev/ttyUSB0", "COM9")
    pub serial_port: String,
    pub baud_rate: u32,
    pub write_timeout_ms: u64,
    /// Duration of a manual forward/backward move
    pub move_duration_ms: u64,
    /// Duration of one rotation step
    pub rotate_duration_ms: u64,
    /// Flash LEDs and play a note after connecting
    pub announce_on_connect: bool,
}

impl Default for DriveSettings {
    fn default() -> Self {
        Self {
            serial_port: drive::DEFAULT_PORT.to_string(),
            baud_rate: drive::BAUD_RATE,
            write_timeout_ms: drive::WRITE_TIMEOUT_MS,
            move_duration_ms: drive::MOVE_DURATION_MS,
            rotate_duration_ms: drive::ROTATE_DURATION_MS,
            announce_on_connect: false,
        }
    }
}

impl DriveSettings {
    pub fn move_duration(&self) -> Duration {
        Duration::from_millis(self.move_duration_ms)
    }

    pub fn rotate_duration(&self) -> Duration {
        Duration::from_millis(self.rotate_duration_ms)
    }
}

/// Direction the platform turns between captures
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub enum RotationDirection {
    #[default]
    Clockwise,
    CounterClockwise,
}

/// Sweep settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PanoramaSettings {
    /// Rotation steps per sweep (captures = rotations + 1)
    pub max_rotations: u32,
    /// Hold after each rotation before capturing
    pub settle_delay_ms: u64,
    pub direction: RotationDirection,
}

impl Default for PanoramaSettings {
    fn default() -> Self {
        Self {
            max_rotations: panorama::MAX_ROTATIONS,
            settle_delay_ms: panorama::STABILIZE_TIME_MS,
            direction: RotationDirection::default(),
        }
    }
}

/// How capture files are named
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub enum FileNaming {
    /// `Kind-PPP-III.ext` from (panorama index, image index)
    #[default]
    Sequence,
    /// `Kind-YYYYmmdd_HHMMSS_mmm.ext`
    Timestamp,
}

/// Where and how captures are written
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSettings {
    /// Output directory (default: ~/Pictures/Panorama)
    pub directory: Option<PathBuf>,
    pub naming: FileNaming,
    /// Also write PGM/PPM raw dumps next to the PNGs
    pub dump_raw: bool,
    /// Calibration dump location (default: output directory)
    pub calibration_path: Option<PathBuf>,
}

impl OutputSettings {
    /// Resolved output directory
    pub fn directory(&self) -> PathBuf {
        self.directory
            .clone()
            .unwrap_or_else(crate::storage::default_output_dir)
    }

    /// Resolved calibration dump path
    pub fn calibration_path(&self) -> PathBuf {
        self.calibration_path
            .clone()
            .unwrap_or_else(|| self.directory().join(output::CALIBRATION_FILE))
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub sensor: SensorSettings,
    pub registration: ColorRegistration,
    pub drive: DriveSettings,
    pub panorama: PanoramaSettings,
    pub output: OutputSettings,
}

impl Config {
    /// Default config file location
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(output::CONFIG_DIR).join(output::CONFIG_FILE))
    }

    /// Load a config file
    pub fn load(path: &Path) -> AppResult<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("{}: {}", path.display(), e)))?;
        let config = serde_json::from_str(&text)
            .map_err(|e| AppError::Config(format!("{}: {}", path.display(), e)))?;
        debug!(path = %path.display(), "Loaded config");
        Ok(config)
    }

    /// Load a config file, falling back to defaults when it does not exist
    pub fn load_or_default(path: Option<&Path>) -> AppResult<Self> {
        let path = match path.map(Path::to_path_buf).or_else(Self::default_path) {
            Some(p) => p,
            None => return Ok(Self::default()),
        };

        if !path.exists() {
            info!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }

        Self::load(&path)
    }

    /// Write the config file, creating parent directories
    pub fn save(&self, path: &Path) -> AppResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| AppError::Config(format!("{}: {}", parent.display(), e)))?;
        }
        let text = serde_json::to_string_pretty(self)
            .map_err(|e| AppError::Config(e.to_string()))?;
        std::fs::write(path, text)
            .map_err(|e| AppError::Config(format!("{}: {}", path.display(), e)))?;
        info!(path = %path.display(), "Saved config");
        Ok(())
    }

    /// Check that the sections agree with each other
    ///
    /// The color intrinsics in `registration` describe the color stream, so
    /// their resolution must match the canonical color geometry.
    pub fn validate(&self) -> AppResult<()> {
        let registration = (self.registration.width, self.registration.height);
        let color = (self.sensor.color_width, self.sensor.color_height);
        if registration != color {
            return Err(AppError::Config(format!(
                "registration is calibrated for {}x{} but the color stream is {}x{}",
                registration.0, registration.1, color.0, color.1
            )));
        }
        Ok(())
    }

    /// Settle delay as a Duration
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.panorama.settle_delay_ms)
    }
}
