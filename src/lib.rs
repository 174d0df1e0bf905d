// SPDX-License-Identifier: GPL-3.0-only

//! Panorama - depth + color panorama capture on a rotating platform
//!
//! A paired depth/color sensor is mounted on a drive base that turns in
//! place. Each sweep captures one registered depth/color pair per heading,
//! rotating a fixed step and letting the platform settle in between.
//!
//! # Architecture
//!
//! - [`backends`]: sensor sources, frame synchronization and the drive link
//! - [`registration`]: calibration table and color → depth coordinate mapping
//! - [`pipelines`]: capture state machine, worker loop and persistence
//! - [`config`]: user configuration
//! - [`storage`]: output locations and file naming
//!
//! # Example
//!
//! ```ignore
//! // Ten-step sweep with the synthetic sensor and no hardware attached:
//! // panorama --dry-run sweep --rotations 10
//! ```

pub mod backends;
pub mod config;
pub mod constants;
pub mod errors;
pub mod pipelines;
pub mod registration;
pub mod storage;

// Re-export commonly used types
pub use backends::drive::{DriveController, MotionCommand};
pub use backends::sensor::{FramePair, FrameSynchronizer, SensorSource};
pub use config::Config;
pub use errors::{AppError, AppResult};
pub use pipelines::panorama::{CaptureState, PanoramaCapture, SweepReport};
pub use registration::{CalibrationTable, CoordinateMapper, DepthSpacePoint};
