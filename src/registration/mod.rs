// SPDX-License-Identifier: GPL-3.0-only

//! Depth ↔ color registration
//!
//! [`calibration`] owns the per-depth-pixel ray table, [`mapper`] uses it to
//! project color pixels into depth space and build composites.

pub mod calibration;
pub mod mapper;

pub use calibration::{CalibrationTable, CameraSpacePoint, DepthIntrinsics};
pub use mapper::{ColorRegistration, CompositeImage, CoordinateMapper, DepthSpacePoint};

use crate::backends::sensor::SensorSource;
use crate::errors::AppResult;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// Resolve the calibration table once at startup
///
/// Loads the dump at `path` when it exists and matches the sensor geometry.
/// Otherwise the table is fetched from the sensor and written to `path` so
/// later runs skip the fetch. A failed write is logged, not fatal.
pub fn load_or_fetch(
    path: Option<&Path>,
    source: &dyn SensorSource,
) -> AppResult<Arc<CalibrationTable>> {
    let depth = source.depth_description();

    if let Some(path) = path.filter(|p| p.exists()) {
        match CalibrationTable::load(path, depth.width, depth.height) {
            Ok(table) => return Ok(Arc::new(table)),
            Err(e) => warn!(path = %path.display(), error = %e, "Ignoring calibration dump"),
        }
    }

    let table = source.calibration_table()?;
    info!(source = source.name(), entries = table.len(), "Fetched calibration table from sensor");

    if let Some(path) = path {
        if let Err(e) = table.dump(path) {
            warn!(path = %path.display(), error = %e, "Failed to write calibration dump");
        }
    }

    Ok(Arc::new(table))
}
