// SPDX-License-Identifier: GPL-3.0-only

//! Depth camera calibration table
//!
//! One entry per depth pixel holding the normalized camera-space ray
//! `(X/Z, Y/Z)` for that pixel. Multiplying an entry by the pixel's measured
//! depth yields its camera-space position.
//!
//! The table is produced once from the depth intrinsics (or fetched from the
//! sensor) and is read-only afterwards. It can be dumped to and loaded from a
//! flat little-endian `f32` (x, y) sequence.

use crate::errors::CalibrationError;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::{debug, info};

/// Number of fixed-point iterations used to invert the distortion model
const UNDISTORT_ITERATIONS: usize = 20;

/// Depth camera intrinsics with a three-term radial distortion model
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DepthIntrinsics {
    /// Focal length X (pixels)
    pub fx: f32,
    /// Focal length Y (pixels)
    pub fy: f32,
    /// Principal point X (pixels)
    pub cx: f32,
    /// Principal point Y (pixels)
    pub cy: f32,
    /// Radial distortion, 2nd order
    pub k2: f32,
    /// Radial distortion, 4th order
    pub k4: f32,
    /// Radial distortion, 6th order
    pub k6: f32,
}

impl Default for DepthIntrinsics {
    /// Typical values for a 512x424 time-of-flight depth sensor
    fn default() -> Self {
        Self {
            fx: 365.46,
            fy: 365.46,
            cx: 254.88,
            cy: 205.40,
            k2: 0.0905,
            k4: -0.2688,
            k6: 0.0961,
        }
    }
}

impl DepthIntrinsics {
    /// Ideal pinhole intrinsics (no distortion) centered on the image
    pub fn pinhole(width: u32, height: u32, focal: f32) -> Self {
        Self {
            fx: focal,
            fy: focal,
            cx: (width as f32 - 1.0) / 2.0,
            cy: (height as f32 - 1.0) / 2.0,
            k2: 0.0,
            k4: 0.0,
            k6: 0.0,
        }
    }

    fn distortion(&self, r2: f32) -> f32 {
        1.0 + r2 * (self.k2 + r2 * (self.k4 + r2 * self.k6))
    }

    /// Undistorted normalized ray for a depth pixel
    pub fn undistort(&self, u: f32, v: f32) -> CameraSpacePoint {
        let xd = (u - self.cx) / self.fx;
        let yd = (v - self.cy) / self.fy;

        let (mut x, mut y) = (xd, yd);
        for _ in 0..UNDISTORT_ITERATIONS {
            let factor = self.distortion(x * x + y * y);
            if !factor.is_finite() || factor.abs() < f32::EPSILON {
                break;
            }
            x = xd / factor;
            y = yd / factor;
        }

        CameraSpacePoint { x, y }
    }
}

/// Normalized camera-space ray `(X/Z, Y/Z)`
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraSpacePoint {
    pub x: f32,
    pub y: f32,
}

/// Depth pixel → camera-space ray lookup table
#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationTable {
    width: u32,
    height: u32,
    points: Vec<CameraSpacePoint>,
}

impl CalibrationTable {
    /// Wrap a table, checking its length against the depth geometry
    pub fn new(
        width: u32,
        height: u32,
        points: Vec<CameraSpacePoint>,
    ) -> Result<Self, CalibrationError> {
        let expected = width as usize * height as usize;
        if points.len() != expected {
            return Err(CalibrationError::LengthMismatch {
                expected,
                actual: points.len(),
            });
        }
        Ok(Self {
            width,
            height,
            points,
        })
    }

    /// Compute the table from depth intrinsics
    pub fn from_intrinsics(width: u32, height: u32, intrinsics: &DepthIntrinsics) -> Self {
        let mut points = Vec::with_capacity(width as usize * height as usize);
        for v in 0..height {
            for u in 0..width {
                points.push(intrinsics.undistort(u as f32, v as f32));
            }
        }

        info!(
            width,
            height,
            fx = intrinsics.fx,
            fy = intrinsics.fy,
            cx = intrinsics.cx,
            cy = intrinsics.cy,
            "Computed depth calibration table"
        );

        Self {
            width,
            height,
            points,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[CameraSpacePoint] {
        &self.points
    }

    /// Ray for depth pixel `(u, v)`
    pub fn get(&self, u: u32, v: u32) -> Option<CameraSpacePoint> {
        if u >= self.width || v >= self.height {
            return None;
        }
        self.points.get((v * self.width + u) as usize).copied()
    }

    /// Load a dump written by [`dump`](Self::dump)
    pub fn load(path: &Path, width: u32, height: u32) -> Result<Self, CalibrationError> {
        let bytes = std::fs::read(path)?;
        let table = Self::from_le_bytes(&bytes, width, height)?;
        info!(path = %path.display(), entries = table.len(), "Loaded calibration table");
        Ok(table)
    }

    /// Parse flat little-endian `f32` (x, y) pairs
    pub fn from_le_bytes(bytes: &[u8], width: u32, height: u32) -> Result<Self, CalibrationError> {
        if bytes.len() % 8 != 0 {
            return Err(CalibrationError::Truncated(bytes.len()));
        }

        let points = bytes
            .chunks_exact(8)
            .map(|c| CameraSpacePoint {
                x: f32::from_le_bytes([c[0], c[1], c[2], c[3]]),
                y: f32::from_le_bytes([c[4], c[5], c[6], c[7]]),
            })
            .collect();

        Self::new(width, height, points)
    }

    /// Write the table as flat little-endian `f32` (x, y) pairs
    pub fn dump(&self, path: &Path) -> Result<(), CalibrationError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut writer = BufWriter::new(std::fs::File::create(path)?);
        for value in bytemuck::cast_slice::<CameraSpacePoint, f32>(&self.points) {
            writer.write_all(&value.to_le_bytes())?;
        }
        writer.flush()?;

        debug!(path = %path.display(), entries = self.len(), "Wrote calibration dump");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pinhole_table_is_centered() {
        let table = CalibrationTable::from_intrinsics(5, 3, &DepthIntrinsics::pinhole(5, 3, 2.0));
        assert_eq!(table.len(), 15);

        let center = table.get(2, 1).unwrap();
        assert_eq!(center, CameraSpacePoint { x: 0.0, y: 0.0 });

        let corner = table.get(0, 0).unwrap();
        assert_eq!(corner, CameraSpacePoint { x: -1.0, y: -0.5 });
        assert!(table.get(5, 0).is_none());
    }

    #[test]
    fn test_undistort_inverts_distortion() {
        let intrinsics = DepthIntrinsics::default();
        let ray = intrinsics.undistort(40.0, 30.0);

        // Re-apply the forward model and land back on the pixel
        let factor = intrinsics.distortion(ray.x * ray.x + ray.y * ray.y);
        let u = ray.x * factor * intrinsics.fx + intrinsics.cx;
        let v = ray.y * factor * intrinsics.fy + intrinsics.cy;
        assert!((u - 40.0).abs() < 0.05, "u = {}", u);
        assert!((v - 30.0).abs() < 0.05, "v = {}", v);
    }

    #[test]
    fn test_dump_and_load() {
        let dir = std::env::temp_dir().join(format!("panorama-calib-{}", std::process::id()));
        let path = dir.join("Depth2Color.bin");
        let table = CalibrationTable::from_intrinsics(4, 2, &DepthIntrinsics::pinhole(4, 2, 3.0));

        table.dump(&path).unwrap();
        assert_eq!(std::fs::metadata(&path).unwrap().len(), 4 * 2 * 8);
        assert_eq!(CalibrationTable::load(&path, 4, 2).unwrap(), table);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_wrong_length_rejected() {
        let bytes = vec![0u8; 8 * 3];
        assert_eq!(
            CalibrationTable::from_le_bytes(&bytes, 2, 2).unwrap_err(),
            CalibrationError::LengthMismatch {
                expected: 4,
                actual: 3
            }
        );
        assert_eq!(
            CalibrationTable::from_le_bytes(&bytes[..10], 2, 2).unwrap_err(),
            CalibrationError::Truncated(10)
        );
    }
}
