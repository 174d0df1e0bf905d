// SPDX-License-Identifier: GPL-3.0-only

//! Color ↔ depth coordinate mapping
//!
//! Each valid depth pixel is lifted to camera space through the calibration
//! table, shifted into the color camera's frame and projected with the color
//! intrinsics. The color pixels it covers are tagged with the depth pixel's
//! coordinates; everything else stays [`DepthSpacePoint::UNMAPPED`].
//!
//! Occlusion is not resolved: depth pixels are visited in row-major order and
//! the last writer wins, which also keeps the mapping deterministic.

use super::calibration::CalibrationTable;
use crate::backends::sensor::format_converters::depth_mm_to_byte;
use crate::constants::sensor;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// Upper bound on the color pixels one depth pixel may cover per axis
const MAX_FOOTPRINT: i64 = 16;

/// Color camera intrinsics and its offset from the depth camera
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorRegistration {
    pub width: u32,
    pub height: u32,
    pub fx: f32,
    pub fy: f32,
    pub cx: f32,
    pub cy: f32,
    /// Depth camera origin expressed in color camera space (millimeters)
    pub translation_mm: [f32; 3],
}

impl Default for ColorRegistration {
    fn default() -> Self {
        Self {
            width: sensor::COLOR_WIDTH,
            height: sensor::COLOR_HEIGHT,
            fx: 1081.37,
            fy: 1081.37,
            cx: 959.5,
            cy: 539.5,
            translation_mm: [-52.0, 0.0, 0.0],
        }
    }
}

/// Position in the depth sensor's pixel grid
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DepthSpacePoint {
    pub x: f32,
    pub y: f32,
}

impl DepthSpacePoint {
    /// No corresponding depth pixel
    pub const UNMAPPED: Self = Self {
        x: f32::NEG_INFINITY,
        y: f32::NEG_INFINITY,
    };

    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn is_mapped(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    /// Row-major index into a `width`-wide depth grid holding `len` pixels
    ///
    /// Returns `None` for the sentinel and for any coordinate that lands
    /// outside the grid.
    pub fn depth_index(&self, width: u32, len: usize) -> Option<usize> {
        if !self.is_mapped() {
            return None;
        }
        let x = self.x.round();
        let y = self.y.round();
        if x < 0.0 || y < 0.0 || x >= width as f32 {
            return None;
        }
        let index = (y as usize)
            .checked_mul(width as usize)?
            .checked_add(x as usize)?;
        (index < len).then_some(index)
    }
}

/// Depth-resolution RGBA image assembled from mapped color pixels
#[derive(Debug, Clone, PartialEq)]
pub struct CompositeImage {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
    /// Mapped entries whose index fell outside the buffer
    pub rejected: usize,
}

/// Maps color pixels into depth space using the calibration table
#[derive(Debug, Clone)]
pub struct CoordinateMapper {
    table: Arc<CalibrationTable>,
    registration: ColorRegistration,
}

impl CoordinateMapper {
    pub fn new(table: Arc<CalibrationTable>, registration: ColorRegistration) -> Self {
        Self {
            table,
            registration,
        }
    }

    pub fn depth_width(&self) -> u32 {
        self.table.width()
    }

    pub fn depth_height(&self) -> u32 {
        self.table.height()
    }

    pub fn registration(&self) -> &ColorRegistration {
        &self.registration
    }

    /// Depth-space coordinate for every color pixel
    ///
    /// `depth_values` are millimeters, one per depth pixel, with 0 meaning no
    /// valid sample. The result has `color_width * color_height` entries.
    pub fn map_color_to_depth_space(
        &self,
        depth_values: &[u16],
        color_width: u32,
        color_height: u32,
    ) -> Vec<DepthSpacePoint> {
        let color_len = color_width as usize * color_height as usize;
        let mut mapped = vec![DepthSpacePoint::UNMAPPED; color_len];
        if depth_values.len() != self.table.len() {
            debug!(
                expected = self.table.len(),
                actual = depth_values.len(),
                "Depth sample count differs from calibration table"
            );
        }

        let reg = &self.registration;
        let [tx, ty, tz] = reg.translation_mm;
        let width = self.table.width();
        let rays = self.table.points();

        for (index, (&depth, ray)) in depth_values.iter().zip(rays).enumerate() {
            if depth == 0 {
                continue;
            }

            let z = depth as f32;
            let cam_x = ray.x * z + tx;
            let cam_y = ray.y * z + ty;
            let cam_z = z + tz;
            if cam_z <= 0.0 {
                continue;
            }

            let u = (index % width as usize) as u32;
            let v = (index / width as usize) as u32;
            let (step_x, step_y) = self.ray_step(u, v);

            let center_x = reg.fx * cam_x / cam_z + reg.cx;
            let center_y = reg.fy * cam_y / cam_z + reg.cy;
            let span_x = footprint(reg.fx * step_x * z / cam_z);
            let span_y = footprint(reg.fy * step_y * z / cam_z);

            let start_x = (center_x - (span_x - 1) as f32 / 2.0).round() as i64;
            let start_y = (center_y - (span_y - 1) as f32 / 2.0).round() as i64;
            let point = DepthSpacePoint::new(u as f32, v as f32);

            let rows = start_y.max(0)..start_y.saturating_add(span_y).min(color_height as i64);
            let cols = start_x.max(0)..start_x.saturating_add(span_x).min(color_width as i64);
            for py in rows {
                let row = py as usize * color_width as usize;
                for px in cols.clone() {
                    mapped[row + px as usize] = point;
                }
            }
        }

        mapped
    }

    /// Angular size of one depth pixel, from neighbouring rays
    fn ray_step(&self, u: u32, v: u32) -> (f32, f32) {
        let table = &self.table;
        let step = |a: Option<f32>, b: Option<f32>| match (a, b) {
            (Some(a), Some(b)) => (a - b).abs(),
            _ => 0.0,
        };

        let here = table.get(u, v);
        let step_x = if u + 1 < table.width() {
            step(table.get(u + 1, v).map(|p| p.x), here.map(|p| p.x))
        } else {
            let left = u.checked_sub(1).and_then(|pu| table.get(pu, v));
            step(here.map(|p| p.x), left.map(|p| p.x))
        };
        let step_y = if v + 1 < table.height() {
            step(table.get(u, v + 1).map(|p| p.y), here.map(|p| p.y))
        } else {
            let above = v.checked_sub(1).and_then(|pv| table.get(u, pv));
            step(here.map(|p| p.y), above.map(|p| p.y))
        };

        (step_x, step_y)
    }

    /// Scatter color pixels into a depth-resolution RGBA buffer
    ///
    /// `color_rgba` holds 4 bytes per color pixel in the same order as
    /// `mapped`. Entries whose computed index leaves the buffer are counted in
    /// [`CompositeImage::rejected`] and never written.
    pub fn build_composite(&self, mapped: &[DepthSpacePoint], color_rgba: &[u8]) -> CompositeImage {
        let width = self.table.width();
        let height = self.table.height();
        let pixels = self.table.len();
        let mut rgba = vec![0u8; pixels * 4];
        let mut rejected = 0;

        for (color_index, point) in mapped.iter().enumerate() {
            if !point.is_mapped() {
                continue;
            }
            let Some(depth_index) = point.depth_index(width, pixels) else {
                rejected += 1;
                continue;
            };
            let Some(src) = color_rgba.get(color_index * 4..color_index * 4 + 4) else {
                continue;
            };
            rgba[depth_index * 4..depth_index * 4 + 4].copy_from_slice(src);
        }

        if rejected > 0 {
            debug!(rejected, "Rejected out-of-bounds composite writes");
        }

        CompositeImage {
            width,
            height,
            rgba,
            rejected,
        }
    }

    /// 8-bit depth image at color resolution, 0 where unmapped
    pub fn registered_depth(&self, mapped: &[DepthSpacePoint], depth_mm: &[u16]) -> Vec<u8> {
        let width = self.table.width();
        mapped
            .iter()
            .map(|point| {
                point
                    .depth_index(width, depth_mm.len())
                    .map(|i| depth_mm_to_byte(depth_mm[i], sensor::MAP_DEPTH_TO_BYTE))
                    .unwrap_or(0)
            })
            .collect()
    }
}

/// Whole color pixels covered by one depth pixel along one axis
fn footprint(extent: f32) -> i64 {
    if extent.is_finite() {
        (extent.round() as i64).clamp(1, MAX_FOOTPRINT)
    } else {
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registration::calibration::DepthIntrinsics;

    /// Depth and color cameras share optics, so mapping is the identity
    fn identity_mapper(width: u32, height: u32) -> CoordinateMapper {
        let intrinsics = DepthIntrinsics::pinhole(width, height, 2.0);
        let table = CalibrationTable::from_intrinsics(width, height, &intrinsics);
        let registration = ColorRegistration {
            width,
            height,
            fx: intrinsics.fx,
            fy: intrinsics.fy,
            cx: intrinsics.cx,
            cy: intrinsics.cy,
            translation_mm: [0.0; 3],
        };
        CoordinateMapper::new(Arc::new(table), registration)
    }

    #[test]
    fn test_identity_mapping() {
        let mapper = identity_mapper(4, 3);
        let mut depth = vec![1000u16; 12];
        depth[5] = 0;

        let mapped = mapper.map_color_to_depth_space(&depth, 4, 3);
        assert_eq!(mapped.len(), 12);
        for (i, point) in mapped.iter().enumerate() {
            if i == 5 {
                assert!(!point.is_mapped());
            } else {
                assert_eq!(*point, DepthSpacePoint::new((i % 4) as f32, (i / 4) as f32));
            }
        }
    }

    #[test]
    fn test_mapping_is_idempotent() {
        let table = Arc::new(CalibrationTable::from_intrinsics(
            16,
            12,
            &DepthIntrinsics::pinhole(16, 12, 10.0),
        ));
        let mapper = CoordinateMapper::new(
            table,
            ColorRegistration {
                width: 32,
                height: 24,
                fx: 20.0,
                fy: 20.0,
                cx: 15.5,
                cy: 11.5,
                translation_mm: [-52.0, 0.0, 0.0],
            },
        );
        let depth: Vec<u16> = (0..16 * 12).map(|i| 800 + (i as u16 * 7) % 900).collect();

        let first = mapper.map_color_to_depth_space(&depth, 32, 24);
        let second = mapper.map_color_to_depth_space(&depth, 32, 24);
        assert_eq!(first, second);
        assert!(first.iter().any(DepthSpacePoint::is_mapped));
    }

    #[test]
    fn test_composite_copies_color() {
        let mapper = identity_mapper(4, 3);
        let depth = vec![1000u16; 12];
        let color: Vec<u8> = (0..12u8).flat_map(|i| [i, i, i, 255]).collect();

        let mapped = mapper.map_color_to_depth_space(&depth, 4, 3);
        let composite = mapper.build_composite(&mapped, &color);
        assert_eq!(composite.rgba, color);
        assert_eq!(composite.rejected, 0);
    }

    #[test]
    fn test_out_of_bounds_points_rejected() {
        let mapper = identity_mapper(4, 3);
        let mapped = vec![
            DepthSpacePoint::new(-1.0, 0.0),
            DepthSpacePoint::new(0.0, 3.0),
            DepthSpacePoint::new(4.0, 0.0),
            DepthSpacePoint::new(1e9, 1e9),
            DepthSpacePoint::UNMAPPED,
            DepthSpacePoint::new(3.4, 2.4),
        ];
        let color = [7u8; 6 * 4];

        let composite = mapper.build_composite(&mapped, &color);
        assert_eq!(composite.rgba.len(), 4 * 3 * 4);
        assert_eq!(composite.rejected, 4);
        // Only the last point lands, on (3, 2)
        assert_eq!(&composite.rgba[11 * 4..], &[7, 7, 7, 7]);
        assert_eq!(composite.rgba.iter().filter(|&&b| b != 0).count(), 4);
    }

    #[test]
    fn test_registered_depth() {
        let mapper = identity_mapper(2, 1);
        let mapped = vec![DepthSpacePoint::new(1.0, 0.0), DepthSpacePoint::UNMAPPED];
        let depth = [0u16, 3100];

        let registered = mapper.registered_depth(&mapped, &depth);
        assert_eq!(registered, vec![100, 0]);
    }
}
