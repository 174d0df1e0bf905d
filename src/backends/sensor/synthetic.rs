// SPDX-License-Identifier: GPL-3.0-only

//! Synthetic depth + color sensor
//!
//! Generates a deterministic scene so the whole pipeline can run without
//! hardware: a wavy wall between 1 and 3 meters with scattered no-return
//! holes, and a BGRA gradient that shifts every frame.

use super::SensorSource;
use super::types::{
    DepthRange, FrameArrival, FrameDescription, PixelFormat, RawDepthFrame, RawFrame,
};
use crate::config::SensorSettings;
use crate::constants::sensor;
use crate::errors::{SensorError, StreamKind};
use crate::registration::{CalibrationTable, DepthIntrinsics};
use std::time::Duration;
use tracing::debug;

/// Every Nth depth pixel reports no return
const HOLE_STRIDE: usize = 97;

pub struct SyntheticSensor {
    depth: FrameDescription,
    color: FrameDescription,
    intrinsics: DepthIntrinsics,
    frame_interval: Duration,
    frame_limit: Option<u64>,
    frame_index: u64,
}

impl SyntheticSensor {
    /// Create a sensor with the given stream geometry
    ///
    /// Zero-sized streams cannot be opened.
    pub fn new(
        depth_width: u32,
        depth_height: u32,
        color_width: u32,
        color_height: u32,
        frame_interval: Duration,
    ) -> Result<Self, SensorError> {
        if depth_width == 0 || depth_height == 0 || color_width == 0 || color_height == 0 {
            return Err(SensorError::SensorUnavailable(format!(
                "invalid synthetic geometry: depth {}x{}, color {}x{}",
                depth_width, depth_height, color_width, color_height
            )));
        }

        let native = (depth_width, depth_height) == (sensor::DEPTH_WIDTH, sensor::DEPTH_HEIGHT);
        let intrinsics = if native {
            DepthIntrinsics::default()
        } else {
            DepthIntrinsics::pinhole(depth_width, depth_height, depth_width as f32 * 0.714)
        };

        Ok(Self {
            depth: FrameDescription::new(depth_width, depth_height, PixelFormat::Gray16),
            color: FrameDescription::new(color_width, color_height, PixelFormat::Bgra8),
            intrinsics,
            frame_interval,
            frame_limit: None,
            frame_index: 0,
        })
    }

    pub fn from_settings(settings: &SensorSettings) -> Result<Self, SensorError> {
        Self::new(
            settings.depth_width,
            settings.depth_height,
            settings.color_width,
            settings.color_height,
            Duration::from_millis(settings.frame_interval_ms),
        )
    }

    /// End the stream after `limit` arrivals
    pub fn with_frame_limit(mut self, limit: u64) -> Self {
        self.frame_limit = Some(limit);
        self
    }

    /// Produce color frames in this format instead of BGRA
    ///
    /// YUY2 packs horizontal pixel pairs, so it needs an even color width.
    pub fn with_color_format(mut self, format: PixelFormat) -> Result<Self, SensorError> {
        match format {
            PixelFormat::Gray16 => {
                return Err(SensorError::UnsupportedFormat {
                    stream: StreamKind::Color,
                    format: format.to_string(),
                });
            }
            PixelFormat::Yuy2 if self.color.width % 2 == 1 => {
                return Err(SensorError::SensorUnavailable(format!(
                    "YUY2 needs an even color width, got {}",
                    self.color.width
                )));
            }
            _ => {}
        }
        self.color.format = format;
        Ok(self)
    }

    /// Depth samples (millimeters) for one frame
    pub fn depth_samples(&self, frame_index: u64) -> Vec<u16> {
        let width = self.depth.width as usize;
        let phase = frame_index as f32 * 0.05;

        (0..self.depth.pixel_count())
            .map(|i| {
                if (i + frame_index as usize) % HOLE_STRIDE == 0 {
                    return 0;
                }
                let u = (i % width) as f32 / width as f32;
                let wave = (u * std::f32::consts::TAU + phase).sin();
                (2000.0 + 1000.0 * wave) as u16
            })
            .collect()
    }

    fn color_bytes(&self, frame_index: u64) -> Vec<u8> {
        let width = self.color.width as usize;
        let height = self.color.height as usize;
        let shift = (frame_index % 256) as u8;

        match self.color.format {
            PixelFormat::Yuy2 => {
                let mut data = Vec::with_capacity(self.color.byte_len());
                for y in 0..height {
                    for pair in 0..width / 2 {
                        let luma = ((pair * 2 * 255) / width.max(1)) as u8;
                        let u = (y * 255 / height.max(1)) as u8;
                        data.extend_from_slice(&[luma, u, luma, shift]);
                    }
                }
                data
            }
            _ => {
                let mut data = Vec::with_capacity(self.color.byte_len());
                for y in 0..height {
                    let green = (y * 255 / height.max(1)) as u8;
                    for x in 0..width {
                        let blue = (x * 255 / width.max(1)) as u8;
                        data.extend_from_slice(&[blue, green, shift, 255]);
                    }
                }
                data
            }
        }
    }
}

impl SensorSource for SyntheticSensor {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn depth_description(&self) -> FrameDescription {
        self.depth
    }

    fn color_description(&self) -> FrameDescription {
        self.color
    }

    fn calibration_table(&self) -> Result<CalibrationTable, SensorError> {
        Ok(CalibrationTable::from_intrinsics(
            self.depth.width,
            self.depth.height,
            &self.intrinsics,
        ))
    }

    fn next_arrival(&mut self) -> Result<Option<FrameArrival>, SensorError> {
        if self.frame_limit.is_some_and(|limit| self.frame_index >= limit) {
            return Ok(None);
        }
        if !self.frame_interval.is_zero() {
            std::thread::sleep(self.frame_interval);
        }

        let index = self.frame_index;
        self.frame_index += 1;

        let depth = RawDepthFrame {
            frame: RawFrame::from_depth_mm(
                self.depth.width,
                self.depth.height,
                &self.depth_samples(index),
            ),
            reliable_range: DepthRange::new(
                sensor::MIN_RELIABLE_DISTANCE_MM,
                sensor::MAX_RELIABLE_DISTANCE_MM,
            ),
        };
        let color = RawFrame::new(self.color, self.color_bytes(index));

        debug!(frame = index, "Synthetic arrival");
        Ok(Some(FrameArrival::new(Some(depth), Some(color))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::sensor::synchronizer::FrameSynchronizer;

    #[test]
    fn test_zero_geometry_is_unavailable() {
        assert!(matches!(
            SyntheticSensor::new(0, 4, 4, 4, Duration::ZERO),
            Err(SensorError::SensorUnavailable(_))
        ));
    }

    #[test]
    fn test_arrivals_pass_synchronizer() {
        let mut sensor = SyntheticSensor::new(16, 8, 32, 16, Duration::ZERO).unwrap();
        let mut sync = FrameSynchronizer::new(16, 8, 32, 16, sensor::DEPTH_SCALE);

        let arrival = sensor.next_arrival().unwrap().unwrap();
        let pair = sync.on_frame_arrived(&arrival).unwrap();
        assert_eq!(pair.depth_mm.len(), 16 * 8);
        // Index 0 is a hole on the first frame
        assert_eq!(pair.depth_mm[0], 0);
        assert!(pair.depth_mm.iter().any(|&d| d > 0));
    }

    #[test]
    fn test_yuy2_arrivals_pass_synchronizer() {
        let mut sensor = SyntheticSensor::new(4, 4, 8, 4, Duration::ZERO)
            .unwrap()
            .with_color_format(PixelFormat::Yuy2)
            .unwrap();
        let mut sync = FrameSynchronizer::new(4, 4, 8, 4, 1);

        let arrival = sensor.next_arrival().unwrap().unwrap();
        let pair = sync.on_frame_arrived(&arrival).unwrap();
        assert_eq!(pair.color.data().len(), 8 * 4 * 4);

        // Chroma is constant along a row, luma repeats within each pair
        let row_bytes = 8 * 4;
        for row in pair.color.data().chunks_exact(row_bytes) {
            assert_eq!(row[0..4], row[4..8]);
            assert_eq!(row[3], 255);
        }
    }

    #[test]
    fn test_yuy2_requires_even_width() {
        let odd = SyntheticSensor::new(2, 2, 3, 2, Duration::ZERO).unwrap();
        assert!(matches!(
            odd.with_color_format(PixelFormat::Yuy2),
            Err(SensorError::SensorUnavailable(_))
        ));

        let gray = SyntheticSensor::new(2, 2, 4, 2, Duration::ZERO).unwrap();
        assert!(matches!(
            gray.with_color_format(PixelFormat::Gray16),
            Err(SensorError::UnsupportedFormat { .. })
        ));
    }

    #[test]
    fn test_frame_limit_ends_stream() {
        let mut sensor = SyntheticSensor::new(2, 2, 2, 2, Duration::ZERO)
            .unwrap()
            .with_frame_limit(1);
        assert!(sensor.next_arrival().unwrap().is_some());
        assert!(sensor.next_arrival().unwrap().is_none());
    }

    #[test]
    fn test_calibration_matches_geometry() {
        let sensor = SyntheticSensor::new(8, 6, 8, 6, Duration::ZERO).unwrap();
        let table = sensor.calibration_table().unwrap();
        assert_eq!(table.len(), 48);
    }
}
