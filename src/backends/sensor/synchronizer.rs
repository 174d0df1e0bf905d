// SPDX-License-Identifier: GPL-3.0-only

//! Frame synchronizer
//!
//! Turns a multi-source arrival event into a validated [`FramePair`].
//!
//! - Both halves must be present, otherwise the pair is dropped.
//! - Reported geometry must equal the canonical geometry and the buffer must
//!   hold exactly `width * height * bytes_per_pixel` bytes. Anything else is a
//!   transient resolution negotiation: the pair is dropped, never fatal.
//! - Accepted pairs are converted into double-buffered canonical frames:
//!   depth as contrast-scaled Gray16, color as RGBA.
//!
//! Validation happens before any write, so a dropped pair leaves the last
//! delivered pair intact.

use super::format_converters::{bgra_into_rgba, scale_depth_into, yuy2_into_rgba};
use super::types::{
    Frame, FrameArrival, FrameDescription, FramePair, PixelFormat, RawDepthFrame, RawFrame,
};
use crate::constants::timing;
use crate::errors::{SensorError, StreamKind};
use std::time::Instant;
use tracing::{debug, info};

/// Frame statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncStats {
    pub delivered: u64,
    pub dropped: u64,
}

/// One set of canonical buffers
struct CanonicalSlot {
    depth: Frame,
    depth_mm: Vec<u16>,
    color: Frame,
    captured_at: Option<Instant>,
}

impl CanonicalSlot {
    fn new(depth: FrameDescription, color: FrameDescription) -> Self {
        Self {
            depth: Frame::blank(depth.width, depth.height, PixelFormat::Gray16),
            depth_mm: vec![0; depth.pixel_count()],
            color: Frame::blank(color.width, color.height, PixelFormat::Rgba8),
            captured_at: None,
        }
    }

    fn pair(&self) -> Option<FramePair<'_>> {
        Some(FramePair {
            depth: &self.depth,
            color: &self.color,
            depth_mm: &self.depth_mm,
            captured_at: self.captured_at?,
        })
    }
}

/// Validates arrivals and owns the canonical frame buffers
pub struct FrameSynchronizer {
    depth_description: FrameDescription,
    color_description: FrameDescription,
    depth_scale: u16,
    slots: [CanonicalSlot; 2],
    /// Index of the slot holding the last delivered pair
    front: usize,
    stats: SyncStats,
}

impl FrameSynchronizer {
    /// Pre-allocate canonical buffers for the given geometry
    ///
    /// `depth_scale` is the contrast multiplier applied to canonical depth
    /// pixels; a value of 0 is treated as 1.
    pub fn new(
        depth_width: u32,
        depth_height: u32,
        color_width: u32,
        color_height: u32,
        depth_scale: u16,
    ) -> Self {
        let depth_description =
            FrameDescription::new(depth_width, depth_height, PixelFormat::Gray16);
        let color_description =
            FrameDescription::new(color_width, color_height, PixelFormat::Rgba8);

        info!(
            depth_width,
            depth_height,
            color_width,
            color_height,
            depth_scale,
            "Allocating canonical frame buffers"
        );

        Self {
            depth_description,
            color_description,
            depth_scale: depth_scale.max(1),
            slots: [
                CanonicalSlot::new(depth_description, color_description),
                CanonicalSlot::new(depth_description, color_description),
            ],
            front: 0,
            stats: SyncStats::default(),
        }
    }

    /// Build from the sensor section of the config
    pub fn from_settings(settings: &crate::config::SensorSettings) -> Self {
        Self::new(
            settings.depth_width,
            settings.depth_height,
            settings.color_width,
            settings.color_height,
            settings.depth_scale,
        )
    }

    /// Canonical depth geometry
    pub fn depth_description(&self) -> FrameDescription {
        self.depth_description
    }

    /// Canonical color geometry
    pub fn color_description(&self) -> FrameDescription {
        self.color_description
    }

    pub fn stats(&self) -> SyncStats {
        self.stats
    }

    /// Last delivered pair, if any
    pub fn latest(&self) -> Option<FramePair<'_>> {
        self.slots[self.front].pair()
    }

    /// Validate an arrival and convert it into the canonical buffers
    ///
    /// On error the pair is dropped and the previous pair stays available
    /// through [`latest`](Self::latest).
    pub fn on_frame_arrived(
        &mut self,
        arrival: &FrameArrival,
    ) -> Result<FramePair<'_>, SensorError> {
        let checked = self.validate(arrival);
        let (depth, color) = match checked {
            Ok(halves) => halves,
            Err(err) => {
                self.stats.dropped += 1;
                debug!(error = %err, dropped = self.stats.dropped, "Dropping frame pair");
                return Err(err);
            }
        };

        let back = 1 - self.front;
        let slot = &mut self.slots[back];

        scale_depth_into(
            &depth.frame.data,
            depth.reliable_range,
            self.depth_scale,
            slot.depth.data_mut(),
            &mut slot.depth_mm,
        );

        match color.format {
            PixelFormat::Bgra8 => bgra_into_rgba(&color.data, slot.color.data_mut()),
            PixelFormat::Rgba8 => slot.color.data_mut().copy_from_slice(&color.data),
            PixelFormat::Yuy2 => yuy2_into_rgba(&color.data, slot.color.data_mut()),
            // Rejected by validate()
            PixelFormat::Gray16 => {}
        }

        slot.captured_at = Some(arrival.arrived_at);
        self.front = back;
        self.stats.delivered += 1;

        if self.stats.delivered % timing::FRAME_LOG_INTERVAL == 0 {
            debug!(
                delivered = self.stats.delivered,
                dropped = self.stats.dropped,
                "Frame synchronizer statistics"
            );
        }

        // The slot was just stamped, so this is always Some
        self.slots[self.front]
            .pair()
            .ok_or(SensorError::MissingFrame(StreamKind::Depth))
    }

    fn validate<'a>(
        &self,
        arrival: &'a FrameArrival,
    ) -> Result<(&'a RawDepthFrame, &'a RawFrame), SensorError> {
        let depth = arrival
            .depth
            .as_ref()
            .ok_or(SensorError::MissingFrame(StreamKind::Depth))?;
        let color = arrival
            .color
            .as_ref()
            .ok_or(SensorError::MissingFrame(StreamKind::Color))?;

        if depth.frame.format != PixelFormat::Gray16 {
            return Err(SensorError::UnsupportedFormat {
                stream: StreamKind::Depth,
                format: depth.frame.format.to_string(),
            });
        }
        // YUY2 groups pixel pairs, an odd row would split a pair
        let split_pairs = color.format == PixelFormat::Yuy2 && color.width % 2 == 1;
        if color.format == PixelFormat::Gray16 || split_pairs {
            return Err(SensorError::UnsupportedFormat {
                stream: StreamKind::Color,
                format: color.format.to_string(),
            });
        }

        check_geometry(StreamKind::Depth, &depth.frame, &self.depth_description)?;
        check_geometry(StreamKind::Color, color, &self.color_description)?;

        Ok((depth, color))
    }
}

/// Reported dimensions must equal the canonical ones and the buffer must be
/// exactly `width * height * bytes_per_pixel` long
fn check_geometry(
    stream: StreamKind,
    raw: &RawFrame,
    canonical: &FrameDescription,
) -> Result<(), SensorError> {
    let bytes_per_pixel = raw.format.bytes_per_pixel();
    let expected_len = canonical.pixel_count() * bytes_per_pixel;

    let matches = raw.width == canonical.width
        && raw.height == canonical.height
        && raw.bytes_per_pixel == bytes_per_pixel
        && raw.data.len() == expected_len;

    if matches {
        Ok(())
    } else {
        Err(SensorError::FrameSizeMismatch {
            stream,
            expected: (canonical.width, canonical.height, expected_len),
            actual: (raw.width, raw.height, raw.data.len()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::sensor::types::DepthRange;

    fn depth_frame(width: u32, height: u32, mm: u16) -> RawDepthFrame {
        let samples = vec![mm; (width * height) as usize];
        RawDepthFrame {
            frame: RawFrame::from_depth_mm(width, height, &samples),
            reliable_range: DepthRange::new(500, 4500),
        }
    }

    fn bgra_frame(width: u32, height: u32) -> RawFrame {
        let data = [10u8, 20, 30, 255].repeat((width * height) as usize);
        RawFrame::new(FrameDescription::new(width, height, PixelFormat::Bgra8), data)
    }

    #[test]
    fn test_valid_pair_has_canonical_geometry() {
        let mut sync = FrameSynchronizer::new(4, 3, 8, 6, 8);
        let arrival = FrameArrival::new(Some(depth_frame(4, 3, 1000)), Some(bgra_frame(8, 6)));

        let pair = sync.on_frame_arrived(&arrival).unwrap();
        assert_eq!((pair.depth.width(), pair.depth.height()), (4, 3));
        assert_eq!((pair.color.width(), pair.color.height()), (8, 6));
        assert_eq!(pair.depth.depth_samples(), vec![8000; 12]);
        assert_eq!(pair.depth_mm, &[1000; 12]);
        // BGRA swapped into RGBA
        assert_eq!(&pair.color.data()[..4], &[30, 20, 10, 255]);
    }

    #[test]
    fn test_mismatched_dimensions_are_dropped() {
        let mut sync = FrameSynchronizer::new(4, 3, 8, 6, 8);
        let good = FrameArrival::new(Some(depth_frame(4, 3, 1000)), Some(bgra_frame(8, 6)));
        sync.on_frame_arrived(&good).unwrap();

        let bad = FrameArrival::new(Some(depth_frame(4, 3, 2000)), Some(bgra_frame(4, 3)));
        let err = sync.on_frame_arrived(&bad).unwrap_err();
        assert!(matches!(
            err,
            SensorError::FrameSizeMismatch {
                stream: StreamKind::Color,
                ..
            }
        ));

        // Previous pair survives untouched
        let latest = sync.latest().unwrap();
        assert_eq!(latest.depth_mm, &[1000; 12]);
        assert_eq!(sync.stats(), SyncStats { delivered: 1, dropped: 1 });
    }

    #[test]
    fn test_short_buffer_is_dropped() {
        let mut sync = FrameSynchronizer::new(4, 3, 8, 6, 8);
        let mut depth = depth_frame(4, 3, 1000);
        depth.frame.data.truncate(20);
        let arrival = FrameArrival::new(Some(depth), Some(bgra_frame(8, 6)));
        assert!(matches!(
            sync.on_frame_arrived(&arrival),
            Err(SensorError::FrameSizeMismatch {
                stream: StreamKind::Depth,
                ..
            })
        ));
    }

    #[test]
    fn test_missing_half_drops_pair() {
        let mut sync = FrameSynchronizer::new(4, 3, 8, 6, 8);
        let arrival = FrameArrival::new(None, Some(bgra_frame(8, 6)));
        assert_eq!(
            sync.on_frame_arrived(&arrival).unwrap_err(),
            SensorError::MissingFrame(StreamKind::Depth)
        );
        assert!(sync.latest().is_none());
    }

    #[test]
    fn test_buffers_alternate() {
        let mut sync = FrameSynchronizer::new(2, 2, 2, 2, 1);
        let first = FrameArrival::new(Some(depth_frame(2, 2, 1000)), Some(bgra_frame(2, 2)));
        let first_ptr = sync.on_frame_arrived(&first).unwrap().depth_mm.as_ptr();

        let second = FrameArrival::new(Some(depth_frame(2, 2, 2000)), Some(bgra_frame(2, 2)));
        let second_ptr = sync.on_frame_arrived(&second).unwrap().depth_mm.as_ptr();

        let third = FrameArrival::new(Some(depth_frame(2, 2, 3000)), Some(bgra_frame(2, 2)));
        let third_ptr = sync.on_frame_arrived(&third).unwrap().depth_mm.as_ptr();

        assert_ne!(first_ptr, second_ptr);
        assert_eq!(first_ptr, third_ptr);
    }

    #[test]
    fn test_odd_width_yuy2_is_dropped() {
        let mut sync = FrameSynchronizer::new(2, 2, 3, 2, 1);
        let color = RawFrame::new(FrameDescription::new(3, 2, PixelFormat::Yuy2), vec![128; 12]);
        let arrival = FrameArrival::new(Some(depth_frame(2, 2, 1000)), Some(color));

        assert!(matches!(
            sync.on_frame_arrived(&arrival),
            Err(SensorError::UnsupportedFormat {
                stream: StreamKind::Color,
                ..
            })
        ));
        assert_eq!(sync.stats().dropped, 1);
    }
}
