// SPDX-License-Identifier: GPL-3.0-only
// Shared types for sensor backends

//! Frame types shared between sensor sources and the pipeline

use std::time::Instant;

/// Pixel layout of a frame buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    /// 16-bit little-endian depth samples
    Gray16,
    /// 8-bit B, G, R, A
    Bgra8,
    /// 8-bit R, G, B, A
    Rgba8,
    /// YUV 4:2:2 packed as Y0 U Y1 V (raw color sensor output)
    Yuy2,
}

impl PixelFormat {
    /// Bytes per pixel for this format
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            PixelFormat::Gray16 | PixelFormat::Yuy2 => 2,
            PixelFormat::Bgra8 | PixelFormat::Rgba8 => 4,
        }
    }
}

impl std::fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PixelFormat::Gray16 => write!(f, "Gray16"),
            PixelFormat::Bgra8 => write!(f, "BGRA"),
            PixelFormat::Rgba8 => write!(f, "RGBA"),
            PixelFormat::Yuy2 => write!(f, "YUY2"),
        }
    }
}

/// Stream geometry a sensor reports for its current frames
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameDescription {
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
}

impl FrameDescription {
    pub fn new(width: u32, height: u32, format: PixelFormat) -> Self {
        Self {
            width,
            height,
            format,
        }
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Expected buffer length in bytes
    pub fn byte_len(&self) -> usize {
        self.pixel_count() * self.format.bytes_per_pixel()
    }
}

/// Depth window outside which readings are noise (millimeters)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepthRange {
    pub min_mm: u16,
    pub max_mm: u16,
}

impl DepthRange {
    pub fn new(min_mm: u16, max_mm: u16) -> Self {
        Self { min_mm, max_mm }
    }
}

/// A frame exactly as a sensor delivered it
#[derive(Debug, Clone)]
pub struct RawFrame {
    pub width: u32,
    pub height: u32,
    /// Bytes per pixel as reported by the sensor
    pub bytes_per_pixel: usize,
    pub format: PixelFormat,
    pub data: Vec<u8>,
}

impl RawFrame {
    pub fn new(description: FrameDescription, data: Vec<u8>) -> Self {
        Self {
            width: description.width,
            height: description.height,
            bytes_per_pixel: description.format.bytes_per_pixel(),
            format: description.format,
            data,
        }
    }

    /// Build a Gray16 frame from depth samples in millimeters
    pub fn from_depth_mm(width: u32, height: u32, samples: &[u16]) -> Self {
        let mut data = Vec::with_capacity(samples.len() * 2);
        for &s in samples {
            data.extend_from_slice(&s.to_le_bytes());
        }
        Self::new(FrameDescription::new(width, height, PixelFormat::Gray16), data)
    }
}

/// Raw depth frame plus the per-frame reliable range
#[derive(Debug, Clone)]
pub struct RawDepthFrame {
    pub frame: RawFrame,
    pub reliable_range: DepthRange,
}

/// One multi-source arrival event
///
/// Either half may be missing when a sensor did not produce a frame in time.
#[derive(Debug, Clone)]
pub struct FrameArrival {
    pub depth: Option<RawDepthFrame>,
    pub color: Option<RawFrame>,
    pub arrived_at: Instant,
}

impl FrameArrival {
    pub fn new(depth: Option<RawDepthFrame>, color: Option<RawFrame>) -> Self {
        Self {
            depth,
            color,
            arrived_at: Instant::now(),
        }
    }
}

/// Canonical in-memory image
///
/// Buffers are owned by the frame synchronizer and rewritten in place; other
/// stages only ever see `&Frame` or an owned copy.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    width: u32,
    height: u32,
    format: PixelFormat,
    data: Vec<u8>,
}

impl Frame {
    /// Allocate a zeroed frame
    pub fn blank(width: u32, height: u32, format: PixelFormat) -> Self {
        let len = width as usize * height as usize * format.bytes_per_pixel();
        Self {
            width,
            height,
            format,
            data: vec![0; len],
        }
    }

    /// Wrap an existing buffer, rejecting a length that does not match
    pub fn from_data(width: u32, height: u32, format: PixelFormat, data: Vec<u8>) -> Option<Self> {
        let expected = width as usize * height as usize * format.bytes_per_pixel();
        (data.len() == expected).then_some(Self {
            width,
            height,
            format,
            data,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn bytes_per_pixel(&self) -> usize {
        self.format.bytes_per_pixel()
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub(crate) fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Decode Gray16 samples (empty for other formats)
    pub fn depth_samples(&self) -> Vec<u16> {
        if self.format != PixelFormat::Gray16 {
            return Vec::new();
        }
        self.data
            .chunks_exact(2)
            .map(|c| u16::from_le_bytes([c[0], c[1]]))
            .collect()
    }
}

/// Synchronized depth + color pair, borrowed from the synchronizer's front buffers
#[derive(Debug, Clone, Copy)]
pub struct FramePair<'a> {
    /// Canonical depth image (contrast-scaled, out-of-range zeroed)
    pub depth: &'a Frame,
    /// Canonical color image (RGBA)
    pub color: &'a Frame,
    /// Unscaled depth in millimeters, out-of-range zeroed
    pub depth_mm: &'a [u16],
    pub captured_at: Instant,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_data_checks_length() {
        assert!(Frame::from_data(2, 2, PixelFormat::Rgba8, vec![0; 16]).is_some());
        assert!(Frame::from_data(2, 2, PixelFormat::Rgba8, vec![0; 15]).is_none());
    }

    #[test]
    fn test_depth_samples_little_endian() {
        let raw = RawFrame::from_depth_mm(2, 1, &[0x0102, 500]);
        assert_eq!(raw.data, vec![0x02, 0x01, 0xF4, 0x01]);

        let frame = Frame::from_data(2, 1, PixelFormat::Gray16, raw.data).unwrap();
        assert_eq!(frame.depth_samples(), vec![0x0102, 500]);
    }
}
