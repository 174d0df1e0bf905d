// SPDX-License-Identifier: GPL-3.0-only

//! Capture persistence
//!
//! Every capture produces:
//! - `Composite-*.png`: depth-resolution RGBA composite
//! - `Depth-*.png`: canonical 16-bit depth
//! - `Color-*.png`: color as RGB
//!
//! With raw dumps enabled it additionally writes `Depth-*.pgm` (16-bit),
//! `Color-*.ppm` and `Registered-*.pgm` (8-bit depth at color resolution).

pub mod pnm;

use crate::backends::sensor::format_converters::rgba_to_rgb;
use crate::backends::sensor::types::{Frame, PixelFormat};
use crate::config::{FileNaming, OutputSettings};
use crate::errors::PersistenceError;
use crate::registration::CompositeImage;
use crate::storage;
use chrono::{DateTime, Local};
use image::{ImageBuffer, Luma, RgbImage, RgbaImage};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Position of a capture within the panorama series
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct SequenceKey {
    pub panorama_index: u32,
    pub image_index: u32,
}

/// Everything produced for one captured pair
#[derive(Debug, Clone, Copy)]
pub struct Capture<'a> {
    pub key: SequenceKey,
    pub taken_at: DateTime<Local>,
    /// Canonical depth (Gray16)
    pub depth: &'a Frame,
    /// Canonical color (RGBA)
    pub color: &'a Frame,
    pub composite: &'a CompositeImage,
    /// 8-bit depth at color resolution, 0 where unmapped
    pub registered_depth: &'a [u8],
}

/// Destination for captures
pub trait CaptureSink: Send {
    /// Persist one capture, returning the written paths
    fn persist(&mut self, capture: &Capture<'_>) -> Result<Vec<PathBuf>, PersistenceError>;
}

/// Writes captures as image files into one directory
#[derive(Debug, Clone)]
pub struct FileSink {
    directory: PathBuf,
    naming: FileNaming,
    dump_raw: bool,
}

impl FileSink {
    pub fn new(directory: impl Into<PathBuf>, naming: FileNaming, dump_raw: bool) -> Self {
        Self {
            directory: directory.into(),
            naming,
            dump_raw,
        }
    }

    pub fn from_settings(settings: &OutputSettings) -> Self {
        Self::new(settings.directory(), settings.naming, settings.dump_raw)
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    fn path(&self, kind: &str, extension: &str, capture: &Capture<'_>) -> PathBuf {
        let stem = storage::capture_stem(kind, self.naming, capture.key, &capture.taken_at);
        storage::capture_path(&self.directory, &stem, extension)
    }
}

impl CaptureSink for FileSink {
    fn persist(&mut self, capture: &Capture<'_>) -> Result<Vec<PathBuf>, PersistenceError> {
        std::fs::create_dir_all(&self.directory).map_err(|e| {
            PersistenceError::WriteFailed(format!("{}: {}", self.directory.display(), e))
        })?;

        let depth = capture.depth;
        let color = capture.color;
        if depth.format() != PixelFormat::Gray16 || color.format() != PixelFormat::Rgba8 {
            return Err(PersistenceError::EncodingFailed(format!(
                "unexpected frame formats: depth {}, color {}",
                depth.format(),
                color.format()
            )));
        }

        let depth_samples = depth.depth_samples();
        let color_rgb = rgba_to_rgb(color.data());
        let mut written = Vec::with_capacity(6);

        let composite = capture.composite;
        let path = self.path("Composite", "png", capture);
        RgbaImage::from_raw(composite.width, composite.height, composite.rgba.clone())
            .ok_or_else(|| PersistenceError::EncodingFailed("composite buffer size".into()))?
            .save(&path)?;
        written.push(path);

        let path = self.path("Depth", "png", capture);
        ImageBuffer::<Luma<u16>, Vec<u16>>::from_raw(
            depth.width(),
            depth.height(),
            depth_samples.clone(),
        )
        .ok_or_else(|| PersistenceError::EncodingFailed("depth buffer size".into()))?
        .save(&path)?;
        written.push(path);

        let path = self.path("Color", "png", capture);
        RgbImage::from_raw(color.width(), color.height(), color_rgb.clone())
            .ok_or_else(|| PersistenceError::EncodingFailed("color buffer size".into()))?
            .save(&path)?;
        written.push(path);

        if self.dump_raw {
            let path = self.path("Depth", "pgm", capture);
            pnm::write(&path, &pnm::encode_gray16(depth.width(), depth.height(), &depth_samples)?)?;
            written.push(path);

            let path = self.path("Color", "ppm", capture);
            pnm::write(&path, &pnm::encode_rgb8(color.width(), color.height(), &color_rgb)?)?;
            written.push(path);

            let path = self.path("Registered", "pgm", capture);
            pnm::write(
                &path,
                &pnm::encode_gray8(color.width(), color.height(), capture.registered_depth)?,
            )?;
            written.push(path);
        }

        debug!(files = written.len(), "Capture files written");
        info!(
            panorama = capture.key.panorama_index,
            image = capture.key.image_index,
            dir = %self.directory.display(),
            "Capture saved"
        );
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("panorama-persist-{}-{}", name, std::process::id()))
    }

    #[test]
    fn test_file_sink_writes_all_artifacts() {
        let dir = temp_dir("all");
        let depth = Frame::from_data(2, 2, PixelFormat::Gray16, vec![0x10; 8]).unwrap();
        let color = Frame::from_data(4, 2, PixelFormat::Rgba8, vec![200; 32]).unwrap();
        let composite = CompositeImage {
            width: 2,
            height: 2,
            rgba: vec![50; 16],
            rejected: 0,
        };
        let registered = vec![7u8; 8];
        let capture = Capture {
            key: SequenceKey {
                panorama_index: 1,
                image_index: 4,
            },
            taken_at: Local::now(),
            depth: &depth,
            color: &color,
            composite: &composite,
            registered_depth: &registered,
        };

        let mut sink = FileSink::new(&dir, FileNaming::Sequence, true);
        let written = sink.persist(&capture).unwrap();
        assert_eq!(written.len(), 6);
        assert!(dir.join("Composite-001-004.png").exists());
        assert!(dir.join("Depth-001-004.pgm").exists());

        let decoded = image::open(dir.join("Color-001-004.png")).unwrap().to_rgb8();
        assert_eq!(decoded.dimensions(), (4, 2));
        assert_eq!(decoded.get_pixel(0, 0).0, [200, 200, 200]);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_wrong_format_is_encoding_error() {
        let dir = temp_dir("format");
        let depth = Frame::blank(1, 1, PixelFormat::Rgba8);
        let color = Frame::blank(1, 1, PixelFormat::Rgba8);
        let composite = CompositeImage {
            width: 1,
            height: 1,
            rgba: vec![0; 4],
            rejected: 0,
        };
        let capture = Capture {
            key: SequenceKey::default(),
            taken_at: Local::now(),
            depth: &depth,
            color: &color,
            composite: &composite,
            registered_depth: &[0],
        };

        let mut sink = FileSink::new(&dir, FileNaming::Sequence, false);
        assert!(matches!(
            sink.persist(&capture),
            Err(PersistenceError::EncodingFailed(_))
        ));

        let _ = std::fs::remove_dir_all(&dir);
    }
}
