// SPDX-License-Identifier: GPL-3.0-only

//! Netpbm raw dumps
//!
//! Header is `"P{type}\n{width} {height}\n{maxval}\n"` followed by raw
//! samples. 16-bit samples are big-endian as the format requires.

use crate::errors::PersistenceError;
use std::path::Path;

/// Binary graymap
const GRAYMAP: u8 = 5;
/// Binary pixmap
const PIXMAP: u8 = 6;

fn header(kind: u8, width: u32, height: u32, maxval: u16) -> Vec<u8> {
    format!("P{}\n{} {}\n{}\n", kind, width, height, maxval).into_bytes()
}

fn check_len(actual: usize, expected: usize) -> Result<(), PersistenceError> {
    if actual == expected {
        Ok(())
    } else {
        Err(PersistenceError::EncodingFailed(format!(
            "raster holds {} samples, expected {}",
            actual, expected
        )))
    }
}

/// 16-bit graymap (maxval 65535)
pub fn encode_gray16(
    width: u32,
    height: u32,
    samples: &[u16],
) -> Result<Vec<u8>, PersistenceError> {
    check_len(samples.len(), width as usize * height as usize)?;
    let mut out = header(GRAYMAP, width, height, u16::MAX);
    out.reserve(samples.len() * 2);
    for s in samples {
        out.extend_from_slice(&s.to_be_bytes());
    }
    Ok(out)
}

/// 8-bit graymap (maxval 255)
pub fn encode_gray8(width: u32, height: u32, samples: &[u8]) -> Result<Vec<u8>, PersistenceError> {
    check_len(samples.len(), width as usize * height as usize)?;
    let mut out = header(GRAYMAP, width, height, u8::MAX as u16);
    out.extend_from_slice(samples);
    Ok(out)
}

/// 8-bit RGB pixmap (maxval 255)
pub fn encode_rgb8(width: u32, height: u32, rgb: &[u8]) -> Result<Vec<u8>, PersistenceError> {
    check_len(rgb.len(), width as usize * height as usize * 3)?;
    let mut out = header(PIXMAP, width, height, u8::MAX as u16);
    out.extend_from_slice(rgb);
    Ok(out)
}

pub fn write(path: &Path, bytes: &[u8]) -> Result<(), PersistenceError> {
    std::fs::write(path, bytes)
        .map_err(|e| PersistenceError::WriteFailed(format!("{}: {}", path.display(), e)))
}
