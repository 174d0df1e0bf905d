// SPDX-License-Identifier: GPL-3.0-only
//! Pixel format conversion into the canonical buffers
//!
//! All converters write into caller-owned buffers so the synchronizer can
//! reuse its allocations across arrivals. Callers validate lengths first;
//! converters only touch whole pixels that fit both sides.

use super::types::DepthRange;

/// Swap BGRA into RGBA
pub fn bgra_into_rgba(src: &[u8], dst: &mut [u8]) {
    for (s, d) in src.chunks_exact(4).zip(dst.chunks_exact_mut(4)) {
        d[0] = s[2];
        d[1] = s[1];
        d[2] = s[0];
        d[3] = s[3];
    }
}

/// Convert YUY2 (YUV 4:2:2) to RGBA
///
/// YUY2 format: Y0 U0 Y1 V0 - each 4-byte group encodes 2 pixels.
/// Uses BT.601 coefficients for YUV to RGB conversion.
pub fn yuy2_into_rgba(src: &[u8], dst: &mut [u8]) {
    for (chunk, out) in src.chunks_exact(4).zip(dst.chunks_exact_mut(8)) {
        let y0 = chunk[0] as f32;
        let u = chunk[1] as f32 - 128.0;
        let y1 = chunk[2] as f32;
        let v = chunk[3] as f32 - 128.0;

        for (px, y) in out.chunks_exact_mut(4).zip([y0, y1]) {
            px[0] = (y + 1.402 * v).clamp(0.0, 255.0) as u8;
            px[1] = (y - 0.344 * u - 0.714 * v).clamp(0.0, 255.0) as u8;
            px[2] = (y + 1.772 * u).clamp(0.0, 255.0) as u8;
            px[3] = 255;
        }
    }
}

/// Scale raw 16-bit depth and zero everything outside the reliable range
///
/// `src` holds little-endian millimeter samples. The range test is done on
/// the scaled values, matching how the sensor SDK reports its window, and the
/// result saturates at `u16::MAX`. `dst` receives the scaled little-endian
/// samples, `dst_mm` the unscaled millimeters (also zeroed out of range).
pub fn scale_depth_into(
    src: &[u8],
    range: DepthRange,
    scale: u16,
    dst: &mut [u8],
    dst_mm: &mut [u16],
) {
    let scale = scale as u32;
    let min_depth = range.min_mm as u32 * scale;
    let max_depth = range.max_mm as u32 * scale;

    for ((s, d), mm) in src
        .chunks_exact(2)
        .zip(dst.chunks_exact_mut(2))
        .zip(dst_mm.iter_mut())
    {
        let raw = u16::from_le_bytes([s[0], s[1]]);
        let depth = raw as u32 * scale;
        let in_range = depth >= min_depth && depth <= max_depth;

        let scaled = if in_range {
            depth.min(u16::MAX as u32) as u16
        } else {
            0
        };
        d.copy_from_slice(&scaled.to_le_bytes());
        *mm = if in_range { raw } else { 0 };
    }
}

/// Map millimeters onto a byte with a fixed divisor, saturating at 255
pub fn depth_mm_to_byte(depth_mm: u16, divisor: u16) -> u8 {
    (depth_mm / divisor.max(1)).min(u8::MAX as u16) as u8
}

/// Drop the alpha channel
pub fn rgba_to_rgb(rgba: &[u8]) -> Vec<u8> {
    let mut rgb = Vec::with_capacity(rgba.len() / 4 * 3);
    for chunk in rgba.chunks_exact(4) {
        rgb.extend_from_slice(&chunk[..3]);
    }
    rgb
}
