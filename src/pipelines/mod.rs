// SPDX-License-Identifier: GPL-3.0-only

//! Capture pipelines
//!
//! ```text
//! ┌──────────────┐     ┌───────────────────┐     ┌──────────────┐
//! │  FramePair   │ ──▶ │ PanoramaCapture   │ ──▶ │ CaptureSink  │
//! │ (depth+RGBA) │     │  - map + composite│     │  PNG / PGM   │
//! │              │     │  - rotate, settle │     │              │
//! └──────────────┘     └───────────────────┘     └──────────────┘
//! ```
//!
//! - [`panorama`]: session state machine and the worker that feeds it
//! - [`persist`]: writing captures to disk

pub mod panorama;
pub mod persist;
