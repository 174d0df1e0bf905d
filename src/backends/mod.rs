// SPDX-License-Identifier: GPL-3.0-only

//! Hardware abstraction layer
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │            Panorama pipeline             │
//! └──────────┬────────────────────┬──────────┘
//!            │                    │
//! ┌──────────┴─────────┐ ┌────────┴─────────┐
//! │   sensor           │ │   drive          │
//! │   depth + color    │ │   serial packets │
//! └────────────────────┘ └──────────────────┘
//! ```
//!
//! - [`sensor`]: paired depth/color arrivals and frame synchronization
//! - [`drive`]: motion commands for the rotating base

pub mod drive;
pub mod sensor;
