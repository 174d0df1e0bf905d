// SPDX-License-Identifier: GPL-3.0-only

//! Depth + color sensor layer
//!
//! A [`SensorSource`] delivers paired arrivals together with their reported
//! geometry and a one-time calibration table. The [`FrameSynchronizer`]
//! validates each arrival and converts it into canonical buffers.
//!
//! ```text
//! SensorSource ──► ArrivalPump (own thread) ──► bounded queue ──► worker
//!                                                                 │
//!                                                  FrameSynchronizer
//! ```

pub mod format_converters;
pub mod frame_loop;
pub mod synchronizer;
pub mod synthetic;
pub mod types;

pub use frame_loop::{ArrivalPump, LoopAction, LoopController};
pub use synchronizer::{FrameSynchronizer, SyncStats};
pub use synthetic::SyntheticSensor;
pub use types::{
    DepthRange, Frame, FrameArrival, FrameDescription, FramePair, PixelFormat, RawDepthFrame,
    RawFrame,
};

use crate::errors::SensorError;
use crate::registration::CalibrationTable;

/// A paired depth + color sensor
pub trait SensorSource: Send {
    /// Short name used in logs
    fn name(&self) -> &str;

    /// Geometry of the depth stream
    fn depth_description(&self) -> FrameDescription;

    /// Geometry of the color stream
    fn color_description(&self) -> FrameDescription;

    /// Fetch the depth → camera-space table (done once at startup)
    fn calibration_table(&self) -> Result<CalibrationTable, SensorError>;

    /// Block until the next arrival
    ///
    /// `Ok(None)` means the stream has ended.
    fn next_arrival(&mut self) -> Result<Option<FrameArrival>, SensorError>;
}

/// Presentation hook for synchronized frames
///
/// Called on the capture worker for every delivered pair. Implementations
/// must not block for long; they hold up frame processing.
pub trait FrameObserver: Send {
    fn render_depth(&mut self, frame: &Frame);
    fn render_color(&mut self, frame: &Frame);
}

/// Observer that ignores everything
#[derive(Debug, Default)]
pub struct NullObserver;

impl FrameObserver for NullObserver {
    fn render_depth(&mut self, _frame: &Frame) {}
    fn render_color(&mut self, _frame: &Frame) {}
}
