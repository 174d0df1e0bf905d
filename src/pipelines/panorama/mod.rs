// SPDX-License-Identifier: GPL-3.0-only

//! Panorama capture state machine
//!
//! ```text
//! Idle ─trigger─► Capturing ─► Rotating ─► Stabilizing ─► Capturing ─► … ─► Done ─► Idle
//! ```
//!
//! All transitions happen on the thread that feeds frame pairs in. Rotation
//! and the settle delay block that thread on purpose: frames that arrive
//! while the base is moving are never composited. Pairs captured before the
//! settle delay ended are discarded as stale.
//!
//! Every failure has a defined next state:
//! - link error: best-effort stop, then `Done` with a partial report
//! - persistence error: logged, the image counter still advances

pub mod session;
pub mod worker;

pub use session::{CaptureState, PanoramaSession, SessionMode, SweepReport};
pub use worker::CaptureWorker;

use crate::backends::drive::{DriveController, MotionCommand};
use crate::backends::sensor::types::FramePair;
use crate::config::{Config, RotationDirection};
use crate::errors::LinkError;
use crate::pipelines::persist::{Capture, CaptureSink};
use crate::registration::CoordinateMapper;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Observer for state changes
pub type TransitionListener = Box<dyn FnMut(CaptureState) + Send>;

/// What happened to a frame pair handed to the state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameDisposition {
    /// No active session
    Idle,
    /// Captured before the platform settled
    Stale,
    /// Captured; the session continues
    Captured,
    /// Captured and the session ended
    Finished(SweepReport),
}

/// Timing and direction of the rotation steps
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MotionProfile {
    pub rotate_duration: Duration,
    pub settle_delay: Duration,
    pub direction: RotationDirection,
}

impl MotionProfile {
    pub fn from_config(config: &Config) -> Self {
        Self {
            rotate_duration: config.drive.rotate_duration(),
            settle_delay: config.settle_delay(),
            direction: config.panorama.direction,
        }
    }

    fn rotate_command(&self) -> MotionCommand {
        match self.direction {
            RotationDirection::Clockwise => MotionCommand::RotateCw,
            RotationDirection::CounterClockwise => MotionCommand::RotateCcw,
        }
    }
}

/// Drives capture sessions from synchronized frame pairs
pub struct PanoramaCapture {
    session: PanoramaSession,
    mapper: CoordinateMapper,
    drive: DriveController,
    sink: Box<dyn CaptureSink>,
    motion: MotionProfile,
    /// End of the last settle delay
    settled_at: Option<Instant>,
    listener: Option<TransitionListener>,
}

impl PanoramaCapture {
    pub fn new(
        mapper: CoordinateMapper,
        drive: DriveController,
        sink: Box<dyn CaptureSink>,
        motion: MotionProfile,
    ) -> Self {
        Self {
            session: PanoramaSession::default(),
            mapper,
            drive,
            sink,
            motion,
            settled_at: None,
            listener: None,
        }
    }

    /// Register a callback invoked on every state change
    pub fn set_listener(&mut self, listener: TransitionListener) {
        self.listener = Some(listener);
    }

    pub fn state(&self) -> CaptureState {
        self.session.state
    }

    pub fn session(&self) -> &PanoramaSession {
        &self.session
    }

    pub fn drive(&mut self) -> &mut DriveController {
        &mut self.drive
    }

    /// Start a sweep of `max_rotations` rotation steps
    ///
    /// Ignored (returns false) while another session is active.
    pub fn start_panorama(&mut self, max_rotations: u32) -> bool {
        self.start(SessionMode::Sweep, max_rotations)
    }

    /// Take a single capture without moving
    ///
    /// Ignored (returns false) while another session is active.
    pub fn start_capture(&mut self) -> bool {
        self.start(SessionMode::Single, 0)
    }

    fn start(&mut self, mode: SessionMode, max_rotations: u32) -> bool {
        if self.session.is_active() {
            debug!(state = %self.session.state, "Session already active, ignoring trigger");
            return false;
        }

        self.session.begin(mode, max_rotations);
        self.settled_at = None;
        info!(
            ?mode,
            max_rotations,
            panorama = self.session.panorama_index,
            "Capture session started"
        );
        self.transition(CaptureState::Capturing);
        true
    }

    /// Feed the next synchronized pair
    pub fn on_frame_pair(&mut self, pair: &FramePair<'_>) -> FrameDisposition {
        if self.session.state != CaptureState::Capturing {
            return FrameDisposition::Idle;
        }
        if self.settled_at.is_some_and(|settled| pair.captured_at < settled) {
            debug!("Discarding frame captured before the platform settled");
            return FrameDisposition::Stale;
        }

        self.capture(pair);

        if self.session.mode == SessionMode::Single {
            let report = SweepReport {
                panorama_index: self.session.panorama_index,
                captures: self.session.captures,
                rotations: 0,
                partial: false,
            };
            self.transition(CaptureState::Idle);
            return FrameDisposition::Finished(report);
        }

        if !self.session.rotations_remaining() {
            return FrameDisposition::Finished(self.finish());
        }

        match self.rotate() {
            Ok(()) => {
                self.stabilize();
                FrameDisposition::Captured
            }
            Err(e) => {
                warn!(
                    error = %e,
                    rotations = self.session.rotations_completed,
                    "Rotation failed, ending sweep early"
                );
                if let Err(e) = self.drive.send(MotionCommand::Stop) {
                    warn!(error = %e, "Stop after failed rotation also failed");
                }
                self.session.partial = true;
                FrameDisposition::Finished(self.finish())
            }
        }
    }

    /// Composite and persist one pair, then advance the image counter
    fn capture(&mut self, pair: &FramePair<'_>) {
        let key = self.session.sequence_key();
        let color = pair.color;

        let mapped = self
            .mapper
            .map_color_to_depth_space(pair.depth_mm, color.width(), color.height());
        let composite = self.mapper.build_composite(&mapped, color.data());
        let registered = self.mapper.registered_depth(&mapped, pair.depth_mm);

        let capture = Capture {
            key,
            taken_at: chrono::Local::now(),
            depth: pair.depth,
            color,
            composite: &composite,
            registered_depth: &registered,
        };

        if let Err(e) = self.sink.persist(&capture) {
            warn!(
                panorama = key.panorama_index,
                image = key.image_index,
                error = %e,
                "Failed to persist capture"
            );
        }

        self.session.image_index += 1;
        self.session.captures += 1;
    }

    fn rotate(&mut self) -> Result<(), LinkError> {
        self.transition(CaptureState::Rotating);
        self.drive.send(self.motion.rotate_command())?;
        self.drive.stop_after(self.motion.rotate_duration)?;
        self.session.rotations_completed += 1;
        Ok(())
    }

    fn stabilize(&mut self) {
        self.transition(CaptureState::Stabilizing);
        std::thread::sleep(self.motion.settle_delay);
        self.settled_at = Some(Instant::now());
        self.transition(CaptureState::Capturing);
    }

    fn finish(&mut self) -> SweepReport {
        self.transition(CaptureState::Done);
        let report = self.session.complete();
        info!(
            panorama = report.panorama_index,
            captures = report.captures,
            rotations = report.rotations,
            partial = report.partial,
            "Panorama finished"
        );
        self.transition(CaptureState::Idle);
        report
    }

    fn transition(&mut self, next: CaptureState) {
        debug!(from = %self.session.state, to = %next, "Capture state transition");
        self.session.state = next;
        if let Some(listener) = self.listener.as_mut() {
            listener(next);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::drive::LoopbackLink;
    use crate::backends::sensor::types::{Frame, PixelFormat};
    use crate::errors::PersistenceError;
    use crate::registration::{CalibrationTable, ColorRegistration, DepthIntrinsics};
    use std::path::PathBuf;
    use std::sync::{Arc, Mutex};

    struct NullSink;

    impl CaptureSink for NullSink {
        fn persist(&mut self, _capture: &Capture<'_>) -> Result<Vec<PathBuf>, PersistenceError> {
            Ok(Vec::new())
        }
    }

    fn machine(link: LoopbackLink) -> PanoramaCapture {
        let table = CalibrationTable::from_intrinsics(2, 2, &DepthIntrinsics::pinhole(2, 2, 1.0));
        let mapper = CoordinateMapper::new(Arc::new(table), ColorRegistration::default());
        PanoramaCapture::new(
            mapper,
            DriveController::new(Box::new(link)),
            Box::new(NullSink),
            MotionProfile {
                rotate_duration: Duration::ZERO,
                settle_delay: Duration::ZERO,
                direction: RotationDirection::CounterClockwise,
            },
        )
    }

    fn frames() -> (Frame, Frame, Vec<u16>) {
        (
            Frame::blank(2, 2, PixelFormat::Gray16),
            Frame::blank(2, 2, PixelFormat::Rgba8),
            vec![1000; 4],
        )
    }

    #[test]
    fn test_idle_ignores_frames() {
        let mut capture = machine(LoopbackLink::new());
        let (depth, color, mm) = frames();
        let pair = FramePair {
            depth: &depth,
            color: &color,
            depth_mm: &mm,
            captured_at: Instant::now(),
        };
        assert_eq!(capture.on_frame_pair(&pair), FrameDisposition::Idle);
        assert_eq!(capture.session().image_index, 0);
    }

    #[test]
    fn test_second_trigger_is_ignored() {
        let mut capture = machine(LoopbackLink::new());
        assert!(capture.start_panorama(2));
        assert!(!capture.start_panorama(5));
        assert!(!capture.start_capture());
        assert_eq!(capture.session().max_rotations, 2);
    }

    #[test]
    fn test_rotation_direction_follows_profile() {
        let link = LoopbackLink::new();
        let mut capture = machine(link.clone());
        let (depth, color, mm) = frames();

        capture.start_panorama(1);
        let pair = FramePair {
            depth: &depth,
            color: &color,
            depth_mm: &mm,
            captured_at: Instant::now(),
        };
        assert_eq!(capture.on_frame_pair(&pair), FrameDisposition::Captured);
        assert_eq!(link.packets()[0], MotionCommand::RotateCcw.packet().to_vec());
    }

    #[test]
    fn test_stale_frame_is_discarded() {
        let mut capture = machine(LoopbackLink::new());
        let (depth, color, mm) = frames();
        let before = Instant::now();
        std::thread::sleep(Duration::from_millis(1));

        capture.start_panorama(1);
        let first = FramePair {
            depth: &depth,
            color: &color,
            depth_mm: &mm,
            captured_at: before,
        };
        assert_eq!(capture.on_frame_pair(&first), FrameDisposition::Captured);

        // Same timestamp predates the settle delay that just ended
        assert_eq!(capture.on_frame_pair(&first), FrameDisposition::Stale);
        assert_eq!(capture.session().image_index, 1);
    }

    #[test]
    fn test_single_capture_keeps_panorama_index() {
        let mut capture = machine(LoopbackLink::new());
        let (depth, color, mm) = frames();

        capture.start_capture();
        let pair = FramePair {
            depth: &depth,
            color: &color,
            depth_mm: &mm,
            captured_at: Instant::now(),
        };
        assert!(matches!(
            capture.on_frame_pair(&pair),
            FrameDisposition::Finished(SweepReport { captures: 1, .. })
        ));
        assert_eq!(capture.state(), CaptureState::Idle);
        assert_eq!(capture.session().panorama_index, 0);
        assert_eq!(capture.session().image_index, 1);
    }

    #[test]
    fn test_listener_sees_transitions() {
        let seen = Arc::new(Mutex::new(Vec::<CaptureState>::new()));
        let sink = Arc::clone(&seen);
        let mut capture = machine(LoopbackLink::new());
        capture.set_listener(Box::new(move |state: CaptureState| {
            sink.lock().unwrap().push(state)
        }));

        capture.start_panorama(0);
        let (depth, color, mm) = frames();
        let pair = FramePair {
            depth: &depth,
            color: &color,
            depth_mm: &mm,
            captured_at: Instant::now(),
        };
        capture.on_frame_pair(&pair);

        assert_eq!(
            *seen.lock().unwrap(),
            vec![CaptureState::Capturing, CaptureState::Done, CaptureState::Idle]
        );
    }
}
