// SPDX-License-Identifier: GPL-3.0-only

//! Drive base control
//!
//! Motion commands are single open-loop packets: the drive opcode followed by
//! a big-endian `i16` velocity and `i16` radius. Nothing is ever read back.
//!
//! | Command | Bytes |
//! |---|---|
//! | Forward | `89 01 F4 03 E8` |
//! | Backward | `89 FE 0C 03 E8` |
//! | RotateCw | `89 F1 F1 00 00` |
//! | RotateCcw | `89 01 F4 00 00` |
//! | Stop | `89 00 00 00 00` |
//!
//! Link errors are returned to the caller, never fatal here.

pub mod serial;

pub use serial::SerialLink;

use crate::constants::drive;
use crate::errors::LinkError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Motion the drive base can perform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotionCommand {
    Forward,
    Backward,
    RotateCw,
    RotateCcw,
    Stop,
}

impl MotionCommand {
    /// Wheel velocity (mm/s)
    pub fn velocity(&self) -> i16 {
        match self {
            MotionCommand::Forward | MotionCommand::RotateCcw => 500,
            MotionCommand::Backward => -500,
            MotionCommand::RotateCw => -3599,
            MotionCommand::Stop => 0,
        }
    }

    /// Turn radius (mm); 0 turns in place
    pub fn radius(&self) -> i16 {
        match self {
            MotionCommand::Forward | MotionCommand::Backward => 1000,
            MotionCommand::RotateCw | MotionCommand::RotateCcw | MotionCommand::Stop => 0,
        }
    }

    /// Wire packet for this command
    pub fn packet(&self) -> [u8; 5] {
        let [v_hi, v_lo] = self.velocity().to_be_bytes();
        let [r_hi, r_lo] = self.radius().to_be_bytes();
        [drive::DRIVE_OPCODE, v_hi, v_lo, r_hi, r_lo]
    }
}

impl std::fmt::Display for MotionCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MotionCommand::Forward => write!(f, "forward"),
            MotionCommand::Backward => write!(f, "backward"),
            MotionCommand::RotateCw => write!(f, "rotate-cw"),
            MotionCommand::RotateCcw => write!(f, "rotate-ccw"),
            MotionCommand::Stop => write!(f, "stop"),
        }
    }
}

/// Byte sink connected to the drive base
pub trait DriveLink: Send {
    /// Name used in logs
    fn name(&self) -> &str;

    /// Write one complete packet
    fn write_packet(&mut self, packet: &[u8]) -> Result<(), LinkError>;
}

/// Sends motion commands and tracks whether the base is moving
pub struct DriveController {
    link: Box<dyn DriveLink>,
    moving: Arc<AtomicBool>,
}

impl DriveController {
    pub fn new(link: Box<dyn DriveLink>) -> Self {
        info!(link = link.name(), "Creating drive controller");
        Self {
            link,
            moving: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Put the base under host control
    ///
    /// With `announce` set the base also flashes its LEDs and plays a single
    /// note so an operator can tell the link is up.
    pub fn initialize(&mut self, announce: bool) -> Result<(), LinkError> {
        self.link.write_packet(&[drive::START_OPCODE])?;
        self.link.write_packet(&[drive::CONTROL_OPCODE])?;

        if announce {
            self.link.write_packet(&[drive::LEDS_OPCODE, 25, 0, 128])?;
            self.link.write_packet(&[drive::SONG_OPCODE, 1, 1, 48, 20])?;
            self.link.write_packet(&[drive::PLAY_OPCODE, 1])?;
        }

        info!(link = self.link.name(), announce, "Drive base initialized");
        Ok(())
    }

    /// Send one motion command
    ///
    /// The moving flag only changes when the write succeeds.
    pub fn send(&mut self, command: MotionCommand) -> Result<(), LinkError> {
        debug!(%command, packet = ?command.packet(), "Sending motion command");

        match self.link.write_packet(&command.packet()) {
            Ok(()) => {
                self.moving
                    .store(command != MotionCommand::Stop, Ordering::SeqCst);
                Ok(())
            }
            Err(e) => {
                warn!(%command, error = %e, "Motion command failed");
                Err(e)
            }
        }
    }

    /// Block for `duration`, then send [`MotionCommand::Stop`]
    ///
    /// This is the only wait in the motion path; callers rely on it to hold
    /// off frame processing while the base is moving.
    pub fn stop_after(&mut self, duration: Duration) -> Result<(), LinkError> {
        std::thread::sleep(duration);
        self.send(MotionCommand::Stop)
    }

    /// `send(command)` followed by `stop_after(duration)`
    pub fn drive_for(
        &mut self,
        command: MotionCommand,
        duration: Duration,
    ) -> Result<(), LinkError> {
        self.send(command)?;
        self.stop_after(duration)
    }

    pub fn is_moving(&self) -> bool {
        self.moving.load(Ordering::SeqCst)
    }

    /// Shared view of the moving flag for other threads
    pub fn moving_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.moving)
    }
}

#[derive(Debug, Default)]
struct LoopbackState {
    packets: Vec<Vec<u8>>,
    fail_from: Option<usize>,
    attempts: usize,
}

/// In-memory link that records every packet
///
/// Clones share the same record, so a test can keep one handle while the
/// controller owns another. Used for dry runs as well.
#[derive(Debug, Clone, Default)]
pub struct LoopbackLink {
    state: Arc<Mutex<LoopbackState>>,
}

impl LoopbackLink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every write from the `n`th attempt on (0-based)
    pub fn fail_from(self, n: usize) -> Self {
        self.lock().fail_from = Some(n);
        self
    }

    /// Packets written so far
    pub fn packets(&self) -> Vec<Vec<u8>> {
        self.lock().packets.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, LoopbackState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl DriveLink for LoopbackLink {
    fn name(&self) -> &str {
        "loopback"
    }

    fn write_packet(&mut self, packet: &[u8]) -> Result<(), LinkError> {
        let mut state = self.lock();
        let attempt = state.attempts;
        state.attempts += 1;

        if state.fail_from.is_some_and(|n| attempt >= n) {
            return Err(LinkError::Timeout);
        }
        state.packets.push(packet.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_packet_encoding() {
        assert_eq!(MotionCommand::Forward.packet(), [0x89, 0x01, 0xF4, 0x03, 0xE8]);
        assert_eq!(MotionCommand::Backward.packet(), [0x89, 0xFE, 0x0C, 0x03, 0xE8]);
        assert_eq!(MotionCommand::RotateCw.packet(), [0x89, 0xF1, 0xF1, 0x00, 0x00]);
        assert_eq!(MotionCommand::RotateCcw.packet(), [0x89, 0x01, 0xF4, 0x00, 0x00]);
        assert_eq!(MotionCommand::Stop.packet(), [0x89, 0x00, 0x00, 0x00, 0x00]);
    }

    #[test]
    fn test_stop_after_clears_moving() {
        let link = LoopbackLink::new();
        let mut controller = DriveController::new(Box::new(link.clone()));

        controller.send(MotionCommand::RotateCw).unwrap();
        assert!(controller.is_moving());

        controller.stop_after(Duration::from_millis(1)).unwrap();
        assert!(!controller.is_moving());
        assert_eq!(
            link.packets(),
            vec![
                MotionCommand::RotateCw.packet().to_vec(),
                MotionCommand::Stop.packet().to_vec()
            ]
        );
    }

    #[test]
    fn test_failed_write_keeps_state() {
        let link = LoopbackLink::new().fail_from(1);
        let mut controller = DriveController::new(Box::new(link.clone()));

        controller.send(MotionCommand::Forward).unwrap();
        assert_eq!(
            controller.send(MotionCommand::Stop),
            Err(LinkError::Timeout)
        );
        // Stop never reached the base
        assert!(controller.is_moving());
        assert_eq!(link.packets().len(), 1);
    }

    #[test]
    fn test_initialize_sequence() {
        let link = LoopbackLink::new();
        let mut controller = DriveController::new(Box::new(link.clone()));
        controller.initialize(true).unwrap();

        assert_eq!(
            link.packets(),
            vec![
                vec![128],
                vec![132],
                vec![139, 25, 0, 128],
                vec![140, 1, 1, 48, 20],
                vec![141, 1]
            ]
        );
    }

    #[test]
    fn test_moving_flag_is_shared() {
        let mut controller = DriveController::new(Box::new(LoopbackLink::new()));
        let flag = controller.moving_flag();
        controller.send(MotionCommand::Backward).unwrap();
        assert!(flag.load(Ordering::SeqCst));
    }
}
