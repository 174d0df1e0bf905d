// SPDX-License-Identifier: GPL-3.0-only

//! Single consumer of the arrival queue
//!
//! Synchronizes each arrival, shows it to the observer and feeds the state
//! machine. This is the only place session state is mutated.

use super::{FrameDisposition, PanoramaCapture, SweepReport};
use crate::backends::sensor::types::FrameArrival;
use crate::backends::sensor::{FrameObserver, FrameSynchronizer};
use crate::constants::timing;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, RecvTimeoutError};
use tracing::{debug, info};

/// Result of handling one arrival
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrivalOutcome {
    /// Rejected by the synchronizer
    Dropped,
    /// Delivered to the state machine
    Delivered(FrameDisposition),
}

pub struct CaptureWorker {
    synchronizer: FrameSynchronizer,
    capture: PanoramaCapture,
    observer: Box<dyn FrameObserver>,
}

impl CaptureWorker {
    pub fn new(
        synchronizer: FrameSynchronizer,
        capture: PanoramaCapture,
        observer: Box<dyn FrameObserver>,
    ) -> Self {
        Self {
            synchronizer,
            capture,
            observer,
        }
    }

    pub fn capture(&self) -> &PanoramaCapture {
        &self.capture
    }

    pub fn capture_mut(&mut self) -> &mut PanoramaCapture {
        &mut self.capture
    }

    pub fn synchronizer(&self) -> &FrameSynchronizer {
        &self.synchronizer
    }

    /// Process one arrival synchronously
    pub fn handle_arrival(&mut self, arrival: &FrameArrival) -> ArrivalOutcome {
        let pair = match self.synchronizer.on_frame_arrived(arrival) {
            Ok(pair) => pair,
            Err(_) => return ArrivalOutcome::Dropped,
        };

        self.observer.render_depth(pair.depth);
        self.observer.render_color(pair.color);

        ArrivalOutcome::Delivered(self.capture.on_frame_pair(&pair))
    }

    /// Drain `arrivals` until the active session finishes
    ///
    /// Returns `None` when `stop` is raised or the queue is closed first.
    pub fn run(
        &mut self,
        arrivals: &Receiver<FrameArrival>,
        stop: &AtomicBool,
    ) -> Option<SweepReport> {
        info!(state = %self.capture.state(), "Capture worker running");

        while !stop.load(Ordering::SeqCst) {
            let arrival = match arrivals.recv_timeout(timing::ARRIVAL_POLL_INTERVAL) {
                Ok(arrival) => arrival,
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => {
                    info!("Arrival queue closed");
                    return None;
                }
            };

            if let ArrivalOutcome::Delivered(FrameDisposition::Finished(report)) =
                self.handle_arrival(&arrival)
            {
                return Some(report);
            }
        }

        debug!(stats = ?self.synchronizer.stats(), "Capture worker stopped");
        None
    }
}
