// SPDX-License-Identifier: GPL-3.0-only
//! Thread lifecycle for the sensor arrival loop
//!
//! The sensor is polled on its own thread and every arrival is pushed into a
//! bounded single-consumer queue. The capture worker is the only consumer.
//! While the worker is blocked (rotation, settle delay) the queue fills up and
//! further arrivals are dropped at the producer rather than piling up.

use super::SensorSource;
use super::types::FrameArrival;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, TrySendError};
use std::thread::{self, JoinHandle};
use tracing::{debug, info, warn};

/// Returned by each loop iteration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopAction {
    Continue,
    Stop,
}

/// Owns a loop thread and its stop signal
///
/// Dropping the controller stops the loop and joins the thread.
pub struct LoopController {
    thread_handle: Option<JoinHandle<()>>,
    stop_signal: Arc<AtomicBool>,
    name: String,
}

impl LoopController {
    /// Run `step` on a new thread until it returns [`LoopAction::Stop`] or a
    /// stop is requested
    ///
    /// `state` is moved onto the thread and handed to every iteration.
    pub fn start<S, F>(name: &str, mut state: S, mut step: F) -> Self
    where
        S: Send + 'static,
        F: FnMut(&mut S) -> LoopAction + Send + 'static,
    {
        let stop_signal = Arc::new(AtomicBool::new(false));
        let thread_stop = Arc::clone(&stop_signal);
        let thread_name = name.to_string();

        info!(name = %name, "Starting loop thread");

        let thread_handle = thread::spawn(move || {
            while !thread_stop.load(Ordering::SeqCst) {
                if step(&mut state) == LoopAction::Stop {
                    debug!(name = %thread_name, "Loop requested stop");
                    break;
                }
            }
            info!(name = %thread_name, "Loop thread exiting");
        });

        Self {
            thread_handle: Some(thread_handle),
            stop_signal,
            name: name.to_string(),
        }
    }

    pub fn is_running(&self) -> bool {
        self.thread_handle
            .as_ref()
            .map(|h| !h.is_finished())
            .unwrap_or(false)
    }

    /// Signal the loop to stop without waiting
    pub fn request_stop(&self) {
        debug!(name = %self.name, "Requesting loop stop");
        self.stop_signal.store(true, Ordering::SeqCst);
    }

    /// Signal the loop to stop and wait for the thread
    pub fn stop(&mut self) {
        self.request_stop();
        self.join();
    }

    /// Wait for the thread without signalling it
    pub fn join(&mut self) {
        if let Some(handle) = self.thread_handle.take() {
            if let Err(e) = handle.join() {
                warn!(name = %self.name, "Loop thread panicked: {:?}", e);
            }
        }
    }
}

impl Drop for LoopController {
    fn drop(&mut self) {
        if self.thread_handle.is_some() {
            self.stop();
        }
    }
}

/// Sensor thread feeding the arrival queue
pub struct ArrivalPump {
    controller: LoopController,
    dropped: Arc<AtomicU64>,
}

impl ArrivalPump {
    /// Move `source` onto its own thread and return the consumer end
    ///
    /// The queue holds at most `capacity` arrivals. The pump stops when the
    /// source is exhausted, reports an error, or the receiver goes away.
    pub fn start(source: Box<dyn SensorSource>, capacity: usize) -> (Self, Receiver<FrameArrival>) {
        let (sender, receiver) = mpsc::sync_channel(capacity.max(1));
        let dropped = Arc::new(AtomicU64::new(0));
        let pump_dropped = Arc::clone(&dropped);
        let name = format!("sensor-{}", source.name());

        let controller = LoopController::start(&name, source, move |source| {
            let arrival = match source.next_arrival() {
                Ok(Some(arrival)) => arrival,
                Ok(None) => {
                    info!("Sensor stream ended");
                    return LoopAction::Stop;
                }
                Err(e) => {
                    warn!(error = %e, "Sensor failed, stopping arrival pump");
                    return LoopAction::Stop;
                }
            };

            match sender.try_send(arrival) {
                Ok(()) => LoopAction::Continue,
                Err(TrySendError::Full(_)) => {
                    let total = pump_dropped.fetch_add(1, Ordering::Relaxed) + 1;
                    debug!(dropped = total, "Worker busy, dropping arrival");
                    LoopAction::Continue
                }
                Err(TrySendError::Disconnected(_)) => LoopAction::Stop,
            }
        });

        (
            Self {
                controller,
                dropped,
            },
            receiver,
        )
    }

    /// Arrivals dropped because the queue was full
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn is_running(&self) -> bool {
        self.controller.is_running()
    }

    pub fn stop(&mut self) {
        self.controller.stop();
    }
}
