// SPDX-License-Identifier: GPL-3.0-only

//! Panorama session bookkeeping

use crate::pipelines::persist::SequenceKey;

/// Capture state machine states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CaptureState {
    /// Waiting for a capture-start trigger
    #[default]
    Idle,
    /// Waiting for the next valid frame pair
    Capturing,
    /// Base is turning to the next heading
    Rotating,
    /// Holding still after a rotation
    Stabilizing,
    /// Sweep finished (fully or partially)
    Done,
}

impl std::fmt::Display for CaptureState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            CaptureState::Idle => "idle",
            CaptureState::Capturing => "capturing",
            CaptureState::Rotating => "rotating",
            CaptureState::Stabilizing => "stabilizing",
            CaptureState::Done => "done",
        };
        f.write_str(name)
    }
}

/// What the active session was started for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionMode {
    /// One capture, no motion
    #[default]
    Single,
    /// Full rotation sweep
    Sweep,
}

/// Counters of the (at most one) active session
///
/// `panorama_index` survives across sessions; everything else is reset when
/// a sweep completes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PanoramaSession {
    pub state: CaptureState,
    pub mode: SessionMode,
    pub panorama_index: u32,
    pub image_index: u32,
    pub rotations_completed: u32,
    pub max_rotations: u32,
    /// Captures taken since the trigger
    pub captures: u32,
    /// A link failure cut the sweep short
    pub partial: bool,
}

impl PanoramaSession {
    /// Key for the next capture
    pub fn sequence_key(&self) -> SequenceKey {
        SequenceKey {
            panorama_index: self.panorama_index,
            image_index: self.image_index,
        }
    }

    pub fn is_active(&self) -> bool {
        self.state != CaptureState::Idle
    }

    pub fn rotations_remaining(&self) -> bool {
        self.rotations_completed < self.max_rotations
    }

    /// Arm a new session; `image_index` is left as is
    pub(super) fn begin(&mut self, mode: SessionMode, max_rotations: u32) {
        self.mode = mode;
        self.max_rotations = max_rotations;
        self.rotations_completed = 0;
        self.captures = 0;
        self.partial = false;
    }

    /// Close a sweep and advance to the next panorama
    pub(super) fn complete(&mut self) -> SweepReport {
        let report = SweepReport {
            panorama_index: self.panorama_index,
            captures: self.captures,
            rotations: self.rotations_completed,
            partial: self.partial,
        };
        self.panorama_index += 1;
        self.rotations_completed = 0;
        self.image_index = 0;
        report
    }
}

/// Outcome of a finished session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    pub panorama_index: u32,
    pub captures: u32,
    pub rotations: u32,
    pub partial: bool,
}
