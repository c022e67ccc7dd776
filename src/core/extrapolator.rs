//! Local countdown between polls.
//!
//! The backend only recomputes hatch progress when asked, and the client asks
//! every few seconds. In between, each local tick moves one second of heat
//! from the buffer into progress so the countdown reads smoothly. Every poll
//! overwrites the prediction outright; nothing carries across polls.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::snapshot::EntitySnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LocalPredictedState {
    /// Seconds of heat already turned into hatch progress, `0..=target`.
    pub progress: u64,
    /// Seconds of heat left to consume.
    pub buffer: u64,
}

#[derive(Debug, Clone)]
pub struct Extrapolator {
    target: u64,
    state: LocalPredictedState,
}

impl Extrapolator {
    pub fn new(target: u64) -> Self {
        Self {
            target,
            state: LocalPredictedState::default(),
        }
    }

    pub fn target(&self) -> u64 {
        self.target
    }

    pub fn state(&self) -> LocalPredictedState {
        self.state
    }

    /// Hard resync from a fresh snapshot.
    ///
    /// Outside the incubating family the counters carry no meaning, so the
    /// buffer is zeroed and ticks become no-ops.
    pub fn resync(&mut self, snapshot: &EntitySnapshot) {
        let progress = snapshot.hatch_progress_seconds.max(0) as u64;
        let buffer = if snapshot.status.is_incubating_family() {
            snapshot.heat_buffer_seconds.max(0) as u64
        } else {
            0
        };
        self.state = LocalPredictedState {
            progress: progress.min(self.target),
            buffer,
        };
    }

    /// Advances the prediction by one second. Returns `false` when the tick
    /// would leave the bounds and nothing changed.
    pub fn tick(&mut self) -> bool {
        if self.state.buffer == 0 || self.state.progress >= self.target {
            return false;
        }
        self.state.buffer -= 1;
        self.state.progress += 1;
        true
    }

    pub fn is_heating(&self) -> bool {
        self.state.buffer > 0
    }

    pub fn remaining_seconds(&self) -> u64 {
        self.target.saturating_sub(self.state.progress)
    }

    /// Progress as a whole percentage, rounded down.
    pub fn percent(&self) -> u8 {
        if self.target == 0 {
            return 100;
        }
        ((self.state.progress * 100) / self.target).min(100) as u8
    }
}
