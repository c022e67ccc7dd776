//! Timed egg → creature hand-off.
//!
//! `Idle → Triggered → InProgress → Done`, one way. The sequencer never reads
//! a clock: the runtime starts a timer for [`HatchSequencer::begin`]'s
//! duration and calls [`HatchSequencer::finish`] when it fires. Sub-phases are
//! presentation only and derived from elapsed time on demand.

use core::time::Duration;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum TransitionPhase {
    #[default]
    Idle,
    Triggered,
    InProgress,
    Done,
}

/// What the view should be drawing at a point in the hand-off.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HatchVisual {
    /// Egg shakes and brightens.
    Shaking,
    /// White overlay fading in; `overlay` runs 0.0 → 1.0.
    WhiteOut { overlay: f32 },
    /// Fully covered, waiting for navigation.
    Covered,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SequenceTiming {
    pub total: Duration,
    pub fade_start: Duration,
    pub fade_len: Duration,
}

impl Default for SequenceTiming {
    fn default() -> Self {
        Self {
            total: Duration::from_millis(6500),
            fade_start: Duration::from_millis(2000),
            fade_len: Duration::from_millis(1000),
        }
    }
}

impl SequenceTiming {
    pub fn visual_at(&self, elapsed: Duration) -> HatchVisual {
        if elapsed < self.fade_start {
            return HatchVisual::Shaking;
        }
        let into_fade = elapsed - self.fade_start;
        if into_fade < self.fade_len {
            let overlay = into_fade.as_secs_f32() / self.fade_len.as_secs_f32();
            HatchVisual::WhiteOut { overlay }
        } else {
            HatchVisual::Covered
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct HatchSequencer {
    phase: TransitionPhase,
    timing: SequenceTiming,
}

impl HatchSequencer {
    pub fn new(timing: SequenceTiming) -> Self {
        Self {
            phase: TransitionPhase::Idle,
            timing,
        }
    }

    pub fn phase(&self) -> TransitionPhase {
        self.phase
    }

    pub fn timing(&self) -> &SequenceTiming {
        &self.timing
    }

    /// Arms the hand-off. Ignored unless idle.
    pub fn trigger(&mut self) -> bool {
        if self.phase != TransitionPhase::Idle {
            return false;
        }
        self.phase = TransitionPhase::Triggered;
        true
    }

    /// Starts the timed portion and returns how long the runtime should wait.
    pub fn begin(&mut self) -> Option<Duration> {
        if self.phase != TransitionPhase::Triggered {
            return None;
        }
        self.phase = TransitionPhase::InProgress;
        Some(self.timing.total)
    }

    /// Completes the hand-off. Returns `true` exactly once.
    pub fn finish(&mut self) -> bool {
        if self.phase != TransitionPhase::InProgress {
            return false;
        }
        self.phase = TransitionPhase::Done;
        true
    }

    /// Abandons an unfinished hand-off. `Done` is kept.
    pub fn cancel(&mut self) -> bool {
        match self.phase {
            TransitionPhase::Triggered | TransitionPhase::InProgress => {
                self.phase = TransitionPhase::Idle;
                true
            }
            TransitionPhase::Idle | TransitionPhase::Done => false,
        }
    }
}
