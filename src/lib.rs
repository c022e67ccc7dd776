//! # linkpet
//!
//! Client-side reconciliation core for a companion-creature app.
//!
//! The backend owns the pet. This crate watches it: it mirrors each polled
//! snapshot, extrapolates the hatch countdown between polls, detects status
//! transitions exactly once, tracks unread diary entries against a
//! high-water mark, and sequences the egg → creature hand-off.
//!
//! Nothing here performs I/O or reads a clock. Every entry point takes its
//! inputs as arguments and returns the [`engine::Effect`]s the caller must
//! carry out, so a runtime (see the `linkpetd` crate) can drive it from timers
//! and network responses while tests drive it by hand.
//!
//! ## Quick Start
//!
//! ```
//! use linkpet::prelude::*;
//!
//! let mut engine = Engine::new(EngineConfig::default(), SessionFlags::default());
//! let snap = EntitySnapshot {
//!     id: 7,
//!     status: PetStatus::EggHatching,
//!     hatch_progress_seconds: 80,
//!     heat_buffer_seconds: 5,
//!     ..EntitySnapshot::default()
//! };
//! let _effects = engine.apply_snapshot(snap);
//! engine.tick();
//! assert_eq!(engine.view().predicted.progress, 81);
//! ```
//!
//! ## Feature Flags
//!
//! - `serde` (default): derive `Serialize`/`Deserialize` for the wire types
//!
//! ## Modules
//!
//! - [`snapshot`]: server-owned entity and diary types
//! - [`extrapolator`]: local countdown between polls
//! - [`detector`]: status transition detection
//! - [`notifier`]: unread diary tracking
//! - [`sequencer`]: timed hatch hand-off
//! - [`engine`]: composition of the above behind one owner

#[path = "core/snapshot.rs"]
pub mod snapshot;

#[path = "core/extrapolator.rs"]
pub mod extrapolator;

#[path = "core/detector.rs"]
pub mod detector;

#[path = "core/notifier.rs"]
pub mod notifier;

#[path = "core/sequencer.rs"]
pub mod sequencer;

#[path = "core/engine.rs"]
pub mod engine;

#[path = "core/prng.rs"]
pub mod prng;

/// Prelude module for convenient imports.
///
/// ```
/// use linkpet::prelude::*;
/// ```
pub mod prelude {
    pub use crate::detector::{ObservedTransition, TransitionDetector};
    pub use crate::engine::{
        AckRequest, AnswerRequest, Effect, Engine, EngineConfig, EngineView, NameRequest, Rejection,
        Route, SessionFlags,
    };
    pub use crate::extrapolator::{Extrapolator, LocalPredictedState};
    pub use crate::notifier::NarrativeNotifier;
    pub use crate::sequencer::{HatchSequencer, HatchVisual, TransitionPhase};
    pub use crate::snapshot::{DiaryEntry, EntitySnapshot, HatchRules, ObservedStatus, PetStatus};
}
