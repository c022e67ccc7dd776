//! One owner for all client-side pet state.
//!
//! The [`Engine`] is what a view holds. It applies each snapshot to the
//! extrapolator, detector and notifier in one call so they always agree on
//! which snapshot they saw, and it answers every entry point with the
//! [`Effect`]s the runtime has to carry out. It keeps no timers and does no
//! I/O of its own.

use core::time::Duration;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::detector::TransitionDetector;
use crate::extrapolator::{Extrapolator, LocalPredictedState};
use crate::notifier::NarrativeNotifier;
use crate::sequencer::{HatchSequencer, SequenceTiming, TransitionPhase};
use crate::snapshot::{DiaryEntry, EntitySnapshot, HatchRules, ObservedStatus};

/// Where the view layer should go next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Route {
    /// Claim a (new) egg.
    Claim,
    /// Name the freshly hatched creature.
    Naming,
}

/// Side effects the runtime must perform, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    ShowTerminalFailure { pet_id: u64 },
    StartHatchTimer { duration: Duration },
    FetchEntries { pet_id: u64 },
    PublishUnread(Vec<DiaryEntry>),
    Navigate(Route),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnswerRequest {
    pub pet_id: u64,
    pub question_index: usize,
    pub answer_index: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameRequest {
    pub pet_id: u64,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AckRequest {
    pub pet_id: u64,
    pub last_seen_id: u64,
}

/// A user-initiated call that was refused locally. Nothing was changed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("no snapshot received yet")]
    NoSnapshot,

    #[error("engine has been torn down")]
    TornDown,

    #[error("pet {pet_id} is dead; incubation is over")]
    EntityDead { pet_id: u64 },

    #[error("pet is not incubating (observed {status:?})")]
    NotIncubating { status: ObservedStatus },

    #[error("question {question_index} was already answered")]
    AlreadyAnswered { question_index: usize },

    #[error("question {question_index} is out of order; next is {expected}")]
    OutOfOrder {
        question_index: usize,
        expected: usize,
    },

    #[error("all {max} questions are answered")]
    AllQuestionsAnswered { max: usize },

    #[error("already answered a question this session")]
    AnsweredThisSession,

    #[error("an answer is already being submitted")]
    AnswerInFlight,

    #[error("no unread entries to view")]
    NothingToView,

    #[error("viewer is already open")]
    ViewerAlreadyOpen,

    #[error("restart is only available for a dead egg")]
    NotDead,

    #[error("only a freshly hatched pet can be named (observed {status:?})")]
    NotHatched { status: ObservedStatus },

    #[error("name must not be empty")]
    EmptyName,

    #[error("a name is already being submitted")]
    NameInFlight,
}

/// Per-process session state, owned by the engine instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SessionFlags {
    /// Allow at most one answered question per session.
    pub one_answer_per_session: bool,
    pub answered_this_session: bool,
}

#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    pub rules: HatchRules,
    pub timing: SequenceTiming,
}

/// Read-only state for the view layer.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EngineView {
    pub pet_id: Option<u64>,
    pub pet_name: Option<String>,
    pub status: Option<ObservedStatus>,
    pub predicted: LocalPredictedState,
    pub target_seconds: u64,
    pub percent: u8,
    pub heating: bool,
    pub phase: TransitionPhase,
    pub answered: usize,
    pub max_questions: usize,
    pub unread: Vec<DiaryEntry>,
    pub viewer_open: bool,
    pub terminal: bool,
    pub route: Option<Route>,
}

#[derive(Debug, Clone)]
pub struct Engine {
    rules: HatchRules,
    session: SessionFlags,
    snapshot: Option<EntitySnapshot>,

    extrapolator: Extrapolator,
    detector: TransitionDetector,
    notifier: NarrativeNotifier,
    sequencer: HatchSequencer,

    answer_in_flight: bool,
    name_in_flight: bool,
    terminal: bool,
    missing_reported: bool,
    route: Option<Route>,
    torn_down: bool,
}

impl Engine {
    pub fn new(config: EngineConfig, session: SessionFlags) -> Self {
        Self {
            rules: config.rules,
            session,
            snapshot: None,
            extrapolator: Extrapolator::new(config.rules.target_seconds),
            detector: TransitionDetector::new(),
            notifier: NarrativeNotifier::default(),
            sequencer: HatchSequencer::new(config.timing),
            answer_in_flight: false,
            name_in_flight: false,
            terminal: false,
            missing_reported: false,
            route: None,
            torn_down: false,
        }
    }

    pub fn snapshot(&self) -> Option<&EntitySnapshot> {
        self.snapshot.as_ref()
    }

    pub fn rules(&self) -> HatchRules {
        self.rules
    }

    pub fn session(&self) -> SessionFlags {
        self.session
    }

    pub fn phase(&self) -> TransitionPhase {
        self.sequencer.phase()
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    /// Applies a fresh snapshot as one unit.
    pub fn apply_snapshot(&mut self, snapshot: EntitySnapshot) -> Vec<Effect> {
        if self.torn_down {
            return Vec::new();
        }

        let status = ObservedStatus::classify(&snapshot);
        let pet_id = snapshot.id;
        self.extrapolator.resync(&snapshot);
        self.notifier.observe_mark(snapshot.last_acknowledged());
        self.snapshot = Some(snapshot);
        self.missing_reported = false;

        let mut effects = Vec::new();
        let mut wants_check = status.is_living() && status != ObservedStatus::Traveling;

        if let Some(t) = self.detector.observe(status) {
            if t.from == Some(ObservedStatus::Dead) {
                self.terminal = false;
            }
            if t.enters(ObservedStatus::Dead) {
                self.terminal = true;
                effects.push(Effect::ShowTerminalFailure { pet_id });
            }
            if t.enters(ObservedStatus::Hatched) && self.sequencer.trigger() {
                if let Some(duration) = self.sequencer.begin() {
                    effects.push(Effect::StartHatchTimer { duration });
                }
            }
            if t.leaves_travel() || (t.is_initial() && status.is_living()) {
                wants_check = true;
            }
        }

        if wants_check && self.notifier.begin_check() {
            effects.push(Effect::FetchEntries { pet_id });
        }
        effects
    }

    /// The backend has no pet for this user.
    pub fn missing_entity(&mut self) -> Vec<Effect> {
        if self.torn_down || self.missing_reported {
            return Vec::new();
        }
        self.missing_reported = true;
        self.route = Some(Route::Claim);
        vec![Effect::Navigate(Route::Claim)]
    }

    /// A claim request failed. The next missing-entity report routes to
    /// claim again.
    pub fn claim_failed(&mut self) {
        self.missing_reported = false;
    }

    /// One local extrapolation step.
    pub fn tick(&mut self) -> bool {
        if self.torn_down {
            return false;
        }
        self.extrapolator.tick()
    }

    pub fn next_question_index(&self) -> Option<usize> {
        let answered = self.snapshot.as_ref()?.answered_count();
        (answered < self.rules.max_questions).then_some(answered)
    }

    /// Validates an answer against the last snapshot and claims the single
    /// submission slot.
    pub fn submit_answer(
        &mut self,
        question_index: usize,
        answer_index: u32,
    ) -> Result<AnswerRequest, Rejection> {
        if self.torn_down {
            return Err(Rejection::TornDown);
        }
        let snap = self.snapshot.as_ref().ok_or(Rejection::NoSnapshot)?;
        let status = ObservedStatus::classify(snap);
        if status == ObservedStatus::Dead {
            return Err(Rejection::EntityDead { pet_id: snap.id });
        }
        if !status.accepts_incubation() {
            return Err(Rejection::NotIncubating { status });
        }
        if snap.is_answered(question_index) {
            return Err(Rejection::AlreadyAnswered { question_index });
        }
        let max = self.rules.max_questions;
        if question_index >= max || snap.answered_count() >= max {
            return Err(Rejection::AllQuestionsAnswered { max });
        }
        let expected = snap.answered_count();
        if question_index != expected {
            return Err(Rejection::OutOfOrder {
                question_index,
                expected,
            });
        }
        if self.session.one_answer_per_session && self.session.answered_this_session {
            return Err(Rejection::AnsweredThisSession);
        }
        if self.answer_in_flight {
            return Err(Rejection::AnswerInFlight);
        }

        self.answer_in_flight = true;
        Ok(AnswerRequest {
            pet_id: snap.id,
            question_index,
            answer_index,
        })
    }

    /// The backend accepted the answer and returned the updated pet.
    pub fn answer_succeeded(&mut self, snapshot: EntitySnapshot) -> Vec<Effect> {
        self.answer_in_flight = false;
        if self.torn_down {
            return Vec::new();
        }
        self.session.answered_this_session = true;
        self.apply_snapshot(snapshot)
    }

    pub fn answer_failed(&mut self) {
        self.answer_in_flight = false;
    }

    /// Validates a name for the hatched pet and claims the naming slot.
    pub fn submit_name(&mut self, name: &str) -> Result<NameRequest, Rejection> {
        if self.torn_down {
            return Err(Rejection::TornDown);
        }
        let snap = self.snapshot.as_ref().ok_or(Rejection::NoSnapshot)?;
        let status = ObservedStatus::classify(snap);
        if status != ObservedStatus::Hatched {
            return Err(Rejection::NotHatched { status });
        }
        let name = name.trim();
        if name.is_empty() {
            return Err(Rejection::EmptyName);
        }
        if self.name_in_flight {
            return Err(Rejection::NameInFlight);
        }

        self.name_in_flight = true;
        Ok(NameRequest {
            pet_id: snap.id,
            name: name.to_string(),
        })
    }

    pub fn name_succeeded(&mut self, snapshot: EntitySnapshot) -> Vec<Effect> {
        self.name_in_flight = false;
        self.apply_snapshot(snapshot)
    }

    pub fn name_failed(&mut self) {
        self.name_in_flight = false;
    }

    pub fn entries_fetched(&mut self, entries: &[DiaryEntry]) -> Vec<Effect> {
        if self.torn_down {
            return Vec::new();
        }
        match self.notifier.finish_check(entries) {
            Some(unread) => vec![Effect::PublishUnread(unread)],
            None => Vec::new(),
        }
    }

    pub fn entries_failed(&mut self) {
        self.notifier.check_failed();
    }

    pub fn open_viewer(&mut self) -> Result<Vec<DiaryEntry>, Rejection> {
        if self.torn_down {
            return Err(Rejection::TornDown);
        }
        if self.notifier.viewer_open() {
            return Err(Rejection::ViewerAlreadyOpen);
        }
        self.notifier
            .open_viewer()
            .map(<[DiaryEntry]>::to_vec)
            .ok_or(Rejection::NothingToView)
    }

    /// Hides the unread prompt without acknowledging anything.
    pub fn dismiss_prompt(&mut self) -> bool {
        !self.torn_down && self.notifier.dismiss()
    }

    /// Closes the viewer. Returns the acknowledgment to send, if any.
    pub fn close_viewer(&mut self) -> Option<AckRequest> {
        if self.torn_down {
            return None;
        }
        let last_seen_id = self.notifier.close_viewer()?;
        let pet_id = self.snapshot.as_ref()?.id;
        Some(AckRequest {
            pet_id,
            last_seen_id,
        })
    }

    pub fn ack_succeeded(&mut self, last_seen_id: u64) {
        self.notifier.ack_succeeded(last_seen_id);
    }

    pub fn ack_failed(&mut self) {
        self.notifier.ack_failed();
    }

    /// The hand-off timer fired.
    ///
    /// The phase reaches `Done` before navigation is handed out, so a failing
    /// navigation cannot leave the sequencer in progress.
    pub fn hatch_timer_elapsed(&mut self) -> Vec<Effect> {
        if self.torn_down || !self.sequencer.finish() {
            return Vec::new();
        }
        self.route = Some(Route::Naming);
        vec![Effect::Navigate(Route::Naming)]
    }

    /// Leaves a dead egg for a fresh claim.
    pub fn restart(&mut self) -> Result<Vec<Effect>, Rejection> {
        if self.torn_down {
            return Err(Rejection::TornDown);
        }
        if !self.terminal {
            return Err(Rejection::NotDead);
        }
        self.route = Some(Route::Claim);
        Ok(vec![Effect::Navigate(Route::Claim)])
    }

    /// Releases the engine. Every later entry point is a no-op.
    pub fn teardown(&mut self) {
        self.torn_down = true;
        self.sequencer.cancel();
    }

    pub fn view(&self) -> EngineView {
        EngineView {
            pet_id: self.snapshot.as_ref().map(|s| s.id),
            pet_name: self.snapshot.as_ref().map(|s| s.name.clone()),
            status: self.detector.last_seen(),
            predicted: self.extrapolator.state(),
            target_seconds: self.extrapolator.target(),
            percent: self.extrapolator.percent(),
            heating: self.extrapolator.is_heating(),
            phase: self.sequencer.phase(),
            answered: self
                .snapshot
                .as_ref()
                .map_or(0, EntitySnapshot::answered_count),
            max_questions: self.rules.max_questions,
            unread: self.notifier.pending().to_vec(),
            viewer_open: self.notifier.viewer_open(),
            terminal: self.terminal,
            route: self.route,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::PetStatus;

    fn engine() -> Engine {
        let config = EngineConfig {
            rules: HatchRules {
                target_seconds: 90,
                ..HatchRules::default()
            },
            ..EngineConfig::default()
        };
        Engine::new(config, SessionFlags::default())
    }

    fn pet(status: PetStatus, progress: i64, buffer: i64) -> EntitySnapshot {
        EntitySnapshot {
            id: 11,
            name: "Pet Egg".to_string(),
            status,
            hatch_progress_seconds: progress,
            heat_buffer_seconds: buffer,
            hatch_answers: Some(vec![]),
            ..EntitySnapshot::default()
        }
    }

    fn entry(id: u64) -> DiaryEntry {
        DiaryEntry {
            id,
            ..DiaryEntry::default()
        }
    }

    fn count_hatch_timers(effects: &[Effect]) -> usize {
        effects
            .iter()
            .filter(|e| matches!(e, Effect::StartHatchTimer { .. }))
            .count()
    }

    #[test]
    fn hatch_fires_once_on_third_poll() {
        let mut e = engine();
        let polls = [
            pet(PetStatus::EggHatching, 85, 0),
            pet(PetStatus::EggHatching, 85, 0),
            pet(PetStatus::EggHatched, 90, 0),
            pet(PetStatus::EggHatched, 90, 0),
        ];
        let fired: Vec<usize> = polls
            .into_iter()
            .map(|p| count_hatch_timers(&e.apply_snapshot(p)))
            .collect();
        assert_eq!(fired, vec![0, 0, 1, 0]);
        assert_eq!(e.phase(), TransitionPhase::InProgress);

        assert_eq!(
            e.hatch_timer_elapsed(),
            vec![Effect::Navigate(Route::Naming)]
        );
        assert!(e.hatch_timer_elapsed().is_empty());
        assert_eq!(e.phase(), TransitionPhase::Done);
        assert_eq!(e.view().route, Some(Route::Naming));
    }

    #[test]
    fn hatched_on_first_load_still_arms() {
        let mut e = engine();
        let effects = e.apply_snapshot(pet(PetStatus::EggHatched, 90, 0));
        assert_eq!(count_hatch_timers(&effects), 1);
    }

    #[test]
    fn ticks_extrapolate_until_next_poll() {
        let mut e = engine();
        e.apply_snapshot(pet(PetStatus::EggHatching, 80, 5));
        for _ in 0..6 {
            e.tick();
        }
        let v = e.view();
        assert_eq!(v.predicted.progress, 85);
        assert_eq!(v.predicted.buffer, 0);

        e.apply_snapshot(pet(PetStatus::EggHatching, 83, 10));
        assert_eq!(e.view().predicted.progress, 83);
        assert_eq!(e.view().predicted.buffer, 10);
    }

    #[test]
    fn already_answered_question_is_rejected_without_side_effects() {
        let mut e = engine();
        let mut snap = pet(PetStatus::EggHatching, 40, 12);
        snap.hatch_answers = Some(vec![1, 0]);
        e.apply_snapshot(snap);
        let before = e.view();

        assert_eq!(
            e.submit_answer(1, 2),
            Err(Rejection::AlreadyAnswered { question_index: 1 })
        );
        assert_eq!(e.view(), before);

        // The rejection did not claim the submission slot.
        let req = e.submit_answer(2, 0).unwrap();
        assert_eq!(req.question_index, 2);
        assert_eq!(e.submit_answer(2, 0), Err(Rejection::AnswerInFlight));
    }

    #[test]
    fn answers_past_the_last_question_are_rejected() {
        let mut e = engine();
        let mut snap = pet(PetStatus::EggHatching, 40, 0);
        snap.hatch_answers = Some(vec![0; 6]);
        e.apply_snapshot(snap);
        assert_eq!(
            e.submit_answer(6, 0),
            Err(Rejection::AllQuestionsAnswered { max: 6 })
        );
        assert_eq!(e.next_question_index(), None);
    }

    #[test]
    fn out_of_order_answer_is_rejected() {
        let mut e = engine();
        e.apply_snapshot(pet(PetStatus::EggClaimed, 0, 0));
        assert_eq!(
            e.submit_answer(3, 0),
            Err(Rejection::OutOfOrder {
                question_index: 3,
                expected: 0
            })
        );
    }

    #[test]
    fn session_flag_limits_answers_when_enabled() {
        let session = SessionFlags {
            one_answer_per_session: true,
            answered_this_session: false,
        };
        let mut e = Engine::new(EngineConfig::default(), session);
        e.apply_snapshot(pet(PetStatus::EggClaimed, 0, 0));

        let req = e.submit_answer(0, 1).unwrap();
        let mut after = pet(PetStatus::EggHatching, 0, 30);
        after.hatch_answers = Some(vec![req.answer_index]);
        e.answer_succeeded(after);

        assert!(e.session().answered_this_session);
        assert_eq!(e.submit_answer(1, 0), Err(Rejection::AnsweredThisSession));
    }

    #[test]
    fn dead_egg_shows_failure_once_and_refuses_answers() {
        let mut e = engine();
        e.apply_snapshot(pet(PetStatus::EggFrozen, 30, 0));
        let effects = e.apply_snapshot(pet(PetStatus::EggDead, 30, 0));
        assert_eq!(effects, vec![Effect::ShowTerminalFailure { pet_id: 11 }]);
        assert!(e.apply_snapshot(pet(PetStatus::EggDead, 30, 0)).is_empty());
        assert!(e.view().terminal);

        assert_eq!(
            e.submit_answer(0, 0),
            Err(Rejection::EntityDead { pet_id: 11 })
        );
        assert_eq!(e.restart(), Ok(vec![Effect::Navigate(Route::Claim)]));
    }

    #[test]
    fn restart_requires_dead_egg() {
        let mut e = engine();
        e.apply_snapshot(pet(PetStatus::EggHatching, 1, 1));
        assert_eq!(e.restart(), Err(Rejection::NotDead));
    }

    #[test]
    fn return_from_travel_checks_diaries() {
        let mut e = engine();
        let first = e.apply_snapshot(pet(PetStatus::Traveling, 90, 0));
        assert!(first.contains(&Effect::FetchEntries { pet_id: 11 }));
        e.entries_fetched(&[]);

        // Still traveling: no periodic check.
        assert!(e.apply_snapshot(pet(PetStatus::Traveling, 90, 0)).is_empty());

        let back = e.apply_snapshot(pet(PetStatus::Sleeping, 90, 0));
        assert_eq!(back, vec![Effect::FetchEntries { pet_id: 11 }]);
    }

    #[test]
    fn open_viewer_suppresses_republishing() {
        let mut e = engine();
        e.apply_snapshot(pet(PetStatus::Sleeping, 90, 0));
        let published = e.entries_fetched(&[entry(1), entry(2)]);
        assert_eq!(published, vec![Effect::PublishUnread(vec![entry(1), entry(2)])]);

        e.open_viewer().unwrap();
        for _ in 0..3 {
            let effects = e.apply_snapshot(pet(PetStatus::Eating, 90, 0));
            assert!(!effects.iter().any(|x| matches!(
                x,
                Effect::FetchEntries { .. } | Effect::PublishUnread(_)
            )));
        }
        assert_eq!(e.open_viewer(), Err(Rejection::ViewerAlreadyOpen));
    }

    #[test]
    fn acknowledgment_outcomes() {
        let mut e = engine();
        e.apply_snapshot(pet(PetStatus::Sleeping, 90, 0));
        e.entries_fetched(&[entry(3), entry(5)]);
        e.open_viewer().unwrap();
        let ack = e.close_viewer().unwrap();
        assert_eq!(
            ack,
            AckRequest {
                pet_id: 11,
                last_seen_id: 5
            }
        );

        // Failure: mark unchanged, same set comes back on the next check.
        e.ack_failed();
        let effects = e.apply_snapshot(pet(PetStatus::Sleeping, 90, 0));
        assert_eq!(effects, vec![Effect::FetchEntries { pet_id: 11 }]);
        let again = e.entries_fetched(&[entry(3), entry(5)]);
        assert_eq!(again, vec![Effect::PublishUnread(vec![entry(3), entry(5)])]);

        // Success: unread set empties.
        e.open_viewer().unwrap();
        let ack = e.close_viewer().unwrap();
        e.ack_succeeded(ack.last_seen_id);
        assert!(e.view().unread.is_empty());
        e.apply_snapshot(pet(PetStatus::Sleeping, 90, 0));
        assert!(e.entries_fetched(&[entry(3), entry(5)]).is_empty());
    }

    #[test]
    fn no_viewer_without_unread() {
        let mut e = engine();
        e.apply_snapshot(pet(PetStatus::Sleeping, 90, 0));
        assert_eq!(e.open_viewer(), Err(Rejection::NothingToView));
        assert!(e.close_viewer().is_none());
    }

    #[test]
    fn teardown_silences_everything() {
        let mut e = engine();
        e.apply_snapshot(pet(PetStatus::EggHatched, 90, 0));
        e.teardown();

        assert!(e.hatch_timer_elapsed().is_empty());
        assert!(e.apply_snapshot(pet(PetStatus::Sleeping, 90, 0)).is_empty());
        assert!(e.entries_fetched(&[entry(1)]).is_empty());
        assert!(e.missing_entity().is_empty());
        assert!(!e.tick());
        assert_eq!(e.submit_answer(0, 0), Err(Rejection::TornDown));
        assert_eq!(e.view().route, None);
    }

    #[test]
    fn missing_pet_routes_to_claim_once() {
        let mut e = engine();
        assert_eq!(e.missing_entity(), vec![Effect::Navigate(Route::Claim)]);
        assert!(e.missing_entity().is_empty());

        // A failed claim lets the next report route again.
        e.claim_failed();
        assert_eq!(e.missing_entity(), vec![Effect::Navigate(Route::Claim)]);
    }

    #[test]
    fn reclaimed_egg_clears_terminal_state() {
        let mut e = engine();
        e.apply_snapshot(pet(PetStatus::EggDead, 30, 0));
        assert!(e.view().terminal);
        e.restart().unwrap();

        e.apply_snapshot(pet(PetStatus::EggClaimed, 0, 0));
        let v = e.view();
        assert!(!v.terminal);
        assert_eq!(v.status, Some(ObservedStatus::Waiting));
        assert_eq!(e.submit_answer(0, 1).map(|r| r.question_index), Ok(0));
    }

    #[test]
    fn naming_requires_hatched_pet() {
        let mut e = engine();
        e.apply_snapshot(pet(PetStatus::EggHatching, 40, 3));
        assert_eq!(
            e.submit_name("Mochi"),
            Err(Rejection::NotHatched {
                status: ObservedStatus::Incubating
            })
        );

        e.apply_snapshot(pet(PetStatus::EggHatched, 90, 0));
        assert_eq!(e.submit_name("   "), Err(Rejection::EmptyName));
        let req = e.submit_name("  Mochi ").unwrap();
        assert_eq!(req.name, "Mochi");
        assert_eq!(e.submit_name("Mochi"), Err(Rejection::NameInFlight));

        let mut named = pet(PetStatus::Traveling, 90, 0);
        named.name = req.name;
        e.name_succeeded(named);
        let v = e.view();
        assert_eq!(v.pet_name.as_deref(), Some("Mochi"));
        assert_eq!(v.status, Some(ObservedStatus::Traveling));
        assert_eq!(
            e.submit_name("Again"),
            Err(Rejection::NotHatched {
                status: ObservedStatus::Traveling
            })
        );
    }
}
