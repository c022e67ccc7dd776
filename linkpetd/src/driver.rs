//! Async runtime around the [`Engine`].
//!
//! One task owns the engine and multiplexes everything that can happen to it
//! in a single `select!` loop: the poll cadence, the local tick, the hatch
//! timer, each kind of in-flight request, and commands from handles. Every
//! handler runs to completion before the next event is looked at, so the
//! engine needs no locking.
//!
//! Each request kind has one slot. An occupied slot is the in-flight guard;
//! dropping the slot cancels the request. Teardown empties every slot, so no
//! late response or timer can reach a torn-down engine.
//!
//! Polls are numbered. When a write (answer, claim, name) returns a fresh
//! snapshot, every poll started before it is stale and its result is dropped,
//! so an older read can never roll the engine back.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use linkpet::engine::{Effect, Engine, EngineView, Rejection, Route};
use linkpet::snapshot::{DiaryEntry, EntitySnapshot};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, Interval, Sleep};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::backend::{Backend, BackendError};
use crate::backoff::PollBackoff;
use crate::surface::{NavigationOutcome, Surface};

type Pending<T> = Pin<Box<dyn Future<Output = T> + Send>>;
type Reply<T> = oneshot::Sender<Result<T, DriverError>>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DriverError {
    #[error(transparent)]
    Rejected(#[from] Rejection),

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error("driver has stopped")]
    Stopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriverConfig {
    pub poll_interval: Duration,
    /// Each tick advances the prediction by one second.
    pub tick: Duration,
    pub max_backoff: Duration,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
            tick: Duration::from_secs(1),
            max_backoff: Duration::from_secs(60),
        }
    }
}

enum Command {
    StartPolling(oneshot::Sender<()>),
    StopPolling(oneshot::Sender<()>),
    SubmitAnswer {
        question_index: Option<usize>,
        answer_index: u32,
        reply: Reply<EngineView>,
    },
    OpenViewer(Reply<Vec<DiaryEntry>>),
    DismissPrompt(oneshot::Sender<bool>),
    CloseViewer(Reply<Option<u64>>),
    Restart(Reply<EngineView>),
    NamePet {
        name: String,
        reply: Reply<EngineView>,
    },
}

/// Cheap, cloneable access to a running driver.
#[derive(Clone)]
pub struct DriverHandle {
    commands: mpsc::Sender<Command>,
    view: watch::Receiver<EngineView>,
    cancel: CancellationToken,
}

impl DriverHandle {
    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T, DriverError> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(make(tx))
            .await
            .map_err(|_| DriverError::Stopped)?;
        rx.await.map_err(|_| DriverError::Stopped)
    }

    pub async fn start_polling(&self) -> Result<(), DriverError> {
        self.request(Command::StartPolling).await
    }

    pub async fn stop_polling(&self) -> Result<(), DriverError> {
        self.request(Command::StopPolling).await
    }

    /// Submits one hatching answer. `None` answers the next open question.
    ///
    /// Resolves once the backend has responded, with the view after the
    /// updated snapshot was applied.
    pub async fn submit_answer(
        &self,
        question_index: Option<usize>,
        answer_index: u32,
    ) -> Result<EngineView, DriverError> {
        self.request(|reply| Command::SubmitAnswer {
            question_index,
            answer_index,
            reply,
        })
        .await?
    }

    pub async fn open_viewer(&self) -> Result<Vec<DiaryEntry>, DriverError> {
        self.request(Command::OpenViewer).await?
    }

    pub async fn dismiss_prompt(&self) -> Result<bool, DriverError> {
        self.request(Command::DismissPrompt).await
    }

    /// Closes the viewer and waits for the acknowledgment, if one was needed.
    /// Returns the acknowledged id.
    pub async fn close_viewer(&self) -> Result<Option<u64>, DriverError> {
        self.request(Command::CloseViewer).await?
    }

    /// Leaves a dead egg. When the egg is claimed again here, resolves with
    /// the view of the new egg.
    pub async fn restart(&self) -> Result<EngineView, DriverError> {
        self.request(Command::Restart).await?
    }

    /// Names the freshly hatched pet.
    pub async fn name_pet(&self, name: impl Into<String>) -> Result<EngineView, DriverError> {
        let name = name.into();
        self.request(|reply| Command::NamePet { name, reply }).await?
    }

    pub fn view(&self) -> EngineView {
        self.view.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<EngineView> {
        self.view.clone()
    }

    pub fn is_running(&self) -> bool {
        !self.commands.is_closed()
    }

    /// Tears the driver down and waits until it has stopped.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        let mut view = self.view.clone();
        // The sender is dropped when the task exits.
        while view.changed().await.is_ok() {}
    }
}

pub fn spawn(
    config: DriverConfig,
    engine: Engine,
    backend: Arc<dyn Backend>,
    surface: Box<dyn Surface>,
) -> (DriverHandle, JoinHandle<()>) {
    let (cmd_tx, cmd_rx) = mpsc::channel(32);
    let (view_tx, view_rx) = watch::channel(engine.view());
    let cancel = CancellationToken::new();

    let driver = Driver {
        config,
        engine,
        backend,
        surface,
        backoff: PollBackoff::new(config.poll_interval, config.max_backoff, jitter_seed()),
        view_tx,
        commands: cmd_rx,
        cancel: cancel.clone(),
        polling: false,
        next_poll: None,
        ticker: None,
        poll_seq: 0,
        fresh_from: 0,
        poll: None,
        hatch: None,
        entries: None,
        ack: None,
        ack_reply: None,
        answer: None,
        answer_reply: None,
        claim: None,
        claim_reply: None,
        naming: None,
        naming_reply: None,
    };
    let task = tokio::spawn(driver.run());

    let handle = DriverHandle {
        commands: cmd_tx,
        view: view_rx,
        cancel,
    };
    (handle, task)
}

fn jitter_seed() -> u64 {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0);
    nanos ^ u64::from(std::process::id()).rotate_left(32)
}

enum Flow {
    Continue,
    Stop,
}

struct Driver {
    config: DriverConfig,
    engine: Engine,
    backend: Arc<dyn Backend>,
    surface: Box<dyn Surface>,
    backoff: PollBackoff,
    view_tx: watch::Sender<EngineView>,
    commands: mpsc::Receiver<Command>,
    cancel: CancellationToken,

    polling: bool,
    next_poll: Option<Instant>,
    ticker: Option<Interval>,

    poll_seq: u64,
    /// Polls numbered below this started before the last write landed.
    fresh_from: u64,
    poll: Option<Pending<(u64, Result<EntitySnapshot, BackendError>)>>,
    hatch: Option<Pin<Box<Sleep>>>,
    entries: Option<Pending<Result<Vec<DiaryEntry>, BackendError>>>,
    ack: Option<Pending<(u64, Result<(), BackendError>)>>,
    ack_reply: Option<Reply<Option<u64>>>,
    answer: Option<Pending<Result<EntitySnapshot, BackendError>>>,
    answer_reply: Option<Reply<EngineView>>,
    claim: Option<Pending<Result<EntitySnapshot, BackendError>>>,
    claim_reply: Option<Reply<EngineView>>,
    naming: Option<Pending<Result<EntitySnapshot, BackendError>>>,
    naming_reply: Option<Reply<EngineView>>,
}

/// Resolves with the slot's output, or never when the slot is empty.
/// The caller must clear the slot once this resolves.
async fn in_flight<F: Future + Unpin>(slot: &mut Option<F>) -> F::Output {
    match slot.as_mut() {
        Some(fut) => fut.await,
        None => std::future::pending().await,
    }
}

async fn until(deadline: Option<Instant>) {
    match deadline {
        Some(at) => time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker.as_mut() {
        Some(t) => {
            t.tick().await;
        }
        None => std::future::pending().await,
    }
}

impl Driver {
    async fn run(mut self) {
        debug!("driver started");
        loop {
            let flow = tokio::select! {
                biased;

                _ = self.cancel.cancelled() => Flow::Stop,

                cmd = self.commands.recv() => match cmd {
                    Some(cmd) => self.handle_command(cmd),
                    None => Flow::Stop,
                },

                _ = until(self.next_poll) => self.poll_due(),

                (seq, result) = in_flight(&mut self.poll) => {
                    self.poll = None;
                    self.poll_finished(seq, result)
                }

                result = in_flight(&mut self.answer) => {
                    self.answer = None;
                    self.answer_finished(result)
                }

                result = in_flight(&mut self.claim) => {
                    self.claim = None;
                    self.claim_finished(result)
                }

                result = in_flight(&mut self.naming) => {
                    self.naming = None;
                    self.naming_finished(result)
                }

                (last_seen_id, result) = in_flight(&mut self.ack) => {
                    self.ack = None;
                    self.ack_finished(last_seen_id, result);
                    Flow::Continue
                }

                result = in_flight(&mut self.entries) => {
                    self.entries = None;
                    self.entries_finished(result)
                }

                _ = in_flight(&mut self.hatch) => {
                    self.hatch = None;
                    let effects = self.engine.hatch_timer_elapsed();
                    self.run_effects(effects)
                }

                _ = next_tick(&mut self.ticker) => {
                    self.engine.tick();
                    Flow::Continue
                }
            };

            if let Flow::Stop = flow {
                break;
            }
            self.publish();
        }
        self.teardown();
    }

    fn publish(&self) {
        let view = self.engine.view();
        self.view_tx.send_if_modified(|current| {
            if *current == view {
                return false;
            }
            *current = view;
            true
        });
    }

    fn handle_command(&mut self, cmd: Command) -> Flow {
        match cmd {
            Command::StartPolling(reply) => {
                self.start_polling();
                let _ = reply.send(());
            }
            Command::StopPolling(reply) => {
                self.stop_polling();
                let _ = reply.send(());
            }
            Command::SubmitAnswer {
                question_index,
                answer_index,
                reply,
            } => self.submit_answer(question_index, answer_index, reply),
            Command::OpenViewer(reply) => {
                let _ = reply.send(self.engine.open_viewer().map_err(DriverError::from));
            }
            Command::DismissPrompt(reply) => {
                let _ = reply.send(self.engine.dismiss_prompt());
            }
            Command::CloseViewer(reply) => self.close_viewer(reply),
            Command::Restart(reply) => match self.engine.restart() {
                Ok(effects) => {
                    if let Flow::Stop = self.run_effects(effects) {
                        return Flow::Stop;
                    }
                    if self.claim.is_some() && self.claim_reply.is_none() {
                        self.claim_reply = Some(reply);
                    } else {
                        let _ = reply.send(Ok(self.engine.view()));
                    }
                }
                Err(rejection) => {
                    let _ = reply.send(Err(rejection.into()));
                }
            },
            Command::NamePet { name, reply } => self.name_pet(&name, reply),
        }
        Flow::Continue
    }

    fn start_polling(&mut self) {
        if self.polling {
            return;
        }
        info!(interval = ?self.config.poll_interval, "polling started");
        self.polling = true;
        let now = Instant::now();
        self.next_poll = Some(now);
        self.ticker = Some(time::interval_at(now + self.config.tick, self.config.tick));
    }

    fn stop_polling(&mut self) {
        if !self.polling {
            return;
        }
        info!("polling stopped");
        self.polling = false;
        self.next_poll = None;
        self.ticker = None;
        self.poll = None;
    }

    fn poll_due(&mut self) -> Flow {
        self.next_poll = Some(Instant::now() + self.config.poll_interval);
        if self.poll.is_some() {
            debug!("previous poll still in flight; skipping");
            return Flow::Continue;
        }
        self.poll_seq += 1;
        let seq = self.poll_seq;
        let backend = Arc::clone(&self.backend);
        self.poll = Some(Box::pin(async move { (seq, backend.fetch_snapshot().await) }));
        Flow::Continue
    }

    /// A write returned the backend's current pet; older reads are stale.
    fn mark_fresh(&mut self) {
        self.fresh_from = self.poll_seq + 1;
    }

    fn poll_finished(&mut self, seq: u64, result: Result<EntitySnapshot, BackendError>) -> Flow {
        let effects = match result {
            Ok(_) if seq < self.fresh_from => {
                debug!(seq, "dropping poll that predates the last write");
                self.backoff.succeeded();
                return Flow::Continue;
            }
            Ok(snapshot) => {
                debug!(pet_id = snapshot.id, status = snapshot.status.as_str(), "poll");
                self.backoff.succeeded();
                self.engine.apply_snapshot(snapshot)
            }
            Err(BackendError::NoEntity) => {
                self.backoff.succeeded();
                self.engine.missing_entity()
            }
            Err(e) => {
                let delay = self.backoff.failed();
                warn!(
                    error = %e,
                    failures = self.backoff.failures(),
                    retry_in = ?delay,
                    "poll failed; keeping last snapshot"
                );
                self.next_poll = Some(Instant::now() + delay);
                return Flow::Continue;
            }
        };
        self.run_effects(effects)
    }

    fn submit_answer(
        &mut self,
        question_index: Option<usize>,
        answer_index: u32,
        reply: Reply<EngineView>,
    ) {
        let question_index = question_index
            .or_else(|| self.engine.next_question_index())
            .unwrap_or(self.engine.rules().max_questions);

        match self.engine.submit_answer(question_index, answer_index) {
            Ok(req) => {
                debug!(question_index, answer_index, "submitting answer");
                let backend = Arc::clone(&self.backend);
                self.answer = Some(Box::pin(async move {
                    backend
                        .advance_incubation(req.pet_id, req.question_index, req.answer_index)
                        .await
                }));
                self.answer_reply = Some(reply);
            }
            Err(rejection) => {
                debug!(%rejection, "answer rejected");
                let _ = reply.send(Err(rejection.into()));
            }
        }
    }

    fn answer_finished(&mut self, result: Result<EntitySnapshot, BackendError>) -> Flow {
        let reply = self.answer_reply.take();
        match result {
            Ok(snapshot) => {
                self.mark_fresh();
                let effects = self.engine.answer_succeeded(snapshot);
                let flow = self.run_effects(effects);
                if let Some(reply) = reply {
                    let _ = reply.send(Ok(self.engine.view()));
                }
                flow
            }
            Err(e) => {
                self.engine.answer_failed();
                if e.is_rejection() {
                    warn!(error = %e, "backend refused answer");
                } else {
                    warn!(error = %e, "answer not delivered");
                }
                if let Some(reply) = reply {
                    let _ = reply.send(Err(e.into()));
                }
                Flow::Continue
            }
        }
    }

    fn start_claim(&mut self) {
        if self.claim.is_some() {
            return;
        }
        info!("claiming an egg");
        let backend = Arc::clone(&self.backend);
        self.claim = Some(Box::pin(async move { backend.claim_egg().await }));
    }

    fn claim_finished(&mut self, result: Result<EntitySnapshot, BackendError>) -> Flow {
        let reply = self.claim_reply.take();
        match result {
            Ok(snapshot) => {
                info!(pet_id = snapshot.id, status = snapshot.status.as_str(), "egg claimed");
                self.mark_fresh();
                let effects = self.engine.apply_snapshot(snapshot);
                let flow = self.run_effects(effects);
                if let Some(reply) = reply {
                    let _ = reply.send(Ok(self.engine.view()));
                }
                flow
            }
            Err(e) => {
                warn!(error = %e, "claim failed");
                self.engine.claim_failed();
                if let Some(reply) = reply {
                    let _ = reply.send(Err(e.into()));
                }
                Flow::Continue
            }
        }
    }

    fn name_pet(&mut self, name: &str, reply: Reply<EngineView>) {
        match self.engine.submit_name(name) {
            Ok(req) => {
                debug!(name = %req.name, "naming pet");
                let backend = Arc::clone(&self.backend);
                self.naming = Some(Box::pin(async move {
                    backend.name_pet(req.pet_id, &req.name).await
                }));
                self.naming_reply = Some(reply);
            }
            Err(rejection) => {
                debug!(%rejection, "name rejected");
                let _ = reply.send(Err(rejection.into()));
            }
        }
    }

    fn naming_finished(&mut self, result: Result<EntitySnapshot, BackendError>) -> Flow {
        let reply = self.naming_reply.take();
        match result {
            Ok(snapshot) => {
                self.mark_fresh();
                let effects = self.engine.name_succeeded(snapshot);
                let flow = self.run_effects(effects);
                if let Some(reply) = reply {
                    let _ = reply.send(Ok(self.engine.view()));
                }
                flow
            }
            Err(e) => {
                warn!(error = %e, "naming failed");
                self.engine.name_failed();
                if let Some(reply) = reply {
                    let _ = reply.send(Err(e.into()));
                }
                Flow::Continue
            }
        }
    }

    fn close_viewer(&mut self, reply: Reply<Option<u64>>) {
        let Some(req) = self.engine.close_viewer() else {
            let _ = reply.send(Ok(None));
            return;
        };
        let backend = Arc::clone(&self.backend);
        self.ack = Some(Box::pin(async move {
            let result = backend
                .acknowledge_entries(req.pet_id, req.last_seen_id)
                .await;
            (req.last_seen_id, result)
        }));
        self.ack_reply = Some(reply);
    }

    fn ack_finished(&mut self, last_seen_id: u64, result: Result<(), BackendError>) {
        let reply = self.ack_reply.take();
        let outcome = match result {
            Ok(()) => {
                self.engine.ack_succeeded(last_seen_id);
                Ok(Some(last_seen_id))
            }
            Err(e) => {
                warn!(error = %e, last_seen_id, "diary acknowledgment failed");
                self.engine.ack_failed();
                Err(e.into())
            }
        };
        if let Some(reply) = reply {
            let _ = reply.send(outcome);
        }
    }

    fn entries_finished(&mut self, result: Result<Vec<DiaryEntry>, BackendError>) -> Flow {
        match result {
            Ok(entries) => {
                let effects = self.engine.entries_fetched(&entries);
                self.run_effects(effects)
            }
            Err(e) => {
                warn!(error = %e, "diary check failed");
                self.engine.entries_failed();
                Flow::Continue
            }
        }
    }

    fn run_effects(&mut self, effects: Vec<Effect>) -> Flow {
        for effect in effects {
            match effect {
                Effect::ShowTerminalFailure { pet_id } => self.surface.terminal_failure(pet_id),
                Effect::StartHatchTimer { duration } => {
                    info!(?duration, "hatch sequence started");
                    self.hatch = Some(Box::pin(time::sleep(duration)));
                }
                Effect::FetchEntries { pet_id } => {
                    if self.entries.is_none() {
                        let backend = Arc::clone(&self.backend);
                        self.entries =
                            Some(Box::pin(async move { backend.fetch_entries(pet_id).await }));
                    }
                }
                Effect::PublishUnread(entries) => self.surface.publish_unread(&entries),
                Effect::Navigate(route) => match self.surface.navigate(route) {
                    Ok(NavigationOutcome::Stay) if route == Route::Claim => self.start_claim(),
                    Ok(NavigationOutcome::Stay) => {}
                    Ok(NavigationOutcome::LeaveView) => {
                        info!(?route, "left pet view");
                        return Flow::Stop;
                    }
                    Err(e) => error!(error = %e, "navigation failed"),
                },
            }
        }
        Flow::Continue
    }

    fn teardown(&mut self) {
        self.engine.teardown();
        self.polling = false;
        self.next_poll = None;
        self.ticker = None;
        self.poll = None;
        self.hatch = None;
        self.entries = None;
        self.ack = None;
        self.answer = None;
        self.claim = None;
        self.naming = None;
        // Pending replies resolve as `Stopped`.
        self.ack_reply = None;
        self.answer_reply = None;
        self.claim_reply = None;
        self.naming_reply = None;
        self.cancel.cancel();
        self.publish();
        info!("driver stopped");
    }
}
