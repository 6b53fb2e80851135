//! Session owner task.
//!
//! One tokio task per session owns the [`Machine`]. Commands from handlers,
//! timer ticks and network callbacks are all applied from this task, one at
//! a time, so the session never sees two concurrent writers. Network calls
//! run in spawned tasks and report back tagged with the attempt that started
//! them; anything from an older attempt is dropped.

use std::future::pending;
use std::pin::Pin;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{sleep, timeout, Sleep};
use tracing::{debug, info, warn};

use crate::ats::analysis::AnalysisBackend;
use crate::ats::errors::{SessionError, UploadError};
use crate::ats::machine::{Effect, Event, Machine, Phase, SessionSnapshot, Timer};
use crate::ats::models::PendingFile;
use crate::ats::steps::Pacing;
use crate::ats::store::{DocumentStore, UploadProgress};
use crate::auth::BearerToken;

const COMMAND_BUFFER: usize = 16;

/// Collaborators shared by every session.
#[derive(Clone)]
pub struct SessionDeps {
    pub store: Arc<dyn DocumentStore>,
    pub analysis: Arc<dyn AnalysisBackend>,
    /// Folder/prefix uploads go to.
    pub destination: String,
    pub pacing: Pacing,
}

enum Command {
    Submit {
        file: Option<PendingFile>,
        token: BearerToken,
        reply: oneshot::Sender<Result<(), SessionError>>,
    },
    Reset {
        reply: oneshot::Sender<()>,
    },
}

struct Tagged {
    attempt: u64,
    event: Event,
}

/// Cheap, cloneable handle to a running session. The task stops when the
/// last handle is dropped.
#[derive(Clone)]
pub struct SessionHandle {
    commands: mpsc::Sender<Command>,
    snapshots: watch::Receiver<SessionSnapshot>,
    /// Unix millis of the last command, callback or timer the owner applied.
    last_activity: Arc<AtomicI64>,
}

impl SessionHandle {
    pub fn spawn(deps: SessionDeps) -> Self {
        Self::spawn_with_rng(deps, StdRng::from_entropy())
    }

    pub fn spawn_with_rng(deps: SessionDeps, rng: StdRng) -> Self {
        let machine = Machine::new(deps.pacing.clone(), rng);
        let (commands_tx, commands_rx) = mpsc::channel(COMMAND_BUFFER);
        let (snapshots_tx, snapshots_rx) = watch::channel(machine.snapshot());
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let last_activity = Arc::new(AtomicI64::new(Utc::now().timestamp_millis()));

        let owner = SessionOwner {
            machine,
            deps,
            token: None,
            commands: commands_rx,
            events_tx,
            events_rx,
            snapshots: snapshots_tx,
            last_activity: last_activity.clone(),
            timer: None,
        };
        tokio::spawn(owner.run());

        Self {
            commands: commands_tx,
            snapshots: snapshots_rx,
            last_activity,
        }
    }

    /// Validates and starts a new attempt. Validation errors come back here;
    /// later failures show up in the snapshot.
    pub async fn submit(
        &self,
        file: Option<PendingFile>,
        token: BearerToken,
    ) -> Result<(), SessionError> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(Command::Submit { file, token, reply })
            .await
            .map_err(|_| session_gone())?;
        rx.await.map_err(|_| session_gone())?
    }

    pub async fn reset(&self) {
        let (reply, rx) = oneshot::channel();
        if self.commands.send(Command::Reset { reply }).await.is_ok() {
            let _ = rx.await;
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshots.borrow().clone()
    }

    #[cfg(test)]
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshots.clone()
    }

    pub fn last_activity(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.last_activity.load(Ordering::Relaxed))
            .unwrap_or_else(Utc::now)
    }
}

fn session_gone() -> SessionError {
    SessionError::Validation("Session is no longer available.".to_string())
}

struct SessionOwner {
    machine: Machine<StdRng>,
    deps: SessionDeps,
    token: Option<BearerToken>,
    commands: mpsc::Receiver<Command>,
    events_tx: mpsc::UnboundedSender<Tagged>,
    events_rx: mpsc::UnboundedReceiver<Tagged>,
    snapshots: watch::Sender<SessionSnapshot>,
    last_activity: Arc<AtomicI64>,
    /// The single armed timer, if any.
    timer: Option<(Timer, Pin<Box<Sleep>>)>,
}

impl SessionOwner {
    async fn run(mut self) {
        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(command) => self.on_command(command),
                    None => break,
                },
                Some(tagged) = self.events_rx.recv() => {
                    if tagged.attempt == self.machine.attempt() {
                        let effects = self.machine.handle(tagged.event);
                        self.apply(effects);
                    } else {
                        debug!(stale = tagged.attempt, "dropping callback from previous attempt");
                    }
                }
                timer = next_timer(&mut self.timer) => {
                    self.timer = None;
                    let effects = self.machine.handle(Event::TimerFired(timer));
                    self.apply(effects);
                    if timer == Timer::Display && self.machine.session().phase == Phase::Completed {
                        info!(attempt = self.machine.attempt(), "ATS analysis completed");
                    }
                }
            }
            self.publish();
        }
        debug!("session owner stopped");
    }

    fn on_command(&mut self, command: Command) {
        match command {
            Command::Submit { file, token, reply } => {
                let file_name = file.as_ref().map(|f| f.file_name.clone());
                let result = self.machine.submit(file).map(|effects| {
                    self.token = Some(token);
                    // a fresh attempt never inherits the old timer
                    self.timer = None;
                    self.apply(effects);
                });
                match &result {
                    Ok(()) => info!(
                        attempt = self.machine.attempt(),
                        file = file_name.as_deref().unwrap_or_default(),
                        "ATS analysis submitted"
                    ),
                    Err(e) => warn!("ATS submission rejected: {e}"),
                }
                self.publish();
                let _ = reply.send(result);
            }
            Command::Reset { reply } => {
                let effects = self.machine.reset();
                self.token = None;
                self.apply(effects);
                self.publish();
                let _ = reply.send(());
            }
        }
    }

    fn publish(&self) {
        self.snapshots.send_replace(self.machine.snapshot());
        self.last_activity
            .store(Utc::now().timestamp_millis(), Ordering::Relaxed);
    }

    fn apply(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::Arm(timer, delay) => {
                    self.timer = Some((timer, Box::pin(sleep(delay))));
                }
                Effect::Disarm => {
                    self.timer = None;
                    let session = self.machine.session();
                    if let Some(err) = &session.error {
                        warn!(attempt = session.attempt, "ATS session failed: {err}");
                    }
                }
                Effect::StartUpload(file) => self.start_upload(file),
                Effect::StartAnalysis(url) => self.start_analysis(url),
                Effect::Discard(url) => self.discard(url),
            }
        }
    }

    fn start_upload(&self, file: PendingFile) {
        let attempt = self.machine.attempt();
        let store = self.deps.store.clone();
        let destination = self.deps.destination.clone();
        let events = self.events_tx.clone();
        let limit = self.deps.pacing.upload_timeout;

        let progress_events = events.clone();
        let progress = UploadProgress::new(move |percent| {
            let _ = progress_events.send(Tagged {
                attempt,
                event: Event::UploadProgress(percent),
            });
        });

        tokio::spawn(async move {
            let event = match timeout(limit, store.upload(&file, &destination, progress)).await {
                Ok(Ok(url)) => Event::UploadSucceeded(url),
                Ok(Err(e)) => Event::UploadFailed(e.into()),
                Err(_) => {
                    warn!(attempt, "upload still pending after {limit:?}, giving up");
                    Event::UploadFailed(UploadError::TimedOut.into())
                }
            };
            let _ = events.send(Tagged { attempt, event });
        });
    }

    fn start_analysis(&self, url: String) {
        let attempt = self.machine.attempt();
        let analysis = self.deps.analysis.clone();
        let events = self.events_tx.clone();
        let token = self.token.clone();

        tokio::spawn(async move {
            let event = match token {
                Some(token) => match analysis.analyze(&url, &token).await {
                    Ok(report) => Event::AnalysisSucceeded(report),
                    Err(e) => Event::AnalysisFailed(e.into()),
                },
                None => Event::AnalysisFailed(SessionError::Analysis(
                    "Authentication required".to_string(),
                )),
            };
            let _ = events.send(Tagged { attempt, event });
        });
    }

    fn discard(&self, url: String) {
        let store = self.deps.store.clone();
        tokio::spawn(async move {
            if let Err(e) = store.discard(&url).await {
                warn!("Failed to discard temporary upload: {e}");
            }
        });
    }
}

async fn next_timer(slot: &mut Option<(Timer, Pin<Box<Sleep>>)>) -> Timer {
    match slot {
        Some((timer, delay)) => {
            delay.as_mut().await;
            *timer
        }
        None => pending().await,
    }
}
