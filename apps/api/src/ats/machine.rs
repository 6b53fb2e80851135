//! Upload/analysis session state machine.
//!
//! Pure: every input (submit, timer tick, network callback, reset) goes
//! through one transition function that mutates the session and returns the
//! effects the owner must carry out. Nothing here sleeps or does I/O, so the
//! pacing rules can be checked without a clock.

use std::time::Duration;

use rand::Rng;
use serde::Serialize;
use tracing::debug;

use crate::ats::errors::SessionError;
use crate::ats::models::{AtsReport, PendingFile};
use crate::ats::steps::{step_label, Pacing, LAST_STEP};
use crate::ats::validation::validate_pdf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Idle,
    Submitting,
    StepAdvancing,
    AwaitingResult,
    Completing,
    Completed,
    Failed,
}

impl Phase {
    /// A submitted session that has not yet completed or failed.
    pub fn is_active(self) -> bool {
        !matches!(self, Phase::Idle | Phase::Completed | Phase::Failed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timer {
    Advance,
    ShortCircuitJump,
    Finish,
    Poll,
    Cleanup,
    Display,
}

#[derive(Debug, Clone)]
pub enum Event {
    TimerFired(Timer),
    UploadProgress(u8),
    UploadSucceeded(String),
    UploadFailed(SessionError),
    AnalysisSucceeded(AtsReport),
    AnalysisFailed(SessionError),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Arm the session's single timer, replacing whatever was armed.
    Arm(Timer, Duration),
    Disarm,
    StartUpload(PendingFile),
    StartAnalysis(String),
    /// Drop the temporary upload once the result is on screen.
    Discard(String),
}

#[derive(Debug, Clone)]
pub struct Session {
    pub attempt: u64,
    pub phase: Phase,
    pub file: Option<PendingFile>,
    pub uploaded_url: Option<String>,
    pub analysis_result: Option<AtsReport>,
    /// `None` is the idle step (-1 on the wire).
    pub current_step: Option<usize>,
    pub upload_percent: u8,
    pub animation_complete: bool,
    /// Result published for display by `complete()`.
    pub displayed_result: Option<AtsReport>,
    pub awaited: Duration,
    pub error: Option<SessionError>,
}

impl Session {
    fn idle(attempt: u64) -> Self {
        Self {
            attempt,
            phase: Phase::Idle,
            file: None,
            uploaded_url: None,
            analysis_result: None,
            current_step: None,
            upload_percent: 0,
            animation_complete: false,
            displayed_result: None,
            awaited: Duration::ZERO,
            error: None,
        }
    }
}

/// What the UI layer sees.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub state: Phase,
    pub current_step_index: i32,
    pub current_step: Option<&'static str>,
    pub upload_percent: u8,
    pub animation_complete: bool,
    pub complete: bool,
    pub file_name: Option<String>,
    pub error: Option<String>,
    pub result: Option<AtsReport>,
}

pub struct Machine<R> {
    session: Session,
    pacing: Pacing,
    rng: R,
}

impl<R: Rng> Machine<R> {
    pub fn new(pacing: Pacing, rng: R) -> Self {
        Self {
            session: Session::idle(0),
            pacing,
            rng,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn attempt(&self) -> u64 {
        self.session.attempt
    }

    /// Validates the file and starts a fresh attempt. On a validation error
    /// nothing changes and nothing is scheduled.
    pub fn submit(&mut self, file: Option<PendingFile>) -> Result<Vec<Effect>, SessionError> {
        validate_pdf(file.as_ref())?;

        let attempt = self.session.attempt + 1;
        self.session = Session::idle(attempt);
        self.session.file = file;
        self.session.phase = Phase::Submitting;
        debug!(attempt, "session submitted");

        Ok(vec![Effect::Arm(Timer::Advance, self.pacing.initial_delay)])
    }

    /// Back to idle from any state. Callbacks of the old attempt must be
    /// dropped by the owner (the attempt counter changes).
    pub fn reset(&mut self) -> Vec<Effect> {
        let attempt = self.session.attempt + 1;
        self.session = Session::idle(attempt);
        debug!(attempt, "session reset");
        vec![Effect::Disarm]
    }

    pub fn handle(&mut self, event: Event) -> Vec<Effect> {
        if !self.session.phase.is_active() {
            debug!(?event, phase = ?self.session.phase, "ignoring event for inactive session");
            return vec![];
        }

        match event {
            Event::TimerFired(timer) => self.on_timer(timer),
            Event::UploadProgress(percent) => {
                if self.session.current_step == Some(0) && self.session.uploaded_url.is_none() {
                    self.session.upload_percent = self.session.upload_percent.max(percent.min(100));
                }
                vec![]
            }
            Event::UploadSucceeded(url) => self.on_uploaded(url),
            Event::UploadFailed(err) => self.fail(err),
            Event::AnalysisSucceeded(report) => {
                if self.session.uploaded_url.is_some() && self.session.analysis_result.is_none() {
                    debug!(score = report.ats_score, "analysis result received");
                    self.session.analysis_result = Some(report);
                }
                vec![]
            }
            Event::AnalysisFailed(err) => self.fail(err),
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let s = &self.session;
        SessionSnapshot {
            state: s.phase,
            current_step_index: s.current_step.map(|i| i as i32).unwrap_or(-1),
            current_step: s.current_step.and_then(step_label),
            upload_percent: s.upload_percent,
            animation_complete: s.animation_complete,
            complete: s.phase == Phase::Completed,
            file_name: s.file.as_ref().map(|f| f.file_name.clone()),
            error: s.error.as_ref().map(ToString::to_string),
            result: s.displayed_result.clone(),
        }
    }

    fn on_timer(&mut self, timer: Timer) -> Vec<Effect> {
        if !self.timer_applies(timer) {
            debug!(?timer, phase = ?self.session.phase, "ignoring stray timer");
            return vec![];
        }

        match timer {
            Timer::Advance => self.advance(),
            Timer::ShortCircuitJump => {
                self.session.current_step = Some(LAST_STEP);
                self.session.animation_complete = true;
                vec![Effect::Arm(Timer::Finish, self.pacing.finish_delay)]
            }
            Timer::Finish => self.complete(),
            Timer::Poll => {
                self.session.awaited += self.pacing.poll_interval;
                if self.session.analysis_result.is_some() {
                    self.complete()
                } else if self.session.awaited >= self.pacing.poll_window {
                    self.fail(SessionError::Timeout)
                } else {
                    vec![Effect::Arm(Timer::Poll, self.pacing.poll_interval)]
                }
            }
            Timer::Cleanup => vec![Effect::Arm(Timer::Display, self.pacing.display_delay)],
            Timer::Display => {
                self.session.phase = Phase::Completed;
                debug!(attempt = self.session.attempt, "session completed");
                vec![]
            }
        }
    }

    fn timer_applies(&self, timer: Timer) -> bool {
        let s = &self.session;
        match timer {
            Timer::Advance => match s.phase {
                Phase::Submitting => true,
                // step 0 only moves on once the upload is done
                Phase::StepAdvancing => s.current_step != Some(0) || s.uploaded_url.is_some(),
                _ => false,
            },
            Timer::ShortCircuitJump | Timer::Finish => s.phase == Phase::StepAdvancing,
            Timer::Poll => s.phase == Phase::AwaitingResult,
            Timer::Cleanup | Timer::Display => s.phase == Phase::Completing,
        }
    }

    fn advance(&mut self) -> Vec<Effect> {
        match self.session.current_step {
            None => {
                self.session.current_step = Some(0);
                self.session.phase = Phase::StepAdvancing;
                self.session.upload_percent = 0;
                match self.session.file.clone() {
                    Some(file) => vec![Effect::StartUpload(file)],
                    None => self.fail(SessionError::Upload("No file selected.".to_string())),
                }
            }
            Some(step) if step + 1 >= LAST_STEP => {
                self.session.current_step = Some(LAST_STEP);
                self.session.animation_complete = true;
                if self.session.analysis_result.is_some() {
                    self.complete()
                } else {
                    self.session.phase = Phase::AwaitingResult;
                    self.session.awaited = Duration::ZERO;
                    vec![Effect::Arm(Timer::Poll, self.pacing.poll_interval)]
                }
            }
            Some(step) => {
                self.session.current_step = Some(step + 1);
                vec![self.next_advance()]
            }
        }
    }

    fn on_uploaded(&mut self, url: String) -> Vec<Effect> {
        if self.session.phase != Phase::StepAdvancing || self.session.uploaded_url.is_some() {
            return vec![];
        }
        self.session.upload_percent = 100;
        self.session.uploaded_url = Some(url.clone());
        vec![Effect::StartAnalysis(url), self.next_advance()]
    }

    /// Either keep stepping after a random pause or, once the result is in
    /// and enough steps have played, jump to the end.
    fn next_advance(&mut self) -> Effect {
        let step = self.session.current_step.unwrap_or(0);
        if self.session.analysis_result.is_some() && step >= self.pacing.short_circuit_step {
            Effect::Arm(Timer::ShortCircuitJump, self.pacing.short_circuit_jump)
        } else {
            Effect::Arm(Timer::Advance, self.random_step_delay())
        }
    }

    fn random_step_delay(&mut self) -> Duration {
        let min = self.pacing.step_delay_min;
        let max = self.pacing.step_delay_max;
        if max <= min {
            return min;
        }
        let ms = self
            .rng
            .gen_range(min.as_millis() as u64..max.as_millis() as u64);
        Duration::from_millis(ms)
    }

    fn complete(&mut self) -> Vec<Effect> {
        self.session.phase = Phase::Completing;
        self.session.animation_complete = true;
        self.session.displayed_result = self.session.analysis_result.clone();

        let mut effects = Vec::with_capacity(2);
        if let Some(url) = &self.session.uploaded_url {
            effects.push(Effect::Discard(url.clone()));
        }
        effects.push(Effect::Arm(Timer::Cleanup, self.pacing.cleanup_delay));
        effects
    }

    fn fail(&mut self, err: SessionError) -> Vec<Effect> {
        debug!(attempt = self.session.attempt, error = %err, "session failed");
        self.session.phase = Phase::Failed;
        self.session.error = Some(err);
        vec![Effect::Disarm]
    }
}
