use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use thiserror::Error;
use time::OffsetDateTime;
use tokio::sync::watch;
use tokio::time::Duration;
use uuid::Uuid;

use super::payload::{AttemptMetadata, SubmissionPayload};
use crate::backend::{AssessmentBackend, ClientError};
use crate::core::config::Settings;
use crate::core::metrics::{DROPPED_WRITES_TOTAL, SUBMISSIONS_TOTAL};
use crate::core::time::now_utc;
use crate::domain::models::{Answer, AnswerError, QuestionId, Test};
use crate::domain::types::{IntegrityEventKind, SessionState};
use crate::schemas::submission::SubmissionRequest;
use crate::schemas::test::DefinitionError;
use crate::services::autosave::{self, AutosaveConfig, AutosaveHandle, AutosaveStatus, DraftSnapshot, DraftSource};
use crate::services::countdown::{CountdownTimer, Deadline};
use crate::services::proctoring::{ProctoringEnvironment, ProctoringError, ProctoringMonitor};
use crate::services::response_store::ResponseStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitMode {
    /// Learner pressed Submit. Blocked while questions are unanswered.
    Manual,
    /// Learner confirmed submitting with unanswered questions.
    Confirmed,
    /// Deadline reached. Never blocked.
    AutoDeadline,
}

impl SubmitMode {
    fn as_label(self) -> &'static str {
        match self {
            SubmitMode::Manual => "manual",
            SubmitMode::Confirmed => "confirmed",
            SubmitMode::AutoDeadline => "auto_deadline",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Completed { submission_id: String },
    /// Another submit is in flight; no request was sent.
    AlreadySubmitting,
    AlreadyCompleted { submission_id: String },
    /// Manual submit blocked; confirm to send anyway.
    Incomplete { unanswered: Vec<QuestionId> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Stored,
    Unchanged,
    /// The session no longer accepts writes.
    Dropped,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Progress {
    pub answered: usize,
    pub total: usize,
    pub unanswered: Vec<QuestionId>,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("session already started (state {})", .0.as_str())]
    AlreadyStarted(SessionState),
    #[error("Could not load the test: {0}")]
    Fetch(#[source] ClientError),
    #[error("The test definition is incomplete: {0}")]
    Definition(#[from] DefinitionError),
    #[error(transparent)]
    Proctoring(#[from] ProctoringError),
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session has not started")]
    NotStarted,
    #[error("session is {} and accepts no further submissions", .0.as_str())]
    Closed(SessionState),
    #[error("unknown question {0}")]
    UnknownQuestion(String),
    #[error(transparent)]
    InvalidAnswer(#[from] AnswerError),
    #[error("Submission failed: {source}")]
    Submit {
        recoverable: bool,
        #[source]
        source: ClientError,
    },
}

impl SessionError {
    pub fn is_recoverable(&self) -> bool {
        matches!(self, SessionError::Submit { recoverable: true, .. })
    }
}

#[derive(Debug, Clone)]
struct ControllerConfig {
    auto_submit_max_retries: u32,
    auto_submit_retry_base: u64,
    autosave_interval: Option<Duration>,
    require_camera: bool,
}

impl ControllerConfig {
    fn from_settings(settings: &Settings) -> Self {
        let session = settings.session();
        Self {
            auto_submit_max_retries: session.auto_submit_max_retries,
            auto_submit_retry_base: session.auto_submit_retry_base_seconds,
            autosave_interval: (session.auto_save_interval_seconds > 0)
                .then(|| Duration::from_secs(session.auto_save_interval_seconds)),
            require_camera: settings.proctoring().require_camera,
        }
    }

    fn retry_delay(&self, attempt: u32) -> Duration {
        let factor = 2u64.saturating_pow(attempt);
        Duration::from_secs(self.auto_submit_retry_base.saturating_mul(factor))
    }
}

struct Inner {
    test_id: Option<String>,
    test: Option<Arc<Test>>,
    attempt_id: String,
    started_at: Option<OffsetDateTime>,
    deadline: Option<Deadline>,
    timer: Option<CountdownTimer>,
    /// Sticky once the deadline fires; survives reverts to InProgress.
    expired: bool,
    store: ResponseStore,
    payload: Option<Arc<SubmissionPayload>>,
    submission_id: Option<String>,
    last_error: Option<String>,
    autosave: Option<AutosaveHandle>,
}

impl Inner {
    /// True from the deadline instant on, even before the expiry task has run.
    fn deadline_passed(&self) -> bool {
        self.expired || self.deadline.is_some_and(|deadline| deadline.has_passed())
    }
}

struct Shared {
    backend: Arc<dyn AssessmentBackend>,
    environment: Arc<dyn ProctoringEnvironment>,
    config: ControllerConfig,
    proctoring: ProctoringMonitor,
    state: watch::Sender<SessionState>,
    inner: Mutex<Inner>,
}

/// Owns one attempt at one test and is the only thing that changes its
/// state.
///
/// Manual submit and deadline expiry share `submit_with`; the mode only
/// decides whether the completeness gate applies. Once the deadline has
/// fired every submit is treated as a deadline submit.
#[derive(Clone)]
pub struct SessionController {
    shared: Arc<Shared>,
}

impl SessionController {
    pub fn new(
        settings: &Settings,
        backend: Arc<dyn AssessmentBackend>,
        environment: Arc<dyn ProctoringEnvironment>,
    ) -> Self {
        Self::with_config(ControllerConfig::from_settings(settings), backend, environment)
    }

    fn with_config(
        config: ControllerConfig,
        backend: Arc<dyn AssessmentBackend>,
        environment: Arc<dyn ProctoringEnvironment>,
    ) -> Self {
        let (state, _) = watch::channel(SessionState::Loading);
        let proctoring = ProctoringMonitor::new(environment.clone(), config.require_camera);
        let inner = Inner {
            test_id: None,
            test: None,
            attempt_id: Uuid::new_v4().to_string(),
            started_at: None,
            deadline: None,
            timer: None,
            expired: false,
            store: ResponseStore::new(),
            payload: None,
            submission_id: None,
            last_error: None,
            autosave: None,
        };

        Self {
            shared: Arc::new(Shared {
                backend,
                environment,
                config,
                proctoring,
                state,
                inner: Mutex::new(inner),
            }),
        }
    }

    /// New controller at the Loading boundary with the same collaborators.
    /// This is the only way to retry after a terminal state.
    pub fn fresh(&self) -> Self {
        Self::with_config(
            self.shared.config.clone(),
            self.shared.backend.clone(),
            self.shared.environment.clone(),
        )
    }

    /// Loads the test, checks the camera gate and enters InProgress.
    ///
    /// A load or definition failure is terminal. A camera denial leaves the
    /// session in Loading so `start` can be called again.
    pub async fn start(&self, test_id: &str) -> Result<(), LoadError> {
        {
            let mut inner = self.shared.lock();
            let state = self.state();
            if state != SessionState::Loading || inner.test_id.is_some() {
                return Err(LoadError::AlreadyStarted(state));
            }
            inner.test_id = Some(test_id.to_string());
        }

        let attempt_id = self.attempt_id();
        tracing::info!(test_id, attempt_id = %attempt_id, "Loading test");

        let test = match self.shared.backend.fetch_test(test_id).await {
            Ok(dto) => match dto.into_domain() {
                Ok(test) => test,
                Err(err) => {
                    self.shared.fail(&err.to_string());
                    tracing::error!(test_id, error = %err, "Rejected test definition");
                    return Err(LoadError::Definition(err));
                }
            },
            Err(err) => {
                self.shared.fail(&err.to_string());
                tracing::error!(test_id, error = %err, "Failed to fetch test");
                return Err(LoadError::Fetch(err));
            }
        };

        if let Err(err) = self.shared.proctoring.acquire_camera().await {
            let mut inner = self.shared.lock();
            inner.test_id = None;
            inner.last_error = Some(err.to_string());
            return Err(LoadError::Proctoring(err));
        }

        {
            let mut inner = self.shared.lock();
            let deadline = Deadline::after_seconds(test.duration_seconds());
            tracing::info!(
                test_id,
                attempt_id = %inner.attempt_id,
                questions = test.questions.len(),
                duration_seconds = test.duration_seconds(),
                "Session in progress"
            );
            inner.test = Some(Arc::new(test));
            inner.started_at = Some(now_utc());
            inner.deadline = Some(deadline);
            inner.last_error = None;
            self.shared.state.send_replace(SessionState::InProgress);
            Shared::arm_timer(&self.shared, &mut inner);
            Shared::start_autosave(&self.shared, &mut inner);
        }

        self.shared.proctoring.enter_fullscreen().await;
        Ok(())
    }

    /// Upserts the answer for one question. Silently dropped unless the
    /// session is InProgress and the deadline has not passed. An empty
    /// answer clears the entry.
    pub fn record_response(
        &self,
        question_id: &str,
        answer: Answer,
    ) -> Result<WriteOutcome, SessionError> {
        let mut inner = self.shared.lock();
        if !self.shared.accepts_writes(&inner) {
            self.shared.dropped_write(question_id);
            return Ok(WriteOutcome::Dropped);
        }
        let test = inner.test.clone().ok_or(SessionError::NotStarted)?;
        let question = test
            .question(question_id)
            .ok_or_else(|| SessionError::UnknownQuestion(question_id.to_string()))?;
        question.check_answer(&answer)?;

        let changed = if answer.is_empty() {
            inner.store.clear(question_id)
        } else {
            inner.store.upsert(question_id, answer)
        };
        if changed {
            Ok(WriteOutcome::Stored)
        } else {
            Ok(WriteOutcome::Unchanged)
        }
    }

    pub fn clear_response(&self, question_id: &str) -> Result<WriteOutcome, SessionError> {
        let mut inner = self.shared.lock();
        if !self.shared.accepts_writes(&inner) {
            self.shared.dropped_write(question_id);
            return Ok(WriteOutcome::Dropped);
        }
        let test = inner.test.clone().ok_or(SessionError::NotStarted)?;
        if test.question(question_id).is_none() {
            return Err(SessionError::UnknownQuestion(question_id.to_string()));
        }

        if inner.store.clear(question_id) {
            Ok(WriteOutcome::Stored)
        } else {
            Ok(WriteOutcome::Unchanged)
        }
    }

    /// Manual submit, gated on every question being answered.
    pub async fn submit(&self) -> Result<SubmitOutcome, SessionError> {
        Shared::submit_with(&self.shared, SubmitMode::Manual).await
    }

    /// Manual submit after the learner confirmed the incomplete warning.
    pub async fn submit_confirmed(&self) -> Result<SubmitOutcome, SessionError> {
        Shared::submit_with(&self.shared, SubmitMode::Confirmed).await
    }

    /// Whole seconds until the deadline; `None` before the test is loaded.
    pub fn time_remaining(&self) -> Option<u64> {
        let inner = self.shared.lock();
        if inner.expired {
            return Some(0);
        }
        inner.deadline.map(|deadline| deadline.remaining_seconds())
    }

    /// Per-second clock of the running timer. A revert to InProgress re-arms
    /// the timer, so subscribe again when the state changes.
    pub fn subscribe_remaining(&self) -> Option<watch::Receiver<u64>> {
        self.shared.lock().timer.as_ref().map(CountdownTimer::subscribe)
    }

    pub fn state(&self) -> SessionState {
        *self.shared.state.borrow()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<SessionState> {
        self.shared.state.subscribe()
    }

    pub fn deadline_passed(&self) -> bool {
        self.shared.lock().deadline_passed()
    }

    pub fn progress(&self) -> Progress {
        let inner = self.shared.lock();
        let Some(test) = inner.test.as_ref() else {
            return Progress { answered: 0, total: 0, unanswered: Vec::new() };
        };
        Progress {
            answered: inner.store.len(),
            total: test.questions.len(),
            unanswered: unanswered(test, &inner.store),
        }
    }

    pub fn test(&self) -> Option<Arc<Test>> {
        self.shared.lock().test.clone()
    }

    pub fn answer(&self, question_id: &str) -> Option<Answer> {
        self.shared.lock().store.get(question_id).cloned()
    }

    pub fn attempt_id(&self) -> String {
        self.shared.lock().attempt_id.clone()
    }

    pub fn submission_id(&self) -> Option<String> {
        self.shared.lock().submission_id.clone()
    }

    /// The payload of the accepted submission.
    pub fn payload(&self) -> Option<Arc<SubmissionPayload>> {
        self.shared.lock().payload.clone()
    }

    /// Message for the most recent blocking failure, cleared on success.
    pub fn last_error(&self) -> Option<String> {
        self.shared.lock().last_error.clone()
    }

    pub fn autosave_status(&self) -> Option<watch::Receiver<AutosaveStatus>> {
        self.shared.lock().autosave.as_ref().map(AutosaveHandle::subscribe)
    }

    pub fn record_integrity_event(&self, kind: IntegrityEventKind) {
        if self.state().is_terminal() {
            return;
        }
        self.shared.proctoring.record(kind);
    }

    pub fn proctoring(&self) -> &ProctoringMonitor {
        &self.shared.proctoring
    }
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn current_state(&self) -> SessionState {
        *self.state.borrow()
    }

    fn accepts_writes(&self, inner: &Inner) -> bool {
        self.current_state() == SessionState::InProgress && !inner.deadline_passed()
    }

    fn dropped_write(&self, question_id: &str) {
        metrics::counter!(DROPPED_WRITES_TOTAL).increment(1);
        tracing::debug!(
            question_id,
            state = self.current_state().as_str(),
            "Dropped response write"
        );
    }

    fn fail(&self, message: &str) {
        let mut inner = self.lock();
        inner.timer = None;
        inner.autosave = None;
        inner.last_error = Some(message.to_string());
        self.state.send_replace(SessionState::Failed);
    }

    /// Arms the countdown against the fixed deadline. A deadline already in
    /// the past fires on the spot.
    fn arm_timer(shared: &Arc<Shared>, inner: &mut Inner) {
        let Some(deadline) = inner.deadline else {
            return;
        };
        if inner.expired {
            return;
        }
        let weak = Arc::downgrade(shared);
        inner.timer = Some(CountdownTimer::start(deadline, move || {
            if let Some(shared) = weak.upgrade() {
                tokio::spawn(Shared::on_deadline(shared));
            }
        }));
    }

    fn start_autosave(shared: &Arc<Shared>, inner: &mut Inner) {
        let (Some(interval), Some(test_id)) = (shared.config.autosave_interval, inner.test_id.clone())
        else {
            return;
        };
        let weak: Weak<Shared> = Arc::downgrade(shared);
        inner.autosave = Some(autosave::spawn(
            shared.backend.clone(),
            AutosaveConfig { test_id, attempt_id: inner.attempt_id.clone(), interval },
            weak,
            shared.state.subscribe(),
        ));
    }

    async fn on_deadline(shared: Arc<Shared>) {
        {
            let mut inner = shared.lock();
            if inner.expired {
                return;
            }
            inner.expired = true;
            tracing::info!(
                test_id = inner.test_id.as_deref().unwrap_or_default(),
                attempt_id = %inner.attempt_id,
                answered = inner.store.len(),
                "Deadline reached; submitting automatically"
            );
        }

        let mut state = shared.state.subscribe();
        let mut retries = 0;
        loop {
            match Shared::submit_with(&shared, SubmitMode::AutoDeadline).await {
                Ok(SubmitOutcome::AlreadySubmitting) => {
                    // A manual attempt is in flight; follow up only if it reverts.
                    if state.wait_for(|current| *current != SessionState::Submitting).await.is_err() {
                        return;
                    }
                }
                Ok(_) => return,
                Err(err) if err.is_recoverable() && retries < shared.config.auto_submit_max_retries => {
                    let delay = shared.config.retry_delay(retries);
                    retries += 1;
                    tracing::warn!(
                        error = %err,
                        retry = retries,
                        delay_seconds = delay.as_secs(),
                        "Auto-submit failed; retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) => {
                    tracing::error!(
                        error = %err,
                        retries,
                        "Auto-submit gave up; waiting for a manual submit"
                    );
                    return;
                }
            }
        }
    }

    async fn submit_with(
        shared: &Arc<Shared>,
        requested: SubmitMode,
    ) -> Result<SubmitOutcome, SessionError> {
        let (test_id, payload, mode) = {
            let mut inner = shared.lock();
            match shared.current_state() {
                SessionState::InProgress => {}
                SessionState::Submitting => return Ok(SubmitOutcome::AlreadySubmitting),
                SessionState::Completed => {
                    return Ok(SubmitOutcome::AlreadyCompleted {
                        submission_id: inner.submission_id.clone().unwrap_or_default(),
                    });
                }
                SessionState::Loading => return Err(SessionError::NotStarted),
                state @ SessionState::Failed => return Err(SessionError::Closed(state)),
            }
            let (Some(test), Some(test_id)) = (inner.test.clone(), inner.test_id.clone()) else {
                return Err(SessionError::NotStarted);
            };

            let mode = if inner.deadline_passed() { SubmitMode::AutoDeadline } else { requested };
            if mode == SubmitMode::Manual {
                let unanswered = unanswered(&test, &inner.store);
                if !unanswered.is_empty() {
                    tracing::info!(
                        test_id = %test_id,
                        unanswered = unanswered.len(),
                        "Manual submit blocked; unanswered questions"
                    );
                    return Ok(SubmitOutcome::Incomplete { unanswered });
                }
            }

            shared.state.send_replace(SessionState::Submitting);
            inner.timer = None;
            inner.autosave = None;

            let metadata = AttemptMetadata {
                attempt_id: inner.attempt_id.clone(),
                started_at: inner.started_at.unwrap_or_else(now_utc),
                submitted_at: now_utc(),
                auto_submitted: mode == SubmitMode::AutoDeadline,
                integrity_events: shared.proctoring.events(),
            };
            let payload = SubmissionPayload::build(&test, inner.store.snapshot(), metadata);
            (test_id, payload, mode)
        };

        tracing::info!(
            test_id = %test_id,
            attempt_id = %payload.attempt_id(),
            mode = mode.as_label(),
            responses = payload.len(),
            "Submitting responses"
        );

        let request = SubmissionRequest::from_payload(&payload);
        let result = shared.backend.submit(&test_id, &request).await;

        let mut inner = shared.lock();
        match result {
            Ok(response) => {
                let submission_id = response.submission_id;
                inner.payload = Some(Arc::new(payload));
                inner.submission_id = Some(submission_id.clone());
                inner.last_error = None;
                shared.state.send_replace(SessionState::Completed);
                metrics::counter!(SUBMISSIONS_TOTAL, "status" => "completed", "mode" => mode.as_label())
                    .increment(1);
                tracing::info!(test_id = %test_id, submission_id = %submission_id, "Submission accepted");
                Ok(SubmitOutcome::Completed { submission_id })
            }
            Err(err) if err.is_recoverable() => {
                inner.last_error = Some(err.to_string());
                shared.state.send_replace(SessionState::InProgress);
                Shared::arm_timer(shared, &mut inner);
                Shared::start_autosave(shared, &mut inner);
                metrics::counter!(SUBMISSIONS_TOTAL, "status" => "retryable", "mode" => mode.as_label())
                    .increment(1);
                tracing::warn!(
                    test_id = %test_id,
                    error = %err,
                    reason = err.as_label(),
                    "Submission failed; session reopened for retry"
                );
                Err(SessionError::Submit { recoverable: true, source: err })
            }
            Err(err) => {
                inner.last_error = Some(err.to_string());
                shared.state.send_replace(SessionState::Failed);
                metrics::counter!(SUBMISSIONS_TOTAL, "status" => "failed", "mode" => mode.as_label())
                    .increment(1);
                tracing::error!(
                    test_id = %test_id,
                    error = %err,
                    reason = err.as_label(),
                    "Submission rejected; session failed"
                );
                Err(SessionError::Submit { recoverable: false, source: err })
            }
        }
    }
}

impl DraftSource for Shared {
    fn draft(&self) -> Option<DraftSnapshot> {
        let inner = self.lock();
        if !self.accepts_writes(&inner) {
            return None;
        }
        Some(DraftSnapshot { revision: inner.store.revision(), responses: inner.store.snapshot() })
    }
}

fn unanswered(test: &Test, store: &ResponseStore) -> Vec<QuestionId> {
    test.questions
        .iter()
        .filter(|question| !store.contains(&question.id))
        .map(|question| question.id.clone())
        .collect()
}

#[cfg(test)]
#[path = "tests.rs"]
mod tests;
