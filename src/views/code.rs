use std::sync::atomic::{AtomicU64, Ordering};

use super::ResponseChange;
use crate::domain::models::{Answer, CodeQuestion, ExecutionReport, SampleTestCase};
use crate::services::code_execution::{ExecutionError, RunRequest, RunTicket};
use crate::services::starter_templates::starter_template;

static RUN_GENERATION: AtomicU64 = AtomicU64::new(0);

fn next_generation() -> u64 {
    RUN_GENERATION.fetch_add(1, Ordering::Relaxed) + 1
}

/// What the run panel under the editor shows.
#[derive(Debug, Clone, PartialEq)]
pub enum RunPanel {
    Idle,
    Running,
    Report(ExecutionReport),
    /// Local validation message; the service was not called.
    Invalid(String),
    Error(String),
}

/// Source buffer plus run state for one code question.
///
/// At most one run is in flight. A result is applied only when its ticket
/// matches the run this view is waiting for.
#[derive(Debug, Clone)]
pub struct CodeView {
    question_id: String,
    language: String,
    sample_cases: Vec<SampleTestCase>,
    source: String,
    running: Option<RunTicket>,
    panel: RunPanel,
}

impl CodeView {
    pub fn new(question_id: &str, question: &CodeQuestion, prior: Option<&Answer>) -> Self {
        let source = match prior {
            Some(Answer::Code { source, .. }) => source.clone(),
            _ => starter_template(&question.language).to_string(),
        };
        Self {
            question_id: question_id.to_string(),
            language: question.language.clone(),
            sample_cases: question.sample_cases.clone(),
            source,
            running: None,
            panel: RunPanel::Idle,
        }
    }

    pub fn question_id(&self) -> &str {
        &self.question_id
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn sample_cases(&self) -> &[SampleTestCase] {
        &self.sample_cases
    }

    pub fn panel(&self) -> &RunPanel {
        &self.panel
    }

    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    /// Recorded on every edit whether or not the code was ever run.
    pub fn set_source(&mut self, source: &str) -> ResponseChange {
        self.source = source.to_string();
        if self.source.trim().is_empty() {
            ResponseChange::Clear
        } else {
            ResponseChange::Upsert(Answer::Code {
                source: self.source.clone(),
                language: self.language.clone(),
            })
        }
    }

    /// Prepares a run of the current buffer. A second run while one is
    /// pending is refused rather than queued.
    pub fn begin_run(&mut self) -> Result<RunRequest, ExecutionError> {
        if self.running.is_some() {
            return Err(ExecutionError::AlreadyRunning);
        }
        if self.source.trim().is_empty() {
            self.panel = RunPanel::Invalid(ExecutionError::EmptySource.to_string());
            return Err(ExecutionError::EmptySource);
        }

        let ticket = RunTicket { question_id: self.question_id.clone(), generation: next_generation() };
        self.running = Some(ticket.clone());
        self.panel = RunPanel::Running;
        Ok(RunRequest {
            ticket,
            code: self.source.clone(),
            language: self.language.clone(),
            sample_cases: self.sample_cases.clone(),
        })
    }

    /// Applies a finished run. Returns false and leaves the panel untouched
    /// when the ticket is stale.
    pub fn finish_run(
        &mut self,
        ticket: &RunTicket,
        result: Result<ExecutionReport, ExecutionError>,
    ) -> bool {
        if self.running.as_ref() != Some(ticket) {
            tracing::debug!(
                question_id = %ticket.question_id,
                generation = ticket.generation,
                "Discarding stale code run result"
            );
            return false;
        }

        self.running = None;
        self.panel = match result {
            Ok(report) => RunPanel::Report(report),
            Err(err) => RunPanel::Error(err.to_string()),
        };
        true
    }

    /// Forget the pending run; its result will be discarded.
    pub fn abandon_run(&mut self) {
        if self.running.take().is_some() {
            self.panel = RunPanel::Idle;
        }
    }
}
