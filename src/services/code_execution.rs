use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;

use crate::backend::{AssessmentBackend, ClientError};
use crate::core::metrics::CODE_RUNS_TOTAL;
use crate::domain::models::{ExecutionReport, SampleTestCase};
use crate::schemas::execution::CodeExecutionRequest;

#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("Write some code before running it")]
    EmptySource,
    #[error("A run is already in progress for this question")]
    AlreadyRunning,
    #[error("Code execution failed: {0}")]
    Service(#[from] ClientError),
}

/// Identifies one run of one question's buffer. Results carrying an old
/// ticket are discarded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunTicket {
    pub question_id: String,
    pub generation: u64,
}

#[derive(Debug, Clone)]
pub struct RunRequest {
    pub ticket: RunTicket,
    pub code: String,
    pub language: String,
    pub sample_cases: Vec<SampleTestCase>,
}

/// Runs a code buffer against the question's visible sample cases. Purely
/// informational: it never writes a response and never touches session state.
#[derive(Clone)]
pub struct CodeExecutionClient {
    backend: Arc<dyn AssessmentBackend>,
}

impl CodeExecutionClient {
    pub fn new(backend: Arc<dyn AssessmentBackend>) -> Self {
        Self { backend }
    }

    pub async fn run(&self, request: &RunRequest) -> Result<ExecutionReport, ExecutionError> {
        if request.code.trim().is_empty() {
            return Err(ExecutionError::EmptySource);
        }

        let payload =
            CodeExecutionRequest::new(&request.code, &request.language, &request.sample_cases);
        let timer = Instant::now();

        match self.backend.execute_code(&payload).await {
            Ok(response) => {
                let report = response.into_report();
                metrics::counter!(CODE_RUNS_TOTAL, "status" => "completed").increment(1);
                tracing::info!(
                    question_id = %request.ticket.question_id,
                    language = %request.language,
                    passed = report.passed,
                    total = report.total,
                    elapsed_ms = timer.elapsed().as_millis() as u64,
                    "Code run completed"
                );
                Ok(report)
            }
            Err(err) => {
                metrics::counter!(CODE_RUNS_TOTAL, "status" => "failed").increment(1);
                tracing::warn!(
                    question_id = %request.ticket.question_id,
                    language = %request.language,
                    error = %err,
                    "Code run failed"
                );
                Err(ExecutionError::Service(err))
            }
        }
    }
}
