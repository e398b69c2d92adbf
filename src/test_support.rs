use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock};

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tokio::time::Duration;

use crate::backend::{AssessmentBackend, ClientError};
use crate::domain::models::Test;
use crate::schemas::execution::{CodeExecutionRequest, CodeExecutionResponse};
use crate::schemas::results::GradeBreakdownDto;
use crate::schemas::submission::{DraftRequest, SubmissionRequest, SubmitResponseDto};
use crate::schemas::test::TestDto;

pub(crate) const SCENARIO_TEST_ID: &str = "t-100";

pub(crate) async fn env_lock() -> OwnedMutexGuard<()> {
    static LOCK: OnceLock<Arc<AsyncMutex<()>>> = OnceLock::new();
    let lock = LOCK.get_or_init(|| Arc::new(AsyncMutex::new(()))).clone();
    lock.lock_owned().await
}

/// Two single-select choice questions (1 mark each) and one code question
/// (3 marks), 2 minutes.
pub(crate) fn scenario_definition() -> Value {
    json!({
        "id": SCENARIO_TEST_ID,
        "title": "Warm-up quiz",
        "duration": 2,
        "totalMarks": 5,
        "passingMarks": 3,
        "questions": [
            {
                "id": "q1",
                "question": "Which collection keeps keys sorted?",
                "marks": 1,
                "type": "MCQ",
                "options": [
                    {"optionId": "a", "text": "BTreeMap"},
                    {"optionId": "b", "text": "HashMap"},
                    {"optionId": "c", "text": "Vec"}
                ]
            },
            {
                "id": "q2",
                "question": "Which trait enables the ? operator on Option?",
                "marks": 1,
                "type": "MCQ",
                "options": [
                    {"optionId": "a", "text": "Try"},
                    {"optionId": "b", "text": "From"}
                ]
            },
            {
                "id": "q3",
                "question": "Print the sum of two integers.",
                "marks": 3,
                "type": "CODE",
                "language": "python",
                "constraints": "|a|, |b| <= 10^9",
                "timeLimit": 1000,
                "memoryLimit": 64,
                "sampleTestCases": [
                    {"input": "1 2", "expectedOutput": "3"},
                    {"input": "-4 4", "expectedOutput": "0"}
                ]
            }
        ]
    })
}

pub(crate) fn scenario_test() -> Test {
    let dto: TestDto = serde_json::from_value(scenario_definition()).expect("scenario json");
    dto.into_domain().expect("scenario definition")
}

fn passing_execution() -> CodeExecutionResponse {
    serde_json::from_value(json!({
        "results": [
            {"status": "PASSED", "input": "1 2", "expectedOutput": "3", "actualOutput": "3",
             "executionTimeMs": 14}
        ]
    }))
    .expect("execution json")
}

#[derive(Default)]
struct Script {
    definition: Option<Value>,
    fetch_failure: Option<ClientError>,
    submit_results: VecDeque<Result<String, ClientError>>,
    submit_delay: Duration,
    submitted: Vec<SubmissionRequest>,
    execution_failure: Option<ClientError>,
    execution_delay: Duration,
    last_execution: Option<CodeExecutionRequest>,
    draft_failure: Option<ClientError>,
    drafts: Vec<DraftRequest>,
    results: Option<Value>,
}

/// Scripted in-memory backend. Every call is counted; failures and delays
/// are injected per endpoint.
pub(crate) struct MockBackend {
    script: Mutex<Script>,
    fetch_calls: AtomicUsize,
    submit_calls: AtomicUsize,
    execute_calls: AtomicUsize,
    draft_calls: AtomicUsize,
}

impl MockBackend {
    pub(crate) fn new() -> Arc<Self> {
        Self::with_definition(scenario_definition())
    }

    pub(crate) fn with_definition(definition: Value) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(Script { definition: Some(definition), ..Script::default() }),
            fetch_calls: AtomicUsize::new(0),
            submit_calls: AtomicUsize::new(0),
            execute_calls: AtomicUsize::new(0),
            draft_calls: AtomicUsize::new(0),
        })
    }

    fn script(&self) -> std::sync::MutexGuard<'_, Script> {
        self.script.lock().expect("mock script lock")
    }

    pub(crate) fn fail_fetch(&self, err: ClientError) {
        self.script().fetch_failure = Some(err);
    }

    /// Queue outcomes for the next submit calls; once drained every submit
    /// succeeds.
    pub(crate) fn script_submits(&self, results: Vec<Result<String, ClientError>>) {
        self.script().submit_results.extend(results);
    }

    pub(crate) fn set_submit_delay(&self, delay: Duration) {
        self.script().submit_delay = delay;
    }

    pub(crate) fn fail_execution(&self, err: ClientError) {
        self.script().execution_failure = Some(err);
    }

    pub(crate) fn set_execution_delay(&self, delay: Duration) {
        self.script().execution_delay = delay;
    }

    pub(crate) fn fail_drafts(&self, err: ClientError) {
        self.script().draft_failure = Some(err);
    }

    pub(crate) fn set_results(&self, results: Value) {
        self.script().results = Some(results);
    }

    pub(crate) fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn submit_calls(&self) -> usize {
        self.submit_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn execute_calls(&self) -> usize {
        self.execute_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn draft_calls(&self) -> usize {
        self.draft_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn submitted_requests(&self) -> Vec<SubmissionRequest> {
        self.script().submitted.clone()
    }

    pub(crate) fn last_execution_request(&self) -> Option<CodeExecutionRequest> {
        self.script().last_execution.clone()
    }

    pub(crate) fn saved_drafts(&self) -> Vec<DraftRequest> {
        self.script().drafts.clone()
    }
}

#[async_trait]
impl AssessmentBackend for MockBackend {
    async fn fetch_test(&self, test_id: &str) -> Result<TestDto, ClientError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        let script = self.script();
        if let Some(err) = script.fetch_failure.clone() {
            return Err(err);
        }
        let definition =
            script.definition.clone().ok_or_else(|| ClientError::NotFound(test_id.to_string()))?;
        serde_json::from_value(definition).map_err(|err| ClientError::Decode(err.to_string()))
    }

    async fn submit(
        &self,
        _test_id: &str,
        request: &SubmissionRequest,
    ) -> Result<SubmitResponseDto, ClientError> {
        let call = self.submit_calls.fetch_add(1, Ordering::SeqCst) + 1;
        let (delay, outcome) = {
            let mut script = self.script();
            script.submitted.push(request.clone());
            let outcome =
                script.submit_results.pop_front().unwrap_or_else(|| Ok(format!("sub-{call}")));
            (script.submit_delay, outcome)
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        outcome.map(|submission_id| SubmitResponseDto { submission_id })
    }

    async fn fetch_results(&self, submission_id: &str) -> Result<GradeBreakdownDto, ClientError> {
        let results = self
            .script()
            .results
            .clone()
            .ok_or_else(|| ClientError::NotFound(submission_id.to_string()))?;
        serde_json::from_value(results).map_err(|err| ClientError::Decode(err.to_string()))
    }

    async fn execute_code(
        &self,
        request: &CodeExecutionRequest,
    ) -> Result<CodeExecutionResponse, ClientError> {
        self.execute_calls.fetch_add(1, Ordering::SeqCst);
        let (delay, failure) = {
            let mut script = self.script();
            script.last_execution = Some(request.clone());
            (script.execution_delay, script.execution_failure.clone())
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        match failure {
            Some(err) => Err(err),
            None => Ok(passing_execution()),
        }
    }

    async fn save_draft(&self, _test_id: &str, draft: &DraftRequest) -> Result<(), ClientError> {
        self.draft_calls.fetch_add(1, Ordering::SeqCst);
        let mut script = self.script();
        if let Some(err) = script.draft_failure.clone() {
            return Err(err);
        }
        script.drafts.push(draft.clone());
        Ok(())
    }
}
