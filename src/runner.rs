use std::env;
use std::fs;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use serde::Deserialize;
use tokio::time::{sleep, Duration};

use crate::backend::{AssessmentBackend, ClientError, HttpBackend, StaticToken};
use crate::core::config::Settings;
use crate::domain::models::{Answer, QuestionBody};
use crate::schemas::submission::ResponseEntryDto;
use crate::services::code_execution::{CodeExecutionClient, RunRequest, RunTicket};
use crate::services::proctoring::StaticEnvironment;
use crate::services::results::{fetch_results, ResultsSummary};
use crate::session::{SessionController, SessionError, SubmitOutcome};

/// Answers file for the headless runner.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptedAnswers {
    #[serde(default)]
    pub responses: Vec<ResponseEntryDto>,
    /// Run every code answer against its sample cases before submitting.
    #[serde(default)]
    pub run_code: bool,
    /// Submit even when some questions are unanswered.
    #[serde(default)]
    pub confirm_incomplete: bool,
}

pub(crate) struct RunnerArgs {
    pub(crate) test_id: String,
    pub(crate) answers_path: String,
}

pub(crate) fn parse_args() -> Result<RunnerArgs> {
    let mut positional = Vec::new();
    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--test" => {
                positional.insert(0, args.next().ok_or_else(|| anyhow!("--test missing value"))?);
            }
            value if value.starts_with("--") => return Err(anyhow!("Unknown argument: {value}")),
            _ => positional.push(arg),
        }
    }

    match positional.as_slice() {
        [test_id, answers_path] => {
            Ok(RunnerArgs { test_id: test_id.clone(), answers_path: answers_path.clone() })
        }
        _ => Err(anyhow!("usage: assessment-runner <test-id> <answers.json>")),
    }
}

pub(crate) fn load_answers(path: &str) -> Result<ScriptedAnswers> {
    let payload = fs::read_to_string(path).with_context(|| format!("Failed to read {path}"))?;
    serde_json::from_str(&payload).with_context(|| format!("Invalid JSON in {path}"))
}

pub(crate) fn backend_from_settings(settings: &Settings) -> Result<Arc<dyn AssessmentBackend>> {
    let credentials = Arc::new(StaticToken::new(settings.api().token.clone()));
    Ok(Arc::new(HttpBackend::from_settings(settings, credentials)?))
}

/// Drives one session to a grade summary.
pub(crate) async fn drive(
    settings: &Settings,
    backend: Arc<dyn AssessmentBackend>,
    test_id: &str,
    answers: ScriptedAnswers,
) -> Result<ResultsSummary> {
    let controller =
        SessionController::new(settings, backend.clone(), Arc::new(StaticEnvironment::permissive()));
    controller.start(test_id).await.context("Failed to start session")?;
    let test = controller.test().ok_or_else(|| anyhow!("Session has no test loaded"))?;

    let executor = CodeExecutionClient::new(backend.clone());
    for entry in answers.responses {
        let Some(response) = entry.into_response() else {
            tracing::warn!("Skipping malformed scripted answer");
            continue;
        };
        controller
            .record_response(&response.question_id, response.answer.clone())
            .with_context(|| format!("Rejected answer for question {}", response.question_id))?;

        if !answers.run_code {
            continue;
        }
        let (Answer::Code { source, language }, Some(question)) =
            (&response.answer, test.question(&response.question_id))
        else {
            continue;
        };
        let QuestionBody::Code(code) = &question.body else {
            continue;
        };
        let request = RunRequest {
            ticket: RunTicket { question_id: question.id.clone(), generation: 0 },
            code: source.clone(),
            language: language.clone(),
            sample_cases: code.sample_cases.clone(),
        };
        match executor.run(&request).await {
            Ok(report) => println!("{}: {}/{} sample cases passed", question.id, report.passed, report.total),
            Err(err) => println!("{}: {err}", question.id),
        }
    }

    let progress = controller.progress();
    tracing::info!(answered = progress.answered, total = progress.total, "Answers recorded");

    let submission_id = submit_with_retries(settings, &controller, answers.confirm_incomplete).await?;
    println!("Submitted as {submission_id}");

    let breakdown = fetch_results(backend.as_ref(), &submission_id)
        .await
        .context("Failed to fetch results")?;
    Ok(ResultsSummary::from_breakdown(breakdown, test.passing_marks))
}

async fn submit_with_retries(
    settings: &Settings,
    controller: &SessionController,
    confirm_incomplete: bool,
) -> Result<String> {
    let max_retries = settings.session().auto_submit_max_retries;
    let base = settings.session().auto_submit_retry_base_seconds;
    let mut attempt = 0;

    loop {
        let outcome = if confirm_incomplete {
            controller.submit_confirmed().await
        } else {
            controller.submit().await
        };

        match outcome {
            Ok(SubmitOutcome::Completed { submission_id })
            | Ok(SubmitOutcome::AlreadyCompleted { submission_id }) => return Ok(submission_id),
            Ok(SubmitOutcome::Incomplete { unanswered }) => {
                bail!("Unanswered questions: {}; pass confirmIncomplete to submit anyway", unanswered.join(", "))
            }
            Ok(SubmitOutcome::AlreadySubmitting) => sleep(Duration::from_millis(200)).await,
            Err(SessionError::Submit { recoverable: true, source }) if attempt < max_retries => {
                let delay = base.saturating_mul(2u64.saturating_pow(attempt));
                attempt += 1;
                tracing::warn!(error = %source, attempt, delay_seconds = delay, "Submit failed; retrying");
                sleep(Duration::from_secs(delay)).await;
            }
            Err(SessionError::Submit { source: ClientError::NotAuthenticated, .. }) => {
                bail!("Not authenticated; set ASSESSMENT_API_TOKEN")
            }
            Err(err) => return Err(err.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{MockBackend, SCENARIO_TEST_ID};
    use serde_json::json;

    #[tokio::test]
    async fn drive_submits_scripted_answers_and_summarizes() {
        let backend = MockBackend::new();
        backend.set_results(json!({
            "submissionId": "sub-1",
            "responses": [
                {"questionId": "q1", "type": "MCQ", "score": 1, "maxMarks": 1},
                {"questionId": "q2", "type": "MCQ", "score": 0, "maxMarks": 1},
                {"questionId": "q3", "type": "CODE", "maxMarks": 3}
            ]
        }));
        let answers: ScriptedAnswers = serde_json::from_value(json!({
            "runCode": true,
            "responses": [
                {"questionId": "q1", "type": "MCQ", "answer": "a"},
                {"questionId": "q2", "type": "MCQ", "answer": "b"},
                {"questionId": "q3", "type": "CODE", "code": "print(3)", "language": "python"}
            ]
        }))
        .unwrap();

        let settings = Settings::for_base_url("http://127.0.0.1:9");
        let summary = drive(&settings, backend.clone(), SCENARIO_TEST_ID, answers).await.unwrap();

        assert_eq!(backend.execute_calls(), 1);
        assert_eq!(backend.submitted_requests()[0].responses.len(), 3);
        assert_eq!(summary.submission_id, "sub-1");
        assert_eq!(summary.scored_total, 1.0);
        assert_eq!(summary.pending, 1);
    }

    #[tokio::test]
    async fn incomplete_answers_need_confirmation() {
        let backend = MockBackend::new();
        let answers: ScriptedAnswers = serde_json::from_value(json!({
            "responses": [{"questionId": "q1", "type": "MCQ", "answer": "a"}]
        }))
        .unwrap();

        let settings = Settings::for_base_url("http://127.0.0.1:9");
        let err = drive(&settings, backend.clone(), SCENARIO_TEST_ID, answers).await.unwrap_err();
        assert!(err.to_string().contains("q2, q3"));
        assert_eq!(backend.submit_calls(), 0);
    }
}
