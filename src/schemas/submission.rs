use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::deserialize_id;
use crate::core::time::format_offset;
use crate::domain::models::{Answer, IntegrityEvent, Response};
use crate::domain::types::{IntegrityEventKind, QuestionKind};
use crate::session::payload::SubmissionPayload;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionRequest {
    pub responses: Vec<ResponseEntryDto>,
    pub metadata: SubmissionMetadataDto,
}

/// One answered question. MCQ answers carry the selected option in `answer`
/// when exactly one is selected, and always in `selectedOptions`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseEntryDto {
    #[serde(deserialize_with = "deserialize_id")]
    pub question_id: String,
    #[serde(rename = "type")]
    pub kind: QuestionKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_options: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionMetadataDto {
    pub attempt_id: String,
    pub started_at: String,
    pub submitted_at: String,
    pub auto_submitted: bool,
    #[serde(default)]
    pub integrity_events: Vec<IntegrityEventDto>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntegrityEventDto {
    pub kind: IntegrityEventKind,
    pub at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponseDto {
    #[serde(deserialize_with = "deserialize_id", alias = "submission_id", alias = "id")]
    pub submission_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftRequest {
    pub attempt_id: String,
    pub saved_at: String,
    pub responses: Vec<ResponseEntryDto>,
}

impl SubmissionRequest {
    pub fn from_payload(payload: &SubmissionPayload) -> Self {
        Self {
            responses: payload.entries().iter().map(ResponseEntryDto::from_response).collect(),
            metadata: SubmissionMetadataDto {
                attempt_id: payload.attempt_id().to_string(),
                started_at: format_offset(payload.started_at()),
                submitted_at: format_offset(payload.submitted_at()),
                auto_submitted: payload.auto_submitted(),
                integrity_events: payload
                    .integrity_events()
                    .iter()
                    .map(IntegrityEventDto::from_event)
                    .collect(),
            },
        }
    }
}

impl DraftRequest {
    pub fn new(attempt_id: &str, saved_at: OffsetDateTime, responses: &[Response]) -> Self {
        Self {
            attempt_id: attempt_id.to_string(),
            saved_at: format_offset(saved_at),
            responses: responses.iter().map(ResponseEntryDto::from_response).collect(),
        }
    }
}

impl IntegrityEventDto {
    fn from_event(event: &IntegrityEvent) -> Self {
        Self { kind: event.kind, at: format_offset(event.at) }
    }
}

impl ResponseEntryDto {
    pub fn from_response(response: &Response) -> Self {
        let mut entry = Self {
            question_id: response.question_id.clone(),
            kind: response.kind(),
            answer: None,
            selected_options: None,
            code: None,
            language: None,
        };

        match &response.answer {
            Answer::Choice { selected } => {
                if selected.len() == 1 {
                    entry.answer = selected.iter().next().cloned();
                }
                entry.selected_options = Some(selected.iter().cloned().collect());
            }
            Answer::FreeText { text } => entry.answer = Some(text.clone()),
            Answer::Code { source, language } => {
                entry.code = Some(source.clone());
                entry.language = Some(language.clone());
            }
        }

        entry
    }

    /// Inverse of `from_response`; `None` when required fields are absent.
    pub fn into_response(self) -> Option<Response> {
        let answer = match self.kind {
            QuestionKind::Choice => {
                let selected: BTreeSet<String> = match (self.selected_options, self.answer) {
                    (Some(options), _) => options.into_iter().collect(),
                    (None, Some(single)) => BTreeSet::from([single]),
                    (None, None) => return None,
                };
                Answer::Choice { selected }
            }
            QuestionKind::FreeText => Answer::FreeText { text: self.answer? },
            QuestionKind::Code => Answer::Code { source: self.code?, language: self.language? },
        };
        Some(Response { question_id: self.question_id, answer })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn choice_entry_carries_single_answer_and_selection() {
        let response =
            Response { question_id: "q1".to_string(), answer: Answer::single_choice("b") };
        let value = serde_json::to_value(ResponseEntryDto::from_response(&response)).unwrap();
        assert_eq!(
            value,
            json!({"questionId": "q1", "type": "MCQ", "answer": "b", "selectedOptions": ["b"]})
        );
    }

    #[test]
    fn code_entry_uses_code_and_language_fields() {
        let response = Response {
            question_id: "q3".to_string(),
            answer: Answer::Code { source: "print(1)".to_string(), language: "python".to_string() },
        };
        let value = serde_json::to_value(ResponseEntryDto::from_response(&response)).unwrap();
        assert_eq!(
            value,
            json!({"questionId": "q3", "type": "CODE", "code": "print(1)", "language": "python"})
        );
    }

    #[test]
    fn into_response_accepts_bare_mcq_answer() {
        let entry: ResponseEntryDto =
            serde_json::from_value(json!({"questionId": 5, "type": "MCQ", "answer": "c"}))
                .unwrap();
        let response = entry.into_response().expect("response");
        assert_eq!(response.question_id, "5");
        assert_eq!(response.answer, Answer::single_choice("c"));
    }

    #[test]
    fn into_response_rejects_code_without_language() {
        let entry: ResponseEntryDto =
            serde_json::from_value(json!({"questionId": "q3", "type": "CODE", "code": "x"}))
                .unwrap();
        assert!(entry.into_response().is_none());
    }

    #[test]
    fn submit_response_accepts_id_aliases() {
        let parsed: SubmitResponseDto = serde_json::from_value(json!({"id": 991})).unwrap();
        assert_eq!(parsed.submission_id, "991");
        let parsed: SubmitResponseDto =
            serde_json::from_value(json!({"submissionId": "sub-1"})).unwrap();
        assert_eq!(parsed.submission_id, "sub-1");
    }
}
