use serde::{Deserialize, Serialize};

use super::deserialize_id;
use crate::domain::models::{GradeBreakdown, GradedResponse};
use crate::domain::types::{EvaluationStatus, QuestionKind};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeBreakdownDto {
    #[serde(deserialize_with = "deserialize_id", alias = "submission_id", alias = "id")]
    pub submission_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "score")]
    pub total_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "maxScore", alias = "totalMarks")]
    pub total_max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub passed: Option<bool>,
    #[serde(default)]
    pub responses: Vec<GradedResponseDto>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradedResponseDto {
    #[serde(deserialize_with = "deserialize_id")]
    pub question_id: String,
    #[serde(rename = "type")]
    pub kind: QuestionKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(alias = "marks", alias = "maxScore")]
    pub max_marks: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evaluation_status: Option<EvaluationStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "comments")]
    pub evaluator_comments: Option<String>,
}

impl GradeBreakdownDto {
    pub fn into_domain(self) -> GradeBreakdown {
        GradeBreakdown {
            submission_id: self.submission_id,
            responses: self.responses.into_iter().map(GradedResponseDto::into_domain).collect(),
            total_score: self.total_score,
            total_max: self.total_max,
            passed: self.passed,
        }
    }
}

impl GradedResponseDto {
    /// Choice answers are always machine graded. Other kinds stay pending
    /// until the backend marks them evaluated.
    fn into_domain(self) -> GradedResponse {
        let status = match self.kind {
            QuestionKind::Choice => EvaluationStatus::AutoEvaluated,
            QuestionKind::FreeText | QuestionKind::Code => {
                self.evaluation_status.unwrap_or(EvaluationStatus::PendingManualReview)
            }
        };
        let score = match status {
            EvaluationStatus::PendingManualReview => None,
            EvaluationStatus::AutoEvaluated | EvaluationStatus::Evaluated => self.score,
        };

        GradedResponse {
            question_id: self.question_id,
            kind: self.kind,
            score,
            max_marks: self.max_marks,
            status,
            comments: self.evaluator_comments.filter(|text| !text.trim().is_empty()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn missing_status_defaults_by_kind() {
        let dto: GradeBreakdownDto = serde_json::from_value(json!({
            "submissionId": "sub-1",
            "responses": [
                {"questionId": "q1", "type": "MCQ", "score": 1, "maxMarks": 1},
                {"questionId": "q2", "type": "DESCRIPTIVE", "maxMarks": 2},
                {"questionId": "q3", "type": "CODE", "score": 2.5, "maxMarks": 3,
                 "evaluationStatus": "EVALUATED", "evaluatorComments": "Good"}
            ]
        }))
        .unwrap();

        let breakdown = dto.into_domain();
        let statuses: Vec<_> = breakdown.responses.iter().map(|item| item.status).collect();
        assert_eq!(
            statuses,
            vec![
                EvaluationStatus::AutoEvaluated,
                EvaluationStatus::PendingManualReview,
                EvaluationStatus::Evaluated
            ]
        );
        assert_eq!(breakdown.responses[2].comments.as_deref(), Some("Good"));
    }

    #[test]
    fn pending_review_never_carries_a_score() {
        let dto: GradeBreakdownDto = serde_json::from_value(json!({
            "submissionId": 4,
            "responses": [
                {"questionId": "q2", "type": "DESCRIPTIVE", "score": 0, "marks": 2,
                 "evaluationStatus": "pending"}
            ]
        }))
        .unwrap();

        let breakdown = dto.into_domain();
        assert_eq!(breakdown.submission_id, "4");
        assert_eq!(breakdown.responses[0].score, None);
    }
}
