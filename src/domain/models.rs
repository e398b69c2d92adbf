use std::collections::BTreeSet;

use thiserror::Error;
use time::OffsetDateTime;

use super::types::{EvaluationStatus, ExecutionStatus, IntegrityEventKind, QuestionKind};

pub type QuestionId = String;

/// Immutable test definition. Owned by one session for its whole lifetime.
#[derive(Debug, Clone, PartialEq)]
pub struct Test {
    pub id: String,
    pub title: String,
    pub duration_minutes: u32,
    pub max_marks: f64,
    pub passing_marks: Option<f64>,
    pub questions: Vec<Question>,
}

impl Test {
    pub fn duration_seconds(&self) -> i64 {
        i64::from(self.duration_minutes) * 60
    }

    pub fn question(&self, question_id: &str) -> Option<&Question> {
        self.questions.iter().find(|question| question.id == question_id)
    }

    pub fn position(&self, question_id: &str) -> Option<usize> {
        self.questions.iter().position(|question| question.id == question_id)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Question {
    pub id: QuestionId,
    pub prompt: String,
    pub marks: f64,
    pub body: QuestionBody,
}

#[derive(Debug, Clone, PartialEq)]
pub enum QuestionBody {
    Choice(ChoiceQuestion),
    FreeText(FreeTextQuestion),
    Code(CodeQuestion),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChoiceQuestion {
    pub options: Vec<ChoiceOption>,
    pub multi_select: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChoiceOption {
    pub id: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FreeTextQuestion {
    /// Advisory only.
    pub expected_word_count: Option<u32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CodeQuestion {
    pub language: String,
    pub constraints: Option<String>,
    pub time_limit_ms: Option<u64>,
    pub memory_limit_mb: Option<u64>,
    pub sample_cases: Vec<SampleTestCase>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleTestCase {
    pub input: String,
    pub expected_output: String,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AnswerError {
    #[error("question {question_id} expects a {expected} answer, got {actual}")]
    KindMismatch { question_id: String, expected: QuestionKind, actual: QuestionKind },
    #[error("option {option_id} does not belong to question {question_id}")]
    UnknownOption { question_id: String, option_id: String },
    #[error("question {question_id} accepts a single selection")]
    TooManySelections { question_id: String },
}

impl Question {
    pub fn kind(&self) -> QuestionKind {
        match &self.body {
            QuestionBody::Choice(_) => QuestionKind::Choice,
            QuestionBody::FreeText(_) => QuestionKind::FreeText,
            QuestionBody::Code(_) => QuestionKind::Code,
        }
    }

    /// Checks that `answer` is shaped for this question.
    pub fn check_answer(&self, answer: &Answer) -> Result<(), AnswerError> {
        match (&self.body, answer) {
            (QuestionBody::Choice(choice), Answer::Choice { selected }) => {
                if !choice.multi_select && selected.len() > 1 {
                    return Err(AnswerError::TooManySelections { question_id: self.id.clone() });
                }
                if let Some(unknown) = selected
                    .iter()
                    .find(|option_id| !choice.options.iter().any(|option| &option.id == *option_id))
                {
                    return Err(AnswerError::UnknownOption {
                        question_id: self.id.clone(),
                        option_id: unknown.clone(),
                    });
                }
                Ok(())
            }
            (QuestionBody::FreeText(_), Answer::FreeText { .. })
            | (QuestionBody::Code(_), Answer::Code { .. }) => Ok(()),
            _ => Err(AnswerError::KindMismatch {
                question_id: self.id.clone(),
                expected: self.kind(),
                actual: answer.kind(),
            }),
        }
    }
}

/// Answer payload, one variant per question kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Answer {
    Choice { selected: BTreeSet<String> },
    FreeText { text: String },
    Code { source: String, language: String },
}

impl Answer {
    pub fn kind(&self) -> QuestionKind {
        match self {
            Answer::Choice { .. } => QuestionKind::Choice,
            Answer::FreeText { .. } => QuestionKind::FreeText,
            Answer::Code { .. } => QuestionKind::Code,
        }
    }

    /// No selection, or only whitespace. Never stored as an answer.
    pub fn is_empty(&self) -> bool {
        match self {
            Answer::Choice { selected } => selected.is_empty(),
            Answer::FreeText { text } => text.trim().is_empty(),
            Answer::Code { source, .. } => source.trim().is_empty(),
        }
    }

    pub fn single_choice(option_id: impl Into<String>) -> Self {
        Answer::Choice { selected: BTreeSet::from([option_id.into()]) }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub question_id: QuestionId,
    pub answer: Answer,
}

impl Response {
    pub fn kind(&self) -> QuestionKind {
        self.answer.kind()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IntegrityEvent {
    pub kind: IntegrityEventKind,
    pub at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TestCaseResult {
    pub status: ExecutionStatus,
    pub input: Option<String>,
    pub expected_output: Option<String>,
    pub actual_output: String,
    pub execution_time_ms: Option<u64>,
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionReport {
    pub results: Vec<TestCaseResult>,
    pub passed: usize,
    pub total: usize,
}

impl ExecutionReport {
    pub fn all_passed(&self) -> bool {
        self.total > 0 && self.passed == self.total
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GradedResponse {
    pub question_id: QuestionId,
    pub kind: QuestionKind,
    pub score: Option<f64>,
    pub max_marks: f64,
    pub status: EvaluationStatus,
    pub comments: Option<String>,
}

/// Read-only grading result for one submission.
#[derive(Debug, Clone, PartialEq)]
pub struct GradeBreakdown {
    pub submission_id: String,
    pub responses: Vec<GradedResponse>,
    pub total_score: Option<f64>,
    pub total_max: Option<f64>,
    pub passed: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn choice_question(multi_select: bool) -> Question {
        Question {
            id: "q1".to_string(),
            prompt: "Pick one".to_string(),
            marks: 1.0,
            body: QuestionBody::Choice(ChoiceQuestion {
                options: vec![
                    ChoiceOption { id: "a".to_string(), text: "A".to_string() },
                    ChoiceOption { id: "b".to_string(), text: "B".to_string() },
                ],
                multi_select,
            }),
        }
    }

    #[test]
    fn check_answer_accepts_known_option() {
        let question = choice_question(false);
        assert_eq!(question.check_answer(&Answer::single_choice("b")), Ok(()));
    }

    #[test]
    fn check_answer_rejects_unknown_option() {
        let question = choice_question(false);
        let err = question.check_answer(&Answer::single_choice("z")).unwrap_err();
        assert!(matches!(err, AnswerError::UnknownOption { option_id, .. } if option_id == "z"));
    }

    #[test]
    fn check_answer_enforces_single_select() {
        let selected = BTreeSet::from(["a".to_string(), "b".to_string()]);
        let single = choice_question(false);
        assert!(matches!(
            single.check_answer(&Answer::Choice { selected: selected.clone() }),
            Err(AnswerError::TooManySelections { .. })
        ));
        let multi = choice_question(true);
        assert_eq!(multi.check_answer(&Answer::Choice { selected }), Ok(()));
    }

    #[test]
    fn check_answer_rejects_kind_mismatch() {
        let question = choice_question(false);
        let err = question
            .check_answer(&Answer::FreeText { text: "free".to_string() })
            .unwrap_err();
        assert_eq!(
            err,
            AnswerError::KindMismatch {
                question_id: "q1".to_string(),
                expected: QuestionKind::Choice,
                actual: QuestionKind::FreeText,
            }
        );
    }

    #[test]
    fn blank_answers_are_empty() {
        assert!(Answer::Choice { selected: BTreeSet::new() }.is_empty());
        assert!(Answer::FreeText { text: " \n\t".to_string() }.is_empty());
        assert!(Answer::Code { source: "\n".to_string(), language: "python".to_string() }.is_empty());
        assert!(!Answer::single_choice("a").is_empty());
        assert!(!Answer::FreeText { text: "ok".to_string() }.is_empty());
    }
}
