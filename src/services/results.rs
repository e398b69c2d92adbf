use std::fmt;

use crate::backend::{AssessmentBackend, ClientError};
use crate::domain::models::{GradeBreakdown, GradedResponse};
use crate::domain::types::{EvaluationStatus, QuestionKind};

const KIND_ORDER: [QuestionKind; 3] =
    [QuestionKind::Choice, QuestionKind::FreeText, QuestionKind::Code];

#[derive(Debug, Clone, PartialEq)]
pub struct KindGroup {
    pub kind: QuestionKind,
    pub responses: Vec<GradedResponse>,
}

/// Read-only projection of a grade breakdown for display.
///
/// Only responses carrying a numeric score contribute to the aggregate.
/// Ungraded responses are counted as pending, never as zero.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultsSummary {
    pub submission_id: String,
    pub groups: Vec<KindGroup>,
    pub scored_total: f64,
    /// Total as reported by the backend, which may include adjustments.
    pub reported_total: Option<f64>,
    pub scored_max: f64,
    pub total_max: f64,
    pub pending: usize,
    pub passed: Option<bool>,
}

impl ResultsSummary {
    pub fn from_breakdown(breakdown: GradeBreakdown, passing_marks: Option<f64>) -> Self {
        let mut scored_total = 0.0;
        let mut scored_max = 0.0;
        let mut pending = 0;
        let mut all_max = 0.0;

        for response in &breakdown.responses {
            all_max += response.max_marks;
            match response.score {
                Some(score) => {
                    scored_total += score;
                    scored_max += response.max_marks;
                }
                None => pending += 1,
            }
        }

        let groups = KIND_ORDER
            .iter()
            .filter_map(|kind| {
                let responses: Vec<GradedResponse> = breakdown
                    .responses
                    .iter()
                    .filter(|response| response.kind == *kind)
                    .cloned()
                    .collect();
                (!responses.is_empty()).then_some(KindGroup { kind: *kind, responses })
            })
            .collect();

        let passed = breakdown.passed.or_else(|| match passing_marks {
            Some(threshold) if pending == 0 => Some(scored_total >= threshold),
            _ => None,
        });

        Self {
            submission_id: breakdown.submission_id,
            groups,
            scored_total,
            reported_total: breakdown.total_score,
            scored_max,
            total_max: breakdown.total_max.unwrap_or(all_max),
            pending,
            passed,
        }
    }

    /// Fraction of available marks earned across graded responses only.
    /// `None` until at least one response carries a score.
    pub fn partial_average(&self) -> Option<f64> {
        if self.scored_max > 0.0 {
            Some(self.scored_total / self.scored_max)
        } else {
            None
        }
    }

    pub fn is_final(&self) -> bool {
        self.pending == 0
    }
}

impl fmt::Display for ResultsSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Submission {}", self.submission_id)?;
        for group in &self.groups {
            writeln!(f, "[{}]", group.kind)?;
            for response in &group.responses {
                let score = match response.score {
                    Some(score) => format!("{score}/{}", response.max_marks),
                    None => format!("-/{}", response.max_marks),
                };
                write!(f, "  {:<12} {:<10} {}", response.question_id, score, status_label(response.status))?;
                if let Some(comments) = &response.comments {
                    write!(f, "  {comments}")?;
                }
                writeln!(f)?;
            }
        }
        write!(f, "Score: {}/{}", self.scored_total, self.total_max)?;
        if let Some(reported) = self.reported_total.filter(|reported| *reported != self.scored_total) {
            write!(f, " (reported {reported})")?;
        }
        if self.pending > 0 {
            write!(f, " ({} pending review)", self.pending)?;
        }
        match self.passed {
            Some(true) => write!(f, " PASSED"),
            Some(false) => write!(f, " NOT PASSED"),
            None => Ok(()),
        }
    }
}

fn status_label(status: EvaluationStatus) -> &'static str {
    match status {
        EvaluationStatus::AutoEvaluated => "auto",
        EvaluationStatus::PendingManualReview => "pending",
        EvaluationStatus::Evaluated => "evaluated",
    }
}

pub async fn fetch_results(
    backend: &dyn AssessmentBackend,
    submission_id: &str,
) -> Result<GradeBreakdown, ClientError> {
    let breakdown = backend.fetch_results(submission_id).await?.into_domain();
    tracing::info!(
        submission_id,
        responses = breakdown.responses.len(),
        "Fetched grade breakdown"
    );
    Ok(breakdown)
}
