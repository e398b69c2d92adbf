use std::fmt;

use serde::{Deserialize, Serialize};

/// Question kind. The wire names are the backend's upper-case type tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum QuestionKind {
    #[serde(rename = "MCQ", alias = "mcq")]
    Choice,
    #[serde(rename = "DESCRIPTIVE", alias = "descriptive")]
    FreeText,
    #[serde(rename = "CODE", alias = "code")]
    Code,
}

impl QuestionKind {
    pub fn as_wire(self) -> &'static str {
        match self {
            QuestionKind::Choice => "MCQ",
            QuestionKind::FreeText => "DESCRIPTIVE",
            QuestionKind::Code => "CODE",
        }
    }
}

impl fmt::Display for QuestionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_wire())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Loading,
    InProgress,
    Submitting,
    Completed,
    Failed,
}

impl SessionState {
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionState::Completed | SessionState::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SessionState::Loading => "loading",
            SessionState::InProgress => "in_progress",
            SessionState::Submitting => "submitting",
            SessionState::Completed => "completed",
            SessionState::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EvaluationStatus {
    #[serde(rename = "AUTO_EVALUATED", alias = "auto_evaluated", alias = "autoEvaluated")]
    AutoEvaluated,
    #[serde(
        rename = "PENDING_MANUAL_REVIEW",
        alias = "pending_manual_review",
        alias = "pendingManualReview",
        alias = "PENDING",
        alias = "pending"
    )]
    PendingManualReview,
    #[serde(rename = "EVALUATED", alias = "evaluated")]
    Evaluated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionStatus {
    #[serde(rename = "PASSED", alias = "passed", alias = "Passed")]
    Passed,
    #[serde(rename = "FAILED", alias = "failed", alias = "Failed")]
    Failed,
    #[serde(rename = "ERROR", alias = "error", alias = "Error")]
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntegrityEventKind {
    TabBlur,
    TabFocus,
    VisibilityHidden,
    VisibilityVisible,
    FullscreenExit,
}

impl IntegrityEventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            IntegrityEventKind::TabBlur => "tab_blur",
            IntegrityEventKind::TabFocus => "tab_focus",
            IntegrityEventKind::VisibilityHidden => "visibility_hidden",
            IntegrityEventKind::VisibilityVisible => "visibility_visible",
            IntegrityEventKind::FullscreenExit => "fullscreen_exit",
        }
    }
}
