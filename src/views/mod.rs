pub mod choice;
pub mod code;
pub mod free_text;

use std::sync::Arc;

use thiserror::Error;

use crate::domain::models::{Answer, ExecutionReport, Question, QuestionBody, Test};
use crate::domain::types::QuestionKind;
use crate::services::code_execution::{ExecutionError, RunRequest, RunTicket};
use crate::session::{SessionController, SessionError, WriteOutcome};

pub use choice::ChoiceView;
pub use code::{CodeView, RunPanel};
pub use free_text::FreeTextView;

/// Change a view wants written to the response store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseChange {
    Upsert(Answer),
    Clear,
}

impl ResponseChange {
    pub fn apply(
        self,
        controller: &SessionController,
        question_id: &str,
    ) -> Result<WriteOutcome, SessionError> {
        match self {
            ResponseChange::Upsert(answer) => controller.record_response(question_id, answer),
            ResponseChange::Clear => controller.clear_response(question_id),
        }
    }
}

#[derive(Debug, Error)]
pub enum ViewError {
    #[error("current question is {actual}, not {expected}")]
    WrongKind { expected: QuestionKind, actual: QuestionKind },
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Execution(#[from] ExecutionError),
}

/// One view per question kind.
#[derive(Debug, Clone)]
pub enum QuestionView {
    Choice(ChoiceView),
    FreeText(FreeTextView),
    Code(CodeView),
}

impl QuestionView {
    pub fn for_question(question: &Question, prior: Option<&Answer>) -> Self {
        match &question.body {
            QuestionBody::Choice(choice) => {
                QuestionView::Choice(ChoiceView::new(&question.id, choice, prior))
            }
            QuestionBody::FreeText(free_text) => {
                QuestionView::FreeText(FreeTextView::new(&question.id, free_text, prior))
            }
            QuestionBody::Code(code) => QuestionView::Code(CodeView::new(&question.id, code, prior)),
        }
    }

    pub fn question_id(&self) -> &str {
        match self {
            QuestionView::Choice(view) => view.question_id(),
            QuestionView::FreeText(view) => view.question_id(),
            QuestionView::Code(view) => view.question_id(),
        }
    }

    pub fn kind(&self) -> QuestionKind {
        match self {
            QuestionView::Choice(_) => QuestionKind::Choice,
            QuestionView::FreeText(_) => QuestionKind::FreeText,
            QuestionView::Code(_) => QuestionKind::Code,
        }
    }
}

/// Walks a loaded test one question at a time and writes every local edit
/// through the session controller.
///
/// Leaving a question abandons its pending code run, so a late result can
/// never land on a different question.
pub struct QuestionNavigator {
    controller: SessionController,
    test: Arc<Test>,
    index: usize,
    current: QuestionView,
}

impl QuestionNavigator {
    pub fn new(controller: SessionController) -> Result<Self, SessionError> {
        let test = controller.test().ok_or(SessionError::NotStarted)?;
        let first = test.questions.first().ok_or(SessionError::NotStarted)?;
        let current = QuestionView::for_question(first, controller.answer(&first.id).as_ref());
        Ok(Self { controller, test, index: 0, current })
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn len(&self) -> usize {
        self.test.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.test.questions.is_empty()
    }

    pub fn question(&self) -> &Question {
        &self.test.questions[self.index]
    }

    pub fn current(&self) -> &QuestionView {
        &self.current
    }

    pub fn go_to(&mut self, index: usize) -> bool {
        let Some(question) = self.test.questions.get(index) else {
            return false;
        };
        if let QuestionView::Code(view) = &mut self.current {
            view.abandon_run();
        }
        self.index = index;
        self.current =
            QuestionView::for_question(question, self.controller.answer(&question.id).as_ref());
        true
    }

    pub fn next(&mut self) -> bool {
        self.go_to(self.index + 1)
    }

    pub fn previous(&mut self) -> bool {
        self.index.checked_sub(1).is_some_and(|index| self.go_to(index))
    }

    pub fn toggle_option(&mut self, option_id: &str) -> Result<WriteOutcome, ViewError> {
        let QuestionView::Choice(view) = &mut self.current else {
            return Err(self.wrong_kind(QuestionKind::Choice));
        };
        let change = view.toggle(option_id);
        Ok(change.apply(&self.controller, view.question_id())?)
    }

    pub fn set_text(&mut self, text: &str) -> Result<WriteOutcome, ViewError> {
        let QuestionView::FreeText(view) = &mut self.current else {
            return Err(self.wrong_kind(QuestionKind::FreeText));
        };
        let change = view.set_text(text);
        Ok(change.apply(&self.controller, view.question_id())?)
    }

    pub fn set_source(&mut self, source: &str) -> Result<WriteOutcome, ViewError> {
        let QuestionView::Code(view) = &mut self.current else {
            return Err(self.wrong_kind(QuestionKind::Code));
        };
        let change = view.set_source(source);
        Ok(change.apply(&self.controller, view.question_id())?)
    }

    pub fn begin_run(&mut self) -> Result<RunRequest, ViewError> {
        let QuestionView::Code(view) = &mut self.current else {
            return Err(self.wrong_kind(QuestionKind::Code));
        };
        Ok(view.begin_run()?)
    }

    /// Returns whether the result was applied to the current question.
    pub fn finish_run(
        &mut self,
        ticket: &RunTicket,
        result: Result<ExecutionReport, ExecutionError>,
    ) -> bool {
        match &mut self.current {
            QuestionView::Code(view) => view.finish_run(ticket, result),
            _ => false,
        }
    }

    fn wrong_kind(&self, expected: QuestionKind) -> ViewError {
        ViewError::WrongKind { expected, actual: self.current.kind() }
    }
}
