use super::ResponseChange;
use crate::domain::models::{Answer, FreeTextQuestion};

#[derive(Debug, Clone)]
pub struct FreeTextView {
    question_id: String,
    expected_word_count: Option<u32>,
    text: String,
}

impl FreeTextView {
    pub fn new(question_id: &str, question: &FreeTextQuestion, prior: Option<&Answer>) -> Self {
        let text = match prior {
            Some(Answer::FreeText { text }) => text.clone(),
            _ => String::new(),
        };
        Self {
            question_id: question_id.to_string(),
            expected_word_count: question.expected_word_count,
            text,
        }
    }

    pub fn question_id(&self) -> &str {
        &self.question_id
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Called on every edit. Blank text clears the answer.
    pub fn set_text(&mut self, text: &str) -> ResponseChange {
        self.text = text.to_string();
        if self.text.trim().is_empty() {
            ResponseChange::Clear
        } else {
            ResponseChange::Upsert(Answer::FreeText { text: self.text.clone() })
        }
    }

    pub fn word_count(&self) -> usize {
        self.text.split_whitespace().count()
    }

    pub fn expected_word_count(&self) -> Option<u32> {
        self.expected_word_count
    }

    /// Advisory only; never blocks recording or submission.
    pub fn exceeds_expected_length(&self) -> bool {
        self.expected_word_count
            .is_some_and(|expected| self.word_count() > expected as usize)
    }
}
