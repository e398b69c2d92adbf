use std::collections::BTreeSet;

use super::ResponseChange;
use crate::domain::models::{Answer, ChoiceOption, ChoiceQuestion};

/// Selection state for one choice question. Every toggle yields the change to
/// record; there is no confirm step.
#[derive(Debug, Clone)]
pub struct ChoiceView {
    question_id: String,
    options: Vec<ChoiceOption>,
    multi_select: bool,
    selected: BTreeSet<String>,
}

impl ChoiceView {
    pub fn new(question_id: &str, question: &ChoiceQuestion, prior: Option<&Answer>) -> Self {
        let selected = match prior {
            Some(Answer::Choice { selected }) => selected.clone(),
            _ => BTreeSet::new(),
        };
        Self {
            question_id: question_id.to_string(),
            options: question.options.clone(),
            multi_select: question.multi_select,
            selected,
        }
    }

    pub fn question_id(&self) -> &str {
        &self.question_id
    }

    pub fn options(&self) -> &[ChoiceOption] {
        &self.options
    }

    pub fn multi_select(&self) -> bool {
        self.multi_select
    }

    pub fn is_selected(&self, option_id: &str) -> bool {
        self.selected.contains(option_id)
    }

    /// Single-select replaces the selection; toggling the selected option
    /// again clears it.
    pub fn toggle(&mut self, option_id: &str) -> ResponseChange {
        if !self.selected.remove(option_id) {
            if !self.multi_select {
                self.selected.clear();
            }
            self.selected.insert(option_id.to_string());
        }

        if self.selected.is_empty() {
            ResponseChange::Clear
        } else {
            ResponseChange::Upsert(Answer::Choice { selected: self.selected.clone() })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(multi_select: bool) -> ChoiceQuestion {
        ChoiceQuestion {
            options: ["a", "b", "c"]
                .iter()
                .map(|id| ChoiceOption { id: id.to_string(), text: id.to_uppercase() })
                .collect(),
            multi_select,
        }
    }

    #[test]
    fn single_select_replaces_previous_choice() {
        let mut view = ChoiceView::new("q1", &question(false), None);
        view.toggle("a");
        let change = view.toggle("b");
        assert_eq!(change, ResponseChange::Upsert(Answer::single_choice("b")));
        assert!(!view.is_selected("a"));
    }

    #[test]
    fn deselecting_last_option_clears() {
        let mut view = ChoiceView::new("q1", &question(false), Some(&Answer::single_choice("c")));
        assert!(view.is_selected("c"));
        assert_eq!(view.toggle("c"), ResponseChange::Clear);
    }

    #[test]
    fn multi_select_accumulates() {
        let mut view = ChoiceView::new("q1", &question(true), None);
        view.toggle("a");
        let change = view.toggle("c");
        let expected = BTreeSet::from(["a".to_string(), "c".to_string()]);
        assert_eq!(change, ResponseChange::Upsert(Answer::Choice { selected: expected }));
    }
}
