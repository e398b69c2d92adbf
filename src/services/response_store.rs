use std::collections::BTreeMap;

use crate::domain::models::{Answer, QuestionId, Response};

/// Authoritative answers for the active session, keyed by question id.
///
/// Clearing removes the entry instead of storing an empty answer, so the
/// answered count is always `len()`. The store keeps a revision counter that
/// only moves when contents actually change; autosave uses it to skip
/// unchanged snapshots.
#[derive(Debug, Default, Clone)]
pub struct ResponseStore {
    entries: BTreeMap<QuestionId, Answer>,
    revision: u64,
}

impl ResponseStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last write wins; no merging. Returns whether the stored answer changed.
    pub fn upsert(&mut self, question_id: &str, answer: Answer) -> bool {
        if self.entries.get(question_id) == Some(&answer) {
            return false;
        }
        self.entries.insert(question_id.to_string(), answer);
        self.revision += 1;
        true
    }

    pub fn clear(&mut self, question_id: &str) -> bool {
        let removed = self.entries.remove(question_id).is_some();
        if removed {
            self.revision += 1;
        }
        removed
    }

    pub fn get(&self, question_id: &str) -> Option<&Answer> {
        self.entries.get(question_id)
    }

    pub fn contains(&self, question_id: &str) -> bool {
        self.entries.contains_key(question_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Owned copy of the current contents. Later writes to the store never
    /// show up in a snapshot already taken.
    pub fn snapshot(&self) -> Vec<Response> {
        self.entries
            .iter()
            .map(|(question_id, answer)| Response {
                question_id: question_id.clone(),
                answer: answer.clone(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(value: &str) -> Answer {
        Answer::FreeText { text: value.to_string() }
    }

    #[test]
    fn upsert_is_idempotent() {
        let mut once = ResponseStore::new();
        once.upsert("q1", Answer::single_choice("a"));

        let mut twice = ResponseStore::new();
        assert!(twice.upsert("q1", Answer::single_choice("a")));
        assert!(!twice.upsert("q1", Answer::single_choice("a")));

        assert_eq!(once.snapshot(), twice.snapshot());
        assert_eq!(once.revision(), twice.revision());
    }

    #[test]
    fn upsert_overwrites_previous_answer() {
        let mut store = ResponseStore::new();
        store.upsert("q2", text("first"));
        store.upsert("q2", text("second"));

        assert_eq!(store.len(), 1);
        assert_eq!(store.get("q2"), Some(&text("second")));
    }

    #[test]
    fn snapshot_counts_distinct_uncleared_questions() {
        let mut store = ResponseStore::new();
        store.upsert("q1", Answer::single_choice("a"));
        store.upsert("q2", text("draft"));
        store.upsert("q3", text("other"));
        store.upsert("q1", Answer::single_choice("b"));
        store.clear("q2");
        store.clear("missing");

        let snapshot = store.snapshot();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.len(), store.len());
        assert!(!store.contains("q2"));
    }

    #[test]
    fn snapshot_is_detached_from_later_writes() {
        let mut store = ResponseStore::new();
        store.upsert("q1", text("before"));
        let snapshot = store.snapshot();

        store.upsert("q1", text("after"));
        store.upsert("q4", text("new"));

        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].answer, text("before"));
    }

    #[test]
    fn clear_only_bumps_revision_when_removing() {
        let mut store = ResponseStore::new();
        store.upsert("q1", text("x"));
        let revision = store.revision();

        assert!(!store.clear("q9"));
        assert_eq!(store.revision(), revision);
        assert!(store.clear("q1"));
        assert_eq!(store.revision(), revision + 1);
        assert!(store.is_empty());
    }
}
