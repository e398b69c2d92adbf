use time::OffsetDateTime;

use crate::domain::models::{IntegrityEvent, Response, Test};

/// Flattened, immutable answer set for one submit attempt.
///
/// Entries follow the test's question order so the same store always yields
/// byte-identical requests.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionPayload {
    attempt_id: String,
    started_at: OffsetDateTime,
    submitted_at: OffsetDateTime,
    auto_submitted: bool,
    entries: Vec<Response>,
    integrity_events: Vec<IntegrityEvent>,
}

#[derive(Debug, Clone)]
pub(crate) struct AttemptMetadata {
    pub(crate) attempt_id: String,
    pub(crate) started_at: OffsetDateTime,
    pub(crate) submitted_at: OffsetDateTime,
    pub(crate) auto_submitted: bool,
    pub(crate) integrity_events: Vec<IntegrityEvent>,
}

impl SubmissionPayload {
    pub(crate) fn build(test: &Test, snapshot: Vec<Response>, metadata: AttemptMetadata) -> Self {
        let mut entries: Vec<Response> = snapshot
            .into_iter()
            .filter(|response| test.question(&response.question_id).is_some())
            .collect();
        entries.sort_by_key(|response| test.position(&response.question_id));

        Self {
            attempt_id: metadata.attempt_id,
            started_at: metadata.started_at,
            submitted_at: metadata.submitted_at,
            auto_submitted: metadata.auto_submitted,
            entries,
            integrity_events: metadata.integrity_events,
        }
    }

    pub fn entries(&self) -> &[Response] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn attempt_id(&self) -> &str {
        &self.attempt_id
    }

    pub fn started_at(&self) -> OffsetDateTime {
        self.started_at
    }

    pub fn submitted_at(&self) -> OffsetDateTime {
        self.submitted_at
    }

    pub fn auto_submitted(&self) -> bool {
        self.auto_submitted
    }

    pub fn integrity_events(&self) -> &[IntegrityEvent] {
        &self.integrity_events
    }

    pub fn question_ids(&self) -> Vec<&str> {
        self.entries.iter().map(|response| response.question_id.as_str()).collect()
    }
}
