use std::sync::{Arc, Weak};

use ::time::OffsetDateTime;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, Duration, Instant, MissedTickBehavior};

use crate::backend::AssessmentBackend;
use crate::core::metrics::AUTOSAVES_TOTAL;
use crate::core::time::now_utc;
use crate::domain::models::Response;
use crate::domain::types::SessionState;
use crate::schemas::submission::DraftRequest;

#[derive(Debug, Clone, PartialEq)]
pub enum AutosaveStatus {
    Idle,
    Saved { at: OffsetDateTime, revision: u64 },
    Failed { message: String },
}

#[derive(Debug, Clone)]
pub struct DraftSnapshot {
    pub revision: u64,
    pub responses: Vec<Response>,
}

pub trait DraftSource: Send + Sync + 'static {
    /// Current store contents, or `None` once the session stopped accepting
    /// writes.
    fn draft(&self) -> Option<DraftSnapshot>;
}

pub struct AutosaveConfig {
    pub test_id: String,
    pub attempt_id: String,
    pub interval: Duration,
}

/// Background draft saver. Aborted on drop.
pub struct AutosaveHandle {
    status: watch::Receiver<AutosaveStatus>,
    task: JoinHandle<()>,
}

impl AutosaveHandle {
    pub fn subscribe(&self) -> watch::Receiver<AutosaveStatus> {
        self.status.clone()
    }

    pub fn status(&self) -> AutosaveStatus {
        self.status.borrow().clone()
    }

    pub fn stop(&self) {
        self.task.abort();
    }
}

impl Drop for AutosaveHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

pub fn spawn<S: DraftSource>(
    backend: Arc<dyn AssessmentBackend>,
    config: AutosaveConfig,
    source: Weak<S>,
    state: watch::Receiver<SessionState>,
) -> AutosaveHandle {
    let (status_tx, status_rx) = watch::channel(AutosaveStatus::Idle);
    let task = tokio::spawn(run_autosave(backend, config, source, state, status_tx));
    AutosaveHandle { status: status_rx, task }
}

async fn run_autosave<S: DraftSource>(
    backend: Arc<dyn AssessmentBackend>,
    config: AutosaveConfig,
    source: Weak<S>,
    mut state: watch::Receiver<SessionState>,
    status: watch::Sender<AutosaveStatus>,
) {
    let mut ticks = time::interval_at(Instant::now() + config.interval, config.interval);
    ticks.set_missed_tick_behavior(MissedTickBehavior::Skip);
    // Revision 0 is an empty store; nothing worth saving.
    let mut saved_revision = 0;

    tracing::debug!(
        test_id = %config.test_id,
        interval_seconds = config.interval.as_secs(),
        "Autosave loop started"
    );

    loop {
        tokio::select! {
            changed = state.changed() => {
                if changed.is_err() || *state.borrow() != SessionState::InProgress {
                    break;
                }
            }
            _ = ticks.tick() => {
                let Some(snapshot) = source.upgrade().and_then(|source| source.draft()) else {
                    break;
                };
                if snapshot.revision == saved_revision {
                    continue;
                }

                let draft = DraftRequest::new(&config.attempt_id, now_utc(), &snapshot.responses);
                match backend.save_draft(&config.test_id, &draft).await {
                    Ok(()) => {
                        saved_revision = snapshot.revision;
                        metrics::counter!(AUTOSAVES_TOTAL, "status" => "saved").increment(1);
                        tracing::debug!(
                            test_id = %config.test_id,
                            revision = snapshot.revision,
                            responses = snapshot.responses.len(),
                            "Draft saved"
                        );
                        status.send_replace(AutosaveStatus::Saved {
                            at: now_utc(),
                            revision: snapshot.revision,
                        });
                    }
                    Err(err) => {
                        metrics::counter!(AUTOSAVES_TOTAL, "status" => "failed").increment(1);
                        tracing::warn!(
                            test_id = %config.test_id,
                            error = %err,
                            "Draft save failed"
                        );
                        status.send_replace(AutosaveStatus::Failed { message: err.to_string() });
                    }
                }
            }
        }
    }

    tracing::debug!(test_id = %config.test_id, "Autosave loop stopped");
}
