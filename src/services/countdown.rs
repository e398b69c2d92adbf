use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::watch;
use tokio::time::{self, Duration, Instant, MissedTickBehavior};

const TICK: Duration = Duration::from_secs(1);

/// Fixed wall-clock end of an attempt. Re-arming a timer against the same
/// deadline never refunds time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline {
    at: Instant,
}

impl Deadline {
    pub fn after_seconds(seconds: i64) -> Self {
        let now = Instant::now();
        let at = match u64::try_from(seconds) {
            Ok(seconds) => now + Duration::from_secs(seconds),
            Err(_) => now,
        };
        Self { at }
    }

    pub fn instant(&self) -> Instant {
        self.at
    }

    /// Whole seconds left, floor-truncated, never negative.
    pub fn remaining_seconds(&self) -> u64 {
        self.at.saturating_duration_since(Instant::now()).as_secs()
    }

    pub fn has_passed(&self) -> bool {
        Instant::now() >= self.at
    }
}

/// Ticks once per second and calls `on_expire` exactly once at the deadline.
///
/// The remaining time is derived from the deadline on every tick, so
/// coalesced or skipped ticks (a throttled background tab) never make the
/// value jump upwards or go negative. Dropping the timer cancels it.
pub struct CountdownTimer {
    deadline: Deadline,
    remaining: watch::Receiver<u64>,
    expired: Arc<AtomicBool>,
    cancel: watch::Sender<bool>,
}

impl CountdownTimer {
    /// Must be called inside a Tokio runtime. A deadline that has already
    /// passed fires `on_expire` before this returns.
    pub fn start<F>(deadline: Deadline, on_expire: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        let (remaining_tx, remaining_rx) = watch::channel(deadline.remaining_seconds());
        let (cancel_tx, cancel_rx) = watch::channel(false);
        let expired = Arc::new(AtomicBool::new(false));

        if deadline.has_passed() {
            expired.store(true, Ordering::SeqCst);
            remaining_tx.send_replace(0);
            on_expire();
        } else {
            tokio::spawn(run_countdown(deadline, remaining_tx, cancel_rx, expired.clone(), on_expire));
        }

        Self { deadline, remaining: remaining_rx, expired, cancel: cancel_tx }
    }

    pub fn deadline(&self) -> Deadline {
        self.deadline
    }

    pub fn remaining_seconds(&self) -> u64 {
        if self.has_expired() {
            0
        } else {
            self.deadline.remaining_seconds()
        }
    }

    /// Per-second remaining-time updates for a UI clock.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.remaining.clone()
    }

    pub fn has_expired(&self) -> bool {
        self.expired.load(Ordering::SeqCst)
    }

    pub fn cancel(&self) {
        self.cancel.send_replace(true);
    }
}

impl Drop for CountdownTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}

async fn run_countdown<F>(
    deadline: Deadline,
    remaining_tx: watch::Sender<u64>,
    mut cancel_rx: watch::Receiver<bool>,
    expired: Arc<AtomicBool>,
    on_expire: F,
) where
    F: FnOnce() + Send + 'static,
{
    let mut on_expire = Some(on_expire);
    let mut ticks = time::interval_at(Instant::now() + TICK, TICK);
    ticks.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let expiry = time::sleep_until(deadline.instant());
    tokio::pin!(expiry);

    loop {
        tokio::select! {
            biased;
            changed = cancel_rx.changed() => {
                if changed.is_err() || *cancel_rx.borrow() {
                    tracing::debug!("countdown cancelled");
                    return;
                }
            }
            _ = &mut expiry => {
                remaining_tx.send_replace(0);
                if !expired.swap(true, Ordering::SeqCst) {
                    if let Some(callback) = on_expire.take() {
                        callback();
                    }
                }
                return;
            }
            _ = ticks.tick() => {
                let remaining = deadline.remaining_seconds();
                remaining_tx.send_if_modified(|current| {
                    if remaining < *current {
                        *current = remaining;
                        true
                    } else {
                        false
                    }
                });
            }
        }
    }
}
