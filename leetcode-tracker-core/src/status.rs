//! Transient push status for whatever UI is watching.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::watch;

pub const DEFAULT_REVERT_AFTER: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PushStatus {
    Idle,
    Pushing,
    Succeeded,
    Failed,
}

/// Current [`PushStatus`]; flashed results fall back to `Idle` after a delay.
#[derive(Debug, Clone)]
pub struct StatusIndicator {
    tx: Arc<watch::Sender<PushStatus>>,
    generation: Arc<AtomicU64>,
    revert_after: Duration,
}

impl Default for StatusIndicator {
    fn default() -> Self {
        Self::new(DEFAULT_REVERT_AFTER)
    }
}

impl StatusIndicator {
    pub fn new(revert_after: Duration) -> Self {
        let (tx, _rx) = watch::channel(PushStatus::Idle);
        Self {
            tx: Arc::new(tx),
            generation: Arc::new(AtomicU64::new(0)),
            revert_after,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<PushStatus> {
        self.tx.subscribe()
    }

    pub fn current(&self) -> PushStatus {
        *self.tx.borrow()
    }

    /// Set a status that stays until replaced.
    pub fn set(&self, status: PushStatus) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.tx.send_replace(status);
    }

    /// Show `status`, then revert to `Idle` unless something else was shown
    /// in the meantime. Must be called inside a tokio runtime.
    pub fn flash(&self, status: PushStatus) {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.tx.send_replace(status);

        let tx = Arc::clone(&self.tx);
        let current = Arc::clone(&self.generation);
        let delay = self.revert_after;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if current.load(Ordering::SeqCst) == generation {
                tx.send_replace(PushStatus::Idle);
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn flash_reverts_to_idle_after_delay() {
        let indicator = StatusIndicator::new(Duration::from_secs(3));
        indicator.flash(PushStatus::Failed);
        assert_eq!(indicator.current(), PushStatus::Failed);

        tokio::time::sleep(Duration::from_millis(2_900)).await;
        assert_eq!(indicator.current(), PushStatus::Failed);

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(indicator.current(), PushStatus::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn newer_status_is_not_reverted_by_older_flash() {
        let indicator = StatusIndicator::new(Duration::from_secs(3));
        indicator.flash(PushStatus::Succeeded);
        tokio::time::sleep(Duration::from_secs(1)).await;
        indicator.set(PushStatus::Pushing);

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(indicator.current(), PushStatus::Pushing);
    }
}
