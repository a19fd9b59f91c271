//! Single-slot holder for the submission awaiting push confirmation.
//!
//! Last write wins: a new capture replaces whatever was waiting. Each `set`
//! gets a fresh sequence number so a finished push can clear exactly the
//! submission it pushed and leave a newer capture alone.

use std::sync::Mutex;

use tracing::{debug, info};

use crate::submission::Submission;

/// A pending submission and the sequence number it was stored under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pending {
    pub seq: u64,
    pub submission: Submission,
}

#[derive(Debug, Default)]
struct Slot {
    next_seq: u64,
    current: Option<Pending>,
}

#[derive(Debug, Default)]
pub struct PendingSlot {
    slot: Mutex<Slot>,
}

impl PendingSlot {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Slot> {
        // Slot state stays valid even if a holder panicked.
        self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Store `submission`, replacing any previous one. Returns its sequence number.
    pub fn set(&self, submission: Submission) -> u64 {
        let mut slot = self.lock();
        slot.next_seq += 1;
        let seq = slot.next_seq;
        if let Some(previous) = slot.current.as_ref() {
            info!(
                replaced = %previous.submission.slug,
                slug = %submission.slug,
                "Pending submission overwritten"
            );
        }
        slot.current = Some(Pending { seq, submission });
        seq
    }

    pub fn peek(&self) -> Option<Pending> {
        self.lock().current.clone()
    }

    pub fn take_and_clear(&self) -> Option<Submission> {
        self.lock().current.take().map(|pending| pending.submission)
    }

    /// Clear only if the slot still holds the submission stored under `seq`.
    pub fn clear_if_current(&self, seq: u64) -> bool {
        let mut slot = self.lock();
        match slot.current.as_ref() {
            Some(pending) if pending.seq == seq => {
                slot.current = None;
                true
            }
            _ => {
                debug!(seq, "Pending slot changed since push started, leaving it");
                false
            }
        }
    }
}
