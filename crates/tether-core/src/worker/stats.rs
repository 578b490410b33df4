use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Snapshot of a worker's counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerStats {
    /// Capsules accepted by `dispatch`.
    pub dispatched: u64,
    /// Capsules whose call ran to completion.
    pub completed: u64,
    /// Capsules skipped because their target was gone.
    pub target_dropped: u64,
    /// Capsules whose call panicked.
    pub panicked: u64,
    /// Capsules that returned any other error.
    pub failed: u64,
}

impl WorkerStats {
    /// Capsules accepted but not yet finished (or never to be, after a stop).
    pub fn pending(&self) -> u64 {
        self.dispatched
            .saturating_sub(self.completed + self.target_dropped + self.panicked + self.failed)
    }
}

#[derive(Debug, Default)]
pub(crate) struct Counters {
    pub(crate) dispatched: AtomicU64,
    pub(crate) completed: AtomicU64,
    pub(crate) target_dropped: AtomicU64,
    pub(crate) panicked: AtomicU64,
    pub(crate) failed: AtomicU64,
}

impl Counters {
    pub(crate) fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> WorkerStats {
        WorkerStats {
            dispatched: self.dispatched.load(Ordering::Relaxed),
            completed: self.completed.load(Ordering::Relaxed),
            target_dropped: self.target_dropped.load(Ordering::Relaxed),
            panicked: self.panicked.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}
