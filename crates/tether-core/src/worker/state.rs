//! Worker state machine.

use std::sync::atomic::{AtomicU8, Ordering};

use serde::{Deserialize, Serialize};

/// Lifecycle of a worker thread.
///
/// State transitions:
/// - Idle -> Waiting (loop started)
/// - Waiting -> Running -> Waiting (one capsule)
/// - Waiting -> Terminated (`Exit` received or every sender dropped)
/// - Running -> Terminated (panic under `PanicPolicy::Propagate`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerState {
    /// Thread spawned, loop not entered yet.
    Idle,

    /// Blocked on the queue.
    Waiting,

    /// Invoking a capsule.
    Running,

    /// Loop exited; the thread is gone or about to be.
    Terminated,
}

impl WorkerState {
    /// Is this a terminal state (no further transitions)?
    pub fn is_terminal(self) -> bool {
        matches!(self, WorkerState::Terminated)
    }

    fn as_u8(self) -> u8 {
        match self {
            WorkerState::Idle => 0,
            WorkerState::Waiting => 1,
            WorkerState::Running => 2,
            WorkerState::Terminated => 3,
        }
    }

    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => WorkerState::Idle,
            1 => WorkerState::Waiting,
            2 => WorkerState::Running,
            _ => WorkerState::Terminated,
        }
    }
}

/// Lock-free cell holding the current [`WorkerState`].
#[derive(Debug)]
pub(crate) struct StateCell(AtomicU8);

impl StateCell {
    pub(crate) fn new(state: WorkerState) -> Self {
        Self(AtomicU8::new(state.as_u8()))
    }

    pub(crate) fn get(&self) -> WorkerState {
        WorkerState::from_u8(self.0.load(Ordering::Acquire))
    }

    pub(crate) fn set(&self, state: WorkerState) {
        self.0.store(state.as_u8(), Ordering::Release);
    }
}
