//! DispatchChannel port - capsule を特定スレッドで実行させる抽象
//!
//! ホスト側のスレッド実装（`WorkerThread` など）がこの trait を実装する。

use std::fmt;

use crate::capsule::Capsule;
use crate::error::DelegateError;

/// Accepts capsules and runs each one on the channel's own thread.
///
/// # Contract
/// - `dispatch` never blocks and may be called from any thread.
/// - Capsules are invoked in the order they were accepted.
/// - Every accepted capsule is eventually invoked and dropped on the channel's
///   thread, unless the channel shuts down first, in which case it is dropped
///   without running.
pub trait DispatchChannel: Send + Sync {
    fn dispatch(&self, capsule: Box<dyn Capsule>) -> Result<(), DelegateError>;

    fn name(&self) -> &str;
}

/// Message carried by a worker queue.
pub enum ThreadMsg {
    Call(Box<dyn Capsule>),
    /// Cooperative stop request. Messages queued after it never run.
    Exit,
}

impl fmt::Debug for ThreadMsg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ThreadMsg::Call(capsule) => f.debug_tuple("Call").field(&capsule.describe()).finish(),
            ThreadMsg::Exit => f.write_str("Exit"),
        }
    }
}
