//! Worker - DispatchChannel のリファレンス実装
//!
//! 1 スレッド = 1 チャネル。producer はいくつでもよい。

mod config;
mod state;
mod stats;
mod thread;

pub use self::config::{PanicPolicy, WorkerBuilder, WorkerConfig};
pub use self::state::WorkerState;
pub use self::stats::WorkerStats;
pub use self::thread::WorkerThread;
