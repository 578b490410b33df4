//! WorkerConfig / WorkerBuilder - ワーカースレッドの設定と構築
//!
//! # 使用例
//! ```ignore
//! let worker = WorkerThread::builder()
//!     .name("audio")
//!     .panic_policy(PanicPolicy::Isolate)
//!     .spawn()?;
//! ```

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::thread::WorkerThread;
use crate::error::DelegateError;

/// What the worker does when a dispatched call panics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PanicPolicy {
    /// Catch the panic, log it, keep serving the queue.
    #[default]
    Isolate,
    /// Let the panic unwind out of the loop; the worker thread ends.
    Propagate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// OS thread name, also used as the channel name.
    pub name: String,
    pub panic_policy: PanicPolicy,
}

impl WorkerConfig {
    pub const DEFAULT_NAME: &'static str = "tether-worker";

    /// Parses a config from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, DelegateError> {
        Ok(serde_json::from_str(json)?)
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            name: Self::DEFAULT_NAME.to_string(),
            panic_policy: PanicPolicy::default(),
        }
    }
}

/// Fluent construction of a [`WorkerThread`].
#[derive(Debug, Default)]
pub struct WorkerBuilder {
    config: WorkerConfig,
}

impl WorkerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from an existing config (e.g. one loaded from JSON).
    pub fn config(mut self, config: WorkerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.config.name = name.into();
        self
    }

    pub fn panic_policy(mut self, policy: PanicPolicy) -> Self {
        self.config.panic_policy = policy;
        self
    }

    /// Spawns the worker thread.
    pub fn spawn(self) -> Result<Arc<WorkerThread>, DelegateError> {
        WorkerThread::spawn(self.config)
    }
}
