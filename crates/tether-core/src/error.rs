use thiserror::Error;

#[derive(Debug, Error)]
pub enum DelegateError {
    /// The bound target was dropped before the call reached it.
    #[error("delegate target has been dropped")]
    TargetDropped,

    #[error("dispatch channel `{0}` is closed")]
    ChannelClosed(String),

    #[error("failed to spawn worker thread `{name}`")]
    Spawn {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("worker thread `{name}` panicked: {message}")]
    WorkerPanicked { name: String, message: String },

    #[error("invalid worker config: {0}")]
    Config(#[from] serde_json::Error),
}
