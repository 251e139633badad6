use std::time::Duration;

/// Errors that can occur while admitting or persisting audit records.
#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    /// The logger has begun shutting down and no longer admits records.
    #[error("logger closed")]
    Closed,

    /// A non-blocking admission found the queue at capacity.
    #[error("audit queue full")]
    QueueFull,

    /// The consumer loop was already started (or has already stopped).
    #[error("audit logger already started")]
    AlreadyStarted,

    /// The logger configuration is invalid.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// An error from the underlying sink.
    #[error("storage error: {0}")]
    Storage(String),

    /// An I/O error raised while writing to a sink.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A serialization or deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The drain did not complete before the shutdown deadline.
    #[error("audit drain did not finish within {timeout:?}")]
    ShutdownTimeout {
        /// The deadline that expired.
        timeout: Duration,
    },

    /// The consumer loop terminated abnormally; nothing more will be drained.
    #[error("audit consumer failed: {0}")]
    ConsumerFailed(String),
}
