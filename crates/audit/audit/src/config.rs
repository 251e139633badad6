use crate::error::AuditError;

/// Default capacity of the admission queue.
pub const DEFAULT_MAX_QUEUE_SIZE: usize = 1000;

/// Default upper bound on records handed to the sink per call.
pub const DEFAULT_BATCH_SIZE: usize = 32;

/// Sizing for the background batch logger.
///
/// `max_queue_size` bounds memory and the backpressure window: producers
/// block once that many records are waiting. `batch_size` bounds I/O call
/// granularity and how long a record can sit behind others before it is
/// flushed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchLoggerConfig {
    /// Capacity of the admission queue.
    pub max_queue_size: usize,
    /// Maximum number of records per sink call.
    pub batch_size: usize,
}

impl BatchLoggerConfig {
    /// Create a configuration with the default sizes.
    pub fn new() -> Self {
        Self {
            max_queue_size: DEFAULT_MAX_QUEUE_SIZE,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    /// Set the queue capacity.
    #[must_use]
    pub fn with_max_queue_size(mut self, size: usize) -> Self {
        self.max_queue_size = size;
        self
    }

    /// Set the batch size.
    #[must_use]
    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = size;
        self
    }

    /// Reject sizes the queue cannot honour.
    pub fn validate(&self) -> Result<(), AuditError> {
        if self.max_queue_size == 0 {
            return Err(AuditError::Configuration(
                "max_queue_size must be at least 1".to_owned(),
            ));
        }
        if self.batch_size == 0 {
            return Err(AuditError::Configuration(
                "batch_size must be at least 1".to_owned(),
            ));
        }
        Ok(())
    }
}

impl Default for BatchLoggerConfig {
    fn default() -> Self {
        Self::new()
    }
}
