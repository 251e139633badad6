use std::path::PathBuf;

use serde::Deserialize;

use luno_audit::{BatchLoggerConfig, DEFAULT_BATCH_SIZE, DEFAULT_MAX_QUEUE_SIZE};

/// Configuration for the audit trail.
///
/// ```toml
/// [audit]
/// enabled = true
/// path = "/var/log/luno/audit.log"
/// max_queue_size = 1000
/// batch_size = 32
/// ```
#[derive(Debug, Deserialize)]
pub struct AuditConfig {
    /// Whether audit recording is enabled.
    #[serde(default = "default_audit_enabled")]
    pub enabled: bool,
    /// Log file to append to. Defaults to `audit.log` next to the executable.
    #[serde(default)]
    pub path: Option<PathBuf>,
    /// Capacity of the admission queue.
    #[serde(default = "default_max_queue_size")]
    pub max_queue_size: usize,
    /// Maximum records per write.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

impl AuditConfig {
    /// Queue sizing for the batch logger.
    pub fn logger_config(&self) -> BatchLoggerConfig {
        BatchLoggerConfig::new()
            .with_max_queue_size(self.max_queue_size)
            .with_batch_size(self.batch_size)
    }
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: default_audit_enabled(),
            path: None,
            max_queue_size: default_max_queue_size(),
            batch_size: default_batch_size(),
        }
    }
}

fn default_audit_enabled() -> bool {
    true
}

fn default_max_queue_size() -> usize {
    DEFAULT_MAX_QUEUE_SIZE
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}
