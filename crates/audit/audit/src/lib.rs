//! Asynchronous batch audit logging.
//!
//! Request handlers queue [`AuditRecord`]s through [`AuditLog`]; a
//! [`BatchAuditLogger`] drains them on one background task and persists them
//! in admission order through a pluggable [`AuditSink`].

pub mod config;
pub mod error;
pub mod log;
pub mod logger;
pub mod metrics;
pub mod record;
pub mod sink;

pub use config::{BatchLoggerConfig, DEFAULT_BATCH_SIZE, DEFAULT_MAX_QUEUE_SIZE};
pub use error::AuditError;
pub use log::{AuditLog, NoopAuditLog};
pub use logger::{BatchAuditLogger, LoggerState};
pub use metrics::{AuditMetrics, AuditMetricsSnapshot};
pub use record::AuditRecord;
pub use sink::AuditSink;
