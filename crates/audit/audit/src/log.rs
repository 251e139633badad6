use async_trait::async_trait;

use crate::error::AuditError;

/// Producer-side entry point used by request handlers.
///
/// `Ok(())` means the record was queued, not that it is durably stored.
/// Persistence failures happen after this call returns and are never
/// reported back to the producer.
#[async_trait]
pub trait AuditLog: Send + Sync {
    /// Stamp the current time on a new record and queue it.
    async fn log(&self, action: &str, actor: &str, details: &str) -> Result<(), AuditError>;
}

/// An [`AuditLog`] that discards everything. Used when auditing is disabled.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopAuditLog;

#[async_trait]
impl AuditLog for NoopAuditLog {
    async fn log(&self, _action: &str, _actor: &str, _details: &str) -> Result<(), AuditError> {
        Ok(())
    }
}
