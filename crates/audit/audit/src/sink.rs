use async_trait::async_trait;

use crate::error::AuditError;
use crate::record::AuditRecord;

/// Durable destination for batches drained by the background logger.
///
/// The logger guarantees at most one `persist` call in flight at a time and
/// hands batches over in admission order, so implementations need no
/// locking of their own around the underlying resource.
#[async_trait]
pub trait AuditSink: Send + Sync {
    /// Persist a batch as one unit. An error discards the whole batch.
    async fn persist(&self, batch: &[AuditRecord]) -> Result<(), AuditError>;

    /// Short name used in log fields.
    fn name(&self) -> &str;
}
