use async_trait::async_trait;
use tokio::sync::RwLock;

use luno_audit::{AuditError, AuditRecord, AuditSink};

type BatchPredicate = Box<dyn Fn(&[AuditRecord]) -> bool + Send + Sync>;

/// In-memory audit sink. Suitable for development and testing.
///
/// Every accepted batch is kept as-is, so callers can check both record
/// order and how records were grouped into batches.
pub struct MemoryAuditSink {
    batches: RwLock<Vec<Vec<AuditRecord>>>,
    fail_when: Option<BatchPredicate>,
}

impl MemoryAuditSink {
    /// Create an empty sink that accepts every batch.
    pub fn new() -> Self {
        Self {
            batches: RwLock::new(Vec::new()),
            fail_when: None,
        }
    }

    /// Reject (and do not store) every batch matching `pred`.
    #[must_use]
    pub fn fail_when(
        mut self,
        pred: impl Fn(&[AuditRecord]) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.fail_when = Some(Box::new(pred));
        self
    }

    /// Accepted batches, in the order they were persisted.
    pub async fn batches(&self) -> Vec<Vec<AuditRecord>> {
        self.batches.read().await.clone()
    }

    /// Accepted records, flattened in persistence order.
    pub async fn records(&self) -> Vec<AuditRecord> {
        self.batches.read().await.iter().flatten().cloned().collect()
    }

    /// Number of accepted records.
    pub async fn len(&self) -> usize {
        self.batches.read().await.iter().map(Vec::len).sum()
    }

    /// Whether no record has been accepted yet.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl Default for MemoryAuditSink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AuditSink for MemoryAuditSink {
    async fn persist(&self, batch: &[AuditRecord]) -> Result<(), AuditError> {
        if self.fail_when.as_ref().is_some_and(|pred| pred(batch)) {
            return Err(AuditError::Storage(format!(
                "memory sink rejected batch of {}",
                batch.len()
            )));
        }
        self.batches.write().await.push(batch.to_vec());
        Ok(())
    }

    fn name(&self) -> &str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use luno_audit::{BatchAuditLogger, BatchLoggerConfig};

    use super::*;

    fn rec(action: &str) -> AuditRecord {
        AuditRecord::new(action, "tester", "")
    }

    #[tokio::test]
    async fn stores_batches_in_order() {
        let sink = MemoryAuditSink::new();
        assert!(sink.is_empty().await);

        sink.persist(&[rec("a"), rec("b")]).await.unwrap();
        sink.persist(&[rec("c")]).await.unwrap();

        assert_eq!(sink.len().await, 3);
        let batches = sink.batches().await;
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[1][0].action(), "c");
    }

    #[tokio::test]
    async fn failing_batches_are_not_stored() {
        let sink = MemoryAuditSink::new().fail_when(|batch| batch.len() > 1);

        assert!(sink.persist(&[rec("a"), rec("b")]).await.is_err());
        sink.persist(&[rec("c")]).await.unwrap();

        let actions: Vec<String> = sink
            .records()
            .await
            .iter()
            .map(|r| r.action().to_owned())
            .collect();
        assert_eq!(actions, ["c"]);
    }

    #[tokio::test]
    async fn capacity_two_scenario() {
        let sink = Arc::new(MemoryAuditSink::new());
        let logger = Arc::new(
            BatchAuditLogger::new(
                Arc::clone(&sink) as Arc<dyn AuditSink>,
                BatchLoggerConfig::new()
                    .with_max_queue_size(2)
                    .with_batch_size(2),
            )
            .unwrap(),
        );

        logger.enqueue(rec("A")).await.unwrap();
        logger.enqueue(rec("B")).await.unwrap();
        let third = {
            let logger = Arc::clone(&logger);
            tokio::spawn(async move { logger.enqueue(rec("C")).await })
        };
        tokio::task::yield_now().await;

        logger.start().unwrap();
        third.await.unwrap().unwrap();
        logger.stop().await.unwrap();

        let batches = sink.batches().await;
        let first: Vec<&str> = batches[0].iter().map(AuditRecord::action).collect();
        assert_eq!(first, ["A", "B"]);
        assert_eq!(batches[1][0].action(), "C");
    }
}
