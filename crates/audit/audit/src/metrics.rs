use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Atomic counters tracking the audit pipeline.
///
/// All counters use relaxed ordering. For a consistent point-in-time view,
/// call [`snapshot`](Self::snapshot).
#[derive(Debug, Default)]
pub struct AuditMetrics {
    /// Records admitted to the queue.
    pub enqueued: AtomicU64,
    /// Admissions refused because the logger was closed.
    pub rejected: AtomicU64,
    /// Batches the sink accepted.
    pub batches_persisted: AtomicU64,
    /// Records inside accepted batches.
    pub records_persisted: AtomicU64,
    /// Batches the sink rejected.
    pub batches_failed: AtomicU64,
    /// Records lost to failed batches or an aborted drain.
    pub records_dropped: AtomicU64,
}

impl AuditMetrics {
    /// Increment the enqueued counter.
    pub fn increment_enqueued(&self) {
        self.enqueued.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment the rejected counter.
    pub fn increment_rejected(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a batch of `len` records that the sink accepted.
    pub fn record_persisted(&self, len: usize) {
        self.batches_persisted.fetch_add(1, Ordering::Relaxed);
        self.records_persisted.fetch_add(len as u64, Ordering::Relaxed);
    }

    /// Record a batch of `len` records that the sink rejected.
    pub fn record_failed(&self, len: usize) {
        self.batches_failed.fetch_add(1, Ordering::Relaxed);
        self.records_dropped.fetch_add(len as u64, Ordering::Relaxed);
    }

    /// Add records that were abandoned without a persistence attempt.
    pub fn add_dropped(&self, count: usize) {
        self.records_dropped
            .fetch_add(count as u64, Ordering::Relaxed);
    }

    /// Take a point-in-time copy of every counter.
    pub fn snapshot(&self) -> AuditMetricsSnapshot {
        AuditMetricsSnapshot {
            enqueued: self.enqueued.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            batches_persisted: self.batches_persisted.load(Ordering::Relaxed),
            records_persisted: self.records_persisted.load(Ordering::Relaxed),
            batches_failed: self.batches_failed.load(Ordering::Relaxed),
            records_dropped: self.records_dropped.load(Ordering::Relaxed),
        }
    }
}

/// Plain copy of [`AuditMetrics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AuditMetricsSnapshot {
    pub enqueued: u64,
    pub rejected: u64,
    pub batches_persisted: u64,
    pub records_persisted: u64,
    pub batches_failed: u64,
    pub records_dropped: u64,
}
