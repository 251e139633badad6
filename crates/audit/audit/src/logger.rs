//! Bounded, batching background audit logger.
//!
//! Producers call [`BatchAuditLogger::enqueue`] (or [`AuditLog::log`]) and
//! return as soon as their record is queued. A single consumer task drains
//! the queue in batches and hands each batch to an [`AuditSink`]:
//!
//! - When the queue is full, producers wait for a free slot instead of
//!   dropping or failing.
//! - The consumer waits for at least one record, then takes whatever else is
//!   already queued, up to `batch_size`.
//! - A batch the sink rejects, or whose `persist` call panics, is logged and
//!   discarded. It is never retried and never re-queued; the next batch is
//!   attempted as usual.
//! - Because there is exactly one consumer, batches reach the sink in
//!   admission order and at most one `persist` call is in flight.
//!
//! Shutdown is cooperative. [`BatchAuditLogger::stop`] closes admission,
//! signals the consumer, and waits until everything already queued has had a
//! persistence attempt.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use futures::FutureExt;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::BatchLoggerConfig;
use crate::error::AuditError;
use crate::log::AuditLog;
use crate::metrics::AuditMetrics;
use crate::record::AuditRecord;
use crate::sink::AuditSink;

/// Lifecycle of the consumer, published over a `watch` channel so hosts can
/// use it as a liveness signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoggerState {
    /// Constructed; records may be queued but nothing is drained yet.
    Idle,
    /// The consumer is draining batches.
    Running,
    /// Shutdown was observed; the consumer is flushing what is left.
    Draining,
    /// Everything admitted has had a persistence attempt.
    Stopped,
    /// The consumer loop itself died (not a sink call). No further records
    /// will ever be drained.
    Failed,
    /// The drain was abandoned at the shutdown deadline.
    Aborted,
}

impl LoggerState {
    /// Whether the consumer has finished for good.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Stopped | Self::Failed | Self::Aborted)
    }
}

enum Lifecycle {
    Idle {
        receiver: mpsc::Receiver<AuditRecord>,
    },
    Running {
        shutdown_tx: mpsc::Sender<()>,
        handle: JoinHandle<Result<(), AuditError>>,
    },
    Stopped,
}

/// Background audit logger with a bounded queue and a single batch consumer.
///
/// Dropping a running logger without calling [`stop`](Self::stop) still lets
/// the consumer drain what is queued, but nothing waits for it; hosts should
/// always await `stop` (or [`stop_with_timeout`](Self::stop_with_timeout))
/// before exiting.
pub struct BatchAuditLogger {
    sender: mpsc::Sender<AuditRecord>,
    closed: AtomicBool,
    lifecycle: Mutex<Lifecycle>,
    sink: Arc<dyn AuditSink>,
    config: BatchLoggerConfig,
    metrics: Arc<AuditMetrics>,
    state: Arc<watch::Sender<LoggerState>>,
    in_flight: Arc<AtomicUsize>,
}

impl BatchAuditLogger {
    /// Create a logger that persists into `sink`. The consumer does not run
    /// until [`start`](Self::start) is called.
    pub fn new(sink: Arc<dyn AuditSink>, config: BatchLoggerConfig) -> Result<Self, AuditError> {
        config.validate()?;
        let (sender, receiver) = mpsc::channel(config.max_queue_size);
        let (state, _) = watch::channel(LoggerState::Idle);

        Ok(Self {
            sender,
            closed: AtomicBool::new(false),
            lifecycle: Mutex::new(Lifecycle::Idle { receiver }),
            sink,
            config,
            metrics: Arc::new(AuditMetrics::default()),
            state: Arc::new(state),
            in_flight: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// Queue a record, waiting for a free slot while the queue is full.
    ///
    /// Returns [`AuditError::Closed`] once shutdown has begun, including for
    /// a producer that was still waiting for a slot at that moment.
    pub async fn enqueue(&self, record: AuditRecord) -> Result<(), AuditError> {
        if self.closed.load(Ordering::Acquire) {
            self.metrics.increment_rejected();
            return Err(AuditError::Closed);
        }
        if self.sender.send(record).await.is_err() {
            self.metrics.increment_rejected();
            return Err(AuditError::Closed);
        }
        self.metrics.increment_enqueued();
        Ok(())
    }

    /// Queue a record without waiting. Fails with [`AuditError::QueueFull`]
    /// when no slot is free.
    pub fn try_enqueue(&self, record: AuditRecord) -> Result<(), AuditError> {
        if self.closed.load(Ordering::Acquire) {
            self.metrics.increment_rejected();
            return Err(AuditError::Closed);
        }
        match self.sender.try_send(record) {
            Ok(()) => {
                self.metrics.increment_enqueued();
                Ok(())
            }
            Err(TrySendError::Full(_)) => Err(AuditError::QueueFull),
            Err(TrySendError::Closed(_)) => {
                self.metrics.increment_rejected();
                Err(AuditError::Closed)
            }
        }
    }

    /// Spawn the consumer task on the current tokio runtime.
    ///
    /// May succeed once per logger. A second call returns
    /// [`AuditError::AlreadyStarted`]; a call after shutdown began returns
    /// [`AuditError::Closed`].
    pub fn start(&self) -> Result<(), AuditError> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|e| {
            AuditError::Configuration(format!("audit logger needs a tokio runtime: {e}"))
        })?;

        let mut lifecycle = self.lifecycle();
        if self.closed.load(Ordering::Acquire) {
            return Err(AuditError::Closed);
        }
        let receiver = match std::mem::replace(&mut *lifecycle, Lifecycle::Stopped) {
            Lifecycle::Idle { receiver } => receiver,
            other => {
                *lifecycle = other;
                return Err(AuditError::AlreadyStarted);
            }
        };

        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        self.state.send_replace(LoggerState::Running);
        let handle = runtime.spawn(supervise(
            self.consumer(),
            receiver,
            shutdown_rx,
            Arc::clone(&self.state),
        ));
        *lifecycle = Lifecycle::Running {
            shutdown_tx,
            handle,
        };

        info!(
            sink = self.sink.name(),
            max_queue_size = self.config.max_queue_size,
            batch_size = self.config.batch_size,
            "audit logger started"
        );
        Ok(())
    }

    /// Close admission and wait until every queued record has had a
    /// persistence attempt.
    ///
    /// Has no deadline: a sink that hangs keeps this call suspended. If the
    /// logger was never started, the queued records are drained inline.
    /// Calling `stop` again waits for the first call's drain to finish.
    pub async fn stop(&self) -> Result<(), AuditError> {
        self.shutdown(None).await
    }

    /// Like [`stop`](Self::stop), but gives up after `timeout`.
    ///
    /// On expiry the consumer is aborted, records still queued are counted
    /// in `records_dropped`, the state becomes [`LoggerState::Aborted`], and
    /// [`AuditError::ShutdownTimeout`] is returned.
    pub async fn stop_with_timeout(&self, timeout: Duration) -> Result<(), AuditError> {
        self.shutdown(Some(timeout)).await
    }

    /// Current lifecycle state.
    pub fn state(&self) -> LoggerState {
        *self.state.borrow()
    }

    /// Watch lifecycle changes, e.g. to surface a failed consumer in a
    /// health check.
    pub fn subscribe(&self) -> watch::Receiver<LoggerState> {
        self.state.subscribe()
    }

    /// Pipeline counters.
    pub fn metrics(&self) -> &Arc<AuditMetrics> {
        &self.metrics
    }

    /// Number of records currently waiting in the queue.
    pub fn queued(&self) -> usize {
        self.sender.max_capacity() - self.sender.capacity()
    }

    async fn shutdown(&self, timeout: Option<Duration>) -> Result<(), AuditError> {
        if !self.closed.swap(true, Ordering::AcqRel) {
            info!(queued = self.queued(), "audit logger closing");
        }
        let lifecycle = std::mem::replace(&mut *self.lifecycle(), Lifecycle::Stopped);

        match lifecycle {
            Lifecycle::Running {
                shutdown_tx,
                mut handle,
            } => {
                // A full slot means a signal is already pending.
                let _ = shutdown_tx.try_send(());
                let joined = match timeout {
                    None => handle.await,
                    Some(limit) => match tokio::time::timeout(limit, &mut handle).await {
                        Ok(joined) => joined,
                        Err(_) => {
                            let err = self.abandon(limit);
                            handle.abort();
                            return Err(err);
                        }
                    },
                };
                joined.unwrap_or_else(|e| Err(AuditError::ConsumerFailed(e.to_string())))
            }
            Lifecycle::Idle { receiver } => {
                // A closed signal channel reads as a shutdown request.
                let (_, shutdown_rx) = mpsc::channel(1);
                let drain = supervise(
                    self.consumer(),
                    receiver,
                    shutdown_rx,
                    Arc::clone(&self.state),
                );
                match timeout {
                    None => drain.await,
                    Some(limit) => {
                        tokio::pin!(drain);
                        match tokio::time::timeout(limit, &mut drain).await {
                            Ok(result) => result,
                            Err(_) => Err(self.abandon(limit)),
                        }
                    }
                }
            }
            Lifecycle::Stopped => {
                let mut state = self.state.subscribe();
                let wait = state.wait_for(|s| s.is_terminal());
                match timeout {
                    None => {
                        let _ = wait.await;
                        Ok(())
                    }
                    Some(limit) => match tokio::time::timeout(limit, wait).await {
                        Ok(_) => Ok(()),
                        Err(_) => Err(AuditError::ShutdownTimeout { timeout: limit }),
                    },
                }
            }
        }
    }

    fn abandon(&self, timeout: Duration) -> AuditError {
        // Records taken off the queue by a persist call that never returned
        // are lost as well.
        let pending = self.queued() + self.in_flight.swap(0, Ordering::AcqRel);
        self.metrics.add_dropped(pending);
        self.state.send_replace(LoggerState::Aborted);
        warn!(
            pending,
            timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            "audit drain timed out, abandoning queued records"
        );
        AuditError::ShutdownTimeout { timeout }
    }

    fn consumer(&self) -> Consumer {
        Consumer {
            sink: Arc::clone(&self.sink),
            batch_size: self.config.batch_size,
            metrics: Arc::clone(&self.metrics),
            in_flight: Arc::clone(&self.in_flight),
        }
    }

    fn lifecycle(&self) -> MutexGuard<'_, Lifecycle> {
        self.lifecycle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl AuditLog for BatchAuditLogger {
    async fn log(&self, action: &str, actor: &str, details: &str) -> Result<(), AuditError> {
        self.enqueue(AuditRecord::new(action, actor, details)).await
    }
}

/// The draining half of the logger. Owned by exactly one task.
struct Consumer {
    sink: Arc<dyn AuditSink>,
    batch_size: usize,
    metrics: Arc<AuditMetrics>,
    in_flight: Arc<AtomicUsize>,
}

impl Consumer {
    async fn run(
        &self,
        mut receiver: mpsc::Receiver<AuditRecord>,
        mut shutdown_rx: mpsc::Receiver<()>,
        state: &watch::Sender<LoggerState>,
    ) {
        let mut batch = Vec::with_capacity(self.batch_size);
        let mut draining = false;

        loop {
            let received = if draining {
                receiver.recv_many(&mut batch, self.batch_size).await
            } else {
                tokio::select! {
                    biased;
                    _ = shutdown_rx.recv() => {
                        // Refuse new admissions (and wake blocked producers)
                        // while keeping what is already buffered.
                        receiver.close();
                        draining = true;
                        state.send_replace(LoggerState::Draining);
                        debug!("audit consumer draining");
                        continue;
                    }
                    n = receiver.recv_many(&mut batch, self.batch_size) => n,
                }
            };

            // Closed and empty.
            if received == 0 {
                break;
            }

            self.persist(&batch).await;
            batch.clear();
        }
    }

    async fn persist(&self, batch: &[AuditRecord]) {
        self.in_flight.store(batch.len(), Ordering::Release);
        let outcome = AssertUnwindSafe(self.sink.persist(batch))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| {
                Err(AuditError::Storage(format!(
                    "sink panicked: {}",
                    panic_message(&*panic)
                )))
            });
        self.in_flight.store(0, Ordering::Release);

        match outcome {
            Ok(()) => {
                self.metrics.record_persisted(batch.len());
                debug!(
                    sink = self.sink.name(),
                    batch_len = batch.len(),
                    "audit batch persisted"
                );
            }
            Err(e) => {
                self.metrics.record_failed(batch.len());
                error!(
                    sink = self.sink.name(),
                    batch_len = batch.len(),
                    error = %e,
                    "audit sink failed to persist batch, batch discarded"
                );
            }
        }
    }
}

/// Run the consumer to completion, turning a panic in the loop into a
/// `Failed` state instead of taking the host down. Sink panics never reach
/// this point; they only cost their own batch.
async fn supervise(
    consumer: Consumer,
    receiver: mpsc::Receiver<AuditRecord>,
    shutdown_rx: mpsc::Receiver<()>,
    state: Arc<watch::Sender<LoggerState>>,
) -> Result<(), AuditError> {
    let outcome = AssertUnwindSafe(consumer.run(receiver, shutdown_rx, &state))
        .catch_unwind()
        .await;

    match outcome {
        Ok(()) => {
            state.send_replace(LoggerState::Stopped);
            info!("audit logger stopped");
            Ok(())
        }
        Err(panic) => {
            let message = panic_message(&*panic);
            state.send_replace(LoggerState::Failed);
            error!(
                error = %message,
                "audit consumer loop failed, no further records will be persisted"
            );
            Err(AuditError::ConsumerFailed(message))
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "consumer panicked".to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NullSink;

    #[async_trait]
    impl AuditSink for NullSink {
        async fn persist(&self, _batch: &[AuditRecord]) -> Result<(), AuditError> {
            Ok(())
        }

        fn name(&self) -> &str {
            "null"
        }
    }

    fn logger(queue: usize, batch: usize) -> BatchAuditLogger {
        BatchAuditLogger::new(
            Arc::new(NullSink),
            BatchLoggerConfig::new()
                .with_max_queue_size(queue)
                .with_batch_size(batch),
        )
        .unwrap()
    }

    #[test]
    fn terminal_states() {
        assert!(LoggerState::Stopped.is_terminal());
        assert!(LoggerState::Failed.is_terminal());
        assert!(LoggerState::Aborted.is_terminal());
        assert!(!LoggerState::Idle.is_terminal());
        assert!(!LoggerState::Running.is_terminal());
        assert!(!LoggerState::Draining.is_terminal());
    }

    #[test]
    fn panic_message_extracts_strings() {
        let boxed: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(&*boxed), "boom");
        let boxed: Box<dyn Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(&*boxed), "bang");
        let boxed: Box<dyn Any + Send> = Box::new(7_u32);
        assert_eq!(panic_message(&*boxed), "consumer panicked");
    }

    #[test]
    fn invalid_config_is_rejected() {
        let result = BatchAuditLogger::new(
            Arc::new(NullSink),
            BatchLoggerConfig::new().with_batch_size(0),
        );
        assert!(matches!(result, Err(AuditError::Configuration(_))));
    }

    #[test]
    fn start_outside_runtime_is_an_error() {
        let logger = logger(4, 2);
        assert!(matches!(logger.start(), Err(AuditError::Configuration(_))));
        assert_eq!(logger.state(), LoggerState::Idle);
    }

    #[tokio::test]
    async fn try_enqueue_reports_full_queue() {
        let logger = logger(1, 1);
        logger.try_enqueue(AuditRecord::new("a", "u", "d")).unwrap();
        assert!(matches!(
            logger.try_enqueue(AuditRecord::new("b", "u", "d")),
            Err(AuditError::QueueFull)
        ));
        assert_eq!(logger.queued(), 1);
        logger.stop().await.unwrap();
        assert_eq!(logger.metrics().snapshot().records_persisted, 1);
    }

    #[tokio::test]
    async fn start_twice_is_rejected() {
        let logger = logger(4, 2);
        logger.start().unwrap();
        assert!(matches!(logger.start(), Err(AuditError::AlreadyStarted)));
        logger.stop().await.unwrap();
        assert!(matches!(logger.start(), Err(AuditError::Closed)));
    }

    #[tokio::test]
    async fn state_follows_lifecycle() {
        let logger = logger(4, 2);
        assert_eq!(logger.state(), LoggerState::Idle);
        logger.start().unwrap();
        assert_eq!(logger.state(), LoggerState::Running);
        logger.stop().await.unwrap();
        assert_eq!(logger.state(), LoggerState::Stopped);
    }
}
