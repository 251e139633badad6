use std::sync::Arc;

use luno_audit::{AuditLog, AuditRecord, AuditSink, BatchAuditLogger, BatchLoggerConfig};
use luno_audit_file::FileAuditSink;

#[tokio::test]
async fn logged_action_lands_as_exactly_one_line() {
    let dir = tempfile::tempdir().unwrap();
    let sink = FileAuditSink::new(dir.path().join("audit.log"));
    let logger = BatchAuditLogger::new(
        Arc::new(sink.clone()) as Arc<dyn AuditSink>,
        BatchLoggerConfig::default(),
    )
    .unwrap();
    logger.start().unwrap();

    logger.log("A1", "U1", "D1").await.unwrap();
    logger.stop().await.unwrap();

    let contents = tokio::fs::read_to_string(sink.path()).await.unwrap();
    let lines: Vec<&str> = contents.lines().collect();
    assert_eq!(lines.len(), 1);
    let (timestamp, rest) = lines[0].split_once('\t').unwrap();
    assert_eq!(rest, "A1\tU1\tD1");
    assert!(timestamp.ends_with('Z'));
}

#[tokio::test]
async fn hostile_fields_do_not_break_the_log() {
    let dir = tempfile::tempdir().unwrap();
    let sink = FileAuditSink::new(dir.path().join("audit.log"));
    let logger = BatchAuditLogger::new(
        Arc::new(sink.clone()) as Arc<dyn AuditSink>,
        BatchLoggerConfig::new().with_batch_size(2),
    )
    .unwrap();
    logger.start().unwrap();

    let hostile = AuditRecord::new("Send\tCrypto", "key\n2025-01-01T00:00:00Z\tFake", "a\\b");
    logger.enqueue(AuditRecord::new("first", "u", "d")).await.unwrap();
    logger.enqueue(hostile.clone()).await.unwrap();
    logger.enqueue(AuditRecord::new("last", "u", "d")).await.unwrap();
    logger.stop().await.unwrap();

    let records = sink.read_records().await.unwrap();
    assert_eq!(records.len(), 3);
    assert_eq!(records[0].action(), "first");
    assert_eq!(records[1].action(), hostile.action());
    assert_eq!(records[1].actor(), hostile.actor());
    assert_eq!(records[1].details(), hostile.details());
    assert_eq!(records[2].action(), "last");
}
