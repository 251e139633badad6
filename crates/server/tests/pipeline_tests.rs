use luno_audit::LoggerState;
use luno_audit_file::FileAuditSink;
use luno_server::audit_factory::create_audit_logger;
use luno_server::config::LunoConfig;
use luno_server::ingest;

#[tokio::test]
async fn json_lines_end_up_in_the_audit_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("audit.log");
    let toml = format!(
        "[audit]\npath = {path:?}\nmax_queue_size = 4\nbatch_size = 2\n\n[server]\nshutdown_timeout_seconds = 5\n",
        path = path.display().to_string()
    );
    let config: LunoConfig = toml::from_str(&toml).unwrap();

    let logger = create_audit_logger(&config.audit).unwrap().unwrap();
    logger.start().unwrap();

    let input = (0..10)
        .map(|i| format!("{{\"action\":\"Order{i}\",\"actor\":\"key-1\",\"details\":\"n={i}\\tx\"}}\n"))
        .collect::<String>();
    let summary = ingest::run(input.as_bytes(), logger.as_ref()).await.unwrap();
    assert_eq!(summary.accepted, 10);

    logger
        .stop_with_timeout(config.server.shutdown_timeout())
        .await
        .unwrap();
    assert_eq!(logger.state(), LoggerState::Stopped);

    let records = FileAuditSink::new(&path).read_records().await.unwrap();
    let actions: Vec<&str> = records.iter().map(|r| r.action()).collect();
    let expected: Vec<String> = (0..10).map(|i| format!("Order{i}")).collect();
    assert_eq!(actions, expected);
    assert_eq!(records[3].details(), "n=3\tx");

    let contents = std::fs::read_to_string(&path).unwrap();
    assert_eq!(contents.lines().count(), 10);
}
