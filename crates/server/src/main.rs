use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::io::BufReader;
use tracing::{error, info, warn};

use luno_audit::{AuditLog, NoopAuditLog};
use luno_server::audit_factory::create_audit_logger;
use luno_server::config::LunoConfig;

/// Luno audit host: reads audit events as JSON lines on stdin and persists
/// them through the background batch logger.
#[derive(Parser, Debug)]
#[command(name = "luno-server", about = "Host process for the Luno audit pipeline")]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "luno.toml")]
    config: PathBuf,

    /// Override the audit log file path.
    #[arg(long)]
    audit_path: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = LunoConfig::load(&cli.config)?;
    if let Some(path) = cli.audit_path {
        config.audit.path = Some(path);
    }

    luno_server::telemetry::init();

    if !cli.config.exists() {
        info!(path = %cli.config.display(), "config file not found, using defaults");
    }

    let logger = create_audit_logger(&config.audit)?;
    if let Some(ref logger) = logger {
        logger.start()?;
    }
    let audit: Arc<dyn AuditLog> = match logger {
        Some(ref logger) => Arc::clone(logger) as Arc<dyn AuditLog>,
        None => Arc::new(NoopAuditLog),
    };

    let mut clean = true;
    let stdin = BufReader::new(tokio::io::stdin());
    tokio::select! {
        result = luno_server::ingest::run(stdin, audit.as_ref()) => {
            match result {
                Ok(summary) => info!(
                    accepted = summary.accepted,
                    skipped = summary.skipped,
                    "input closed"
                ),
                Err(e) => {
                    error!(error = %e, "audit intake failed");
                    clean = false;
                }
            }
        }
        () = shutdown_signal() => {}
    }

    // Drain the audit queue (with configurable timeout).
    if let Some(logger) = logger {
        let timeout = config.server.shutdown_timeout();
        info!(
            timeout_secs = config.server.shutdown_timeout_seconds,
            queued = logger.queued(),
            "draining audit queue..."
        );
        if let Err(e) = logger.stop_with_timeout(timeout).await {
            warn!(error = %e, "audit drain incomplete, some records may be lost");
            clean = false;
        }
        let metrics = logger.metrics().snapshot();
        info!(
            persisted = metrics.records_persisted,
            dropped = metrics.records_dropped,
            failed_batches = metrics.batches_failed,
            "audit logger drained"
        );
    }

    info!(clean, "luno-server shut down");
    // The stdin reader thread cannot be cancelled; exit instead of waiting
    // for it during runtime teardown.
    std::process::exit(if clean { 0 } else { 1 })
}

/// Wait for SIGINT (Ctrl+C) or SIGTERM, then return to trigger graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => { info!("received SIGINT"); }
        () = terminate => { info!("received SIGTERM"); }
    }
}
