use std::sync::Arc;

use luno_audit::{AuditSink, BatchAuditLogger};
use luno_audit_file::FileAuditSink;
use tracing::info;

use crate::config::AuditConfig;
use crate::error::ServerError;

/// Build the file-backed batch logger described by `config`.
///
/// Returns `None` when auditing is disabled. The logger is not started.
pub fn create_audit_logger(
    config: &AuditConfig,
) -> Result<Option<Arc<BatchAuditLogger>>, ServerError> {
    if !config.enabled {
        info!("audit disabled");
        return Ok(None);
    }

    let path = config
        .path
        .clone()
        .unwrap_or_else(FileAuditSink::default_path);
    info!(path = %path.display(), "audit log file");

    let sink: Arc<dyn AuditSink> = Arc::new(FileAuditSink::new(path));
    let logger = BatchAuditLogger::new(sink, config.logger_config())
        .map_err(|e| ServerError::Config(format!("audit: {e}")))?;
    Ok(Some(Arc::new(logger)))
}
