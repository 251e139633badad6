use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use luno_audit::{AuditError, AuditRecord, AuditSink};

use crate::codec::{decode_line, encode_batch};

/// File name used when no path is configured.
pub const DEFAULT_FILE_NAME: &str = "audit.log";

/// Appends each batch to a text file, one escaped tab-separated line per
/// record.
///
/// The file is opened in append mode for the duration of a single batch and
/// closed again before `persist` returns. The whole batch is encoded up front
/// and handed to the OS in one write, but a batch is not atomic on disk: if
/// that write fails partway, some of its lines may already be in the file
/// even though the batch is reported as failed.
#[derive(Debug, Clone)]
pub struct FileAuditSink {
    path: PathBuf,
}

impl FileAuditSink {
    /// Create a sink that appends to `path`. The file is created on the
    /// first write; its parent directory must already exist.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `audit.log` next to the running executable, or in the working
    /// directory if the executable path cannot be resolved.
    pub fn default_path() -> PathBuf {
        std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(|dir| dir.join(DEFAULT_FILE_NAME)))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_FILE_NAME))
    }

    /// The file this sink appends to.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every record back from the log, in file order.
    pub async fn read_records(&self) -> Result<Vec<AuditRecord>, AuditError> {
        let contents = tokio::fs::read_to_string(&self.path).await?;
        contents
            .lines()
            .filter(|line| !line.is_empty())
            .map(decode_line)
            .collect()
    }
}

#[async_trait]
impl AuditSink for FileAuditSink {
    async fn persist(&self, batch: &[AuditRecord]) -> Result<(), AuditError> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(encode_batch(batch).as_bytes()).await?;
        file.flush().await?;

        debug!(
            path = %self.path.display(),
            records = batch.len(),
            "appended audit batch"
        );
        Ok(())
    }

    fn name(&self) -> &str {
        "file"
    }
}
