use thiserror::Error;

use luno_audit::AuditError;

/// Errors that can occur when running the Luno host process.
#[derive(Debug, Error)]
pub enum ServerError {
    /// A configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// An I/O error (e.g. reading the config file or stdin).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// An error surfaced by the audit pipeline.
    #[error("audit error: {0}")]
    Audit(#[from] AuditError),
}

impl From<toml::de::Error> for ServerError {
    fn from(e: toml::de::Error) -> Self {
        Self::Config(e.to_string())
    }
}
