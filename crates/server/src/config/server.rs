use std::time::Duration;

use serde::Deserialize;

/// Process lifecycle configuration.
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    /// Graceful shutdown timeout in seconds.
    ///
    /// The maximum time to wait for the audit queue to drain. Records still
    /// queued when it expires are lost.
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_seconds: u64,
}

impl ServerConfig {
    /// The shutdown timeout as a [`Duration`].
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_seconds)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            shutdown_timeout_seconds: default_shutdown_timeout(),
        }
    }
}

fn default_shutdown_timeout() -> u64 {
    30
}
