mod audit;
mod server;


pub use audit::*;
pub use server::*;

use std::path::Path;

use serde::Deserialize;

use crate::error::ServerError;

/// Top-level configuration for the Luno host, loaded from a TOML file.
#[derive(Debug, Default, Deserialize)]
pub struct LunoConfig {
    /// Audit pipeline configuration.
    #[serde(default)]
    pub audit: AuditConfig,
    /// Process lifecycle configuration.
    #[serde(default)]
    pub server: ServerConfig,
}

impl LunoConfig {
    /// Load configuration from `path`, or fall back to defaults when the file
    /// does not exist.
    pub fn load(path: &Path) -> Result<Self, ServerError> {
        if !path.exists() {
            return Ok(toml::from_str("")?);
        }
        let contents = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    }
}
