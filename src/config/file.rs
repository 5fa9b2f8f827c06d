//! TOML configuration file loading
//!
//! Supports `~/.config/wavelink/config.toml` as a persistent config source.
//! All fields are optional; the file is a partial overlay on top of
//! defaults.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::Result;

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
pub struct ClientConfigFile {
    /// Backend endpoints
    #[serde(default)]
    pub server: ServerFileConfig,

    /// Reconnection behavior
    #[serde(default)]
    pub transport: TransportFileConfig,

    /// Session identity persistence
    #[serde(default)]
    pub identity: IdentityFileConfig,
}

/// Backend endpoint configuration
#[derive(Debug, Default, Deserialize)]
pub struct ServerFileConfig {
    /// HTTP base URL for history and session endpoints
    pub url: Option<String>,

    /// WebSocket endpoint URL (derived from `url` when absent)
    pub ws_url: Option<String>,

    /// Timeout for history calls, in seconds
    pub http_timeout_secs: Option<u64>,
}

/// Reconnection configuration
#[derive(Debug, Default, Deserialize)]
pub struct TransportFileConfig {
    /// Maximum automatic reconnect attempts before giving up
    pub max_reconnect_attempts: Option<u32>,

    /// Base backoff delay in milliseconds
    pub base_delay_ms: Option<u64>,

    /// Backoff delay cap in milliseconds
    pub max_delay_ms: Option<u64>,
}

/// Identity persistence configuration
#[derive(Debug, Default, Deserialize)]
pub struct IdentityFileConfig {
    /// Path of the persisted session identity file
    pub path: Option<PathBuf>,
}

/// Default config file path: `~/.config/wavelink/config.toml`
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.config_dir().join("wavelink").join("config.toml"))
}

/// Load and parse a TOML config file
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not valid TOML
pub fn load(path: &Path) -> Result<ClientConfigFile> {
    let content = std::fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_empty_file() {
        let parsed: ClientConfigFile = toml::from_str("").unwrap();
        assert!(parsed.server.url.is_none());
        assert!(parsed.transport.max_reconnect_attempts.is_none());
        assert!(parsed.identity.path.is_none());
    }

    #[test]
    fn parses_partial_overlay() {
        let parsed: ClientConfigFile = toml::from_str(
            r#"
            [server]
            url = "http://chat.example:8080"

            [transport]
            max_reconnect_attempts = 3
            "#,
        )
        .unwrap();
        assert_eq!(parsed.server.url.as_deref(), Some("http://chat.example:8080"));
        assert!(parsed.server.ws_url.is_none());
        assert_eq!(parsed.transport.max_reconnect_attempts, Some(3));
        assert!(parsed.transport.base_delay_ms.is_none());
    }

    #[test]
    fn rejects_invalid_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[server\nurl=").unwrap();
        assert!(load(&path).is_err());
    }
}
