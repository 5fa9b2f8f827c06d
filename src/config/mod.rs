//! Configuration management for the wavelink client
//!
//! Resolution order: built-in defaults, then the optional TOML config file,
//! then `WAVELINK_*` environment variables.

pub mod file;

use std::path::PathBuf;
use std::time::Duration;

use crate::history::HISTORY_TIMEOUT;
use crate::identity::IdentityStore;
use crate::transport::RetryPolicy;
use crate::Result;
use file::ClientConfigFile;

/// Default backend base URL
pub const DEFAULT_SERVER_URL: &str = "http://localhost:3001";

/// Wavelink client configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP base URL for history and session endpoints
    pub server_url: String,

    /// WebSocket endpoint URL
    pub ws_url: String,

    /// Timeout applied to every history call
    pub http_timeout: Duration,

    /// Reconnection policy for the transport
    pub retry: RetryPolicy,

    /// Path of the persisted session identity file; `None` disables
    /// persistence for this process
    pub identity_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            ws_url: ws_from_server(DEFAULT_SERVER_URL),
            http_timeout: HISTORY_TIMEOUT,
            retry: RetryPolicy::default(),
            identity_path: Some(IdentityStore::default_path()),
        }
    }
}

impl Config {
    /// Load configuration from the config file and environment
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed
    pub fn load() -> Result<Self> {
        let mut overlay = ClientConfigFile::default();
        if let Some(path) = file::default_config_path()
            && path.exists()
        {
            tracing::debug!(path = %path.display(), "loading config file");
            overlay = file::load(&path)?;
        }
        Ok(Self::resolve(overlay))
    }

    /// Resolve defaults, file overlay, and the process environment
    fn resolve(overlay: ClientConfigFile) -> Self {
        Self::resolve_with(overlay, env_var)
    }

    /// Resolve with an explicit environment lookup
    fn resolve_with(
        overlay: ClientConfigFile,
        env: impl Fn(&str) -> Option<String>,
    ) -> Self {
        let server_url = env("WAVELINK_SERVER_URL")
            .or(overlay.server.url)
            .unwrap_or_else(|| DEFAULT_SERVER_URL.to_string());
        let server_url = server_url.trim_end_matches('/').to_string();

        let ws_url = env("WAVELINK_WS_URL")
            .or(overlay.server.ws_url)
            .unwrap_or_else(|| ws_from_server(&server_url));

        let http_timeout = env("WAVELINK_HTTP_TIMEOUT_SECS")
            .and_then(|v| v.parse().ok())
            .or(overlay.server.http_timeout_secs)
            .map_or(HISTORY_TIMEOUT, Duration::from_secs);

        let mut retry = RetryPolicy::default();
        if let Some(attempts) = env("WAVELINK_MAX_RECONNECT_ATTEMPTS")
            .and_then(|v| v.parse().ok())
            .or(overlay.transport.max_reconnect_attempts)
        {
            retry.max_attempts = attempts;
        }
        if let Some(ms) = env("WAVELINK_BASE_DELAY_MS")
            .and_then(|v| v.parse().ok())
            .or(overlay.transport.base_delay_ms)
        {
            retry.base_delay = Duration::from_millis(ms);
        }
        if let Some(ms) = env("WAVELINK_MAX_DELAY_MS")
            .and_then(|v| v.parse().ok())
            .or(overlay.transport.max_delay_ms)
        {
            retry.max_delay = Duration::from_millis(ms);
        }

        let identity_path = overlay
            .identity
            .path
            .or_else(|| Some(IdentityStore::default_path()));

        Self {
            server_url,
            ws_url,
            http_timeout,
            retry,
            identity_path,
        }
    }

    /// Override the server URL, rederiving the WebSocket URL from it
    pub fn set_server_url(&mut self, url: &str) {
        self.server_url = url.trim_end_matches('/').to_string();
        self.ws_url = ws_from_server(&self.server_url);
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

/// Derive the WebSocket URL from the HTTP base URL
fn ws_from_server(server: &str) -> String {
    if let Some(rest) = server.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = server.strip_prefix("http://") {
        format!("ws://{rest}")
    } else {
        server.to_string()
    }
}
