//! Client configuration.

use std::time::Duration;

/// Address of a locally running model server.
pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";

/// Time allowed for the server to start responding to a streamed request.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(50);

pub const ENV_BASE_URL: &str = "OLLAMA_CHAT_URL";
pub const ENV_TIMEOUT_SECS: &str = "OLLAMA_CHAT_TIMEOUT_SECS";
pub const ENV_DEBUG: &str = "OLLAMA_CHAT_DEBUG";

/// Configuration for [`OllamaClient`](crate::ollama::OllamaClient).
///
/// ```ignore
/// use ollama_chat::config::ClientConfig;
/// use std::time::Duration;
///
/// let config = ClientConfig::default()
///     .with_base_url("http://gpu-box:11434")
///     .with_request_timeout(Duration::from_secs(120));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Server address without a trailing slash
    pub base_url: String,
    /// Abort a streamed request if no response has started by then
    pub request_timeout: Duration,
    /// Trace decoder buffers and lines
    pub debug: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            debug: false,
        }
    }
}

impl ClientConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Full URL of an endpoint path such as `/api/generate`.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Read `OLLAMA_CHAT_URL`, `OLLAMA_CHAT_TIMEOUT_SECS` and
    /// `OLLAMA_CHAT_DEBUG`, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = lookup(ENV_BASE_URL).filter(|v| !v.trim().is_empty()) {
            config = config.with_base_url(url.trim());
        }

        if let Some(raw) = lookup(ENV_TIMEOUT_SECS) {
            match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => {
                    config.request_timeout = Duration::from_secs(secs);
                }
                _ => tracing::warn!(
                    value = %raw,
                    "ignoring invalid {}, using {}s",
                    ENV_TIMEOUT_SECS,
                    DEFAULT_REQUEST_TIMEOUT.as_secs()
                ),
            }
        }

        if let Some(raw) = lookup(ENV_DEBUG) {
            config.debug = matches!(
                raw.trim().to_ascii_lowercase().as_str(),
                "1" | "true" | "yes" | "on"
            );
        }

        config
    }
}
