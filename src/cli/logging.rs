//! Logging setup for the binary.

use tracing_subscriber::EnvFilter;

use crate::config::ClientConfig;

/// Filter used when `RUST_LOG` is unset.
pub fn default_directive(config: &ClientConfig) -> &'static str {
    if config.debug {
        "ollama_chat=trace,warn"
    } else {
        "warn"
    }
}

/// Install the global subscriber. Logs go to stderr so they never mix
/// with the streamed reply on stdout.
pub fn init_logging(config: &ClientConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(config)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(config.debug)
        .init();

    tracing::debug!("ollama-chat started against {}", config.base_url);
}
