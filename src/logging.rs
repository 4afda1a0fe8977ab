//! Logging initialization
//!
//! One explicit initialization call at the composition root; components log
//! through `tracing` macros and never touch process-wide output streams.

use anyhow::Result;
use tracing_subscriber::{fmt, prelude::*, EnvFilter, Registry};

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Log level filter (e.g., "info", "debug", "trace")
    pub level: String,
    /// Enable JSON formatting for structured logs
    pub json_format: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

/// Initialize the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over the configured level when set.
pub fn init_logging(config: &LogConfig) -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    if config.json_format {
        // JSON structured logging for production
        let fmt_layer = fmt::layer().json().with_current_span(true);
        Registry::default().with(filter).with(fmt_layer).init();
    } else {
        // Human-readable logging for development
        let fmt_layer = fmt::layer();
        Registry::default().with(filter).with(fmt_layer).init();
    }

    tracing::info!("Logging initialized at level '{}'", config.level);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_config_default() {
        let config = LogConfig::default();
        assert_eq!(config.level, "info");
        assert!(!config.json_format);
    }
}
