//! Application configuration
//!
//! TOML file with per-field defaults, overridable through the environment
//! variables the service has always honored (`MODEL_DIR`, `PRECACHE_MODELS`,
//! `HOST`, `PORT`).

use std::net::SocketAddr;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::logging::LogConfig;
use crate::registry::LanguagePair;

/// Main application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    /// HTTP server settings
    #[serde(default)]
    pub server: ServerConfig,

    /// Model storage settings
    #[serde(default)]
    pub models: ModelsConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            models: ModelsConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load from `path` when it exists, otherwise start from defaults; then
    /// apply environment overrides either way.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut config = if path.as_ref().exists() {
            Self::load(path)?
        } else {
            Self::default()
        };
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Apply `MODEL_DIR`, `PRECACHE_MODELS`, `HOST` and `PORT` overrides.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(dir) = std::env::var("MODEL_DIR") {
            self.models.storage_root = dir;
        }
        if let Ok(pairs) = std::env::var("PRECACHE_MODELS") {
            self.models.preload_pairs = pairs
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect();
        }
        if let Ok(host) = std::env::var("HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("PORT") {
            self.server.port = port
                .parse()
                .map_err(|_| Error::Config(format!("invalid PORT: '{}'", port)))?;
        }
        Ok(())
    }

    /// Parse the configured preload list into language pairs.
    pub fn preload_pairs(&self) -> Result<Vec<LanguagePair>> {
        self.models
            .preload_pairs
            .iter()
            .map(|key| key.parse())
            .collect()
    }

    /// Socket address the server binds to.
    pub fn bind_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|_| {
                Error::Config(format!(
                    "invalid bind address {}:{}",
                    self.server.host, self.server.port
                ))
            })
    }

    /// Convert logging config to LogConfig
    pub fn to_log_config(&self) -> LogConfig {
        LogConfig {
            level: self.logging.level.clone(),
            json_format: self.logging.json_format,
        }
    }
}

/// HTTP server settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Bind host
    #[serde(default = "default_host")]
    pub host: String,
    /// Bind port
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8000
}

/// Model storage settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ModelsConfig {
    /// Root directory for persisted model artifacts
    #[serde(default = "default_storage_root")]
    pub storage_root: String,
    /// Pair keys to warm up at startup, e.g. `["en-de", "de-en"]`
    #[serde(default = "default_preload_pairs")]
    pub preload_pairs: Vec<String>,
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            storage_root: default_storage_root(),
            preload_pairs: default_preload_pairs(),
        }
    }
}

fn default_storage_root() -> String {
    "./models_storage".to_string()
}
fn default_preload_pairs() -> Vec<String> {
    ["en-de", "de-en", "en-fr", "fr-en"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Log level filter
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Enable JSON formatting for structured logs
    #[serde(default)]
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json_format: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}
