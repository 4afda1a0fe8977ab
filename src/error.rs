//! Error types for the translation service

use thiserror::Error;

use crate::registry::LanguagePair;

/// Main error type
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed request, including a self-identical language pair.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The requested pair is not in the supported-pair registry.
    #[error("Unsupported language pair: {0}")]
    UnsupportedPair(LanguagePair),

    /// Model resolution (local load or remote fetch) failed.
    #[error("Model unavailable for {pair}: {source}")]
    ModelUnavailable {
        /// Pair whose model could not be produced.
        pair: LanguagePair,
        /// Underlying cause (network, disk, corrupted artifacts).
        #[source]
        source: anyhow::Error,
    },

    /// Generation or decoding failed after a handle was obtained.
    #[error("Translation failed: {0}")]
    TranslationFailed(#[source] anyhow::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Network error.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML deserialization error.
    #[error("TOML deserialization error: {0}")]
    TomlDe(#[from] toml::de::Error),
}

impl Error {
    /// Whether the error is the caller's fault rather than a server-side
    /// failure. Drives the HTTP status mapping in the serving layer.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Error::InvalidRequest(_) | Error::UnsupportedPair(_))
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
