//! Error types for the crypto overlay synchronization engine

use thiserror::Error;

/// Errors a single fetch strategy can produce
///
/// None of these reach the consumer: the provider chain logs them and moves
/// on to the next strategy.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Network request failed
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    /// Non-2xx response
    #[error("HTTP {status}: {url}")]
    HttpStatus { status: u16, url: String },

    /// Rate limit exceeded
    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    /// Body could not be decoded into the expected shape
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Body decoded but the expected field is absent or unusable
    #[error("Missing field: {0}")]
    MissingField(&'static str),

    /// Asset not supported by this provider
    #[error("Asset not supported: {0}")]
    UnsupportedAsset(String),
}

impl ProviderError {
    /// Creates an InvalidResponse error
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidResponse(msg.into())
    }
}

/// Errors raised by a cache storage backend
#[derive(Debug, Error)]
pub enum CacheError {
    /// Underlying storage I/O failed
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Entry could not be (de)serialized
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Storage capacity exhausted
    #[error("Storage quota exceeded writing {key}")]
    QuotaExceeded { key: String },

    /// No usable storage location on this platform
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

/// Errors loading or saving the synchronization settings
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Settings file I/O failed
    #[error("Settings I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Settings file is not valid JSON for [`SyncConfig`](crate::config::SyncConfig)
    #[error("Settings parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// No usable settings location on this platform
    #[error("Could not determine settings directory")]
    NoDataDir,
}

/// Errors building an engine with the default HTTP feeds and file cache
#[derive(Debug, Error)]
pub enum SetupError {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Cache(#[from] CacheError),
}
