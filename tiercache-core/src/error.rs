//! Error types for cache operations
//!
//! Misses, expiry and eviction are never errors. What remains are
//! boundary failures (a value that cannot be encoded or decoded, a
//! malformed pattern), durable backend failures and bad configuration.

use thiserror::Error;

/// Durable tier errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DurableError {
    #[error("Failed to open durable environment: {reason}")]
    EnvOpen { reason: String },

    #[error("Durable transaction failed: {reason}")]
    Transaction { reason: String },

    #[error("Failed to encode container for {namespace}: {reason}")]
    Encode { namespace: String, reason: String },

    #[error("Failed to decode container for {namespace}: {reason}")]
    Decode { namespace: String, reason: String },

    #[error("I/O error: {reason}")]
    Io { reason: String },
}

impl From<std::io::Error> for DurableError {
    fn from(e: std::io::Error) -> Self {
        DurableError::Io {
            reason: e.to_string(),
        }
    }
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required configuration field: {field}")]
    MissingRequired { field: String },

    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Master error type for cache operations.
#[derive(Debug, Clone, Error)]
pub enum CacheError {
    #[error("Failed to encode value for {key}: {reason}")]
    Serialization { key: String, reason: String },

    #[error("Cached value for {key} does not match the requested type: {reason}")]
    TypeMismatch { key: String, reason: String },

    #[error("Invalid invalidation pattern {pattern}: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("Durable error: {0}")]
    Durable(#[from] DurableError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Cache lock poisoned")]
    LockPoisoned,
}

/// Result type alias for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

// =============================================================================
// TESTS
// =============================================================================
