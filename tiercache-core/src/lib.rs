//! Tiercache Core - Entry, Clock and Statistics Types
//!
//! Plain data structures shared by the storage and coherence crates:
//! logical ticks, cache entries and their durable projection, statistics
//! counters, configuration and the error taxonomy.

pub mod clock;
pub mod config;
pub mod entry;
pub mod error;
pub mod stats;

pub use clock::{Clock, ManualClock, Tick, WallClock};
pub use config::{HybridSettings, ManagerSettings, DEFAULT_NAMESPACE};
pub use entry::{CacheEntry, DurableContainer, DurableRecord, DURABLE_FORMAT_VERSION};
pub use error::{CacheError, CacheResult, ConfigError, DurableError};
pub use stats::{hit_rate, CacheStats, NamespaceStats};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// ENUMS
// ============================================================================

/// Storage backend a namespace is held in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Process-lifetime map only.
    Volatile,
    /// Volatile map with selective write-back to the durable tier.
    Hybrid,
}

impl BackendKind {
    pub const ALL: [BackendKind; 2] = [BackendKind::Volatile, BackendKind::Hybrid];

    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Volatile => "volatile",
            BackendKind::Hybrid => "hybrid",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "volatile" | "heap" => Ok(BackendKind::Volatile),
            "hybrid" => Ok(BackendKind::Hybrid),
            other => Err(ConfigError::InvalidValue {
                field: "store".to_string(),
                value: other.to_string(),
                reason: "expected volatile or hybrid".to_string(),
            }),
        }
    }
}

/// Join a namespace and key into the key stored in a backend.
pub fn full_key(namespace: &str, key: &str) -> String {
    format!("{namespace}:{key}")
}

/// Strip everything up to and including the first `:`.
///
/// The remainder may itself contain colons. A key without a separator is
/// returned unchanged.
pub fn strip_namespace(full_key: &str) -> &str {
    match full_key.split_once(':') {
        Some((_, rest)) => rest,
        None => full_key,
    }
}
