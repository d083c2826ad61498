//! Layer tags for registered caches.

use std::fmt;

use serde::Serialize;

/// Reporting and bulk-invalidation group a cache is registered under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum CacheLayer {
    /// Small, hot, short-lived entries.
    #[serde(rename = "fast/small")]
    FastSmall,
    /// Larger volatile working sets.
    #[serde(rename = "fast/large")]
    FastLarge,
    /// Caches backed by the durable tier.
    #[serde(rename = "durable")]
    Durable,
}

impl CacheLayer {
    pub const ALL: [CacheLayer; 3] = [
        CacheLayer::FastSmall,
        CacheLayer::FastLarge,
        CacheLayer::Durable,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            CacheLayer::FastSmall => "fast/small",
            CacheLayer::FastLarge => "fast/large",
            CacheLayer::Durable => "durable",
        }
    }
}

impl fmt::Display for CacheLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
