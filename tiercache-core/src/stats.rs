//! Statistics types.

use serde::Serialize;

/// Counters kept per namespace by the cache manager.
///
/// Independent of any store; reset only by an explicit clear.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct NamespaceStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

impl NamespaceStats {
    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    pub fn record_evictions(&mut self, count: u64) {
        self.evictions += count;
    }

    /// Sum two sets of counters.
    pub fn merge(&mut self, other: &NamespaceStats) {
        self.hits += other.hits;
        self.misses += other.misses;
        self.evictions += other.evictions;
    }
}

/// Statistics about cache usage.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CacheStats {
    /// Number of cache hits.
    pub hits: u64,
    /// Number of cache misses.
    pub misses: u64,
    /// `hits / (hits + misses)`, or 0 with no samples.
    pub hit_rate: f64,
    /// Number of entries currently held, summed across backends.
    pub size: u64,
    /// Number of entries removed by expiry or capacity.
    pub evictions: u64,
}

impl CacheStats {
    pub fn new(hits: u64, misses: u64, size: u64, evictions: u64) -> Self {
        Self {
            hits,
            misses,
            hit_rate: hit_rate(hits, misses),
            size,
            evictions,
        }
    }

    pub fn from_counters(counters: &NamespaceStats, size: u64) -> Self {
        Self::new(counters.hits, counters.misses, size, counters.evictions)
    }

    /// Add another sample into this one, recomputing the hit rate.
    pub fn accumulate(&mut self, other: &CacheStats) {
        self.hits += other.hits;
        self.misses += other.misses;
        self.size += other.size;
        self.evictions += other.evictions;
        self.hit_rate = hit_rate(self.hits, self.misses);
    }
}

/// Calculate the hit rate (0.0 to 1.0).
pub fn hit_rate(hits: u64, misses: u64) -> f64 {
    let total = hits + misses;
    if total == 0 {
        0.0
    } else {
        hits as f64 / total as f64
    }
}
