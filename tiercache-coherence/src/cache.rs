//! The view a coherence manager has of a registered cache.

use std::collections::BTreeMap;
use std::sync::RwLock;

use regex::Regex;
use tiercache_core::CacheStats;
use tiercache_storage::CacheManager;
use tracing::warn;

/// Point-in-time statistics of one registered cache.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CacheSnapshot {
    /// Totals across the cache's namespaces.
    pub stats: CacheStats,
    /// Durable bytes held.
    pub memory_bytes: u64,
    pub namespaces: BTreeMap<String, CacheStats>,
}

/// Operations the coherence manager needs from a cache it does not own.
pub trait CoherentCache: Send + Sync {
    fn snapshot(&self) -> CacheSnapshot;

    fn invalidate_key(&self, key: &str, namespace: &str) -> bool;

    fn invalidate_pattern(&self, pattern: &Regex, namespace: &str) -> usize;

    /// Clear one namespace or everything. Returns the number of entries
    /// held before the clear.
    fn clear(&self, namespace: Option<&str>) -> usize;
}

impl CoherentCache for RwLock<CacheManager> {
    fn snapshot(&self) -> CacheSnapshot {
        match self.write() {
            Ok(mut manager) => CacheSnapshot {
                stats: manager.get_cache_stats(None),
                memory_bytes: manager.memory_bytes(),
                namespaces: manager.namespace_stats(),
            },
            Err(_) => {
                warn!("cache manager lock poisoned, reporting empty stats");
                CacheSnapshot::default()
            }
        }
    }

    fn invalidate_key(&self, key: &str, namespace: &str) -> bool {
        self.write()
            .map(|mut manager| manager.invalidate(key, namespace))
            .unwrap_or(false)
    }

    fn invalidate_pattern(&self, pattern: &Regex, namespace: &str) -> usize {
        self.write()
            .map(|mut manager| manager.invalidate_pattern(pattern, namespace))
            .unwrap_or(0)
    }

    fn clear(&self, namespace: Option<&str>) -> usize {
        self.write()
            .map(|mut manager| manager.clear(namespace))
            .unwrap_or(0)
    }
}
