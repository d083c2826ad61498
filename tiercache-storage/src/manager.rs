//! Cache manager façade.
//!
//! The manager composes namespaced keys, picks the store for a call's
//! options, evaluates TTL on every read, enforces the optional
//! per-namespace size cap, and keeps hit/miss/eviction counters.
//!
//! # Example
//!
//! ```ignore
//! let mut cache = CacheManager::with_backend(clock, durable, ManagerSettings::default());
//! let opts = CacheOptions::in_namespace("pathfinder").ttl(50).store(BackendKind::Hybrid);
//!
//! let route: Vec<u32> = cache.get_or_compute("path:W1N1:W2N2", &opts, || {
//!     Ok::<_, CacheError>(search_route())
//! })?;
//! ```

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use regex::Regex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tiercache_core::{
    full_key, strip_namespace, BackendKind, CacheEntry, CacheError, CacheResult, CacheStats, Clock,
    ManagerSettings, NamespaceStats, Tick,
};
use tracing::{debug, trace};

use crate::durable::DurableBackend;
use crate::hybrid::{HybridConfig, HybridStats};
use crate::registry::StoreRegistry;
use crate::store::Store;

/// Manager shared between the owner and coherence registrations.
pub type SharedCacheManager = Arc<RwLock<CacheManager>>;

/// Per-call options.
///
/// Unset `namespace` and `store` fall back to the manager's
/// [`ManagerSettings`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheOptions {
    pub namespace: Option<String>,
    /// Ticks until expiry. `None` never expires.
    pub ttl: Option<Tick>,
    /// Entry cap for the store. `None` is unbounded.
    pub max_size: Option<usize>,
    pub store: Option<BackendKind>,
}

impl CacheOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn in_namespace(namespace: impl Into<String>) -> Self {
        Self::new().namespace(namespace)
    }

    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn ttl(mut self, ttl: Tick) -> Self {
        self.ttl = Some(ttl);
        self
    }

    pub fn max_size(mut self, max_size: usize) -> Self {
        self.max_size = Some(max_size);
        self
    }

    pub fn store(mut self, kind: BackendKind) -> Self {
        self.store = Some(kind);
        self
    }
}

enum Lookup {
    Miss,
    Expired,
    Hit(Value),
}

/// Orchestrates stores across namespaces and backend kinds.
pub struct CacheManager {
    registry: StoreRegistry,
    stats: BTreeMap<String, NamespaceStats>,
}

impl CacheManager {
    pub fn new(registry: StoreRegistry) -> Self {
        Self {
            registry,
            stats: BTreeMap::new(),
        }
    }

    pub fn with_backend(
        clock: Arc<dyn Clock>,
        durable: Arc<dyn DurableBackend>,
        settings: ManagerSettings,
    ) -> Self {
        Self::new(StoreRegistry::new(clock, durable, settings))
    }

    /// Wrap for sharing with a coherence manager.
    pub fn into_shared(self) -> SharedCacheManager {
        Arc::new(RwLock::new(self))
    }

    pub fn settings(&self) -> &ManagerSettings {
        self.registry.settings()
    }

    pub fn now(&self) -> Tick {
        self.registry.clock().now()
    }

    fn resolve(&self, opts: &CacheOptions) -> (String, BackendKind) {
        let settings = self.registry.settings();
        let namespace = opts
            .namespace
            .clone()
            .unwrap_or_else(|| settings.default_namespace.clone());
        (namespace, opts.store.unwrap_or(settings.default_store))
    }

    /// Configure the hybrid store a namespace will be created with.
    pub fn configure_namespace(&mut self, namespace: impl Into<String>, config: HybridConfig) {
        self.registry.set_hybrid_config(namespace, config);
    }

    fn lookup(&mut self, key: &str, opts: &CacheOptions) -> Option<Value> {
        let (namespace, kind) = self.resolve(opts);
        let full = full_key(&namespace, key);
        let now = self.now();

        let store = self.registry.store_mut(&namespace, kind);
        let lookup = match store.get(&full) {
            None => Lookup::Miss,
            Some(entry) if entry.is_expired(now) => Lookup::Expired,
            Some(entry) => {
                entry.touch(now);
                Lookup::Hit(entry.value.clone())
            }
        };

        let counters = self.stats.entry(namespace).or_default();
        match lookup {
            Lookup::Miss => {
                counters.record_miss();
                None
            }
            Lookup::Expired => {
                store.delete(&full);
                counters.record_evictions(1);
                counters.record_miss();
                trace!(key = %full, "expired on read");
                None
            }
            Lookup::Hit(value) => {
                counters.record_hit();
                Some(value)
            }
        }
    }

    /// Read a value. Absent and expired entries are `Ok(None)`.
    pub fn get<T: DeserializeOwned>(
        &mut self,
        key: &str,
        opts: &CacheOptions,
    ) -> CacheResult<Option<T>> {
        match self.lookup(key, opts) {
            Some(value) => serde_json::from_value(value)
                .map(Some)
                .map_err(|e| CacheError::TypeMismatch {
                    key: key.to_string(),
                    reason: e.to_string(),
                }),
            None => Ok(None),
        }
    }

    /// Read a value, computing and storing it on a miss.
    ///
    /// An error from `compute` is returned as is and nothing is stored.
    pub fn get_or_compute<T, E, F>(
        &mut self,
        key: &str,
        opts: &CacheOptions,
        compute: F,
    ) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        E: From<CacheError>,
        F: FnOnce() -> Result<T, E>,
    {
        if let Some(value) = self.get(key, opts)? {
            return Ok(value);
        }
        let value = compute()?;
        self.set(key, &value, opts)?;
        Ok(value)
    }

    /// Write a value.
    ///
    /// When the store already holds `max_size` entries, the least recently
    /// accessed tenth (rounded up) is evicted first.
    pub fn set<T: Serialize + ?Sized>(
        &mut self,
        key: &str,
        value: &T,
        opts: &CacheOptions,
    ) -> CacheResult<()> {
        let value = serde_json::to_value(value).map_err(|e| CacheError::Serialization {
            key: key.to_string(),
            reason: e.to_string(),
        })?;
        let (namespace, kind) = self.resolve(opts);
        let full = full_key(&namespace, key);
        let now = self.now();

        let store = self.registry.store_mut(&namespace, kind);
        if let Some(max) = opts.max_size {
            if store.size() >= max {
                let evicted = evict_least_recent(store, max.div_ceil(10));
                debug!(namespace = %namespace, evicted, max, "size cap reached");
                self.stats
                    .entry(namespace)
                    .or_default()
                    .record_evictions(evicted as u64);
            }
        }
        store.set(&full, CacheEntry::new(value, now, opts.ttl));
        Ok(())
    }

    /// Remove one key from every backend the namespace uses, including a
    /// durable container left by an earlier process.
    pub fn invalidate(&mut self, key: &str, namespace: &str) -> bool {
        let full = full_key(namespace, key);
        let mut removed = false;
        for kind in self.registry.reachable_kinds(namespace) {
            removed |= self.registry.store_mut(namespace, kind).delete(&full);
        }
        removed
    }

    /// Remove every key in the namespace whose namespace-stripped form
    /// matches `pattern`. Returns the number removed.
    pub fn invalidate_pattern(&mut self, pattern: &Regex, namespace: &str) -> usize {
        let mut removed = 0;
        for kind in self.registry.reachable_kinds(namespace) {
            let store = self.registry.store_mut(namespace, kind);
            for key in store.keys() {
                if pattern.is_match(strip_namespace(&key)) && store.delete(&key) {
                    removed += 1;
                }
            }
        }
        debug!(namespace, pattern = pattern.as_str(), removed, "pattern invalidation");
        removed
    }

    /// [`invalidate_pattern`](Self::invalidate_pattern) from pattern text.
    pub fn invalidate_pattern_str(&mut self, pattern: &str, namespace: &str) -> CacheResult<usize> {
        let regex = Regex::new(pattern).map_err(|e| CacheError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })?;
        Ok(self.invalidate_pattern(&regex, namespace))
    }

    /// Clear one namespace across its backends and reset its counters, or
    /// clear everything. Durable containers are dropped at the next flush.
    ///
    /// Returns the number of entries held before the clear.
    pub fn clear(&mut self, namespace: Option<&str>) -> usize {
        match namespace {
            Some(namespace) => {
                let removed = self.clear_namespace(namespace);
                debug!(namespace, removed, "cleared namespace");
                removed
            }
            None => {
                let removed: usize = self
                    .registry
                    .reachable_namespaces()
                    .iter()
                    .map(|namespace| self.clear_namespace(namespace))
                    .sum();
                self.stats.clear();
                debug!(removed, "cleared all namespaces");
                removed
            }
        }
    }

    fn clear_namespace(&mut self, namespace: &str) -> usize {
        let mut removed = 0;
        for kind in self.registry.reachable_kinds(namespace) {
            let store = self.registry.store_mut(namespace, kind);
            removed += store.size();
            store.clear();
        }
        self.stats.remove(namespace);
        removed
    }

    fn namespace_size(&mut self, namespace: &str) -> u64 {
        let mut size = 0;
        for kind in self.registry.kinds_for(namespace) {
            if let Some(store) = self.registry.existing_mut(namespace, kind) {
                size += store.size() as u64;
            }
        }
        size
    }

    /// Statistics for one namespace, or summed over all of them.
    pub fn get_cache_stats(&mut self, namespace: Option<&str>) -> CacheStats {
        match namespace {
            Some(namespace) => {
                let size = self.namespace_size(namespace);
                let counters = self.stats.get(namespace).cloned().unwrap_or_default();
                CacheStats::from_counters(&counters, size)
            }
            None => {
                let mut counters = NamespaceStats::default();
                for ns_counters in self.stats.values() {
                    counters.merge(ns_counters);
                }
                let size = self.registry.stores_mut().map(|s| s.size() as u64).sum();
                CacheStats::from_counters(&counters, size)
            }
        }
    }

    /// Per-namespace statistics for every namespace with a store.
    pub fn namespace_stats(&mut self) -> BTreeMap<String, CacheStats> {
        self.registry
            .namespaces()
            .into_iter()
            .map(|namespace| {
                let stats = self.get_cache_stats(Some(&namespace));
                (namespace, stats)
            })
            .collect()
    }

    pub fn namespaces(&self) -> Vec<String> {
        self.registry.namespaces()
    }

    /// Sweep expired entries from every store.
    pub fn cleanup(&mut self) -> usize {
        self.registry.stores_mut().map(|store| store.cleanup()).sum()
    }

    /// Run a flush on every store. Returns the number of records written.
    pub fn persist(&mut self) -> usize {
        self.registry.stores_mut().map(|store| store.persist()).sum()
    }

    /// Durable bytes held across all stores.
    pub fn memory_bytes(&self) -> u64 {
        self.registry.stores().map(|store| store.memory_bytes()).sum()
    }

    pub fn hybrid_stats(&self, namespace: &str) -> Option<HybridStats> {
        self.registry
            .existing(namespace, BackendKind::Hybrid)
            .and_then(|store| store.hybrid_stats())
    }
}

/// Delete up to `count` entries, least recently accessed first.
fn evict_least_recent(store: &mut dyn Store, count: usize) -> usize {
    let mut by_recency: Vec<(Tick, String)> = store
        .keys()
        .into_iter()
        .filter_map(|key| {
            let last_accessed = store.peek(&key)?.last_accessed;
            Some((last_accessed, key))
        })
        .collect();
    by_recency.sort();

    by_recency
        .into_iter()
        .take(count)
        .filter(|(_, key)| store.delete(key))
        .count()
}
