//! Coherence manager.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use tiercache_core::{hit_rate, CacheStats};
use tracing::debug;

use crate::cache::CoherentCache;
use crate::event::{CacheEvent, EventSource, InvalidationRule};
use crate::layer::CacheLayer;
use crate::scope::InvalidationScope;

/// A cache registered under a layer. The coherence manager observes it and
/// never owns its storage.
#[derive(Clone)]
pub struct RegisteredCache {
    pub name: String,
    pub layer: CacheLayer,
    pub cache: Arc<dyn CoherentCache>,
}

/// Aggregate over every cache in one layer.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LayerStats {
    /// Number of registered caches.
    pub caches: usize,
    pub size: u64,
    pub hits: u64,
    pub misses: u64,
    pub hit_rate: f64,
    pub evictions: u64,
}

impl LayerStats {
    fn add(&mut self, stats: &CacheStats) {
        self.caches += 1;
        self.size += stats.size;
        self.hits += stats.hits;
        self.misses += stats.misses;
        self.evictions += stats.evictions;
        self.hit_rate = hit_rate(self.hits, self.misses);
    }
}

/// Totals over every registered cache.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GlobalStats {
    pub hits: u64,
    pub misses: u64,
    pub hit_rate: f64,
    /// Durable bytes.
    pub memory: u64,
    pub evictions: u64,
    /// Invalidation calls handled, direct or event-driven.
    pub invalidations: u64,
}

/// Layered statistics report.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CoherenceStats {
    pub layers: BTreeMap<CacheLayer, LayerStats>,
    pub global: GlobalStats,
    /// Per-namespace totals, summed across caches sharing a namespace name.
    pub namespaces: BTreeMap<String, CacheStats>,
}

/// Registry of caches with unified reporting and invalidation.
#[derive(Default)]
pub struct CoherenceManager {
    caches: Vec<RegisteredCache>,
    rules: Vec<InvalidationRule>,
    invalidations: u64,
}

impl CoherenceManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a cache. A registration with the same name is replaced.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        layer: CacheLayer,
        cache: Arc<dyn CoherentCache>,
    ) {
        let name = name.into();
        self.caches.retain(|existing| existing.name != name);
        debug!(name = %name, layer = %layer, "registered cache");
        self.caches.push(RegisteredCache { name, layer, cache });
    }

    pub fn unregister(&mut self, name: &str) -> bool {
        let before = self.caches.len();
        self.caches.retain(|existing| existing.name != name);
        before != self.caches.len()
    }

    pub fn registered(&self) -> &[RegisteredCache] {
        &self.caches
    }

    pub fn get_cache_stats(&self) -> CoherenceStats {
        let mut report = CoherenceStats::default();
        let mut totals = CacheStats::default();

        for registered in &self.caches {
            let snapshot = registered.cache.snapshot();
            report
                .layers
                .entry(registered.layer)
                .or_default()
                .add(&snapshot.stats);
            totals.accumulate(&snapshot.stats);
            report.global.memory += snapshot.memory_bytes;
            for (namespace, stats) in &snapshot.namespaces {
                report
                    .namespaces
                    .entry(namespace.clone())
                    .or_default()
                    .accumulate(stats);
            }
        }

        report.global.hits = totals.hits;
        report.global.misses = totals.misses;
        report.global.hit_rate = totals.hit_rate;
        report.global.evictions = totals.evictions;
        report.global.invalidations = self.invalidations;
        report
    }

    /// Apply a scope to every registered cache.
    ///
    /// Returns the number of entries removed, summed over caches.
    pub fn invalidate(&mut self, scope: &InvalidationScope) -> usize {
        self.invalidations += 1;
        let removed: usize = self
            .caches
            .iter()
            .map(|registered| match scope {
                InvalidationScope::Key { key, namespace } => {
                    usize::from(registered.cache.invalidate_key(key, namespace))
                }
                InvalidationScope::Pattern { pattern, namespace } => {
                    registered.cache.invalidate_pattern(pattern, namespace)
                }
                InvalidationScope::Namespace(namespace) => registered.cache.clear(Some(namespace)),
                InvalidationScope::All => registered.cache.clear(None),
            })
            .sum();
        debug!(
            namespace = scope.target_namespace().unwrap_or("*"),
            removed,
            caches = self.caches.len(),
            "invalidation fan-out"
        );
        removed
    }

    /// Add a rule consulted by [`handle_event`](Self::handle_event).
    pub fn on_event(&mut self, rule: InvalidationRule) {
        self.rules.push(rule);
    }

    /// Run every rule against `event` and apply the scopes they return.
    pub fn handle_event(&mut self, event: &CacheEvent) -> usize {
        let scopes: Vec<InvalidationScope> =
            self.rules.iter().flat_map(|rule| rule.apply(event)).collect();
        scopes.iter().map(|scope| self.invalidate(scope)).sum()
    }

    /// Handle every pending event from `source`.
    pub fn drain_events(&mut self, source: &mut dyn EventSource) -> usize {
        source
            .drain()
            .iter()
            .map(|event| self.handle_event(event))
            .sum()
    }
}
