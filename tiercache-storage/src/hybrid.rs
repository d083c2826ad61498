//! Hybrid store: volatile fast tier with selective durable write-back.
//!
//! Every read and write is served from a volatile map. Entries accepted by
//! the namespace's [`PersistencePredicate`] are marked dirty and written to
//! the namespace's [`DurableContainer`] on the next due [`persist`]. After
//! a restart the first access of any kind rehydrates the volatile map from
//! that container.
//!
//! # Two budgets, two eviction paths
//!
//! The manager caps entry count by evicting from the store. This module
//! caps the durable container's byte size by evicting from the container
//! only: a key dropped for budget stays live in the volatile map until the
//! process goes away.
//!
//! # Durable mutations
//!
//! Only a due flush, budget enforcement, rehydration GC and `cleanup`
//! write the container. `delete` and `clear` queue durable removals that
//! the next flush applies.
//!
//! [`persist`]: Store::persist

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use serde::Serialize;
use tiercache_core::{BackendKind, CacheEntry, Clock, DurableContainer, HybridSettings, Tick};
use tracing::{debug, trace, warn};

use crate::durable::DurableBackend;
use crate::persistence::PersistencePredicate;
use crate::size::{estimate_container_bytes, estimate_record_bytes};
use crate::store::Store;

/// Settings plus persistence predicate for one hybrid namespace.
#[derive(Debug, Clone, Default)]
pub struct HybridConfig {
    pub settings: HybridSettings,
    pub predicate: PersistencePredicate,
}

impl HybridConfig {
    pub fn new(settings: HybridSettings) -> Self {
        Self {
            settings,
            predicate: PersistencePredicate::default(),
        }
    }

    pub fn with_predicate(mut self, predicate: PersistencePredicate) -> Self {
        self.predicate = predicate;
        self
    }
}

/// Durable tier report for one hybrid namespace.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HybridStats {
    pub volatile_entries: usize,
    pub durable_entries: usize,
    pub dirty_entries: usize,
    pub memory_usage_bytes: u64,
    pub max_memory_bytes: u64,
    /// `memory_usage_bytes / max_memory_bytes`.
    pub budget_utilization: f64,
    pub last_sync_tick: Option<Tick>,
    pub rehydrated: bool,
}

/// Process-lifetime half of the store.
#[derive(Debug)]
struct VolatileLayer {
    created_at: Tick,
    rehydrated: bool,
    entries: HashMap<String, CacheEntry>,
}

/// Hybrid volatile/durable store for one namespace.
pub struct HybridStore {
    namespace: String,
    clock: Arc<dyn Clock>,
    durable: Arc<dyn DurableBackend>,
    config: HybridConfig,
    layer: VolatileLayer,
    /// Persistence-eligible keys with unflushed mutations.
    dirty: BTreeSet<String>,
    /// Keys whose durable copy the next flush must drop.
    pending_removals: BTreeSet<String>,
    /// Loaded on rehydration or allocated on first flush.
    container: Option<DurableContainer>,
    /// Set when the last save failed, so the next due flush saves anyway.
    unsaved: bool,
    last_sync_tick: Option<Tick>,
    last_budget_tick: Option<Tick>,
}

impl HybridStore {
    pub fn new(
        namespace: impl Into<String>,
        clock: Arc<dyn Clock>,
        durable: Arc<dyn DurableBackend>,
        config: HybridConfig,
    ) -> Self {
        let created_at = clock.now();
        Self {
            namespace: namespace.into(),
            clock,
            durable,
            config,
            layer: VolatileLayer {
                created_at,
                rehydrated: false,
                entries: HashMap::new(),
            },
            dirty: BTreeSet::new(),
            pending_removals: BTreeSet::new(),
            container: None,
            unsaved: false,
            last_sync_tick: None,
            last_budget_tick: None,
        }
    }

    pub fn config(&self) -> &HybridConfig {
        &self.config
    }

    /// Tick at which this process-lifetime layer was created.
    pub fn created_at(&self) -> Tick {
        self.layer.created_at
    }

    pub fn is_rehydrated(&self) -> bool {
        self.layer.rehydrated
    }

    /// Whether a durable container has been loaded or allocated.
    pub fn has_container(&self) -> bool {
        self.container.is_some()
    }

    /// Whether `key` currently has a durable copy.
    pub fn is_durable(&self, key: &str) -> bool {
        self.container
            .as_ref()
            .is_some_and(|c| c.data.contains_key(key))
    }

    /// The loaded durable container, if any.
    pub fn container(&self) -> Option<&DurableContainer> {
        self.container.as_ref()
    }

    pub fn memory_usage_bytes(&self) -> u64 {
        self.container.as_ref().map_or(0, |c| c.byte_estimate)
    }

    pub fn budget_utilization(&self) -> f64 {
        let max = self.config.settings.max_durable_bytes;
        if max == 0 {
            return 0.0;
        }
        self.memory_usage_bytes() as f64 / max as f64
    }

    pub fn stats(&self) -> HybridStats {
        HybridStats {
            volatile_entries: self.layer.entries.len(),
            durable_entries: self.container.as_ref().map_or(0, DurableContainer::len),
            dirty_entries: self.dirty.len(),
            memory_usage_bytes: self.memory_usage_bytes(),
            max_memory_bytes: self.config.settings.max_durable_bytes,
            budget_utilization: self.budget_utilization(),
            last_sync_tick: self.last_sync_tick,
            rehydrated: self.layer.rehydrated,
        }
    }

    /// Populate the volatile layer from the durable container.
    ///
    /// Runs once per process lifetime; later calls return 0. Expired
    /// records are dropped from the container instead of restored. A
    /// container written with another layout version is discarded.
    ///
    /// Returns the number of entries restored.
    pub fn rehydrate(&mut self) -> usize {
        if self.layer.rehydrated {
            return 0;
        }
        self.layer.rehydrated = true;
        let now = self.clock.now();

        let mut container = match self.durable.load(&self.namespace) {
            Ok(Some(container)) => container,
            Ok(None) => return 0,
            Err(e) => {
                warn!(
                    namespace = %self.namespace,
                    error = %e,
                    "durable container unreadable, starting empty"
                );
                return 0;
            }
        };

        if !container.is_current_version() {
            debug!(
                namespace = %self.namespace,
                version = container.version,
                "discarding durable container with foreign layout"
            );
            if let Err(e) = self.durable.remove(&self.namespace) {
                warn!(namespace = %self.namespace, error = %e, "failed to drop stale container");
            }
            return 0;
        }

        let expired: Vec<String> = container
            .data
            .iter()
            .filter(|(_, record)| record.is_expired(now))
            .map(|(key, _)| key.clone())
            .collect();
        for key in &expired {
            container.data.remove(key);
        }

        let mut restored = 0;
        for (key, record) in &container.data {
            if !self.layer.entries.contains_key(key) {
                self.layer
                    .entries
                    .insert(key.clone(), CacheEntry::from_record(record.clone(), now));
                restored += 1;
            }
        }

        if !expired.is_empty() {
            container.byte_estimate = estimate_container_bytes(&container);
        }
        self.container = Some(container);
        if !expired.is_empty() {
            self.save_container();
        }

        debug!(
            namespace = %self.namespace,
            restored,
            dropped = expired.len(),
            "rehydrated from durable tier"
        );
        restored
    }

    fn ensure_rehydrated(&mut self) {
        if !self.layer.rehydrated {
            self.rehydrate();
        }
    }

    /// Remove from the volatile layer and forget any pending flush.
    fn remove_volatile(&mut self, key: &str) -> bool {
        self.dirty.remove(key);
        self.layer.entries.remove(key).is_some()
    }

    /// Drop a key if it has expired. Returns true if the key is live.
    fn retain_live(&mut self, key: &str, now: Tick) -> bool {
        let expired = match self.layer.entries.get(key) {
            Some(entry) => entry.is_expired(now),
            None => return false,
        };
        if expired {
            trace!(namespace = %self.namespace, key, "expired on access");
            self.remove_volatile(key);
        }
        !expired
    }

    /// Evict durable copies, least recently used first, until the
    /// container fits its budget. Volatile entries are untouched.
    ///
    /// Returns the number of durable records evicted.
    pub fn enforce_durable_budget(&mut self) -> usize {
        self.ensure_rehydrated();
        let evicted = self.evict_over_budget();
        if evicted > 0 {
            self.save_container();
        }
        evicted
    }

    fn evict_over_budget(&mut self) -> usize {
        let max = self.config.settings.max_durable_bytes;
        let Some(container) = self.container.as_mut() else {
            return 0;
        };
        if container.byte_estimate <= max {
            return 0;
        }

        let mut candidates: Vec<(Tick, String)> = container
            .data
            .keys()
            .filter_map(|key| {
                self.layer
                    .entries
                    .get(key)
                    .map(|entry| (entry.last_accessed, key.clone()))
            })
            .collect();
        candidates.sort();

        let mut evicted = 0;
        for (_, key) in candidates {
            if container.byte_estimate <= max {
                break;
            }
            if let Some(record) = container.data.remove(&key) {
                let freed = estimate_record_bytes(&key, &record);
                container.byte_estimate = container.byte_estimate.saturating_sub(freed);
                evicted += 1;
            }
        }

        if evicted > 0 {
            container.byte_estimate = estimate_container_bytes(container);
            debug!(
                namespace = %self.namespace,
                evicted,
                bytes = container.byte_estimate,
                budget = max,
                "evicted durable records over budget"
            );
        }
        evicted
    }

    fn save_container(&mut self) {
        let Some(container) = self.container.as_ref() else {
            return;
        };
        match self.durable.save(&self.namespace, container) {
            Ok(()) => self.unsaved = false,
            Err(e) => {
                warn!(namespace = %self.namespace, error = %e, "durable save failed, will retry");
                self.unsaved = true;
            }
        }
    }

    fn sync_due(&self, now: Tick) -> bool {
        match self.last_sync_tick {
            Some(last) => now.saturating_sub(last) >= self.config.settings.sync_interval,
            None => true,
        }
    }

    fn budget_check_due(&self, now: Tick) -> bool {
        match self.last_budget_tick {
            Some(last) => now.saturating_sub(last) >= self.config.settings.budget_check_interval(),
            None => true,
        }
    }
}

impl Store for HybridStore {
    fn kind(&self) -> BackendKind {
        BackendKind::Hybrid
    }

    fn namespace(&self) -> &str {
        &self.namespace
    }

    fn get(&mut self, key: &str) -> Option<&mut CacheEntry> {
        self.ensure_rehydrated();
        self.layer.entries.get_mut(key)
    }

    fn peek(&mut self, key: &str) -> Option<&CacheEntry> {
        self.ensure_rehydrated();
        let now = self.clock.now();
        if !self.retain_live(key, now) {
            return None;
        }
        self.layer.entries.get(key)
    }

    fn set(&mut self, key: &str, mut entry: CacheEntry) {
        self.ensure_rehydrated();
        let eligible = self.config.predicate.matches(key, &entry);
        entry.dirty = eligible;
        if eligible {
            self.dirty.insert(key.to_string());
            self.pending_removals.remove(key);
        } else {
            self.dirty.remove(key);
            if self.is_durable(key) {
                self.pending_removals.insert(key.to_string());
            }
        }
        self.layer.entries.insert(key.to_string(), entry);
    }

    fn delete(&mut self, key: &str) -> bool {
        self.ensure_rehydrated();
        let existed = self.remove_volatile(key);
        if self.is_durable(key) {
            self.pending_removals.insert(key.to_string());
        }
        existed
    }

    fn has(&mut self, key: &str) -> bool {
        self.ensure_rehydrated();
        let now = self.clock.now();
        self.retain_live(key, now)
    }

    fn keys(&mut self) -> Vec<String> {
        self.ensure_rehydrated();
        let now = self.clock.now();
        self.layer
            .entries
            .iter()
            .filter(|(_, entry)| !entry.is_expired(now))
            .map(|(key, _)| key.clone())
            .collect()
    }

    fn size(&mut self) -> usize {
        self.ensure_rehydrated();
        self.layer.entries.len()
    }

    fn clear(&mut self) {
        self.ensure_rehydrated();
        self.layer.entries.clear();
        self.dirty.clear();
        if let Some(container) = self.container.as_ref() {
            self.pending_removals.extend(container.data.keys().cloned());
        }
    }

    fn cleanup(&mut self) -> usize {
        self.ensure_rehydrated();
        let now = self.clock.now();

        let expired: Vec<String> = self
            .layer
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired(now))
            .map(|(key, _)| key.clone())
            .collect();
        for key in &expired {
            self.remove_volatile(key);
        }
        let mut removed = expired.len();

        let mut durable_removed = 0;
        if let Some(container) = self.container.as_mut() {
            let before = container.data.len();
            container.data.retain(|_, record| !record.is_expired(now));
            durable_removed = before - container.data.len();
            if durable_removed > 0 {
                container.byte_estimate = estimate_container_bytes(container);
            }
        }
        if durable_removed > 0 {
            self.save_container();
        }
        removed += durable_removed;

        if removed > 0 {
            debug!(
                namespace = %self.namespace,
                volatile = expired.len(),
                durable = durable_removed,
                "swept expired entries"
            );
        }
        removed
    }

    fn persist(&mut self) -> usize {
        self.ensure_rehydrated();
        let now = self.clock.now();
        if !self.sync_due(now) {
            return 0;
        }
        self.last_sync_tick = Some(now);

        if self.container.is_none() {
            if self.dirty.is_empty() {
                // Nothing durable to remove either.
                self.pending_removals.clear();
                return 0;
            }
            self.container = Some(DurableContainer::new());
        }

        let dirty = std::mem::take(&mut self.dirty);
        let removals = std::mem::take(&mut self.pending_removals);
        let mut written = 0;
        let mut changed = self.unsaved;

        if let Some(container) = self.container.as_mut() {
            for key in dirty {
                if let Some(entry) = self.layer.entries.get_mut(&key) {
                    container.data.insert(key, entry.to_record());
                    entry.dirty = false;
                    written += 1;
                }
            }
            for key in &removals {
                if container.data.remove(key).is_some() {
                    changed = true;
                }
            }
            changed |= written > 0;
            if changed {
                container.last_sync_tick = now;
                container.byte_estimate = estimate_container_bytes(container);
            }
        }

        if self.budget_check_due(now) {
            self.last_budget_tick = Some(now);
            if self.evict_over_budget() > 0 {
                changed = true;
            }
        }

        if changed {
            self.save_container();
            debug!(
                namespace = %self.namespace,
                written,
                removed = removals.len(),
                bytes = self.memory_usage_bytes(),
                "flushed to durable tier"
            );
        }
        written
    }

    fn memory_bytes(&self) -> u64 {
        self.memory_usage_bytes()
    }

    fn hybrid_stats(&self) -> Option<HybridStats> {
        Some(self.stats())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::durable::InMemoryDurableBackend;
    use serde_json::json;
    use tiercache_core::{DurableRecord, ManualClock, DURABLE_FORMAT_VERSION};

    struct Fixture {
        clock: Arc<ManualClock>,
        durable: Arc<InMemoryDurableBackend>,
    }

    impl Fixture {
        fn new(tick: Tick) -> Self {
            Self {
                clock: Arc::new(ManualClock::new(tick)),
                durable: Arc::new(InMemoryDurableBackend::new()),
            }
        }

        fn store(&self, config: HybridConfig) -> HybridStore {
            HybridStore::new("ns", self.clock.clone(), self.durable.clone(), config)
        }

        fn persist_all(&self) -> HybridStore {
            self.store(
                HybridConfig::new(HybridSettings::new().with_sync_interval(1))
                    .with_predicate(PersistencePredicate::always()),
            )
        }
    }

    fn entry(value: serde_json::Value, now: Tick, ttl: Option<Tick>) -> CacheEntry {
        CacheEntry::new(value, now, ttl)
    }

    fn record(value: serde_json::Value, cached_at: Tick, ttl: Option<Tick>) -> DurableRecord {
        DurableRecord {
            value,
            cached_at,
            ttl,
            hits: 0,
        }
    }

    #[test]
    fn test_set_get_serves_from_volatile() {
        let fx = Fixture::new(10);
        let mut store = fx.persist_all();
        store.set("ns:a", entry(json!("x"), 10, None));

        fx.clock.advance(3);
        let hit = store.get("ns:a").expect("entry should be present");
        assert_eq!(hit.value, json!("x"));
        assert_eq!(hit.last_accessed, 10);
        // Reads never touch the durable tier.
        assert!(fx.durable.raw("ns").is_none());
    }

    #[test]
    fn test_get_leaves_expiry_to_caller() {
        let fx = Fixture::new(100);
        let mut store = fx.persist_all();
        store.set("ns:a", entry(json!(1), 100, Some(5)));

        fx.clock.advance(6);
        let stale = store.get("ns:a").expect("expired entry is still returned");
        assert!(stale.is_expired(106));
        assert_eq!(store.size(), 1);
    }

    #[test]
    fn test_has_drops_expired_entry() {
        let fx = Fixture::new(100);
        let mut store = fx.persist_all();
        store.set("ns:a", entry(json!(1), 100, Some(5)));
        assert_eq!(store.size(), 1);

        fx.clock.advance(6);
        assert!(!store.has("ns:a"));
        assert_eq!(store.size(), 0);
        assert_eq!(store.stats().dirty_entries, 0);
    }

    #[test]
    fn test_predicate_controls_dirty_flag() {
        let fx = Fixture::new(0);
        let families = crate::persistence::KeyFamilyPredicate::new(["^path:"]).unwrap();
        let mut store = fx.store(
            HybridConfig::new(HybridSettings::new().with_sync_interval(1))
                .with_predicate(PersistencePredicate::key_families(families)),
        );
        store.set("ns:path:a", entry(json!(1), 0, None));
        store.set("ns:energy", entry(json!(2), 0, None));

        assert_eq!(store.peek("ns:path:a").map(|e| e.dirty), Some(true));
        assert_eq!(store.peek("ns:energy").map(|e| e.dirty), Some(false));
        assert_eq!(store.stats().dirty_entries, 1);
    }

    #[test]
    fn test_persist_writes_dirty_entries_and_clears_flags() {
        let fx = Fixture::new(7);
        let mut store = fx.persist_all();
        store.set("ns:a", entry(json!({"v": 1}), 7, Some(50)));
        store.set("ns:b", entry(json!({"v": 2}), 7, None));

        assert_eq!(store.persist(), 2);
        assert_eq!(store.peek("ns:a").map(|e| e.dirty), Some(false));

        let saved = fx.durable.load("ns").unwrap().expect("container saved");
        assert_eq!(saved.len(), 2);
        assert_eq!(saved.last_sync_tick, 7);
        assert_eq!(saved.data["ns:a"].ttl, Some(50));
        assert_eq!(saved.byte_estimate, store.memory_usage_bytes());
    }

    #[test]
    fn test_persist_is_rate_limited() {
        let fx = Fixture::new(0);
        let mut store = fx.store(
            HybridConfig::new(HybridSettings::new().with_sync_interval(5))
                .with_predicate(PersistencePredicate::always()),
        );
        store.set("ns:a", entry(json!(1), 0, None));
        assert_eq!(store.persist(), 1);

        store.set("ns:b", entry(json!(2), 0, None));
        fx.clock.advance(4);
        assert_eq!(store.persist(), 0);
        fx.clock.advance(1);
        assert_eq!(store.persist(), 1);
    }

    #[test]
    fn test_hits_do_not_mark_dirty() {
        let fx = Fixture::new(0);
        let mut store = fx.persist_all();
        store.set("ns:a", entry(json!(1), 0, None));
        assert_eq!(store.persist(), 1);

        for _ in 0..3 {
            fx.clock.advance(1);
            store.get("ns:a").expect("present").touch(fx.clock.now());
        }
        fx.clock.advance(1);
        assert_eq!(store.persist(), 0);
    }

    #[test]
    fn test_no_eligible_keys_never_allocates_container() {
        let fx = Fixture::new(0);
        let mut store = fx.store(
            HybridConfig::new(HybridSettings::new().with_sync_interval(1))
                .with_predicate(PersistencePredicate::never()),
        );
        for tick in 0..5 {
            fx.clock.set(tick);
            store.set(&format!("ns:{tick}"), entry(json!(tick), tick, None));
            store.delete("ns:0");
            assert_eq!(store.persist(), 0);
        }
        assert!(!store.has_container());
        assert!(fx.durable.raw("ns").is_none());
    }

    #[test]
    fn test_delete_drops_durable_copy_on_next_flush() {
        let fx = Fixture::new(0);
        let mut store = fx.persist_all();
        store.set("ns:a", entry(json!(1), 0, None));
        store.set("ns:b", entry(json!(2), 0, None));
        store.persist();

        assert!(store.delete("ns:a"));
        assert!(store.is_durable("ns:a"));

        fx.clock.advance(1);
        store.persist();
        assert!(!store.is_durable("ns:a"));
        let saved = fx.durable.load("ns").unwrap().unwrap();
        assert_eq!(saved.data.keys().collect::<Vec<_>>(), vec!["ns:b"]);
    }

    #[test]
    fn test_clear_empties_both_tiers_after_flush() {
        let fx = Fixture::new(0);
        let mut store = fx.persist_all();
        store.set("ns:a", entry(json!(1), 0, None));
        store.persist();
        store.clear();
        assert_eq!(store.size(), 0);

        fx.clock.advance(1);
        store.persist();
        assert_eq!(fx.durable.load("ns").unwrap().map(|c| c.len()), Some(0));
    }

    #[test]
    fn test_budget_eviction_uses_recency_not_insertion() {
        let fx = Fixture::new(0);
        let mut store = fx.store(
            HybridConfig::new(
                HybridSettings::new()
                    .with_sync_interval(1)
                    .with_max_durable_bytes(100_000),
            )
            .with_predicate(PersistencePredicate::always()),
        );
        let payload = "p".repeat(100);
        for (tick, key) in ["ns:old", "ns:mid", "ns:new"].iter().enumerate() {
            fx.clock.set(tick as Tick);
            store.set(key, entry(json!(payload), tick as Tick, None));
        }
        store.persist();

        // Touch the first-inserted key so it becomes most recent.
        fx.clock.set(10);
        store.get("ns:old").expect("present").touch(10);

        let one_record =
            estimate_record_bytes("ns:mid", &store.container().unwrap().data["ns:mid"]);
        store.config.settings.max_durable_bytes = store.memory_usage_bytes() - one_record / 2;

        assert_eq!(store.enforce_durable_budget(), 1);
        assert!(!store.is_durable("ns:mid"));
        assert!(store.is_durable("ns:old"));
        assert!(store.is_durable("ns:new"));
        // Volatile copy survives durable eviction.
        assert!(store.has("ns:mid"));
    }

    #[test]
    fn test_budget_enforced_on_slow_cadence() {
        let fx = Fixture::new(0);
        let mut store = fx.store(
            HybridConfig::new(
                HybridSettings::new()
                    .with_sync_interval(1)
                    .with_max_durable_bytes(400)
                    .with_budget_check_multiplier(10),
            )
            .with_predicate(PersistencePredicate::always()),
        );
        store.set("ns:first", entry(json!("a"), 0, None));
        store.persist();
        assert!(store.memory_usage_bytes() <= 400);

        let payload = "z".repeat(150);
        for tick in 1..10 {
            fx.clock.set(tick);
            store.set(&format!("ns:{tick}"), entry(json!(payload), tick, None));
            store.persist();
        }
        // Between checks the container may run over.
        assert!(store.memory_usage_bytes() > 400);

        fx.clock.set(10);
        store.persist();
        assert!(store.memory_usage_bytes() <= 400);
        assert!(store.budget_utilization() <= 1.0);
    }

    #[test]
    fn test_rehydrate_restores_and_gcs_expired() {
        let fx = Fixture::new(0);
        let mut container = DurableContainer::new();
        container.data.insert("ns:a".into(), record(json!(1), 100, None));
        container.data.insert("ns:b".into(), record(json!(2), 100, Some(1000)));
        container.data.insert("ns:c".into(), record(json!(3), 100, Some(10)));
        fx.durable.save("ns", &container).unwrap();

        fx.clock.set(200);
        let mut store = fx.persist_all();
        assert!(store.get("ns:a").is_some());
        assert_eq!(store.size(), 2);
        assert!(!store.has("ns:c"));
        assert!(!store.is_durable("ns:c"));

        let saved = fx.durable.load("ns").unwrap().unwrap();
        assert!(!saved.data.contains_key("ns:c"));
        assert!(saved.byte_estimate > 0);
        let restored = store.peek("ns:b").unwrap();
        assert_eq!(restored.last_accessed, 200);
        assert!(!restored.dirty);
    }

    #[test]
    fn test_rehydrate_is_idempotent() {
        let fx = Fixture::new(0);
        let mut container = DurableContainer::new();
        container.data.insert("ns:a".into(), record(json!(1), 0, None));
        fx.durable.save("ns", &container).unwrap();

        let mut store = fx.persist_all();
        assert_eq!(store.rehydrate(), 1);
        assert_eq!(store.rehydrate(), 0);
        assert_eq!(store.size(), 1);
    }

    #[test]
    fn test_rehydrate_discards_foreign_version() {
        let fx = Fixture::new(0);
        let mut container = DurableContainer::new();
        container.version = DURABLE_FORMAT_VERSION + 1;
        container.data.insert("ns:a".into(), record(json!(1), 0, None));
        fx.durable.save("ns", &container).unwrap();

        let mut store = fx.persist_all();
        assert_eq!(store.size(), 0);
        assert!(fx.durable.load("ns").unwrap().is_none());
    }

    #[test]
    fn test_rehydrate_survives_corrupt_blob() {
        let fx = Fixture::new(0);
        fx.durable.put_raw("ns", b"{{{".to_vec());
        let mut store = fx.persist_all();
        assert_eq!(store.size(), 0);
        assert!(store.is_rehydrated());
    }

    #[test]
    fn test_cleanup_sweeps_both_tiers() {
        let fx = Fixture::new(0);
        let mut store = fx.persist_all();
        store.set("ns:short", entry(json!(1), 0, Some(5)));
        store.set("ns:long", entry(json!(2), 0, None));
        store.persist();

        store.delete("ns:long");
        fx.clock.set(10);
        // One volatile and one durable copy of ns:short.
        assert_eq!(store.cleanup(), 2);
        assert!(!store.is_durable("ns:short"));
        assert!(store.is_durable("ns:long"));
    }

    #[test]
    fn test_stats_report() {
        let fx = Fixture::new(0);
        let mut store = fx.persist_all();
        store.set("ns:a", entry(json!(1), 0, None));
        let before = store.stats();
        assert_eq!(before.dirty_entries, 1);
        assert_eq!(before.durable_entries, 0);
        assert!(before.rehydrated);

        store.persist();
        let after = store.stats();
        assert_eq!(after.durable_entries, 1);
        assert_eq!(after.dirty_entries, 0);
        assert_eq!(after.last_sync_tick, Some(0));
        assert!(after.memory_usage_bytes > 0);
        assert_eq!(after.max_memory_bytes, HybridSettings::default().max_durable_bytes);
    }
}
