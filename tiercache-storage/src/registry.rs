//! Lazy per-namespace store instantiation.

use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use tiercache_core::{BackendKind, Clock, ManagerSettings};
use tracing::{debug, warn};

use crate::durable::DurableBackend;
use crate::hybrid::{HybridConfig, HybridStore};
use crate::store::Store;
use crate::volatile::VolatileStore;

/// Owns every store the manager has touched, keyed by `(namespace, kind)`.
///
/// A store is created the first time a namespace is used with a kind, and
/// the registry also remembers which kinds each namespace has been used
/// with so namespace-wide operations reach all of them.
pub struct StoreRegistry {
    clock: Arc<dyn Clock>,
    durable: Arc<dyn DurableBackend>,
    settings: ManagerSettings,
    stores: BTreeMap<(String, BackendKind), Box<dyn Store>>,
    in_use: BTreeMap<String, BTreeSet<BackendKind>>,
    hybrid_configs: BTreeMap<String, HybridConfig>,
}

impl StoreRegistry {
    pub fn new(
        clock: Arc<dyn Clock>,
        durable: Arc<dyn DurableBackend>,
        settings: ManagerSettings,
    ) -> Self {
        Self {
            clock,
            durable,
            settings,
            stores: BTreeMap::new(),
            in_use: BTreeMap::new(),
            hybrid_configs: BTreeMap::new(),
        }
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub fn settings(&self) -> &ManagerSettings {
        &self.settings
    }

    /// Override the hybrid configuration for a namespace.
    ///
    /// Takes effect when the namespace's hybrid store is first created; an
    /// existing store keeps the configuration it was built with.
    pub fn set_hybrid_config(&mut self, namespace: impl Into<String>, config: HybridConfig) {
        self.hybrid_configs.insert(namespace.into(), config);
    }

    /// Store for `(namespace, kind)`, created on first use.
    pub fn store_mut(&mut self, namespace: &str, kind: BackendKind) -> &mut dyn Store {
        match self.stores.entry((namespace.to_string(), kind)) {
            Entry::Occupied(slot) => slot.into_mut().as_mut(),
            Entry::Vacant(slot) => {
                let store: Box<dyn Store> = match kind {
                    BackendKind::Volatile => Box::new(VolatileStore::new(namespace)),
                    BackendKind::Hybrid => Box::new(HybridStore::new(
                        namespace,
                        self.clock.clone(),
                        self.durable.clone(),
                        hybrid_config_for(&self.hybrid_configs, &self.settings, namespace),
                    )),
                };
                debug!(namespace, kind = %kind, "created store");
                self.in_use
                    .entry(namespace.to_string())
                    .or_default()
                    .insert(kind);
                slot.insert(store).as_mut()
            }
        }
    }

    /// Store for `(namespace, kind)` if one exists. Never creates.
    pub fn existing_mut(
        &mut self,
        namespace: &str,
        kind: BackendKind,
    ) -> Option<&mut (dyn Store + 'static)> {
        self.stores
            .get_mut(&(namespace.to_string(), kind))
            .map(|store| store.as_mut())
    }

    pub fn existing(&self, namespace: &str, kind: BackendKind) -> Option<&dyn Store> {
        self.stores
            .get(&(namespace.to_string(), kind))
            .map(|store| store.as_ref())
    }

    /// Kinds a namespace has been used with, in stable order.
    pub fn kinds_for(&self, namespace: &str) -> Vec<BackendKind> {
        self.in_use
            .get(namespace)
            .map(|kinds| kinds.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Every namespace with at least one store.
    pub fn namespaces(&self) -> Vec<String> {
        self.in_use.keys().cloned().collect()
    }

    /// Namespaces holding a durable container, including ones written by an
    /// earlier process that this registry has not opened yet.
    pub fn durable_namespaces(&self) -> Vec<String> {
        match self.durable.namespaces() {
            Ok(namespaces) => namespaces,
            Err(e) => {
                warn!(error = %e, "failed to list durable namespaces");
                Vec::new()
            }
        }
    }

    /// Kinds an invalidation of `namespace` has to reach.
    ///
    /// This is every kind in use, plus the hybrid kind when a durable
    /// container exists for the namespace. Otherwise the next hybrid read
    /// would rehydrate what was just invalidated.
    pub fn reachable_kinds(&self, namespace: &str) -> Vec<BackendKind> {
        let mut kinds = self.in_use.get(namespace).cloned().unwrap_or_default();
        if !kinds.contains(&BackendKind::Hybrid)
            && self.durable_namespaces().iter().any(|ns| ns == namespace)
        {
            kinds.insert(BackendKind::Hybrid);
        }
        kinds.into_iter().collect()
    }

    /// Union of [`namespaces`](Self::namespaces) and
    /// [`durable_namespaces`](Self::durable_namespaces).
    pub fn reachable_namespaces(&self) -> Vec<String> {
        let mut namespaces: BTreeSet<String> = self.in_use.keys().cloned().collect();
        namespaces.extend(self.durable_namespaces());
        namespaces.into_iter().collect()
    }

    pub fn stores_mut(&mut self) -> impl Iterator<Item = &mut Box<dyn Store>> {
        self.stores.values_mut()
    }

    pub fn stores(&self) -> impl Iterator<Item = &Box<dyn Store>> {
        self.stores.values()
    }
}

fn hybrid_config_for(
    overrides: &BTreeMap<String, HybridConfig>,
    settings: &ManagerSettings,
    namespace: &str,
) -> HybridConfig {
    overrides
        .get(namespace)
        .cloned()
        .unwrap_or_else(|| HybridConfig::new(settings.hybrid_for(namespace)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::durable::InMemoryDurableBackend;
    use tiercache_core::{HybridSettings, ManualClock};

    fn registry() -> StoreRegistry {
        StoreRegistry::new(
            Arc::new(ManualClock::new(0)),
            Arc::new(InMemoryDurableBackend::new()),
            ManagerSettings::default(),
        )
    }

    #[test]
    fn test_lazy_creation_records_kind() {
        let mut reg = registry();
        assert!(reg.existing_mut("paths", BackendKind::Hybrid).is_none());
        assert!(reg.kinds_for("paths").is_empty());

        assert_eq!(reg.store_mut("paths", BackendKind::Hybrid).kind(), BackendKind::Hybrid);
        assert_eq!(reg.store_mut("paths", BackendKind::Volatile).kind(), BackendKind::Volatile);
        assert_eq!(
            reg.kinds_for("paths"),
            vec![BackendKind::Volatile, BackendKind::Hybrid]
        );
        assert_eq!(reg.namespaces(), vec!["paths".to_string()]);
    }

    #[test]
    fn test_durable_residue_is_reachable() {
        let durable = Arc::new(InMemoryDurableBackend::new());
        durable
            .save("paths", &tiercache_core::DurableContainer::new())
            .unwrap();
        let mut reg = StoreRegistry::new(
            Arc::new(ManualClock::new(0)),
            durable,
            ManagerSettings::default(),
        );
        reg.store_mut("rooms", BackendKind::Volatile);

        assert!(reg.kinds_for("paths").is_empty());
        assert_eq!(reg.reachable_kinds("paths"), vec![BackendKind::Hybrid]);
        assert_eq!(reg.reachable_kinds("rooms"), vec![BackendKind::Volatile]);
        assert!(reg.reachable_kinds("other").is_empty());
        assert_eq!(
            reg.reachable_namespaces(),
            vec!["paths".to_string(), "rooms".to_string()]
        );
    }

    #[test]
    fn test_store_is_reused() {
        let mut reg = registry();
        reg.store_mut("ns", BackendKind::Volatile).set(
            "ns:a",
            tiercache_core::CacheEntry::new(serde_json::json!(1), 0, None),
        );
        assert_eq!(reg.store_mut("ns", BackendKind::Volatile).size(), 1);
    }

    #[test]
    fn test_namespace_override_applies_to_new_hybrid_store() {
        let mut reg = StoreRegistry::new(
            Arc::new(ManualClock::new(0)),
            Arc::new(InMemoryDurableBackend::new()),
            ManagerSettings::default()
                .with_namespace("small", HybridSettings::new().with_max_durable_bytes(512)),
        );
        reg.store_mut("small", BackendKind::Hybrid);
        reg.store_mut("other", BackendKind::Hybrid);

        let small = reg.existing("small", BackendKind::Hybrid).and_then(|s| s.hybrid_stats());
        let other = reg.existing("other", BackendKind::Hybrid).and_then(|s| s.hybrid_stats());
        assert_eq!(small.map(|s| s.max_memory_bytes), Some(512));
        assert_eq!(
            other.map(|s| s.max_memory_bytes),
            Some(HybridSettings::default().max_durable_bytes)
        );
    }
}
