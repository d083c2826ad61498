//! Process-lifetime store with no durability.

use std::collections::HashMap;

use tiercache_core::{BackendKind, CacheEntry};

use crate::store::Store;

/// Plain in-memory map.
///
/// Nothing here survives a restart, so entries are never dirty.
#[derive(Debug, Default)]
pub struct VolatileStore {
    namespace: String,
    entries: HashMap<String, CacheEntry>,
}

impl VolatileStore {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            entries: HashMap::new(),
        }
    }
}

impl Store for VolatileStore {
    fn kind(&self) -> BackendKind {
        BackendKind::Volatile
    }

    fn namespace(&self) -> &str {
        &self.namespace
    }

    fn get(&mut self, key: &str) -> Option<&mut CacheEntry> {
        self.entries.get_mut(key)
    }

    fn peek(&mut self, key: &str) -> Option<&CacheEntry> {
        self.entries.get(key)
    }

    fn set(&mut self, key: &str, mut entry: CacheEntry) {
        entry.dirty = false;
        self.entries.insert(key.to_string(), entry);
    }

    fn delete(&mut self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    fn has(&mut self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    fn keys(&mut self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    fn size(&mut self) -> usize {
        self.entries.len()
    }

    fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_set_get_delete() {
        let mut store = VolatileStore::new("ns");
        store.set("ns:a", CacheEntry::new(json!(1), 0, None));

        assert!(store.has("ns:a"));
        assert_eq!(store.size(), 1);
        assert_eq!(store.get("ns:a").map(|e| e.value.clone()), Some(json!(1)));

        assert!(store.delete("ns:a"));
        assert!(!store.delete("ns:a"));
        assert_eq!(store.size(), 0);
    }

    #[test]
    fn test_set_replaces_existing_key() {
        let mut store = VolatileStore::new("ns");
        store.set("ns:a", CacheEntry::new(json!("old"), 0, None));
        store.set("ns:a", CacheEntry::new(json!("new"), 1, None));

        assert_eq!(store.size(), 1);
        assert_eq!(store.peek("ns:a").map(|e| e.value.clone()), Some(json!("new")));
    }

    #[test]
    fn test_entries_are_never_dirty() {
        let mut store = VolatileStore::new("ns");
        store.set("ns:a", CacheEntry::new(json!(1), 0, None));
        assert_eq!(store.peek("ns:a").map(|e| e.dirty), Some(false));
    }

    #[test]
    fn test_expired_entries_are_left_to_caller() {
        let mut store = VolatileStore::new("ns");
        store.set("ns:a", CacheEntry::new(json!(1), 0, Some(1)));
        // No clock here: expiry is the manager's concern.
        assert!(store.get("ns:a").is_some());
        assert_eq!(store.cleanup(), 0);
        assert_eq!(store.persist(), 0);
    }

    #[test]
    fn test_clear() {
        let mut store = VolatileStore::new("ns");
        for i in 0..5 {
            store.set(&format!("ns:{i}"), CacheEntry::new(json!(i), 0, None));
        }
        let mut keys = store.keys();
        keys.sort();
        assert_eq!(keys.len(), 5);
        store.clear();
        assert_eq!(store.size(), 0);
    }
}
