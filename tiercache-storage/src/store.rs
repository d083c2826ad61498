//! The store contract every backend satisfies.

use tiercache_core::{BackendKind, CacheEntry};

use crate::hybrid::HybridStats;

/// Uniform synchronous interface over a namespace-scoped key/entry map.
///
/// Every method completes within one execution step and is bounded by the
/// number of entries in the namespace. Keys are full keys
/// (`namespace:key`) as derived by the manager.
///
/// # TTL
///
/// `get` returns entries regardless of expiry and leaves TTL evaluation
/// to the caller. The hybrid store drops expired entries on `has`, `peek`
/// and `cleanup`, and `keys` skips them.
pub trait Store: Send + Sync {
    /// Backend kind of this store.
    fn kind(&self) -> BackendKind;

    /// Namespace this store holds.
    fn namespace(&self) -> &str;

    /// Look up an entry for in-place mutation.
    fn get(&mut self, key: &str) -> Option<&mut CacheEntry>;

    /// Look up an entry without recording an access.
    fn peek(&mut self, key: &str) -> Option<&CacheEntry>;

    /// Insert or replace an entry.
    fn set(&mut self, key: &str, entry: CacheEntry);

    /// Remove an entry. Returns true if one was present.
    fn delete(&mut self, key: &str) -> bool;

    fn has(&mut self, key: &str) -> bool;

    fn keys(&mut self) -> Vec<String>;

    fn size(&mut self) -> usize;

    fn clear(&mut self);

    /// Sweep expired entries. Returns the number removed.
    fn cleanup(&mut self) -> usize {
        0
    }

    /// Flush pending writes to durable storage. Returns the number written.
    fn persist(&mut self) -> usize {
        0
    }

    /// Approximate durable bytes held by this store.
    fn memory_bytes(&self) -> u64 {
        0
    }

    /// Durable tier report, for stores that have one.
    fn hybrid_stats(&self) -> Option<HybridStats> {
        None
    }
}
