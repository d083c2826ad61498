//! Cache entry and durable record types.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::clock::Tick;

/// Current layout version of [`DurableContainer`].
///
/// Containers carrying any other version are discarded on rehydration.
pub const DURABLE_FORMAT_VERSION: u32 = 1;

/// A cached value plus its bookkeeping.
///
/// Entries are owned by the store that holds them. Values are kept as JSON
/// so a single store can hold values of any caller type and the durable
/// tier can write them out unchanged.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub value: Value,
    /// Tick at which the value was stored.
    pub cached_at: Tick,
    /// Tick of the most recent read or write.
    pub last_accessed: Tick,
    /// Time-to-live in ticks. `None` never expires.
    pub ttl: Option<Tick>,
    pub hits: u64,
    /// Set while a persistence-eligible entry has unflushed mutations.
    pub dirty: bool,
}

impl CacheEntry {
    /// Create a fresh entry stored at `now`.
    pub fn new(value: Value, now: Tick, ttl: Option<Tick>) -> Self {
        Self {
            value,
            cached_at: now,
            last_accessed: now,
            ttl,
            hits: 0,
            dirty: true,
        }
    }

    /// Whether the entry has outlived its ttl at `now`.
    ///
    /// Expiry is strict: an entry with `ttl = 10` cached at tick 1000 is
    /// still fresh at 1010 and expired at 1011.
    pub fn is_expired(&self, now: Tick) -> bool {
        is_expired(self.cached_at, self.ttl, now)
    }

    /// Record a read at `now`.
    pub fn touch(&mut self, now: Tick) {
        self.last_accessed = now;
        self.hits = self.hits.saturating_add(1);
    }

    /// Durable projection of this entry.
    pub fn to_record(&self) -> DurableRecord {
        DurableRecord {
            value: self.value.clone(),
            cached_at: self.cached_at,
            ttl: self.ttl,
            hits: self.hits,
        }
    }

    /// Rebuild a volatile entry from a durable record.
    pub fn from_record(record: DurableRecord, now: Tick) -> Self {
        Self {
            value: record.value,
            cached_at: record.cached_at,
            last_accessed: now,
            ttl: record.ttl,
            hits: record.hits,
            dirty: false,
        }
    }
}

/// Shared expiry rule for entries and durable records.
pub fn is_expired(cached_at: Tick, ttl: Option<Tick>, now: Tick) -> bool {
    match ttl {
        Some(ttl) => now.saturating_sub(cached_at) > ttl,
        None => false,
    }
}

/// Serialized subset of a [`CacheEntry`].
///
/// `last_accessed` and `dirty` are volatile-only and never written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DurableRecord {
    pub value: Value,
    pub cached_at: Tick,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl: Option<Tick>,
    pub hits: u64,
}

impl DurableRecord {
    pub fn is_expired(&self, now: Tick) -> bool {
        is_expired(self.cached_at, self.ttl, now)
    }
}

/// Per-namespace durable blob. Survives process destruction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DurableContainer {
    pub version: u32,
    pub last_sync_tick: Tick,
    /// Approximate serialized size of the whole container.
    pub byte_estimate: u64,
    pub data: BTreeMap<String, DurableRecord>,
}

impl Default for DurableContainer {
    fn default() -> Self {
        Self {
            version: DURABLE_FORMAT_VERSION,
            last_sync_tick: 0,
            byte_estimate: 0,
            data: BTreeMap::new(),
        }
    }
}

impl DurableContainer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether this container was written with the current layout.
    pub fn is_current_version(&self) -> bool {
        self.version == DURABLE_FORMAT_VERSION
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
