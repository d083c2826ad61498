//! Durable tier backends.
//!
//! A durable backend holds one [`DurableContainer`] blob per namespace and
//! outlives the process that wrote it. The hybrid store owns every
//! mutation of a namespace's container; backends only load and store whole
//! blobs.
//!
//! Two implementations are provided:
//!
//! - [`InMemoryDurableBackend`] keeps encoded blobs in a shared map. A
//!   restart is simulated by dropping every manager and store while keeping
//!   the `Arc` to the backend.
//! - [`LmdbDurableBackend`] writes blobs to an LMDB environment on disk.

pub mod lmdb;

pub use lmdb::LmdbDurableBackend;

use std::collections::BTreeMap;
use std::sync::RwLock;

use tiercache_core::{DurableContainer, DurableError};

/// Storage for per-namespace durable containers.
pub trait DurableBackend: Send + Sync {
    /// Load the container for a namespace, if one was ever stored.
    fn load(&self, namespace: &str) -> Result<Option<DurableContainer>, DurableError>;

    /// Replace the container for a namespace.
    fn save(&self, namespace: &str, container: &DurableContainer) -> Result<(), DurableError>;

    /// Drop the container for a namespace. Returns true if one existed.
    fn remove(&self, namespace: &str) -> Result<bool, DurableError>;

    /// Namespaces that currently have a container.
    fn namespaces(&self) -> Result<Vec<String>, DurableError>;
}

pub(crate) fn encode_container(
    namespace: &str,
    container: &DurableContainer,
) -> Result<Vec<u8>, DurableError> {
    serde_json::to_vec(container).map_err(|e| DurableError::Encode {
        namespace: namespace.to_string(),
        reason: e.to_string(),
    })
}

pub(crate) fn decode_container(
    namespace: &str,
    bytes: &[u8],
) -> Result<DurableContainer, DurableError> {
    serde_json::from_slice(bytes).map_err(|e| DurableError::Decode {
        namespace: namespace.to_string(),
        reason: e.to_string(),
    })
}

/// Durable backend holding encoded blobs in memory.
///
/// Blobs are stored encoded, exactly as a host blob store would hold them,
/// so every save/load goes through the same serialization as the disk
/// backend.
#[derive(Debug, Default)]
pub struct InMemoryDurableBackend {
    blobs: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl InMemoryDurableBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw encoded blob for a namespace.
    pub fn raw(&self, namespace: &str) -> Option<Vec<u8>> {
        self.blobs
            .read()
            .ok()
            .and_then(|blobs| blobs.get(namespace).cloned())
    }

    /// Store a raw blob, bypassing encoding. Used to plant corrupt or
    /// foreign data.
    pub fn put_raw(&self, namespace: &str, bytes: Vec<u8>) {
        if let Ok(mut blobs) = self.blobs.write() {
            blobs.insert(namespace.to_string(), bytes);
        }
    }

    /// Total encoded bytes across all namespaces.
    pub fn total_bytes(&self) -> usize {
        self.blobs
            .read()
            .map(|blobs| blobs.values().map(Vec::len).sum())
            .unwrap_or(0)
    }
}

fn poisoned() -> DurableError {
    DurableError::Transaction {
        reason: "durable map lock poisoned".to_string(),
    }
}

impl DurableBackend for InMemoryDurableBackend {
    fn load(&self, namespace: &str) -> Result<Option<DurableContainer>, DurableError> {
        let blobs = self.blobs.read().map_err(|_| poisoned())?;
        match blobs.get(namespace) {
            Some(bytes) => decode_container(namespace, bytes).map(Some),
            None => Ok(None),
        }
    }

    fn save(&self, namespace: &str, container: &DurableContainer) -> Result<(), DurableError> {
        let bytes = encode_container(namespace, container)?;
        let mut blobs = self.blobs.write().map_err(|_| poisoned())?;
        blobs.insert(namespace.to_string(), bytes);
        Ok(())
    }

    fn remove(&self, namespace: &str) -> Result<bool, DurableError> {
        let mut blobs = self.blobs.write().map_err(|_| poisoned())?;
        Ok(blobs.remove(namespace).is_some())
    }

    fn namespaces(&self) -> Result<Vec<String>, DurableError> {
        let blobs = self.blobs.read().map_err(|_| poisoned())?;
        Ok(blobs.keys().cloned().collect())
    }
}
