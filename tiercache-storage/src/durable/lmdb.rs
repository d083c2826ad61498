//! LMDB-backed durable tier.
//!
//! Uses the heed crate to keep one JSON-encoded container per namespace in
//! a single unnamed database, keyed by namespace.
//!
//! # Transactions
//!
//! - Read transactions for `load` and `namespaces`
//! - Write transactions for `save` and `remove`, committed before returning

use std::path::Path;

use heed::types::{Bytes, Str};
use heed::{Database, Env, EnvOpenOptions};
use tiercache_core::{DurableContainer, DurableError};

use super::{decode_container, encode_container, DurableBackend};

fn txn_error(e: heed::Error) -> DurableError {
    DurableError::Transaction {
        reason: e.to_string(),
    }
}

/// Durable backend stored in an LMDB environment.
///
/// # Example
///
/// ```ignore
/// use tiercache_storage::durable::LmdbDurableBackend;
///
/// let backend = Arc::new(LmdbDurableBackend::open("/var/lib/host/cache", 16)?);
/// let registry = StoreRegistry::new(clock, backend, ManagerSettings::default());
/// ```
pub struct LmdbDurableBackend {
    env: Env,
    db: Database<Str, Bytes>,
}

impl LmdbDurableBackend {
    /// Open or create an environment at `path`.
    ///
    /// # Arguments
    ///
    /// * `path` - Directory where LMDB files will be stored
    /// * `max_size_mb` - Maximum size of the environment in megabytes
    pub fn open<P: AsRef<Path>>(path: P, max_size_mb: usize) -> Result<Self, DurableError> {
        std::fs::create_dir_all(&path)?;

        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(max_size_mb * 1024 * 1024)
                .max_dbs(1)
                .open(path.as_ref())
        }
        .map_err(|e| DurableError::EnvOpen {
            reason: e.to_string(),
        })?;

        let mut wtxn = env.write_txn().map_err(txn_error)?;
        let db: Database<Str, Bytes> = env
            .create_database(&mut wtxn, None)
            .map_err(|e| DurableError::EnvOpen {
                reason: e.to_string(),
            })?;
        wtxn.commit().map_err(txn_error)?;

        Ok(Self { env, db })
    }
}

impl DurableBackend for LmdbDurableBackend {
    fn load(&self, namespace: &str) -> Result<Option<DurableContainer>, DurableError> {
        let rtxn = self.env.read_txn().map_err(txn_error)?;
        match self.db.get(&rtxn, namespace).map_err(txn_error)? {
            Some(bytes) => decode_container(namespace, bytes).map(Some),
            None => Ok(None),
        }
    }

    fn save(&self, namespace: &str, container: &DurableContainer) -> Result<(), DurableError> {
        let bytes = encode_container(namespace, container)?;

        let mut wtxn = self.env.write_txn().map_err(txn_error)?;
        self.db
            .put(&mut wtxn, namespace, bytes.as_slice())
            .map_err(txn_error)?;
        wtxn.commit().map_err(txn_error)
    }

    fn remove(&self, namespace: &str) -> Result<bool, DurableError> {
        let mut wtxn = self.env.write_txn().map_err(txn_error)?;
        let deleted = self.db.delete(&mut wtxn, namespace).map_err(txn_error)?;
        wtxn.commit().map_err(txn_error)?;
        Ok(deleted)
    }

    fn namespaces(&self) -> Result<Vec<String>, DurableError> {
        let rtxn = self.env.read_txn().map_err(txn_error)?;
        let mut names = Vec::new();
        for result in self.db.iter(&rtxn).map_err(txn_error)? {
            let (name, _) = result.map_err(txn_error)?;
            names.push(name.to_string());
        }
        Ok(names)
    }
}
