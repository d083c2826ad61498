//! Tiercache Storage - Store Contract, Hybrid Store and Cache Manager
//!
//! Defines the synchronous store abstraction, the volatile and hybrid
//! stores behind it, the durable backends the hybrid store writes to, and
//! the manager façade that routes namespaced reads and writes.

pub mod durable;
pub mod hybrid;
pub mod manager;
pub mod persistence;
pub mod registry;
pub mod size;
pub mod store;
pub mod volatile;

pub use durable::{DurableBackend, InMemoryDurableBackend, LmdbDurableBackend};
pub use hybrid::{HybridConfig, HybridStats, HybridStore};
pub use manager::{CacheManager, CacheOptions, SharedCacheManager};
pub use persistence::{KeyFamilyPredicate, PersistencePredicate};
pub use registry::StoreRegistry;
pub use size::{estimate_container_bytes, estimate_record_bytes, FALLBACK_RECORD_BYTES};
pub use store::Store;
pub use volatile::VolatileStore;
