//! Tiercache Coherence - Layered Statistics and Unified Invalidation
//!
//! Independently created cache managers are registered under a layer tag.
//! The coherence manager reads their statistics into one report and fans
//! invalidations out to all of them, either directly or from host events.

pub mod cache;
pub mod event;
pub mod layer;
pub mod manager;
pub mod scope;

pub use cache::{CacheSnapshot, CoherentCache};
pub use event::{entity_pattern_rule, CacheEvent, EventSource, InvalidationRule, QueuedEvents};
pub use layer::CacheLayer;
pub use manager::{CoherenceManager, CoherenceStats, GlobalStats, LayerStats, RegisteredCache};
pub use scope::InvalidationScope;
