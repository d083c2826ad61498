//! Tiercache Test Utilities
//!
//! Shared test infrastructure for the tiercache workspace:
//! - Proptest generators for keys, namespaces, TTLs and JSON values
//! - A harness that builds managers over a shared durable backend, so a
//!   host restart is simulated by building a second manager
//! - Assertions for statistics and durable budgets

use std::sync::{Arc, Once};

pub use tiercache_core::{
    BackendKind, CacheEntry, CacheError, CacheResult, CacheStats, Clock, DurableContainer,
    DurableRecord, HybridSettings, ManagerSettings, ManualClock, Tick,
};
pub use tiercache_storage::{
    CacheManager, CacheOptions, DurableBackend, HybridConfig, HybridStats, InMemoryDurableBackend,
    PersistencePredicate, StoreRegistry,
};

static TRACING: Once = Once::new();

/// Install a test-friendly tracing subscriber once per process.
///
/// Honors `RUST_LOG`; defaults to `warn` so tests stay quiet.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for cache inputs.

    use super::*;
    use proptest::prelude::*;
    use serde_json::Value;

    /// Generate a key, optionally with `:`-separated segments.
    pub fn arb_key() -> impl Strategy<Value = String> {
        prop::collection::vec("[a-zA-Z0-9_]{1,8}", 1..4).prop_map(|parts| parts.join(":"))
    }

    /// Generate a namespace (no `:`).
    pub fn arb_namespace() -> impl Strategy<Value = String> {
        "[a-z]{1,10}"
    }

    /// Generate a TTL; `None` never expires.
    pub fn arb_ttl() -> impl Strategy<Value = Option<Tick>> {
        prop_oneof![Just(None), (1u64..500).prop_map(Some)]
    }

    /// Generate a tick in a realistic range.
    pub fn arb_tick() -> impl Strategy<Value = Tick> {
        0u64..1_000_000
    }

    /// Generate a small JSON document.
    pub fn arb_json_value() -> impl Strategy<Value = Value> {
        let leaf = prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::Bool),
            any::<i64>().prop_map(Value::from),
            "[ -~]{0,24}".prop_map(Value::String),
        ];
        leaf.prop_recursive(3, 24, 4, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
                prop::collection::btree_map("[a-z]{1,6}", inner, 0..4)
                    .prop_map(|m| Value::Object(m.into_iter().collect())),
            ]
        })
    }

    /// Generate backend kind.
    pub fn arb_backend_kind() -> impl Strategy<Value = BackendKind> {
        prop_oneof![Just(BackendKind::Volatile), Just(BackendKind::Hybrid)]
    }
}

// ============================================================================
// FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built fixtures for common scenarios.

    use super::*;

    /// Process-independent state shared across simulated restarts.
    ///
    /// The clock and durable backend live here; every call to
    /// [`Harness::manager`] builds a fresh manager with empty volatile state
    /// over them.
    pub struct Harness {
        pub clock: Arc<ManualClock>,
        pub durable: Arc<InMemoryDurableBackend>,
        pub settings: ManagerSettings,
        configs: Vec<(String, HybridConfig)>,
    }

    impl Harness {
        pub fn new(tick: Tick) -> Self {
            init_tracing();
            Self {
                clock: Arc::new(ManualClock::new(tick)),
                durable: Arc::new(InMemoryDurableBackend::new()),
                settings: ManagerSettings::default(),
                configs: Vec::new(),
            }
        }

        pub fn with_settings(mut self, settings: ManagerSettings) -> Self {
            self.settings = settings;
            self
        }

        /// Apply a hybrid config to a namespace in every manager built.
        pub fn with_namespace_config(mut self, namespace: &str, config: HybridConfig) -> Self {
            self.configs.push((namespace.to_string(), config));
            self
        }

        pub fn manager(&self) -> CacheManager {
            let mut manager = CacheManager::with_backend(
                self.clock.clone(),
                self.durable.clone(),
                self.settings.clone(),
            );
            for (namespace, config) in &self.configs {
                manager.configure_namespace(namespace.clone(), config.clone());
            }
            manager
        }

        /// Drop `previous` and build its replacement, as after a host
        /// process recreation.
        pub fn restart(&self, previous: CacheManager) -> CacheManager {
            drop(previous);
            self.manager()
        }

        pub fn now(&self) -> Tick {
            self.clock.now()
        }

        pub fn advance(&self, ticks: Tick) -> Tick {
            self.clock.advance(ticks)
        }

        pub fn set_tick(&self, tick: Tick) {
            self.clock.set(tick);
        }

        pub fn container(&self, namespace: &str) -> Option<DurableContainer> {
            self.durable.load(namespace).ok().flatten()
        }
    }

    /// Hybrid config that persists every key and syncs every `interval` ticks.
    pub fn persist_all(interval: Tick) -> HybridConfig {
        HybridConfig::new(HybridSettings::new().with_sync_interval(interval))
            .with_predicate(PersistencePredicate::always())
    }

    /// Hybrid config with a durable byte budget.
    pub fn budgeted(interval: Tick, max_durable_bytes: u64) -> HybridConfig {
        HybridConfig::new(
            HybridSettings::new()
                .with_sync_interval(interval)
                .with_max_durable_bytes(max_durable_bytes),
        )
        .with_predicate(PersistencePredicate::always())
    }

    /// Options for a hybrid namespace.
    pub fn hybrid(namespace: &str) -> CacheOptions {
        CacheOptions::in_namespace(namespace).store(BackendKind::Hybrid)
    }

    /// String whose JSON encoding is about `bytes` long.
    pub fn payload_of_size(bytes: usize) -> String {
        "x".repeat(bytes.saturating_sub(2))
    }

    /// Durable record with no hits.
    pub fn record(value: serde_json::Value, cached_at: Tick, ttl: Option<Tick>) -> DurableRecord {
        DurableRecord {
            value,
            cached_at,
            ttl,
            hits: 0,
        }
    }
}

// ============================================================================
// ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertions for cache statistics.

    use super::*;

    /// Assert hit and miss counters.
    #[track_caller]
    pub fn assert_counters(stats: &CacheStats, hits: u64, misses: u64) {
        assert_eq!(
            (stats.hits, stats.misses),
            (hits, misses),
            "unexpected counters: {stats:?}"
        );
    }

    /// Assert the durable tier is within `tolerance` of its budget.
    #[track_caller]
    pub fn assert_within_budget(stats: &HybridStats, tolerance: f64) {
        let limit = stats.max_memory_bytes as f64 * (1.0 + tolerance);
        assert!(
            stats.memory_usage_bytes as f64 <= limit,
            "durable tier over budget: {} > {limit}",
            stats.memory_usage_bytes
        );
        assert!(
            stats.budget_utilization <= 1.0 + tolerance,
            "utilization over budget: {}",
            stats.budget_utilization
        );
    }
}
