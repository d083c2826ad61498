//! Configuration types
//!
//! Settings are plain serde structs with defaults suitable for a small
//! host. [`ManagerSettings::from_env`] overlays environment variables on
//! top of those defaults.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::clock::Tick;
use crate::error::ConfigError;
use crate::BackendKind;

/// Default ticks between durable flushes.
pub const DEFAULT_SYNC_INTERVAL: Tick = 10;
/// Default durable byte budget per hybrid namespace.
pub const DEFAULT_MAX_DURABLE_BYTES: u64 = 100 * 1024;
/// Default number of sync intervals between budget checks.
pub const DEFAULT_BUDGET_CHECK_MULTIPLIER: u64 = 10;
/// Namespace used when a caller does not name one.
pub const DEFAULT_NAMESPACE: &str = "default";

/// Tuning for one hybrid namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HybridSettings {
    /// Minimum ticks between two durable flushes.
    pub sync_interval: Tick,
    /// Byte budget of the namespace's durable container.
    pub max_durable_bytes: u64,
    /// Budget enforcement runs every `budget_check_multiplier * sync_interval` ticks.
    pub budget_check_multiplier: u64,
}

impl Default for HybridSettings {
    fn default() -> Self {
        Self {
            sync_interval: DEFAULT_SYNC_INTERVAL,
            max_durable_bytes: DEFAULT_MAX_DURABLE_BYTES,
            budget_check_multiplier: DEFAULT_BUDGET_CHECK_MULTIPLIER,
        }
    }
}

impl HybridSettings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the sync interval.
    pub fn with_sync_interval(mut self, ticks: Tick) -> Self {
        self.sync_interval = ticks;
        self
    }

    /// Set the durable byte budget.
    pub fn with_max_durable_bytes(mut self, bytes: u64) -> Self {
        self.max_durable_bytes = bytes;
        self
    }

    /// Set the budget check cadence.
    pub fn with_budget_check_multiplier(mut self, multiplier: u64) -> Self {
        self.budget_check_multiplier = multiplier;
        self
    }

    /// Ticks between two budget checks.
    pub fn budget_check_interval(&self) -> Tick {
        self.sync_interval.saturating_mul(self.budget_check_multiplier)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        require_positive("sync_interval", self.sync_interval)?;
        require_positive("max_durable_bytes", self.max_durable_bytes)?;
        require_positive("budget_check_multiplier", self.budget_check_multiplier)?;
        Ok(())
    }
}

fn require_positive(field: &str, value: u64) -> Result<(), ConfigError> {
    if value == 0 {
        return Err(ConfigError::InvalidValue {
            field: field.to_string(),
            value: value.to_string(),
            reason: "must be greater than zero".to_string(),
        });
    }
    Ok(())
}

/// Manager-wide settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagerSettings {
    /// Namespace used by `CacheOptions::default()`.
    pub default_namespace: String,
    /// Backend used when options do not name one.
    pub default_store: BackendKind,
    /// Hybrid settings for namespaces without an override.
    pub hybrid: HybridSettings,
    /// Per-namespace hybrid overrides.
    pub namespaces: BTreeMap<String, HybridSettings>,
}

impl Default for ManagerSettings {
    fn default() -> Self {
        Self {
            default_namespace: DEFAULT_NAMESPACE.to_string(),
            default_store: BackendKind::Volatile,
            hybrid: HybridSettings::default(),
            namespaces: BTreeMap::new(),
        }
    }
}

impl ManagerSettings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create settings from environment variables.
    ///
    /// Environment variables:
    /// - `TIERCACHE_DEFAULT_NAMESPACE`: namespace for unnamed calls (default: "default")
    /// - `TIERCACHE_DEFAULT_STORE`: "volatile" or "hybrid" (default: volatile)
    /// - `TIERCACHE_SYNC_INTERVAL`: ticks between durable flushes (default: 10)
    /// - `TIERCACHE_MAX_DURABLE_BYTES`: durable budget per namespace (default: 102400)
    /// - `TIERCACHE_BUDGET_CHECK_MULTIPLIER`: sync intervals per budget check (default: 10)
    ///
    /// Unparseable values fall back to the default.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an explicit variable source.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = HybridSettings::default();

        let default_namespace = lookup("TIERCACHE_DEFAULT_NAMESPACE")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_NAMESPACE.to_string());

        let default_store = lookup("TIERCACHE_DEFAULT_STORE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(BackendKind::Volatile);

        let sync_interval = lookup("TIERCACHE_SYNC_INTERVAL")
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(defaults.sync_interval);

        let max_durable_bytes = lookup("TIERCACHE_MAX_DURABLE_BYTES")
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(defaults.max_durable_bytes);

        let budget_check_multiplier = lookup("TIERCACHE_BUDGET_CHECK_MULTIPLIER")
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(defaults.budget_check_multiplier);

        Self {
            default_namespace,
            default_store,
            hybrid: HybridSettings {
                sync_interval,
                max_durable_bytes,
                budget_check_multiplier,
            },
            namespaces: BTreeMap::new(),
        }
    }

    /// Set the default backend.
    pub fn with_default_store(mut self, kind: BackendKind) -> Self {
        self.default_store = kind;
        self
    }

    /// Set the hybrid settings used when no override exists.
    pub fn with_hybrid(mut self, settings: HybridSettings) -> Self {
        self.hybrid = settings;
        self
    }

    /// Override hybrid settings for one namespace.
    pub fn with_namespace(
        mut self,
        namespace: impl Into<String>,
        settings: HybridSettings,
    ) -> Self {
        self.namespaces.insert(namespace.into(), settings);
        self
    }

    /// Hybrid settings in effect for `namespace`.
    pub fn hybrid_for(&self, namespace: &str) -> HybridSettings {
        self.namespaces
            .get(namespace)
            .copied()
            .unwrap_or(self.hybrid)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_namespace.is_empty() {
            return Err(ConfigError::MissingRequired {
                field: "default_namespace".to_string(),
            });
        }
        self.hybrid.validate()?;
        for settings in self.namespaces.values() {
            settings.validate()?;
        }
        Ok(())
    }
}
