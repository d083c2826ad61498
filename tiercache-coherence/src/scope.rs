//! Invalidation scopes.

use regex::Regex;
use tiercache_core::{CacheError, CacheResult};

/// What an invalidation removes, applied to every registered cache.
#[derive(Debug, Clone)]
pub enum InvalidationScope {
    /// One key in one namespace.
    Key { key: String, namespace: String },
    /// Keys in a namespace whose namespace-stripped form matches.
    Pattern { pattern: Regex, namespace: String },
    /// Every key in a namespace.
    Namespace(String),
    /// Everything.
    All,
}

impl InvalidationScope {
    pub fn key(namespace: impl Into<String>, key: impl Into<String>) -> Self {
        Self::Key {
            key: key.into(),
            namespace: namespace.into(),
        }
    }

    /// Compile `pattern` into a pattern scope.
    pub fn pattern(namespace: impl Into<String>, pattern: &str) -> CacheResult<Self> {
        let regex = Regex::new(pattern).map_err(|e| CacheError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self::Pattern {
            pattern: regex,
            namespace: namespace.into(),
        })
    }

    pub fn namespace(namespace: impl Into<String>) -> Self {
        Self::Namespace(namespace.into())
    }

    pub fn all() -> Self {
        Self::All
    }

    /// Namespace the scope is confined to, `None` for [`All`](Self::All).
    pub fn target_namespace(&self) -> Option<&str> {
        match self {
            Self::Key { namespace, .. }
            | Self::Pattern { namespace, .. }
            | Self::Namespace(namespace) => Some(namespace),
            Self::All => None,
        }
    }
}
