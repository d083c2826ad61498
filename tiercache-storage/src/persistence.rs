//! Persistence predicates.
//!
//! A predicate decides, per `(key, entry)`, whether an entry written to a
//! hybrid namespace is worth a slot in the durable tier. The core has no
//! opinion on key naming; [`KeyFamilyPredicate`] is a pattern table callers
//! configure with their own conventions.

use std::fmt;
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use tiercache_core::{strip_namespace, CacheEntry, CacheError, CacheResult};

type PredicateFn = dyn Fn(&str, &CacheEntry) -> bool + Send + Sync;

/// Decides whether an entry is written back to the durable tier.
///
/// The key passed in is the full stored key (`namespace:key`).
#[derive(Clone)]
pub struct PersistencePredicate {
    inner: Arc<PredicateFn>,
}

impl PersistencePredicate {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&str, &CacheEntry) -> bool + Send + Sync + 'static,
    {
        Self { inner: Arc::new(f) }
    }

    /// Persist every entry.
    pub fn always() -> Self {
        Self::new(|_, _| true)
    }

    /// Persist nothing. The namespace then never allocates a container.
    pub fn never() -> Self {
        Self::new(|_, _| false)
    }

    /// Persist keys matched by a key-family table.
    pub fn key_families(families: KeyFamilyPredicate) -> Self {
        Self::new(move |key, _| families.matches(key))
    }

    /// Example classification: path results, room scans, role and target
    /// assignments persist; everything else does not.
    pub fn example_key_families() -> Self {
        Self::key_families(EXAMPLE_KEY_FAMILIES.clone())
    }

    pub fn matches(&self, key: &str, entry: &CacheEntry) -> bool {
        (self.inner)(key, entry)
    }
}

impl Default for PersistencePredicate {
    fn default() -> Self {
        Self::example_key_families()
    }
}

impl fmt::Debug for PersistencePredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PersistencePredicate").finish_non_exhaustive()
    }
}

static EXAMPLE_KEY_FAMILIES: Lazy<KeyFamilyPredicate> = Lazy::new(|| KeyFamilyPredicate {
    patterns: ["path", "scan", "role", "target"]
        .iter()
        .filter_map(|family| Regex::new(&format!(r"(^|:){family}(:|$)")).ok())
        .collect(),
});

/// Pattern table matched against the namespace-stripped key.
///
/// A key is persisted when any pattern matches the part of the key after
/// the first `:`.
#[derive(Debug, Clone, Default)]
pub struct KeyFamilyPredicate {
    patterns: Vec<Regex>,
}

impl KeyFamilyPredicate {
    /// Compile a table from pattern strings.
    pub fn new<I, S>(patterns: I) -> CacheResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = patterns
            .into_iter()
            .map(|p| {
                Regex::new(p.as_ref()).map_err(|e| CacheError::InvalidPattern {
                    pattern: p.as_ref().to_string(),
                    reason: e.to_string(),
                })
            })
            .collect::<CacheResult<Vec<_>>>()?;
        Ok(Self { patterns })
    }

    pub fn from_regexes(patterns: Vec<Regex>) -> Self {
        Self { patterns }
    }

    /// Test a full stored key.
    pub fn matches(&self, full_key: &str) -> bool {
        let key = strip_namespace(full_key);
        self.patterns.iter().any(|p| p.is_match(key))
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entry() -> CacheEntry {
        CacheEntry::new(json!(null), 0, None)
    }

    #[test]
    fn test_always_and_never() {
        assert!(PersistencePredicate::always().matches("ns:a", &entry()));
        assert!(!PersistencePredicate::never().matches("ns:a", &entry()));
    }

    #[test]
    fn test_example_families() {
        let predicate = PersistencePredicate::example_key_families();
        assert!(predicate.matches("pf:path:W1N1:W2N2", &entry()));
        assert!(predicate.matches("rooms:scan:W5N5", &entry()));
        assert!(predicate.matches("creeps:role:harvester", &entry()));
        assert!(predicate.matches("combat:target", &entry()));
        assert!(!predicate.matches("misc:pathological", &entry()));
        assert!(!predicate.matches("misc:energy", &entry()));
    }

    #[test]
    fn test_family_ignores_namespace_part() {
        let families = KeyFamilyPredicate::new(["^role:"]).unwrap();
        assert!(families.matches("anything:role:x"));
        assert!(!families.matches("role:x"));
    }

    #[test]
    fn test_invalid_pattern_is_reported() {
        let err = KeyFamilyPredicate::new(["(unclosed"]).unwrap_err();
        assert!(matches!(err, CacheError::InvalidPattern { .. }));
    }

    #[test]
    fn test_predicate_can_inspect_entry() {
        let predicate = PersistencePredicate::new(|_, entry| entry.ttl.is_none());
        assert!(predicate.matches("ns:a", &entry()));
        assert!(!predicate.matches("ns:a", &CacheEntry::new(json!(1), 0, Some(5))));
    }
}
