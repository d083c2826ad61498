//! Host events and the rules that turn them into invalidations.
//!
//! The core has no idea what an entity id means to a host. Rules are the
//! seam: each maps an event to zero or more scopes.
//!
//! ```text
//! EventSource ──poll──▶ CacheEvent ──rules──▶ InvalidationScope ──▶ caches
//! ```

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::scope::InvalidationScope;

/// A host-level notification about a tracked entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CacheEvent {
    /// The host lost visibility into the entity.
    EntityLost { entity_id: String },
    /// The entity no longer exists.
    EntityDestroyed { entity_id: String },
}

impl CacheEvent {
    pub fn lost(entity_id: impl Into<String>) -> Self {
        Self::EntityLost {
            entity_id: entity_id.into(),
        }
    }

    pub fn destroyed(entity_id: impl Into<String>) -> Self {
        Self::EntityDestroyed {
            entity_id: entity_id.into(),
        }
    }

    pub fn entity_id(&self) -> &str {
        match self {
            Self::EntityLost { entity_id } | Self::EntityDestroyed { entity_id } => entity_id,
        }
    }
}

/// Something that accumulates host events between steps.
pub trait EventSource {
    /// Take every pending event, oldest first.
    fn drain(&mut self) -> Vec<CacheEvent>;
}

/// FIFO event source for hosts that push events as they observe them.
#[derive(Debug, Default)]
pub struct QueuedEvents {
    queue: VecDeque<CacheEvent>,
}

impl QueuedEvents {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: CacheEvent) {
        self.queue.push_back(event);
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

impl EventSource for QueuedEvents {
    fn drain(&mut self) -> Vec<CacheEvent> {
        self.queue.drain(..).collect()
    }
}

type RuleFn = dyn Fn(&CacheEvent) -> Vec<InvalidationScope> + Send + Sync;

/// Maps an event to the scopes it invalidates.
#[derive(Clone)]
pub struct InvalidationRule {
    inner: Arc<RuleFn>,
}

impl InvalidationRule {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&CacheEvent) -> Vec<InvalidationScope> + Send + Sync + 'static,
    {
        Self { inner: Arc::new(f) }
    }

    pub fn apply(&self, event: &CacheEvent) -> Vec<InvalidationScope> {
        (self.inner)(event)
    }
}

impl fmt::Debug for InvalidationRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InvalidationRule").finish_non_exhaustive()
    }
}

/// Rule invalidating, in `namespace`, every key that names the entity as
/// one of its `:`-separated segments.
pub fn entity_pattern_rule(namespace: impl Into<String>) -> InvalidationRule {
    let namespace = namespace.into();
    InvalidationRule::new(move |event| {
        let segment = regex::escape(event.entity_id());
        match Regex::new(&format!("(^|:){segment}(:|$)")) {
            Ok(pattern) => vec![InvalidationScope::Pattern {
                pattern,
                namespace: namespace.clone(),
            }],
            Err(_) => Vec::new(),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queue_drains_in_order() {
        let mut events = QueuedEvents::new();
        events.push(CacheEvent::lost("a"));
        events.push(CacheEvent::destroyed("b"));
        assert_eq!(events.len(), 2);

        let drained = events.drain();
        assert_eq!(drained.iter().map(CacheEvent::entity_id).collect::<Vec<_>>(), vec!["a", "b"]);
        assert!(events.is_empty());
    }

    #[test]
    fn test_event_wire_format() {
        let json = serde_json::to_value(CacheEvent::destroyed("creep-7")).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"type": "entity_destroyed", "entity_id": "creep-7"})
        );
    }

    #[test]
    fn test_entity_pattern_rule_matches_segments() {
        let rule = entity_pattern_rule("combat");
        let scopes = rule.apply(&CacheEvent::lost("5bc.1"));
        assert_eq!(scopes.len(), 1);
        let InvalidationScope::Pattern { pattern, namespace } = &scopes[0] else {
            panic!("expected pattern scope");
        };
        assert_eq!(namespace, "combat");
        assert!(pattern.is_match("target:5bc.1"));
        assert!(pattern.is_match("5bc.1:threat"));
        // Dot is escaped, and partial segments do not match.
        assert!(!pattern.is_match("target:5bcx1"));
        assert!(!pattern.is_match("target:5bc.10"));
    }
}
