//! Approximate durable byte accounting.
//!
//! Sizes are the length of the JSON encoding the durable tier writes. The
//! estimate is built per record so budget eviction can subtract as it goes;
//! it is within a few bytes of the real blob size.

use serde::Serialize;
use tiercache_core::DurableContainer;

/// Size charged for a record whose value cannot be encoded.
pub const FALLBACK_RECORD_BYTES: u64 = 256;

/// `"key":` plus the separating comma.
const RECORD_FRAMING_BYTES: u64 = 4;

/// Estimated bytes one `key → record` pair adds to a container.
pub fn estimate_record_bytes<T: Serialize>(key: &str, record: &T) -> u64 {
    let body = serde_json::to_vec(record)
        .map(|bytes| bytes.len() as u64)
        .unwrap_or(FALLBACK_RECORD_BYTES);
    key.len() as u64 + RECORD_FRAMING_BYTES + body
}

/// Estimated encoded size of a whole container.
pub fn estimate_container_bytes(container: &DurableContainer) -> u64 {
    let header = DurableContainer {
        version: container.version,
        last_sync_tick: container.last_sync_tick,
        byte_estimate: container.byte_estimate,
        data: Default::default(),
    };
    let header_bytes = serde_json::to_vec(&header)
        .map(|bytes| bytes.len() as u64)
        .unwrap_or(FALLBACK_RECORD_BYTES);

    container
        .data
        .iter()
        .map(|(key, record)| estimate_record_bytes(key, record))
        .sum::<u64>()
        + header_bytes
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;
    use tiercache_core::DurableRecord;

    fn record(payload: &str) -> DurableRecord {
        DurableRecord {
            value: json!(payload),
            cached_at: 1000,
            ttl: Some(50),
            hits: 3,
        }
    }

    #[test]
    fn test_empty_container_is_header_only() {
        let container = DurableContainer::new();
        let actual = serde_json::to_vec(&container).unwrap().len() as u64;
        assert_eq!(estimate_container_bytes(&container), actual);
    }

    #[test]
    fn test_estimate_tracks_real_encoding() {
        let mut container = DurableContainer::new();
        for i in 0..20 {
            container
                .data
                .insert(format!("ns:path:{i}"), record(&"x".repeat(200)));
        }
        let estimate = estimate_container_bytes(&container) as f64;
        let actual = serde_json::to_vec(&container).unwrap().len() as f64;
        assert!((estimate - actual).abs() / actual < 0.1, "{estimate} vs {actual}");
    }

    #[test]
    fn test_unencodable_value_uses_fallback() {
        // serde_json refuses maps with non-string keys.
        let mut bad: HashMap<(u8, u8), u8> = HashMap::new();
        bad.insert((1, 2), 3);
        assert_eq!(
            estimate_record_bytes("k", &bad),
            1 + RECORD_FRAMING_BYTES + FALLBACK_RECORD_BYTES
        );
    }
}
