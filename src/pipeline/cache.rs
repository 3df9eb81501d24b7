/**
 * CacheLayer (§4.9, §3 CacheEntry)
 *
 * DESIGN DECISION: A bounded LRU keyed by `sha256(profile || kind || normalized_text)`
 * behind its own `Mutex`, independent of the engine-scoped lock (§5: "CacheLayer uses
 * its own internal mutex")
 * WHY: The cache must stay available even while the adaptive engine's lock is held
 * across a (non-cache) stage; giving it an independent lock keeps the hot cache path
 * (the common case) from contending with pattern/behavior mutation
 *
 * PATTERN: grounded on `aetherlight-core::matching`'s hashed lookup idiom, adapted
 * to carry a TTL and FIFO/LRU eviction instead of a static index
 */

use crate::types::Verdict;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

struct CacheEntry {
    normalized_text: String,
    verdict: Verdict,
    inserted_at: Instant,
    ttl: Duration,
}

impl CacheEntry {
    fn is_expired(&self) -> bool {
        self.inserted_at.elapsed() > self.ttl
    }
}

/// Normalize whitespace and trim trailing whitespace only; case is preserved since a
/// subset of regex rules are case-sensitive (§4.9).
fn normalize(text: &str) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed.trim_end().to_string()
}

fn cache_key(profile: &str, kind: &str, normalized_text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(profile.as_bytes());
    hasher.update(b"\0");
    hasher.update(kind.as_bytes());
    hasher.update(b"\0");
    hasher.update(normalized_text.as_bytes());
    hex::encode(hasher.finalize())
}

struct Inner {
    entries: HashMap<String, CacheEntry>,
    order: Vec<String>,
    max_size: usize,
}

pub struct CacheLayer {
    inner: Mutex<Inner>,
    default_ttl: Duration,
}

impl CacheLayer {
    pub fn new(max_size: usize, default_ttl: Duration) -> Self {
        Self {
            inner: Mutex::new(Inner {
                entries: HashMap::new(),
                order: Vec::new(),
                max_size,
            }),
            default_ttl,
        }
    }

    /// Look up a cached verdict for `(profile, kind, text)`. Expired entries are
    /// treated as a miss and evicted lazily on lookup.
    pub fn get(&self, profile: &str, kind: &str, text: &str) -> Option<Verdict> {
        let normalized = normalize(text);
        let key = cache_key(profile, kind, &normalized);
        let mut inner = self.inner.lock().expect("cache lock poisoned");

        let hit = match inner.entries.get(&key) {
            Some(entry) if entry.is_expired() => None,
            // §4.9 collision handling: compare the stored normalized text too.
            Some(entry) if entry.normalized_text == normalized => Some(entry.verdict.clone()),
            _ => None,
        };

        if hit.is_none() {
            inner.entries.remove(&key);
            inner.order.retain(|k| k != &key);
        } else {
            Self::touch_order(&mut inner.order, &key);
        }

        hit
    }

    /// Insert (or refresh) a verdict with the default TTL.
    pub fn insert(&self, profile: &str, kind: &str, text: &str, verdict: Verdict) {
        self.insert_with_ttl(profile, kind, text, verdict, self.default_ttl);
    }

    pub fn insert_with_ttl(&self, profile: &str, kind: &str, text: &str, verdict: Verdict, ttl: Duration) {
        let normalized = normalize(text);
        let key = cache_key(profile, kind, &normalized);
        let mut inner = self.inner.lock().expect("cache lock poisoned");

        if !inner.entries.contains_key(&key) && inner.entries.len() >= inner.max_size {
            if let Some(oldest) = inner.order.first().cloned() {
                inner.entries.remove(&oldest);
                inner.order.remove(0);
            }
        }

        inner.entries.insert(
            key.clone(),
            CacheEntry {
                normalized_text: normalized,
                verdict,
                inserted_at: Instant::now(),
                ttl,
            },
        );
        Self::touch_order(&mut inner.order, &key);
    }

    fn touch_order(order: &mut Vec<String>, key: &str) {
        order.retain(|k| k != key);
        order.push(key.to_string());
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("cache lock poisoned").entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Method;

    #[test]
    fn miss_then_hit_round_trips() {
        let cache = CacheLayer::new(10, Duration::from_secs(60));
        assert!(cache.get("standard", "prompt", "hello").is_none());
        cache.insert("standard", "prompt", "hello", Verdict::secure(Method::Regex));
        assert!(cache.get("standard", "prompt", "hello").is_some());
    }

    #[test]
    fn whitespace_is_normalized_but_case_preserved() {
        let cache = CacheLayer::new(10, Duration::from_secs(60));
        cache.insert("standard", "prompt", "Hello   World  ", Verdict::secure(Method::Regex));
        assert!(cache.get("standard", "prompt", "Hello World").is_some());
        assert!(cache.get("standard", "prompt", "hello world").is_none());
    }

    #[test]
    fn expired_entries_are_treated_as_misses() {
        let cache = CacheLayer::new(10, Duration::from_millis(5));
        cache.insert("standard", "prompt", "hello", Verdict::secure(Method::Regex));
        std::thread::sleep(Duration::from_millis(20));
        assert!(cache.get("standard", "prompt", "hello").is_none());
    }

    #[test]
    fn lru_eviction_respects_max_size() {
        let cache = CacheLayer::new(2, Duration::from_secs(60));
        cache.insert("standard", "prompt", "one", Verdict::secure(Method::Regex));
        cache.insert("standard", "prompt", "two", Verdict::secure(Method::Regex));
        cache.insert("standard", "prompt", "three", Verdict::secure(Method::Regex));
        assert_eq!(cache.len(), 2);
        assert!(cache.get("standard", "prompt", "one").is_none());
        assert!(cache.get("standard", "prompt", "three").is_some());
    }
}
