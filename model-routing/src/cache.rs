//! Routing decision cache
//!
//! Bounded map from request fingerprint to [`RoutingDecision`]. Entries expire
//! after a fixed TTL; when full, the least recently used entry is evicted on
//! insert. The cache is never invalidated by reliability changes, so a hit may
//! name a backend that has since been disabled.

use crate::config::CacheSettings;
use crate::context::TaskContext;
use crate::decision::RoutingDecision;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::debug;

/// Fingerprint of a `select` request.
///
/// Every input that can change the decision is hashed: the prompt, the
/// canonical context JSON, the free preference and the cost ceiling.
pub fn cache_key(
    prompt: &str,
    context: Option<&TaskContext>,
    prefer_free: bool,
    max_cost: Option<f64>,
) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(prompt.as_bytes());
    hasher.update(&[0]);
    match context {
        Some(ctx) => hasher.update(ctx.canonical_json().as_bytes()),
        None => hasher.update(b"null"),
    };
    hasher.update(&[0, u8::from(prefer_free), 0]);
    match max_cost {
        Some(cost) => hasher.update(&cost.to_bits().to_le_bytes()),
        None => hasher.update(b"unbounded"),
    };
    hasher.finalize().to_hex().to_string()
}

#[derive(Debug, Clone)]
struct CacheEntry {
    decision: RoutingDecision,
    created_at: Instant,
    last_used: u64,
}

/// Counters exposed through engine stats.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    pub entries: usize,
    pub capacity: usize,
    pub ttl_secs: u64,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

#[derive(Debug, Clone)]
pub struct DecisionCache {
    entries: HashMap<String, CacheEntry>,
    ttl: Duration,
    capacity: usize,
    tick: u64,
    hits: u64,
    misses: u64,
    evictions: u64,
}

impl Default for DecisionCache {
    fn default() -> Self {
        Self::from_settings(&CacheSettings::default())
    }
}

impl DecisionCache {
    /// A capacity of zero disables caching.
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        Self {
            entries: HashMap::new(),
            ttl,
            capacity,
            tick: 0,
            hits: 0,
            misses: 0,
            evictions: 0,
        }
    }

    pub fn from_settings(settings: &CacheSettings) -> Self {
        Self::new(Duration::from_secs(settings.ttl_secs), settings.max_entries)
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&mut self, key: &str) -> Option<RoutingDecision> {
        self.get_at(key, Instant::now())
    }

    fn get_at(&mut self, key: &str, now: Instant) -> Option<RoutingDecision> {
        let ttl = self.ttl;
        let fresh = match self.entries.get(key) {
            Some(entry) => now.saturating_duration_since(entry.created_at) < ttl,
            None => {
                self.misses += 1;
                debug!(key = key, "decision cache miss");
                return None;
            }
        };

        if !fresh {
            self.entries.remove(key);
            self.misses += 1;
            debug!(key = key, "decision cache entry expired");
            return None;
        }

        self.tick += 1;
        let tick = self.tick;
        let entry = self.entries.get_mut(key)?;
        entry.last_used = tick;
        self.hits += 1;
        debug!(key = key, backend = %entry.decision.backend.name, "decision cache hit");
        Some(entry.decision.clone())
    }

    pub fn insert(&mut self, key: impl Into<String>, decision: RoutingDecision) {
        self.insert_at(key.into(), decision, Instant::now());
    }

    fn insert_at(&mut self, key: String, decision: RoutingDecision, now: Instant) {
        if self.capacity == 0 {
            return;
        }

        if !self.entries.contains_key(&key) && self.entries.len() >= self.capacity {
            self.purge_expired_at(now);
            if self.entries.len() >= self.capacity {
                self.evict_lru();
            }
        }

        self.tick += 1;
        self.entries.insert(
            key,
            CacheEntry {
                decision,
                created_at: now,
                last_used: self.tick,
            },
        );
    }

    fn evict_lru(&mut self) {
        let victim = self
            .entries
            .iter()
            .min_by_key(|(_, e)| e.last_used)
            .map(|(k, _)| k.clone());
        if let Some(key) = victim {
            self.entries.remove(&key);
            self.evictions += 1;
            debug!(key = %key, "evicted least recently used decision");
        }
    }

    /// Drop every expired entry; returns how many were removed.
    pub fn purge_expired(&mut self) -> usize {
        self.purge_expired_at(Instant::now())
    }

    fn purge_expired_at(&mut self, now: Instant) -> usize {
        let ttl = self.ttl;
        let before = self.entries.len();
        self.entries
            .retain(|_, e| now.saturating_duration_since(e.created_at) < ttl);
        let removed = before - self.entries.len();
        if removed > 0 {
            debug!(removed, "purged expired decisions");
        }
        removed
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        debug!("cleared decision cache");
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.entries.len(),
            capacity: self.capacity,
            ttl_secs: self.ttl().as_secs(),
            hits: self.hits,
            misses: self.misses,
            evictions: self.evictions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decision::RoutingDecision;

    fn decision(backend: &str) -> RoutingDecision {
        RoutingDecision::for_test(backend)
    }

    #[test]
    fn test_key_depends_on_every_input() {
        let ctx = TaskContext::new().with_files(["main.rs"]);
        let base = cache_key("prompt", None, true, None);
        assert_eq!(base, cache_key("prompt", None, true, None));
        assert_ne!(base, cache_key("prompt!", None, true, None));
        assert_ne!(base, cache_key("prompt", Some(&ctx), true, None));
        assert_ne!(base, cache_key("prompt", None, false, None));
        assert_ne!(base, cache_key("prompt", None, true, Some(0.0)));
        assert_ne!(
            cache_key("prompt", None, true, Some(0.1)),
            cache_key("prompt", None, true, Some(0.2))
        );
    }

    #[test]
    fn test_hit_and_miss() {
        let mut cache = DecisionCache::new(Duration::from_secs(60), 10);
        assert!(cache.get("k").is_none());
        cache.insert("k", decision("a"));
        assert_eq!(cache.get("k").map(|d| d.backend.name), Some("a".to_string()));
        let stats = cache.stats();
        assert_eq!((stats.hits, stats.misses), (1, 1));
    }

    #[test]
    fn test_from_settings_reports_ttl_and_capacity() {
        let cache = DecisionCache::from_settings(&CacheSettings {
            ttl_secs: 42,
            max_entries: 3,
        });
        assert_eq!(cache.ttl(), Duration::from_secs(42));
        let stats = cache.stats();
        assert_eq!((stats.ttl_secs, stats.capacity, stats.entries), (42, 3, 0));
    }

    #[test]
    fn test_entries_expire() {
        let mut cache = DecisionCache::new(Duration::from_secs(300), 10);
        let t0 = Instant::now();
        cache.insert_at("k".to_string(), decision("a"), t0);
        assert!(cache.get_at("k", t0 + Duration::from_secs(299)).is_some());
        assert!(cache.get_at("k", t0 + Duration::from_secs(300)).is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_lru_eviction() {
        let mut cache = DecisionCache::new(Duration::from_secs(60), 2);
        cache.insert("a", decision("a"));
        cache.insert("b", decision("b"));
        // touch a so b becomes the eviction victim
        assert!(cache.get("a").is_some());
        cache.insert("c", decision("c"));
        assert_eq!(cache.len(), 2);
        assert!(cache.get("b").is_none());
        assert!(cache.get("a").is_some());
        assert!(cache.get("c").is_some());
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn test_full_cache_prefers_dropping_expired() {
        let mut cache = DecisionCache::new(Duration::from_secs(10), 2);
        let t0 = Instant::now();
        cache.insert_at("old".to_string(), decision("old"), t0);
        cache.insert_at("new".to_string(), decision("new"), t0 + Duration::from_secs(8));
        cache.insert_at("newer".to_string(), decision("newer"), t0 + Duration::from_secs(11));
        assert_eq!(cache.stats().evictions, 0);
        assert!(cache.get_at("new", t0 + Duration::from_secs(12)).is_some());
    }

    #[test]
    fn test_purge_and_clear() {
        let mut cache = DecisionCache::new(Duration::from_secs(10), 10);
        let t0 = Instant::now();
        cache.insert_at("a".to_string(), decision("a"), t0);
        cache.insert_at("b".to_string(), decision("b"), t0 + Duration::from_secs(5));
        assert_eq!(cache.purge_expired_at(t0 + Duration::from_secs(12)), 1);
        assert_eq!(cache.len(), 1);
        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_zero_capacity_disables_caching() {
        let mut cache = DecisionCache::new(Duration::from_secs(60), 0);
        cache.insert("k", decision("a"));
        assert!(cache.is_empty());
    }
}
