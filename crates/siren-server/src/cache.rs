//! Size-bounded memo of optimization results.
//!
//! Eviction is FIFO by insertion order. Reads do not refresh an entry, and
//! concurrent misses on the same key both compute and store (last write wins).

use dashmap::DashMap;
use serde::Serialize;
use siren_core::OptimizationResult;
use std::sync::atomic::{AtomicU64, Ordering};

struct CachedResult {
    seq: u64,
    result: OptimizationResult,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub capacity: usize,
    pub hits: u64,
    pub misses: u64,
}

pub struct OptimizationCache {
    entries: DashMap<String, CachedResult>,
    capacity: usize,
    sequence: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl OptimizationCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: DashMap::new(),
            capacity: capacity.max(1),
            sequence: AtomicU64::new(0),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn get(&self, key: &str) -> Option<OptimizationResult> {
        match self.entries.get(key) {
            Some(entry) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(entry.result.clone())
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    pub fn insert(&self, key: String, result: OptimizationResult) {
        let seq = self.sequence.fetch_add(1, Ordering::Relaxed);
        self.entries.insert(key, CachedResult { seq, result });
        self.evict_oldest();
    }

    fn evict_oldest(&self) {
        if self.entries.len() <= self.capacity {
            return;
        }
        let mut order: Vec<(String, u64)> = self
            .entries
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().seq))
            .collect();
        order.sort_by_key(|(_, seq)| *seq);
        for (key, _) in order {
            if self.entries.len() <= self.capacity {
                break;
            }
            self.entries.remove(&key);
        }
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.entries.len(),
            capacity: self.capacity,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use siren_core::RoutingError;

    fn result(tag: &str) -> OptimizationResult {
        OptimizationResult::failure(&RoutingError::InvalidRequest(tag.to_string()), 0.0)
    }

    #[test]
    fn evicts_oldest_insert_not_least_recent_read() {
        let cache = OptimizationCache::new(2);
        cache.insert("a".into(), result("a"));
        cache.insert("b".into(), result("b"));
        // Reading "a" does not protect it under FIFO.
        assert!(cache.get("a").is_some());
        cache.insert("c".into(), result("c"));

        assert_eq!(cache.len(), 2);
        assert!(cache.get("a").is_none());
        assert!(cache.get("b").is_some());
        assert!(cache.get("c").is_some());
    }

    #[test]
    fn stats_count_hits_and_misses() {
        let cache = OptimizationCache::new(10);
        assert!(cache.get("missing").is_none());
        cache.insert("k".into(), result("k"));
        assert!(cache.get("k").is_some());
        assert!(cache.get("k").is_some());

        let stats = cache.stats();
        assert_eq!(stats.entries, 1);
        assert_eq!(stats.capacity, 10);
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.misses, 1);

        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.stats().hits, 2);
    }

    #[test]
    fn reinserting_a_key_moves_it_to_the_back() {
        let cache = OptimizationCache::new(2);
        cache.insert("a".into(), result("a"));
        cache.insert("b".into(), result("b"));
        cache.insert("a".into(), result("a2"));
        cache.insert("c".into(), result("c"));
        assert!(cache.get("b").is_none());
        assert!(cache.get("a").is_some());
    }
}
