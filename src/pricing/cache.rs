//! Short-lived per-token price cache
//!
//! Entries are stamped with the graph and oracle generations they were
//! computed from; a lookup under a different stamp is a miss, so a graph
//! swap or new anchor reading invalidates everything without a sweep.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use crate::types::{PriceResult, TokenId};

/// (graph generation, oracle generation)
pub type Stamp = (u64, u64);

struct CacheEntry {
    result: PriceResult,
    stamp: Stamp,
    inserted_at: i64,
}

pub struct PriceCache {
    ttl_ms: i64,
    entries: Mutex<HashMap<TokenId, CacheEntry>>,
}

impl PriceCache {
    /// A zero TTL disables caching
    pub fn new(ttl_secs: u64) -> Self {
        Self {
            ttl_ms: (ttl_secs * 1000) as i64,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn get(&self, token: &TokenId, stamp: Stamp, now: i64) -> Option<PriceResult> {
        if self.ttl_ms == 0 {
            return None;
        }
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries
            .get(token)
            .filter(|e| e.stamp == stamp && now - e.inserted_at < self.ttl_ms)
            .map(|e| e.result.clone())
    }

    pub fn insert(&self, result: PriceResult, stamp: Stamp, now: i64) {
        if self.ttl_ms == 0 {
            return;
        }
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        // Drop anything computed from older inputs while we hold the lock
        entries.retain(|_, e| e.stamp == stamp);
        entries.insert(
            result.token.clone(),
            CacheEntry {
                result,
                stamp,
                inserted_at: now,
            },
        );
    }

    pub fn clear(&self) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(token: &str) -> PriceResult {
        PriceResult::unresolved(TokenId::new(token), 0, None, vec![])
    }

    #[test]
    fn test_hit_within_ttl() {
        let cache = PriceCache::new(15);
        cache.insert(result("X"), (1, 1), 1_000);
        assert!(cache.get(&TokenId::new("X"), (1, 1), 10_000).is_some());
        assert!(cache.get(&TokenId::new("X"), (1, 1), 16_000).is_none());
    }

    #[test]
    fn test_generation_change_is_miss() {
        let cache = PriceCache::new(15);
        cache.insert(result("X"), (1, 1), 0);
        assert!(cache.get(&TokenId::new("X"), (2, 1), 0).is_none());
        assert!(cache.get(&TokenId::new("X"), (1, 2), 0).is_none());
    }

    #[test]
    fn test_insert_evicts_old_generations() {
        let cache = PriceCache::new(15);
        cache.insert(result("X"), (1, 1), 0);
        cache.insert(result("Y"), (2, 1), 0);
        assert_eq!(cache.len(), 1);
        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_zero_ttl_disables() {
        let cache = PriceCache::new(0);
        cache.insert(result("X"), (1, 1), 0);
        assert!(cache.get(&TokenId::new("X"), (1, 1), 0).is_none());
    }
}
