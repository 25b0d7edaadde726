// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! LRU fast path for duplicate postback deliveries.
//!
//! Offer networks retry aggressively, often within seconds. Caching recently
//! processed journal ids answers those replays without a database read. The
//! cache is bounded (capacity + TTL) and purely an optimization: the
//! authoritative duplicate check lives inside the ledger's write
//! transaction.

use std::num::NonZeroUsize;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use lru::LruCache;

/// In-process LRU of recently processed journal ids.
pub struct ReplayCache {
    cache: Mutex<LruCache<String, Instant>>,
    ttl: Duration,
}

impl ReplayCache {
    /// Create a new cache with the given capacity and TTL.
    ///
    /// - `capacity`: Max number of journal ids to remember.
    /// - `ttl`: Time-to-live for each entry.
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            cache: Mutex::new(LruCache::new(
                NonZeroUsize::new(capacity).unwrap_or_else(|| NonZeroUsize::new(1).unwrap()),
            )),
            ttl,
        }
    }

    /// Whether this journal id was processed recently.
    ///
    /// Returns `false` if absent or expired.
    pub fn seen(&self, journal_id: &str) -> bool {
        let Ok(mut cache) = self.cache.lock() else {
            return false;
        };
        if let Some(inserted_at) = cache.get(journal_id) {
            if inserted_at.elapsed() < self.ttl {
                return true;
            }
            // Expired — remove it
            cache.pop(journal_id);
        }
        false
    }

    /// Remember a processed journal id.
    pub fn record(&self, journal_id: &str) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.put(journal_id.to_string(), Instant::now());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_then_seen() {
        let cache = ReplayCache::new(16, Duration::from_secs(300));
        assert!(!cache.seen("CPX_abc"));

        cache.record("CPX_abc");
        assert!(cache.seen("CPX_abc"));
        assert!(!cache.seen("CPX_other"));
    }

    #[test]
    fn entries_expire_after_ttl() {
        let cache = ReplayCache::new(16, Duration::from_millis(1));
        cache.record("CPX_abc");

        std::thread::sleep(Duration::from_millis(5));

        assert!(!cache.seen("CPX_abc"));
    }

    #[test]
    fn capacity_evicts_oldest() {
        let cache = ReplayCache::new(2, Duration::from_secs(300));
        cache.record("a");
        cache.record("b");
        cache.record("c");

        assert!(!cache.seen("a"));
        assert!(cache.seen("b"));
        assert!(cache.seen("c"));
    }

    #[test]
    fn zero_capacity_clamps_to_one() {
        let cache = ReplayCache::new(0, Duration::from_secs(300));
        cache.record("a");
        assert!(cache.seen("a"));
    }
}
