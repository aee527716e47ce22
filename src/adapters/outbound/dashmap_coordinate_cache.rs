//! DashMap Coordinate Cache
//!
//! Implements CoordinateCache using DashMap for lock-free concurrent access.

use crate::domain::entities::{CacheEntry, CacheKey, CacheStats};
use crate::domain::ports::CoordinateCache;
use dashmap::DashMap;
use parking_lot::Mutex;

/// Raw cache counters.
///
/// Kept together behind one lock so a snapshot never observes a request
/// counted as total but not yet as hit or miss.
#[derive(Debug, Default, Clone, Copy)]
struct Counters {
    hits: u64,
    misses: u64,
    api_calls: u64,
}

/// DashMap-backed coordinate cache.
///
/// Entries are never evicted; the map lives as long as the process
/// (or until an explicit teardown calls `clear`).
pub struct DashMapCoordinateCache {
    entries: DashMap<CacheKey, CacheEntry>,
    counters: Mutex<Counters>,
}

impl DashMapCoordinateCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
            counters: Mutex::new(Counters::default()),
        }
    }
}

impl Default for DashMapCoordinateCache {
    fn default() -> Self {
        Self::new()
    }
}

impl CoordinateCache for DashMapCoordinateCache {
    fn lookup(&self, key: &CacheKey) -> Option<CacheEntry> {
        self.entries.get(key).map(|e| e.value().clone())
    }

    fn store(&self, key: CacheKey, entry: CacheEntry) {
        self.entries.insert(key, entry);
    }

    fn record_hit(&self) {
        self.counters.lock().hits += 1;
    }

    fn record_miss(&self) {
        self.counters.lock().misses += 1;
    }

    fn record_api_call(&self) {
        self.counters.lock().api_calls += 1;
    }

    fn stats(&self) -> CacheStats {
        let counters = *self.counters.lock();
        CacheStats::from_counters(
            self.entries.len(),
            counters.hits,
            counters.misses,
            counters.api_calls,
        )
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn clear(&self) {
        self.entries.clear();
    }
}
