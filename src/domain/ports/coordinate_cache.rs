//! Coordinate Cache Port
//!
//! Defines the interface for remembering resolution outcomes and
//! counting cache traffic.

use crate::domain::entities::{CacheEntry, CacheKey, CacheStats};

/// Store for resolved coordinates and the counters describing its use.
///
/// Entries are append-only for the lifetime of the store. Counters only
/// ever grow, and every snapshot satisfies
/// `total_requests == cache_hits + cache_misses`.
pub trait CoordinateCache: Send + Sync {
    /// Look up a previously stored outcome.
    fn lookup(&self, key: &CacheKey) -> Option<CacheEntry>;

    /// Remember the outcome for a key (including `Unresolved`).
    fn store(&self, key: CacheKey, entry: CacheEntry);

    /// Count a request answered from the cache.
    fn record_hit(&self);

    /// Count a request the cache could not answer.
    fn record_miss(&self);

    /// Count an outbound geocoding call.
    fn record_api_call(&self);

    /// Consistent snapshot of size and counters.
    fn stats(&self) -> CacheStats;

    /// Number of stored keys.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every entry. Only used at teardown; counters are kept.
    fn clear(&self);
}
