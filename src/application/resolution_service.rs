//! Resolution Service - Coordinate to country use case
//!
//! Orchestrates one resolution: cache lookup, rate limiter, geocoder call,
//! cache store, statistics update and observer notification.

use crate::domain::entities::{CacheEntry, CacheStats, Coordinate};
use crate::domain::ports::{CoordinateCache, ReverseGeocoder};
use crate::domain::value_objects::CountryCode;
use crate::infrastructure::rate_limiter::RateLimiter;
use crate::infrastructure::stats_publisher::{StatsPublisher, Subscription};
use std::sync::Arc;

/// Resolution service - shared by every consumer in the process.
///
/// This service:
/// 1. Answers repeated lookups of the same ~1 km cell from cache
/// 2. Spaces outbound geocoding calls through the rate limiter
/// 3. Remembers failures so a bad coordinate is not retried
/// 4. Publishes statistics after every change
pub struct ResolutionService {
    cache: Arc<dyn CoordinateCache>,
    geocoder: Option<Arc<dyn ReverseGeocoder>>,
    rate_limiter: Arc<RateLimiter>,
    publisher: StatsPublisher,
}

impl ResolutionService {
    /// Create a new resolution service.
    ///
    /// A `None` geocoder disables detection for the lifetime of the
    /// service: misses return None without any outbound call.
    pub fn new(
        cache: Arc<dyn CoordinateCache>,
        geocoder: Option<Arc<dyn ReverseGeocoder>>,
        rate_limiter: Arc<RateLimiter>,
        publisher: StatsPublisher,
    ) -> Self {
        Self {
            cache,
            geocoder,
            rate_limiter,
            publisher,
        }
    }

    /// Resolve raw latitude/longitude to a country code.
    pub async fn resolve_coordinate(&self, latitude: f64, longitude: f64) -> Option<CountryCode> {
        self.resolve(Coordinate::new(latitude, longitude)).await
    }

    /// Resolve a coordinate to a country code.
    ///
    /// Never fails: every failure path yields None.
    pub async fn resolve(&self, coordinate: Coordinate) -> Option<CountryCode> {
        if !coordinate.is_valid() {
            self.cache.record_miss();
            tracing::debug!("skipping invalid coordinate {}", coordinate);
            self.notify();
            return None;
        }

        let key = coordinate.cache_key();

        if let Some(entry) = self.cache.lookup(&key) {
            self.cache.record_hit();
            tracing::debug!("using cached country for {}: {:?}", coordinate, entry.country());
            self.notify();
            return entry.into_country();
        }

        self.cache.record_miss();

        let Some(geocoder) = self.geocoder.clone() else {
            tracing::debug!("reverse geocoder not available, cannot determine country");
            self.notify();
            return None;
        };

        self.rate_limiter.await_turn().await;

        // The call is recorded and stored by its own task, so a caller that
        // gives up mid-request still leaves the result in the cache
        let task = tokio::spawn(call_and_store(
            geocoder,
            self.cache.clone(),
            self.publisher.clone(),
            coordinate,
        ));

        match task.await {
            Ok(country) => country,
            Err(e) => {
                tracing::warn!("resolution task for {} failed: {}", coordinate, e);
                None
            }
        }
    }

    /// Whether the cell of `coordinate` already has a cached outcome.
    ///
    /// Does not touch the statistics.
    pub fn is_cached(&self, coordinate: &Coordinate) -> bool {
        coordinate.is_valid() && self.cache.lookup(&coordinate.cache_key()).is_some()
    }

    /// Current statistics snapshot.
    pub fn stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Whether outbound geocoding is available at all.
    pub fn geocoding_enabled(&self) -> bool {
        self.geocoder.is_some()
    }

    /// Register a statistics observer.
    #[must_use = "dropping the subscription unregisters the observer"]
    pub fn subscribe<F>(&self, observer: F) -> Subscription
    where
        F: Fn(&CacheStats) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.publisher.subscribe(observer)
    }

    /// Tear the service down: log final statistics and drop cached entries.
    pub fn shutdown(&self) {
        let stats = self.cache.stats();
        tracing::info!(
            "geocoding cache shutting down: size={} hits={} misses={} api_calls={} hit_rate={}%",
            stats.cache_size,
            stats.cache_hits,
            stats.cache_misses,
            stats.api_calls,
            stats.hit_rate
        );
        self.cache.clear();
        self.notify();
    }

    fn notify(&self) {
        self.publisher.publish(&self.cache.stats());
    }
}

/// Run one gateway call, then count it, cache the outcome and publish.
async fn call_and_store(
    geocoder: Arc<dyn ReverseGeocoder>,
    cache: Arc<dyn CoordinateCache>,
    publisher: StatsPublisher,
    coordinate: Coordinate,
) -> Option<CountryCode> {
    // Nested task so a panicking adapter cannot skip the bookkeeping below
    let outcome = tokio::spawn(async move { geocoder.country_code(coordinate).await }).await;
    cache.record_api_call();

    let country = match outcome {
        Ok(Ok(country)) => country,
        Ok(Err(e)) => {
            tracing::debug!("geocoding error for {}: {}", coordinate, e);
            None
        }
        Err(e) => {
            tracing::warn!("unexpected geocoding error for {}: {}", coordinate, e);
            None
        }
    };

    match &country {
        Some(code) => tracing::debug!("resolved {} to country: {}", coordinate, code),
        None => tracing::debug!("could not resolve country for {}", coordinate),
    }

    cache.store(coordinate.cache_key(), CacheEntry::from(country.clone()));
    publisher.publish(&cache.stats());
    country
}
