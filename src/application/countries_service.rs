//! Countries Visited Service - Aggregation use case
//!
//! Reads a person's manual countries and location history from the host,
//! resolves coordinates through the resolution service and merges the
//! result into the visited view.

use crate::application::resolution_service::ResolutionService;
use crate::domain::entities::{Coordinate, StateRecord, VisitedCountries};
use crate::domain::ports::{HistoryReader, StateReader};
use crate::domain::services::CountryAggregator;
use crate::domain::value_objects::{CountryCode, CurrentCountryPolicy};
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Tunables for one aggregation pass.
#[derive(Debug, Clone)]
pub struct AggregationSettings {
    /// Maximum uncached history cells sent to the geocoder per pass
    pub history_cap: usize,
    /// How far back history is read
    pub history_window: chrono::Duration,
    /// Whether the current country joins the visited set
    pub current_policy: CurrentCountryPolicy,
}

impl Default for AggregationSettings {
    fn default() -> Self {
        Self {
            history_cap: 100,
            history_window: chrono::Duration::days(30),
            current_policy: CurrentCountryPolicy::IncludeInVisited,
        }
    }
}

/// Countries visited service.
///
/// Every call recomputes the view from scratch; callers decide when to
/// run it (on a state change or on a polling interval).
pub struct CountriesVisitedService {
    resolver: Arc<ResolutionService>,
    state_reader: Arc<dyn StateReader>,
    history_reader: Arc<dyn HistoryReader>,
    settings: AggregationSettings,
}

impl CountriesVisitedService {
    /// Create a new countries visited service.
    pub fn new(
        resolver: Arc<ResolutionService>,
        state_reader: Arc<dyn StateReader>,
        history_reader: Arc<dyn HistoryReader>,
        settings: AggregationSettings,
    ) -> Self {
        Self {
            resolver,
            state_reader,
            history_reader,
            settings,
        }
    }

    pub fn settings(&self) -> &AggregationSettings {
        &self.settings
    }

    /// Merge manual codes with countries detected from coordinates.
    ///
    /// # Arguments
    /// * `manual_codes` - Manually tagged codes, any case; malformed ones are dropped
    /// * `history` - Raw history samples, duplicates allowed
    /// * `current` - Current position, if known
    pub async fn compute_visited<S: AsRef<str>>(
        &self,
        manual_codes: &[S],
        history: &[Coordinate],
        current: Option<Coordinate>,
    ) -> VisitedCountries {
        let manual = CountryAggregator::normalize_manual(manual_codes);
        let detected = self.detect_from_history(history).await;

        let current_country = match current {
            Some(coordinate) => self.resolver.resolve(coordinate).await,
            None => None,
        };

        let visited = CountryAggregator::merge(
            &manual,
            &detected,
            current_country,
            self.settings.current_policy,
        );

        tracing::info!(
            "total visited countries: {} (manual: {}, detected: {}, current: {:?})",
            visited.count,
            visited.manual_countries.len(),
            visited.detected_from_history.len(),
            visited.current_country.as_ref().map(CountryCode::as_str)
        );

        visited
    }

    /// Recompute the visited view for a person entity.
    ///
    /// Returns an empty view when the host does not know the entity.
    pub async fn update(&self, person_entity: &str) -> VisitedCountries {
        let Some(state) = self.state_reader.current_state(person_entity).await else {
            tracing::warn!("person entity {} not found", person_entity);
            return VisitedCountries::empty();
        };

        tracing::debug!(
            "manual countries from {}: {:?}",
            person_entity,
            state.attributes.visited_countries
        );

        let history = self.history_samples(person_entity).await;

        self.compute_visited(
            &state.attributes.visited_countries,
            &history,
            state.coordinate(),
        )
        .await
    }

    /// Collect coordinate samples from a person's history.
    ///
    /// Records carrying GPS attributes contribute their position; records
    /// whose state is a zone also contribute the zone's position.
    async fn history_samples(&self, person_entity: &str) -> Vec<Coordinate> {
        let until = Utc::now();
        // A window reaching past the representable range reads all history
        let since = until
            .checked_sub_signed(self.settings.history_window)
            .unwrap_or(DateTime::<Utc>::MIN_UTC);

        let records = match self.history_reader.history(person_entity, since, until).await {
            Ok(records) => records,
            Err(e) => {
                tracing::warn!("error reading history for {}: {}", person_entity, e);
                return Vec::new();
            }
        };

        let mut samples = Vec::with_capacity(records.len());
        for record in &records {
            if let Some(coordinate) = record.coordinate() {
                samples.push(coordinate);
            }
            if let Some(coordinate) = self.zone_coordinate(record).await {
                samples.push(coordinate);
            }
        }
        samples
    }

    async fn zone_coordinate(&self, record: &StateRecord) -> Option<Coordinate> {
        let zone = record.zone_entity()?;
        self.state_reader
            .current_state(zone)
            .await
            .and_then(|z| z.coordinate())
    }

    async fn detect_from_history(&self, history: &[Coordinate]) -> BTreeSet<CountryCode> {
        let selection = CountryAggregator::select_history(history, self.settings.history_cap, |c| {
            self.resolver.is_cached(c)
        });

        tracing::debug!(
            "processing {} unique coordinates from history (total: {})",
            selection.distinct,
            history.len()
        );
        if selection.skipped > 0 {
            tracing::info!(
                "limiting history processing to {} new coordinates ({} cached), {} left for a later pass",
                selection.coordinates.len() - selection.cached,
                selection.cached,
                selection.skipped
            );
        }

        let mut detected = BTreeSet::new();
        for coordinate in &selection.coordinates {
            if let Some(code) = self.resolver.resolve(*coordinate).await {
                tracing::debug!("detected country {} from {}", code, coordinate);
                detected.insert(code);
            }
        }

        tracing::info!(
            "history processing complete: {} countries detected from {} coordinates",
            detected.len(),
            selection.coordinates.len()
        );
        detected
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::outbound::{DashMapCoordinateCache, InMemoryStateStore};
    use crate::domain::ports::{GeocodeError, ReverseGeocoder, StateError};
    use crate::infrastructure::rate_limiter::RateLimiter;
    use crate::infrastructure::stats_publisher::StatsPublisher;
    use async_trait::async_trait;
    use chrono::Duration as ChronoDuration;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    // ===== Mock Implementations =====

    /// Geocoder assigning countries by longitude band.
    struct BandGeocoder {
        calls: AtomicUsize,
    }

    impl BandGeocoder {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl ReverseGeocoder for BandGeocoder {
        async fn country_code(
            &self,
            coordinate: Coordinate,
        ) -> Result<Option<CountryCode>, GeocodeError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let code = match coordinate.longitude {
                lon if lon < -30.0 => "US",
                lon if lon < 5.0 => "FR",
                lon if lon < 20.0 => "DE",
                _ => return Ok(None),
            };
            Ok(CountryCode::parse(code))
        }
    }

    struct AlwaysFailing;

    #[async_trait]
    impl ReverseGeocoder for AlwaysFailing {
        async fn country_code(
            &self,
            _coordinate: Coordinate,
        ) -> Result<Option<CountryCode>, GeocodeError> {
            Err(GeocodeError::Timeout)
        }
    }

    struct BrokenHistory;

    #[async_trait]
    impl HistoryReader for BrokenHistory {
        async fn history(
            &self,
            _entity_id: &str,
            _since: DateTime<Utc>,
            _until: DateTime<Utc>,
        ) -> Result<Vec<StateRecord>, StateError> {
            Err(StateError::Unavailable("recorder not loaded".to_string()))
        }
    }

    // ===== Test Helpers =====

    fn resolver(geocoder: Option<Arc<dyn ReverseGeocoder>>) -> Arc<ResolutionService> {
        Arc::new(ResolutionService::new(
            Arc::new(DashMapCoordinateCache::new()),
            geocoder,
            Arc::new(RateLimiter::with_interval(Duration::from_millis(1100))),
            StatsPublisher::new(),
        ))
    }

    fn service(
        geocoder: Option<Arc<dyn ReverseGeocoder>>,
        store: Arc<InMemoryStateStore>,
        settings: AggregationSettings,
    ) -> CountriesVisitedService {
        CountriesVisitedService::new(resolver(geocoder), store.clone(), store, settings)
    }

    fn code(s: &str) -> CountryCode {
        CountryCode::parse(s).unwrap()
    }

    // ===== compute_visited Tests =====

    #[tokio::test]
    async fn test_manual_only() {
        let svc = service(None, Arc::new(InMemoryStateStore::new()), Default::default());

        let result = svc.compute_visited(&["US"], &[], None).await;

        assert_eq!(result.visited_codes, vec![code("US")]);
        assert_eq!(result.count, 1);
        assert_eq!(result.names, vec!["United States".to_string()]);
        assert!(result.current_country.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_merge_manual_history_and_current() {
        let svc = service(
            Some(Arc::new(BandGeocoder::new())),
            Arc::new(InMemoryStateStore::new()),
            Default::default(),
        );

        let history = [Coordinate::new(40.71, -74.0), Coordinate::new(40.71, -74.0)];
        let result = svc
            .compute_visited(&["FR"], &history, Some(Coordinate::new(52.52, 13.4)))
            .await;

        assert_eq!(result.visited_codes, vec![code("DE"), code("FR"), code("US")]);
        assert_eq!(result.count, 3);
        assert_eq!(result.current_country, Some(code("DE")));
        assert_eq!(result.detected_from_history, vec![code("US")]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_history_cap_limits_gateway_calls() {
        let geocoder = Arc::new(BandGeocoder::new());
        let svc = service(
            Some(geocoder.clone()),
            Arc::new(InMemoryStateStore::new()),
            Default::default(),
        );

        let history: Vec<Coordinate> = (0..150)
            .map(|i| Coordinate::new(-60.0 + i as f64 * 0.5, 10.0))
            .collect();
        let result = svc.compute_visited::<&str>(&[], &history, None).await;

        assert_eq!(geocoder.calls.load(Ordering::SeqCst), 100);
        assert_eq!(result.visited_codes, vec![code("DE")]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cells_past_cap_resolved_on_later_pass() {
        let geocoder = Arc::new(BandGeocoder::new());
        let svc = service(
            Some(geocoder.clone()),
            Arc::new(InMemoryStateStore::new()),
            Default::default(),
        );

        // 100 cells in Germany first, then 50 in the US
        let mut history: Vec<Coordinate> = (0..100)
            .map(|i| Coordinate::new(-60.0 + i as f64 * 0.5, 10.0))
            .collect();
        history.extend((0..50).map(|i| Coordinate::new(-20.0 + i as f64 * 0.5, -74.0)));

        let first = svc.compute_visited::<&str>(&[], &history, None).await;
        assert_eq!(first.visited_codes, vec![code("DE")]);
        assert_eq!(geocoder.calls.load(Ordering::SeqCst), 100);

        let second = svc.compute_visited::<&str>(&[], &history, None).await;
        assert_eq!(second.visited_codes, vec![code("DE"), code("US")]);
        assert_eq!(geocoder.calls.load(Ordering::SeqCst), 150);

        // Everything cached now
        svc.compute_visited::<&str>(&[], &history, None).await;
        assert_eq!(geocoder.calls.load(Ordering::SeqCst), 150);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failing_geocoder_still_completes() {
        let svc = service(
            Some(Arc::new(AlwaysFailing)),
            Arc::new(InMemoryStateStore::new()),
            Default::default(),
        );

        let result = svc
            .compute_visited(
                &["IT"],
                &[Coordinate::new(1.0, 1.0)],
                Some(Coordinate::new(2.0, 2.0)),
            )
            .await;

        assert_eq!(result.visited_codes, vec![code("IT")]);
        assert!(result.current_country.is_none());
        assert!(result.detected_from_history.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_display_only_policy() {
        let svc = service(
            Some(Arc::new(BandGeocoder::new())),
            Arc::new(InMemoryStateStore::new()),
            AggregationSettings {
                current_policy: CurrentCountryPolicy::DisplayOnly,
                ..Default::default()
            },
        );

        let result = svc
            .compute_visited(&["FR"], &[], Some(Coordinate::new(52.52, 13.4)))
            .await;

        assert_eq!(result.visited_codes, vec![code("FR")]);
        assert_eq!(result.current_country, Some(code("DE")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_recompute_uses_cache() {
        let geocoder = Arc::new(BandGeocoder::new());
        let svc = service(
            Some(geocoder.clone()),
            Arc::new(InMemoryStateStore::new()),
            Default::default(),
        );
        let history = [Coordinate::new(40.71, -74.0), Coordinate::new(48.86, 2.35)];

        let first = svc.compute_visited::<&str>(&[], &history, None).await;
        let second = svc.compute_visited::<&str>(&[], &history, None).await;

        assert_eq!(first, second);
        assert_eq!(geocoder.calls.load(Ordering::SeqCst), 2);
    }

    // ===== update Tests =====

    #[tokio::test]
    async fn test_update_missing_person_is_empty() {
        let svc = service(None, Arc::new(InMemoryStateStore::new()), Default::default());
        let result = svc.update("person.ghost").await;
        assert_eq!(result, VisitedCountries::empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_update_reads_state_history_and_zones() {
        let store = Arc::new(InMemoryStateStore::new());
        let now = Utc::now();

        store.set_state(
            StateRecord::new("person.alice", "not_home")
                .with_coordinate(52.52, 13.4)
                .with_visited(&["it", "bad-code"]),
        );
        store.set_state(StateRecord::new("zone.paris_office", "0").with_coordinate(48.87, 2.33));
        store.push_history(
            StateRecord::new("person.alice", "not_home")
                .with_coordinate(40.71, -74.0)
                .with_last_changed(now - ChronoDuration::days(3)),
        );
        store.push_history(
            StateRecord::new("person.alice", "zone.paris_office")
                .with_last_changed(now - ChronoDuration::days(2)),
        );
        // Outside the window
        store.push_history(
            StateRecord::new("person.alice", "not_home")
                .with_coordinate(35.0, 100.0)
                .with_last_changed(now - ChronoDuration::days(90)),
        );

        let svc = service(Some(Arc::new(BandGeocoder::new())), store, Default::default());
        let result = svc.update("person.alice").await;

        assert_eq!(
            result.visited_codes,
            vec![code("DE"), code("FR"), code("IT"), code("US")]
        );
        assert_eq!(result.manual_countries, vec![code("IT")]);
        assert_eq!(result.detected_from_history, vec![code("FR"), code("US")]);
        assert_eq!(result.current_country, Some(code("DE")));
    }

    #[tokio::test]
    async fn test_update_survives_broken_history() {
        let store = Arc::new(InMemoryStateStore::new());
        store.set_state(StateRecord::new("person.bob", "home").with_visited(&["NO"]));

        let svc = CountriesVisitedService::new(
            resolver(None),
            store,
            Arc::new(BrokenHistory),
            Default::default(),
        );
        let result = svc.update("person.bob").await;

        assert_eq!(result.visited_codes, vec![code("NO")]);
        assert!(result.detected_from_history.is_empty());
    }

    #[tokio::test]
    async fn test_oversized_history_window_reads_everything() {
        let store = Arc::new(InMemoryStateStore::new());
        store.set_state(StateRecord::new("person.bob", "home").with_visited(&["NO"]));
        store.push_history(
            StateRecord::new("person.bob", "not_home")
                .with_coordinate(1.0, 1.0)
                .with_last_changed(Utc::now() - ChronoDuration::days(3650)),
        );

        let svc = service(
            None,
            store,
            AggregationSettings {
                history_window: ChronoDuration::days(1_000_000_000),
                ..Default::default()
            },
        );
        let result = svc.update("person.bob").await;

        assert_eq!(result.visited_codes, vec![code("NO")]);
        assert_eq!(svc.resolver.stats().cache_misses, 1);
    }

    #[test]
    fn test_settings_default() {
        let settings = AggregationSettings::default();
        assert_eq!(settings.history_cap, 100);
        assert_eq!(settings.history_window, chrono::Duration::days(30));
        assert_eq!(settings.current_policy, CurrentCountryPolicy::IncludeInVisited);
    }
}
