//! Sensor Snapshots
//!
//! Serializable views of the visited countries and cache statistics,
//! shaped the way the host publishes entity state.

use crate::application::countries_service::CountriesVisitedService;
use crate::application::resolution_service::ResolutionService;
use crate::domain::entities::{CacheStats, VisitedCountries};
use crate::domain::ports::StateReader;
use crate::domain::value_objects::CountryCode;
use crate::infrastructure::stats_publisher::Subscription;
use parking_lot::RwLock;
use serde::Serialize;
use std::sync::Arc;

// ===== Countries visited =====

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CountriesVisitedAttributes {
    pub visited_countries: Vec<CountryCode>,
    pub visited_countries_names: Vec<String>,
    pub person: String,
    pub detected_from_history: Vec<CountryCode>,
    pub manual_countries: Vec<CountryCode>,
    pub current_country: Option<CountryCode>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CountriesVisitedState {
    pub name: String,
    pub state: usize,
    pub unit_of_measurement: &'static str,
    pub attributes: CountriesVisitedAttributes,
}

/// Sensor whose state is the number of visited countries.
pub struct CountriesVisitedSensor {
    service: Arc<CountriesVisitedService>,
    person: String,
    last: RwLock<VisitedCountries>,
}

impl CountriesVisitedSensor {
    pub fn new(service: Arc<CountriesVisitedService>, person: impl Into<String>) -> Self {
        Self {
            service,
            person: person.into(),
            last: RwLock::new(VisitedCountries::empty()),
        }
    }

    pub fn name(&self) -> String {
        format!("Countries Visited ({})", self.person)
    }

    pub fn person(&self) -> &str {
        &self.person
    }

    /// Recompute from host state and return the new snapshot.
    pub async fn update(&self) -> CountriesVisitedState {
        let visited = self.service.update(&self.person).await;

        let changed = *self.last.read() != visited;
        if changed {
            tracing::info!(
                "{} changed: {} countries {:?}",
                self.name(),
                visited.count,
                visited.visited_codes
            );
        }

        *self.last.write() = visited;
        self.state()
    }

    /// Snapshot of the last computed view.
    pub fn state(&self) -> CountriesVisitedState {
        let visited = self.last.read().clone();
        CountriesVisitedState {
            name: self.name(),
            state: visited.count,
            unit_of_measurement: "countries",
            attributes: CountriesVisitedAttributes {
                visited_countries: visited.visited_codes,
                visited_countries_names: visited.names,
                person: self.person.clone(),
                detected_from_history: visited.detected_from_history,
                manual_countries: visited.manual_countries,
                current_country: visited.current_country,
            },
        }
    }
}

// ===== Cache statistics =====

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheStatisticsState {
    pub name: &'static str,
    pub state: f64,
    pub unit_of_measurement: &'static str,
    pub attributes: CacheStats,
}

/// Sensor tracking the geocoding cache; refreshed by the stats publisher.
pub struct CacheStatisticsSensor {
    latest: Arc<RwLock<CacheStats>>,
    _subscription: Subscription,
}

impl CacheStatisticsSensor {
    pub fn new(resolver: &ResolutionService) -> Self {
        let latest = Arc::new(RwLock::new(resolver.stats()));
        let subscription = {
            let latest = latest.clone();
            resolver.subscribe(move |stats| {
                *latest.write() = stats.clone();
                Ok(())
            })
        };

        Self {
            latest,
            _subscription: subscription,
        }
    }

    pub fn state(&self) -> CacheStatisticsState {
        let stats = self.latest.read().clone();
        CacheStatisticsState {
            name: "Geocoding Cache Statistics",
            state: stats.hit_rate,
            unit_of_measurement: "%",
            attributes: stats,
        }
    }
}

// ===== Binary checks =====

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VisitedAnywhereAttributes {
    pub visited_countries: Vec<String>,
    pub count: usize,
    pub person: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BinarySensorState<A> {
    pub name: String,
    pub is_on: bool,
    pub attributes: Option<A>,
}

/// On when the person has at least one manually tagged country.
pub struct VisitedAnywhereSensor {
    reader: Arc<dyn StateReader>,
    person: String,
}

impl VisitedAnywhereSensor {
    pub fn new(reader: Arc<dyn StateReader>, person: impl Into<String>) -> Self {
        Self {
            reader,
            person: person.into(),
        }
    }

    pub async fn state(&self) -> BinarySensorState<VisitedAnywhereAttributes> {
        let attributes = self
            .reader
            .current_state(&self.person)
            .await
            .map(|s| VisitedAnywhereAttributes {
                count: s.attributes.visited_countries.len(),
                visited_countries: s.attributes.visited_countries,
                person: self.person.clone(),
            });

        BinarySensorState {
            name: format!("Has Visited Countries ({})", self.person),
            is_on: attributes.as_ref().is_some_and(|a| a.count > 0),
            attributes,
        }
    }
}

/// On when the person has tagged one specific country.
pub struct CountryVisitedSensor {
    reader: Arc<dyn StateReader>,
    person: String,
    country: CountryCode,
}

impl CountryVisitedSensor {
    pub fn new(reader: Arc<dyn StateReader>, person: impl Into<String>, country: CountryCode) -> Self {
        Self {
            reader,
            person: person.into(),
            country,
        }
    }

    pub async fn state(&self) -> BinarySensorState<()> {
        let is_on = match self.reader.current_state(&self.person).await {
            Some(s) => s
                .attributes
                .visited_countries
                .iter()
                .filter_map(|c| CountryCode::parse(c))
                .any(|c| c == self.country),
            None => false,
        };

        BinarySensorState {
            name: format!("Visited {} ({})", self.country.display_name(), self.person),
            is_on,
            attributes: None,
        }
    }
}
