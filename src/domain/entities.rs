//! Domain Entities - Core business objects
//!
//! These entities represent the core concepts of the countries-visited domain.
//! They carry no I/O and contain only business logic.

use crate::domain::value_objects::CountryCode;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A GPS position in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// True when both components are finite and inside the WGS84 range.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && self.latitude.abs() <= 90.0
            && self.longitude.abs() <= 180.0
    }

    /// Quantize to the cache grid (2 decimal places, roughly 1 km).
    pub fn cache_key(&self) -> CacheKey {
        CacheKey::from_coordinate(self)
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.latitude, self.longitude)
    }
}

/// Coordinate rounded to hundredths of a degree.
///
/// Stored as integer hundredths so it can be hashed and compared exactly.
/// Every raw coordinate that rounds to the same pair shares one cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey {
    lat_centi: i64,
    lon_centi: i64,
}

impl CacheKey {
    pub fn from_coordinate(coordinate: &Coordinate) -> Self {
        Self {
            lat_centi: (coordinate.latitude * 100.0).round() as i64,
            lon_centi: (coordinate.longitude * 100.0).round() as i64,
        }
    }

    pub fn latitude(&self) -> f64 {
        self.lat_centi as f64 / 100.0
    }

    pub fn longitude(&self) -> f64 {
        self.lon_centi as f64 / 100.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.2}, {:.2})", self.latitude(), self.longitude())
    }
}

/// Outcome of a resolution attempt, as remembered by the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheEntry {
    /// The coordinate resolved to a country.
    Resolved(CountryCode),
    /// Resolution was attempted and yielded no country.
    Unresolved,
}

impl CacheEntry {
    pub fn country(&self) -> Option<&CountryCode> {
        match self {
            Self::Resolved(code) => Some(code),
            Self::Unresolved => None,
        }
    }

    pub fn into_country(self) -> Option<CountryCode> {
        match self {
            Self::Resolved(code) => Some(code),
            Self::Unresolved => None,
        }
    }
}

impl From<Option<CountryCode>> for CacheEntry {
    fn from(value: Option<CountryCode>) -> Self {
        match value {
            Some(code) => Self::Resolved(code),
            None => Self::Unresolved,
        }
    }
}

/// Read-only snapshot of the geocoding cache counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheStats {
    pub cache_size: usize,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub api_calls: u64,
    pub total_requests: u64,
    /// Percentage of requests served from cache, two decimals.
    pub hit_rate: f64,
}

impl CacheStats {
    /// Build a snapshot from raw counters, deriving total and hit rate.
    pub fn from_counters(cache_size: usize, hits: u64, misses: u64, api_calls: u64) -> Self {
        let total_requests = hits + misses;
        let hit_rate = if total_requests > 0 {
            (hits as f64 / total_requests as f64 * 100.0 * 100.0).round() / 100.0
        } else {
            0.0
        };

        Self {
            cache_size,
            cache_hits: hits,
            cache_misses: misses,
            api_calls,
            total_requests,
            hit_rate,
        }
    }
}

/// Attributes carried by a host entity state.
///
/// Only the fields this crate reads are typed; everything else the host
/// attaches is kept verbatim in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StateAttributes {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    /// Manually tagged country codes, as stored by the host.
    #[serde(default)]
    pub visited_countries: Vec<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// One state of a host entity (current or historical).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateRecord {
    pub entity_id: String,
    /// Raw state value, e.g. `home`, `not_home` or a zone entity id.
    pub state: String,
    #[serde(default)]
    pub attributes: StateAttributes,
    #[serde(default = "Utc::now")]
    pub last_changed: DateTime<Utc>,
}

impl StateRecord {
    pub fn new(entity_id: impl Into<String>, state: impl Into<String>) -> Self {
        Self {
            entity_id: entity_id.into(),
            state: state.into(),
            attributes: StateAttributes::default(),
            last_changed: Utc::now(),
        }
    }

    pub fn with_coordinate(mut self, latitude: f64, longitude: f64) -> Self {
        self.attributes.latitude = Some(latitude);
        self.attributes.longitude = Some(longitude);
        self
    }

    pub fn with_visited(mut self, codes: &[&str]) -> Self {
        self.attributes.visited_countries = codes.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn with_last_changed(mut self, at: DateTime<Utc>) -> Self {
        self.last_changed = at;
        self
    }

    /// GPS position, when both latitude and longitude are present.
    pub fn coordinate(&self) -> Option<Coordinate> {
        match (self.attributes.latitude, self.attributes.longitude) {
            (Some(lat), Some(lon)) => Some(Coordinate::new(lat, lon)),
            _ => None,
        }
    }

    /// Zone entity id when the state value points at a zone.
    pub fn zone_entity(&self) -> Option<&str> {
        self.state
            .starts_with("zone.")
            .then_some(self.state.as_str())
    }
}

/// Merged visited-country view for one person.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct VisitedCountries {
    /// Deduplicated, lexicographically sorted codes.
    pub visited_codes: Vec<CountryCode>,
    pub count: usize,
    /// Display names aligned with `visited_codes`.
    pub names: Vec<String>,
    pub current_country: Option<CountryCode>,
    pub manual_countries: Vec<CountryCode>,
    pub detected_from_history: Vec<CountryCode>,
}

impl VisitedCountries {
    /// Result used when the person cannot be read at all.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn contains(&self, code: &CountryCode) -> bool {
        self.visited_codes.binary_search(code).is_ok()
    }

    pub fn is_empty(&self) -> bool {
        self.visited_codes.is_empty()
    }
}
