//! countries-visited Library
//!
//! Resolves GPS coordinates to ISO country codes through a rate-limited,
//! cached reverse geocoder and aggregates a person's visited countries
//! from manual tags, location history and current position.
//!
//! ```
//! use countries_visited::CountryCode;
//!
//! let code = CountryCode::parse(" fr ").unwrap();
//! assert_eq!(code.as_str(), "FR");
//! assert_eq!(code.display_name(), "France");
//! ```

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;

// Re-export commonly used types
pub use application::{
    AggregationSettings, CountriesVisitedService, ManualCountriesService, ResolutionService,
};
pub use config::load_config;
pub use domain::entities::{CacheStats, Coordinate, StateRecord, VisitedCountries};
pub use domain::ports::{
    CoordinateCache, GeocodeError, HistoryReader, ReverseGeocoder, StateError, StateReader,
    StateWriter,
};
pub use domain::services::CountryAggregator;
pub use domain::value_objects::{CountryCode, CurrentCountryPolicy};
pub use infrastructure::{RateLimiter, StatsPublisher, Subscription};
