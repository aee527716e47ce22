//! Application Layer
//!
//! Use cases orchestrating the domain through its ports.

pub mod countries_service;
pub mod manual_countries;
pub mod resolution_service;
pub mod sensors;

pub use countries_service::{AggregationSettings, CountriesVisitedService};
pub use manual_countries::ManualCountriesService;
pub use resolution_service::ResolutionService;
pub use sensors::{
    CacheStatisticsSensor, CountriesVisitedSensor, CountryVisitedSensor, VisitedAnywhereSensor,
};
