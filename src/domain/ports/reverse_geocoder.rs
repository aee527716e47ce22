//! Reverse Geocoder Port
//!
//! Defines the interface for resolving GPS coordinates to a country.

use crate::domain::entities::Coordinate;
use crate::domain::value_objects::CountryCode;
use async_trait::async_trait;
use thiserror::Error;

/// Errors a geocoding backend can report for a single request.
///
/// None of these are fatal: the resolution service treats every variant
/// as "no country found" and caches it as such.
#[derive(Debug, Error)]
pub enum GeocodeError {
    #[error("geocoding request timed out")]
    Timeout,

    #[error("geocoding connection failed: {0}")]
    Connection(String),

    #[error("geocoding service returned HTTP {0}")]
    Status(u16),

    #[error("geocoding response could not be parsed: {0}")]
    Parse(String),
}

/// Resolver for GPS coordinates to a country code.
///
/// This is an outbound port over a reverse-geocoding service.
/// Each call performs exactly one request against the backend.
#[async_trait]
pub trait ReverseGeocoder: Send + Sync {
    /// Resolve a coordinate to its country.
    ///
    /// Returns `Ok(None)` when the service answered but gave no usable
    /// two-letter country code (open sea, malformed code, ...).
    async fn country_code(&self, coordinate: Coordinate)
        -> Result<Option<CountryCode>, GeocodeError>;
}
