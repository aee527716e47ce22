//! Nominatim Reverse Geocoder
//!
//! Implements ReverseGeocoder using the OpenStreetMap Nominatim API.
//! The public instance allows one request per second, which the
//! resolution service enforces through its rate limiter.

use crate::domain::entities::Coordinate;
use crate::domain::ports::{GeocodeError, ReverseGeocoder};
use crate::domain::value_objects::CountryCode;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

/// Connection settings for a Nominatim instance.
#[derive(Debug, Clone)]
pub struct NominatimConfig {
    /// Base URL, without trailing `/reverse`
    pub base_url: String,
    /// User agent sent with every request (required by the usage policy)
    pub user_agent: String,
    /// Per-request timeout
    pub timeout: Duration,
}

impl Default for NominatimConfig {
    fn default() -> Self {
        Self {
            base_url: "https://nominatim.openstreetmap.org".to_string(),
            user_agent: "home-assistant-countries-visited".to_string(),
            timeout: Duration::from_secs(10),
        }
    }
}

/// Nominatim reverse geocoder.
pub struct NominatimGeocoder {
    client: Client,
    reverse_url: String,
}

impl NominatimGeocoder {
    /// Build a geocoder for the given instance.
    pub fn new(config: &NominatimConfig) -> Result<Self, GeocodeError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| GeocodeError::Connection(e.to_string()))?;

        Ok(Self {
            client,
            reverse_url: format!("{}/reverse", config.base_url.trim_end_matches('/')),
        })
    }
}

/// Raw `/reverse` response. Nominatim answers points it cannot place
/// (open sea, poles) with `{"error": "..."}` and a 200 status.
#[derive(Debug, Deserialize)]
struct ReverseResponse {
    #[serde(default)]
    address: Option<Address>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Address {
    #[serde(default)]
    country_code: Option<String>,
}

impl ReverseResponse {
    fn country_code(self) -> Option<CountryCode> {
        if let Some(err) = self.error {
            tracing::debug!("nominatim could not place coordinate: {}", err);
            return None;
        }

        let raw = self.address?.country_code?;
        let code = CountryCode::parse(&raw);
        if code.is_none() {
            tracing::debug!("invalid country code from geocoding: {:?}", raw);
        }
        code
    }
}

#[async_trait]
impl ReverseGeocoder for NominatimGeocoder {
    async fn country_code(
        &self,
        coordinate: Coordinate,
    ) -> Result<Option<CountryCode>, GeocodeError> {
        let params = [
            ("lat", coordinate.latitude.to_string()),
            ("lon", coordinate.longitude.to_string()),
            ("format", "jsonv2".to_string()),
            ("zoom", "3".to_string()),
            ("addressdetails", "1".to_string()),
        ];

        let response = self
            .client
            .get(&self.reverse_url)
            .query(&params)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GeocodeError::Timeout
                } else {
                    GeocodeError::Connection(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(GeocodeError::Status(status.as_u16()));
        }

        let body: ReverseResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                GeocodeError::Timeout
            } else {
                GeocodeError::Parse(e.to_string())
            }
        })?;

        Ok(body.country_code())
    }
}
