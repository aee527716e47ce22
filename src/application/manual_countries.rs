//! Manual Countries Service
//!
//! Edits the manually tagged `visited_countries` attribute of a person
//! entity. Codes are stored uppercase, sorted and deduplicated.

use crate::domain::ports::{StateError, StateReader, StateWriter};
use crate::domain::value_objects::CountryCode;
use std::collections::BTreeSet;
use std::sync::Arc;

pub struct ManualCountriesService {
    reader: Arc<dyn StateReader>,
    writer: Arc<dyn StateWriter>,
}

impl ManualCountriesService {
    pub fn new(reader: Arc<dyn StateReader>, writer: Arc<dyn StateWriter>) -> Self {
        Self { reader, writer }
    }

    /// Add a country to a person's manual list.
    ///
    /// Returns `Ok(false)` when the person is unknown or already has the code.
    pub async fn add_country(&self, person: &str, code: &str) -> Result<bool, StateError> {
        let code = parse_code(code)?;
        let Some(mut codes) = self.manual_codes(person).await else {
            return Ok(false);
        };

        if !codes.insert(code.as_str().to_string()) {
            return Ok(false);
        }

        tracing::info!("added {} to visited countries of {}", code, person);
        self.write(person, codes).await
    }

    /// Remove a country from a person's manual list.
    ///
    /// Returns `Ok(false)` when the person is unknown or does not have the code.
    pub async fn remove_country(&self, person: &str, code: &str) -> Result<bool, StateError> {
        let code = parse_code(code)?;
        let Some(mut codes) = self.manual_codes(person).await else {
            return Ok(false);
        };

        if !codes.remove(code.as_str()) {
            return Ok(false);
        }

        tracing::info!("removed {} from visited countries of {}", code, person);
        self.write(person, codes).await
    }

    /// Replace a person's manual list.
    ///
    /// Every code is validated before anything is written.
    pub async fn set_countries<S: AsRef<str>>(
        &self,
        person: &str,
        codes: &[S],
    ) -> Result<bool, StateError> {
        let mut wanted = BTreeSet::new();
        for code in codes {
            wanted.insert(parse_code(code.as_ref())?.as_str().to_string());
        }

        let Some(current) = self.manual_codes(person).await else {
            return Ok(false);
        };
        if current == wanted {
            return Ok(false);
        }

        tracing::info!("set visited countries of {} to {:?}", person, wanted);
        self.write(person, wanted).await
    }

    /// Current manual codes, normalized with malformed entries dropped;
    /// `None` when the person is unknown.
    async fn manual_codes(&self, person: &str) -> Option<BTreeSet<String>> {
        let state = self.reader.current_state(person).await;
        if state.is_none() {
            tracing::warn!("person entity {} not found", person);
        }
        state.map(|s| {
            s.attributes
                .visited_countries
                .iter()
                .filter_map(|raw| {
                    let code = CountryCode::parse(raw);
                    if code.is_none() {
                        tracing::debug!("dropping invalid stored country code {:?}", raw);
                    }
                    code
                })
                .map(|c| c.as_str().to_string())
                .collect()
        })
    }

    async fn write(&self, person: &str, codes: BTreeSet<String>) -> Result<bool, StateError> {
        self.writer
            .set_manual_countries(person, codes.into_iter().collect())
            .await?;
        Ok(true)
    }
}

fn parse_code(raw: &str) -> Result<CountryCode, StateError> {
    CountryCode::parse(raw).ok_or_else(|| StateError::InvalidCountryCode(raw.to_string()))
}
