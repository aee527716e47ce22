//! Value Objects - Immutable domain primitives
//!
//! Value objects are identified by their value rather than identity.
//! They are immutable and can be freely shared.

use serde::{Deserialize, Serialize};
use std::fmt;

/// ISO 3166-1 alpha-2 country code, always uppercase.
///
/// Construction goes through [`CountryCode::parse`], so a value of this type
/// is guaranteed to be exactly two ASCII letters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CountryCode(String);

impl CountryCode {
    /// Parse a country code from provider or user input.
    ///
    /// Surrounding whitespace is ignored and the result is uppercased.
    /// Returns None unless the input is exactly two ASCII letters.
    ///
    /// # Examples
    /// ```
    /// use countries_visited::CountryCode;
    ///
    /// assert_eq!(CountryCode::parse(" fr ").unwrap().as_str(), "FR");
    /// assert!(CountryCode::parse("usa").is_none());
    /// ```
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.len() != 2 || !trimmed.chars().all(|c| c.is_ascii_alphabetic()) {
            return None;
        }
        Some(Self(trimmed.to_ascii_uppercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Human readable country name, falling back to the code itself.
    pub fn display_name(&self) -> String {
        country_name(&self.0)
            .map(str::to_string)
            .unwrap_or_else(|| self.0.clone())
    }
}

impl fmt::Display for CountryCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for CountryCode {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value).ok_or_else(|| format!("invalid country code: {value:?}"))
    }
}

impl From<CountryCode> for String {
    fn from(code: CountryCode) -> Self {
        code.0
    }
}

/// Map an uppercase country code to its display name.
///
/// The table covers the countries most commonly tracked; anything else
/// is displayed as its code.
pub fn country_name(code: &str) -> Option<&'static str> {
    let name = match code {
        "US" => "United States",
        "GB" => "United Kingdom",
        "DE" => "Germany",
        "FR" => "France",
        "ES" => "Spain",
        "IT" => "Italy",
        "RU" => "Russia",
        "CN" => "China",
        "JP" => "Japan",
        "AU" => "Australia",
        "CA" => "Canada",
        "BR" => "Brazil",
        "MX" => "Mexico",
        "IN" => "India",
        "KR" => "South Korea",
        "NL" => "Netherlands",
        "BE" => "Belgium",
        "CH" => "Switzerland",
        "AT" => "Austria",
        "PT" => "Portugal",
        "SE" => "Sweden",
        "NO" => "Norway",
        "FI" => "Finland",
        "DK" => "Denmark",
        "PL" => "Poland",
        "CZ" => "Czech Republic",
        "HU" => "Hungary",
        "GR" => "Greece",
        "TR" => "Turkey",
        "EG" => "Egypt",
        "ZA" => "South Africa",
        "AE" => "United Arab Emirates",
        "TH" => "Thailand",
        "SG" => "Singapore",
        "MY" => "Malaysia",
        "ID" => "Indonesia",
        "PH" => "Philippines",
        "VN" => "Vietnam",
        "NZ" => "New Zealand",
        "IL" => "Israel",
        "SA" => "Saudi Arabia",
        "QA" => "Qatar",
        "KW" => "Kuwait",
        _ => return None,
    };
    Some(name)
}

/// Whether a country detected at the person's current position joins the
/// visited set or is only reported as `current_country`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CurrentCountryPolicy {
    /// The current country counts as visited.
    IncludeInVisited,
    /// The current country is shown but does not extend the visited set.
    DisplayOnly,
}

impl CurrentCountryPolicy {
    /// Parse a policy from its config string.
    pub fn from_str(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "display" | "display_only" => Self::DisplayOnly,
            _ => Self::IncludeInVisited, // fallback
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::IncludeInVisited => "include",
            Self::DisplayOnly => "display",
        }
    }
}

impl Default for CurrentCountryPolicy {
    fn default() -> Self {
        Self::IncludeInVisited
    }
}

impl fmt::Display for CurrentCountryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
