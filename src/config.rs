use crate::domain::value_objects::CurrentCountryPolicy;
use serde::Deserialize;

/// Longest history window accepted from the environment (ten years).
const MAX_HISTORY_DAYS: i64 = 3650;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    // Tracked person and host state
    pub person: String,
    pub state_path: String,
    pub poll_secs: u64,
    pub debug: bool,

    // Reverse geocoding
    pub geocoding_enabled: bool,
    pub nominatim_url: String,
    pub user_agent: String,
    pub request_timeout_secs: u64,
    pub min_interval_ms: u64,

    // Aggregation
    pub history_cap: usize,
    pub history_days: i64,
    pub current_policy: CurrentCountryPolicy,

    // Manual edits applied at startup, and per-country checks
    pub add_countries: Vec<String>,
    pub remove_countries: Vec<String>,
    pub watch_countries: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            person: "person.me".to_string(),
            state_path: "states.json".to_string(),
            poll_secs: 0,
            debug: false,
            geocoding_enabled: true,
            nominatim_url: "https://nominatim.openstreetmap.org".to_string(),
            user_agent: "home-assistant-countries-visited".to_string(),
            request_timeout_secs: 10,
            min_interval_ms: 1100,
            history_cap: 100,
            history_days: 30,
            current_policy: CurrentCountryPolicy::IncludeInVisited,
            add_countries: Vec::new(),
            remove_countries: Vec::new(),
            watch_countries: Vec::new(),
        }
    }
}

impl Config {
    /// History window for aggregation; out-of-range values use the default.
    pub fn history_window(&self) -> chrono::Duration {
        chrono::Duration::try_days(self.history_days)
            .filter(|_| (1..=MAX_HISTORY_DAYS).contains(&self.history_days))
            .unwrap_or_else(|| chrono::Duration::days(30))
    }
}

pub fn load_config() -> anyhow::Result<Config> {
    let person = std::env::var("COUNTRIES_VISITED_PERSON")
        .unwrap_or_else(|_| "person.me".to_string());

    let state_path = std::env::var("COUNTRIES_VISITED_STATE_PATH")
        .unwrap_or_else(|_| "states.json".to_string());

    let poll_secs = std::env::var("COUNTRIES_VISITED_POLL_SECS")
        .unwrap_or_else(|_| "0".to_string())
        .parse()
        .unwrap_or(0);

    let debug = std::env::var("DEBUG").is_ok();

    // Reverse geocoding
    let geocoding_enabled = std::env::var("COUNTRIES_VISITED_GEOCODING_ENABLED")
        .map(|v| v == "1" || v.to_lowercase() == "true")
        .unwrap_or(true);

    let nominatim_url = std::env::var("COUNTRIES_VISITED_NOMINATIM_URL")
        .unwrap_or_else(|_| "https://nominatim.openstreetmap.org".to_string());

    let user_agent = std::env::var("COUNTRIES_VISITED_USER_AGENT")
        .unwrap_or_else(|_| "home-assistant-countries-visited".to_string());

    let request_timeout_secs = std::env::var("COUNTRIES_VISITED_REQUEST_TIMEOUT_SECS")
        .unwrap_or_else(|_| "10".to_string())
        .parse()
        .unwrap_or(10);

    let min_interval_ms = std::env::var("COUNTRIES_VISITED_MIN_INTERVAL_MS")
        .unwrap_or_else(|_| "1100".to_string())
        .parse()
        .unwrap_or(1100);

    // Aggregation
    let history_cap = std::env::var("COUNTRIES_VISITED_HISTORY_CAP")
        .unwrap_or_else(|_| "100".to_string())
        .parse()
        .unwrap_or(100);

    let history_days = std::env::var("COUNTRIES_VISITED_HISTORY_DAYS")
        .unwrap_or_else(|_| "30".to_string())
        .parse()
        .ok()
        .filter(|d| (1..=MAX_HISTORY_DAYS).contains(d))
        .unwrap_or(30);

    let current_policy = std::env::var("COUNTRIES_VISITED_CURRENT_POLICY")
        .map(|v| CurrentCountryPolicy::from_str(&v))
        .unwrap_or_default();

    let add_countries = code_list("COUNTRIES_VISITED_ADD");
    let remove_countries = code_list("COUNTRIES_VISITED_REMOVE");
    let watch_countries = code_list("COUNTRIES_VISITED_WATCH");

    Ok(Config {
        person,
        state_path,
        poll_secs,
        debug,
        geocoding_enabled,
        nominatim_url,
        user_agent,
        request_timeout_secs,
        min_interval_ms,
        history_cap,
        history_days,
        current_policy,
        add_countries,
        remove_countries,
        watch_countries,
    })
}

/// Comma-separated list from an env var; blank entries are skipped.
fn code_list(var: &str) -> Vec<String> {
    std::env::var(var)
        .map(|v| {
            v.split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        })
        .unwrap_or_default()
}
