//! countries-visited - Visited countries from GPS history
//!
//! This is the composition root that wires together all the components.

use anyhow::Context;
use countries_visited::adapters::outbound::{
    DashMapCoordinateCache, InMemoryStateStore, NominatimConfig, NominatimGeocoder,
};
use countries_visited::application::{
    AggregationSettings, CacheStatisticsSensor, CountriesVisitedSensor, CountriesVisitedService,
    CountryVisitedSensor, ManualCountriesService, ResolutionService, VisitedAnywhereSensor,
};
use countries_visited::config::{load_config, Config};
use countries_visited::domain::ports::ReverseGeocoder;
use countries_visited::domain::value_objects::CountryCode;
use countries_visited::infrastructure::{
    shutdown_signal, RateLimiter, ShutdownController, StatsPublisher,
};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::fmt::format::FmtSpan;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration from environment
    let cfg = load_config()?;

    // Setup logging
    let log_level = if cfg.debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_span_events(FmtSpan::CLOSE)
        .init();

    tracing::info!(
        "starting countries-visited person={} state={} policy={}",
        cfg.person,
        cfg.state_path,
        cfg.current_policy
    );

    // ===== COMPOSITION ROOT =====

    // 1. Outbound adapters
    let store = Arc::new(
        InMemoryStateStore::from_json_file(&cfg.state_path)
            .with_context(|| format!("failed to load host state from {}", cfg.state_path))?,
    );

    // Manual edits requested through the environment
    let manual = ManualCountriesService::new(store.clone(), store.clone());
    for code in &cfg.add_countries {
        match manual.add_country(&cfg.person, code).await {
            Ok(changed) => tracing::debug!("add {} to {}: changed={}", code, cfg.person, changed),
            Err(e) => tracing::warn!("cannot add {} to {}: {}", code, cfg.person, e),
        }
    }
    for code in &cfg.remove_countries {
        match manual.remove_country(&cfg.person, code).await {
            Ok(changed) => {
                tracing::debug!("remove {} from {}: changed={}", code, cfg.person, changed)
            }
            Err(e) => tracing::warn!("cannot remove {} from {}: {}", code, cfg.person, e),
        }
    }

    let cache = Arc::new(DashMapCoordinateCache::new());
    let geocoder = build_geocoder(&cfg);
    let rate_limiter = Arc::new(RateLimiter::with_interval(Duration::from_millis(
        cfg.min_interval_ms,
    )));

    // 2. Application services
    let resolver = Arc::new(ResolutionService::new(
        cache,
        geocoder,
        rate_limiter,
        StatsPublisher::new(),
    ));

    let service = Arc::new(CountriesVisitedService::new(
        resolver.clone(),
        store.clone(),
        store.clone(),
        AggregationSettings {
            history_cap: cfg.history_cap,
            history_window: cfg.history_window(),
            current_policy: cfg.current_policy,
        },
    ));

    // 3. Sensors
    let visited_sensor = CountriesVisitedSensor::new(service, cfg.person.clone());
    let stats_sensor = CacheStatisticsSensor::new(&resolver);
    let anywhere_sensor = VisitedAnywhereSensor::new(store.clone(), cfg.person.clone());
    let country_sensors: Vec<CountryVisitedSensor> = cfg
        .watch_countries
        .iter()
        .filter_map(|raw| {
            let code = CountryCode::parse(raw);
            if code.is_none() {
                tracing::warn!("ignoring invalid watched country code {:?}", raw);
            }
            code
        })
        .map(|code| CountryVisitedSensor::new(store.clone(), cfg.person.clone(), code))
        .collect();

    // 4. Run once, or poll until a shutdown signal arrives
    let controller = ShutdownController::new();
    tokio::spawn(shutdown_signal(controller.clone()));

    loop {
        let visited = visited_sensor.update().await;
        println!("{}", serde_json::to_string_pretty(&visited)?);
        println!("{}", serde_json::to_string_pretty(&stats_sensor.state())?);
        println!(
            "{}",
            serde_json::to_string_pretty(&anywhere_sensor.state().await)?
        );
        for sensor in &country_sensors {
            println!("{}", serde_json::to_string_pretty(&sensor.state().await)?);
        }

        if cfg.poll_secs == 0 {
            break;
        }

        tokio::select! {
            _ = tokio::time::sleep(Duration::from_secs(cfg.poll_secs)) => {}
            _ = controller.wait() => break,
        }
    }

    resolver.shutdown();
    Ok(())
}

/// Build the Nominatim gateway, or `None` when geocoding is off or the
/// client cannot be constructed.
fn build_geocoder(cfg: &Config) -> Option<Arc<dyn ReverseGeocoder>> {
    if !cfg.geocoding_enabled {
        tracing::info!("reverse geocoding disabled");
        return None;
    }

    let config = NominatimConfig {
        base_url: cfg.nominatim_url.clone(),
        user_agent: cfg.user_agent.clone(),
        timeout: Duration::from_secs(cfg.request_timeout_secs),
    };

    match NominatimGeocoder::new(&config) {
        Ok(g) => {
            tracing::info!("reverse geocoding via {}", cfg.nominatim_url);
            Some(Arc::new(g) as Arc<dyn ReverseGeocoder>)
        }
        Err(e) => {
            tracing::error!("failed to build geocoding client: {}", e);
            None
        }
    }
}
