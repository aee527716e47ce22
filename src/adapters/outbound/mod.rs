mod dashmap_coordinate_cache;
mod in_memory_state_store;
mod nominatim_geocoder;

pub use dashmap_coordinate_cache::DashMapCoordinateCache;
pub use in_memory_state_store::{InMemoryStateStore, StateSnapshot};
pub use nominatim_geocoder::{NominatimConfig, NominatimGeocoder};
