mod coordinate_cache;
mod reverse_geocoder;
mod state_store;

pub use coordinate_cache::CoordinateCache;
pub use reverse_geocoder::{GeocodeError, ReverseGeocoder};
pub use state_store::{HistoryReader, StateError, StateReader, StateWriter};
