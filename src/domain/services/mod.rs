mod country_aggregator;

pub use country_aggregator::{CountryAggregator, HistorySelection};
