//! Country Aggregator Service
//!
//! Pure domain logic for merging manual and detected countries into the
//! visited view of a person. This service has NO external dependencies.

use crate::domain::entities::{CacheKey, Coordinate, VisitedCountries};
use crate::domain::value_objects::{CountryCode, CurrentCountryPolicy};
use std::collections::{BTreeSet, HashSet};

/// Distinct history coordinates picked for one aggregation pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistorySelection {
    /// Coordinates to resolve, one per cache cell, in first-seen order.
    pub coordinates: Vec<Coordinate>,
    /// Distinct cells found before the cap was applied.
    pub distinct: usize,
    /// Selected cells already in the cache; these do not count against the cap.
    pub cached: usize,
    /// Uncached cells left for a later pass because of the cap.
    pub skipped: usize,
}

/// Aggregator for the visited-country set.
///
/// The merge is a plain union:
/// 1. Manually tagged codes
/// 2. Codes resolved from history samples
/// 3. The code at the current position (subject to the policy)
///
/// The result is deduplicated and sorted lexicographically.
pub struct CountryAggregator;

impl CountryAggregator {
    /// Pick the history coordinates worth resolving.
    ///
    /// Samples falling into the same cache cell collapse into one. Cells
    /// for which `is_cached` holds are always selected; at most `cap`
    /// uncached cells are added on top. Each pass therefore caches up to
    /// `cap` new cells, so later passes reach the cells skipped now.
    pub fn select_history<F>(samples: &[Coordinate], cap: usize, is_cached: F) -> HistorySelection
    where
        F: Fn(&Coordinate) -> bool,
    {
        let mut seen: HashSet<CacheKey> = HashSet::with_capacity(samples.len());
        let mut selection = HistorySelection::default();
        let mut uncached = 0;

        for sample in samples {
            if !seen.insert(sample.cache_key()) {
                continue;
            }
            selection.distinct += 1;

            if is_cached(sample) {
                selection.cached += 1;
                selection.coordinates.push(*sample);
            } else if uncached < cap {
                uncached += 1;
                selection.coordinates.push(*sample);
            } else {
                selection.skipped += 1;
            }
        }

        selection
    }

    /// Normalize manually tagged codes, dropping anything malformed.
    pub fn normalize_manual<S: AsRef<str>>(codes: &[S]) -> Vec<CountryCode> {
        let mut normalized = BTreeSet::new();
        for raw in codes {
            match CountryCode::parse(raw.as_ref()) {
                Some(code) => {
                    normalized.insert(code);
                }
                None => {
                    tracing::debug!("ignoring malformed manual country code {:?}", raw.as_ref());
                }
            }
        }
        normalized.into_iter().collect()
    }

    /// Merge the three sources into the visited view.
    pub fn merge(
        manual: &[CountryCode],
        detected: &BTreeSet<CountryCode>,
        current: Option<CountryCode>,
        policy: CurrentCountryPolicy,
    ) -> VisitedCountries {
        let mut visited: BTreeSet<CountryCode> = manual.iter().cloned().collect();
        visited.extend(detected.iter().cloned());

        if policy == CurrentCountryPolicy::IncludeInVisited {
            if let Some(code) = &current {
                visited.insert(code.clone());
            }
        }

        let visited_codes: Vec<CountryCode> = visited.into_iter().collect();
        let names = visited_codes.iter().map(CountryCode::display_name).collect();

        VisitedCountries {
            count: visited_codes.len(),
            visited_codes,
            names,
            current_country: current,
            manual_countries: manual.to_vec(),
            detected_from_history: detected.iter().cloned().collect(),
        }
    }
}
