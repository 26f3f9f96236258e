//! Per-station price selection and cross-station ordering.
//!
//! Both steps are pure. Sorting is stable, so stations with equal keys keep
//! the candidate order the store produced.

use crate::domain::price::latest_per_tag;
use crate::domain::{EnrichedStation, PriceObservation, PriceTuple, SortKey};

/// Turns a station's observations into the tuples a client asked for.
///
/// Tags outside `fuel_types` are dropped (an empty list keeps every tag).
/// With `latest_only`, exactly one tuple per tag remains.
#[must_use]
pub fn select_prices(
    observations: Vec<PriceObservation>,
    fuel_types: &[String],
    latest_only: bool,
) -> Vec<PriceTuple> {
    let wanted: Vec<PriceObservation> = observations
        .into_iter()
        .filter(|obs| fuel_types.is_empty() || fuel_types.iter().any(|t| *t == obs.tag))
        .collect();

    let selected = if latest_only {
        latest_per_tag(wanted)
    } else {
        wanted
    };
    selected.iter().map(PriceTuple::from).collect()
}

/// Orders stations in place.
///
/// Price keys use each station's minimum retained price; a station without
/// prices counts as infinitely expensive. `newest` compares the latest
/// report timestamp lexically and puts stations without prices last.
pub fn sort_stations(stations: &mut [EnrichedStation], sort: SortKey) {
    match sort {
        SortKey::PriceAsc => {
            stations.sort_by(|a, b| price_key(a).total_cmp(&price_key(b)));
        }
        SortKey::PriceDesc => {
            stations.sort_by(|a, b| price_key(b).total_cmp(&price_key(a)));
        }
        SortKey::Newest => {
            stations.sort_by(|a, b| b.newest_timestamp().cmp(&a.newest_timestamp()));
        }
    }
}

fn price_key(station: &EnrichedStation) -> f64 {
    station.min_price().unwrap_or(f64::INFINITY)
}
