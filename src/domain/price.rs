//! Price observations and the single definition of "latest".
//!
//! Observations are append-only: a refresh never edits a row, it writes new
//! ones. Whenever one observation per fuel tag is needed, both the store and
//! the search reducer select it with [`recency_cmp`], so the two can never
//! disagree on which row is the latest.

use std::cmp::Ordering;
use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// One persisted price report for one fuel tag at one station.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PriceObservation {
    /// Store-assigned row id. Increases with insertion order.
    pub id: i64,
    /// Station the price belongs to.
    pub station_id: String,
    /// Fuel grade tag (e.g. `"95"`, `"dsl"`).
    pub tag: String,
    /// Reported price.
    pub price: f64,
    /// Report timestamp exactly as supplied by the provider.
    pub reported_at: String,
    /// Reserved, always `0.0` on insert.
    pub delta: f64,
    /// Identifier of the user who reported the price upstream.
    pub reporter: String,
    /// When this row was written locally.
    pub persisted_at: DateTime<Utc>,
}

/// An observation that has not been written yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewPriceObservation {
    /// Station the price belongs to.
    pub station_id: String,
    /// Fuel grade tag.
    pub tag: String,
    /// Reported price.
    pub price: f64,
    /// Upstream report timestamp, kept verbatim.
    pub reported_at: String,
    /// Upstream reporter id.
    pub reporter: String,
    /// Local persistence timestamp.
    pub persisted_at: DateTime<Utc>,
}

/// Price tuple returned to search clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PriceTuple {
    /// Fuel grade tag.
    pub tag: String,
    /// Reported price.
    pub value: f64,
    /// Upstream report timestamp.
    pub timestamp: String,
}

impl From<&PriceObservation> for PriceTuple {
    fn from(obs: &PriceObservation) -> Self {
        Self {
            tag: obs.tag.clone(),
            value: obs.price,
            timestamp: obs.reported_at.clone(),
        }
    }
}

/// Orders two observations by recency.
///
/// Greater persistence timestamp wins; ties fall back to the upstream report
/// timestamp (plain lexical comparison), then to insertion order.
#[must_use]
pub fn recency_cmp(a: &PriceObservation, b: &PriceObservation) -> Ordering {
    a.persisted_at
        .cmp(&b.persisted_at)
        .then_with(|| a.reported_at.cmp(&b.reported_at))
        .then_with(|| a.id.cmp(&b.id))
}

/// Keeps exactly one observation per tag, the latest by [`recency_cmp`].
///
/// Output order follows the first appearance of each tag in the input.
#[must_use]
pub fn latest_per_tag(observations: Vec<PriceObservation>) -> Vec<PriceObservation> {
    let mut order: Vec<String> = Vec::new();
    let mut latest: HashMap<String, PriceObservation> = HashMap::new();

    for obs in observations {
        match latest.get(&obs.tag) {
            Some(current) if recency_cmp(&obs, current) != Ordering::Greater => {}
            Some(_) => {
                latest.insert(obs.tag.clone(), obs);
            }
            None => {
                order.push(obs.tag.clone());
                latest.insert(obs.tag.clone(), obs);
            }
        }
    }

    order
        .into_iter()
        .filter_map(|tag| latest.remove(&tag))
        .collect()
}

/// Most recent persistence timestamp among `observations`.
#[must_use]
pub fn last_persisted_at(observations: &[PriceObservation]) -> Option<DateTime<Utc>> {
    observations.iter().map(|obs| obs.persisted_at).max()
}
