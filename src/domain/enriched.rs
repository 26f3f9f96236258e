//! Request-scoped search results and their output projections.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{GeoPoint, PriceTuple, Station};

/// A station together with the prices selected for one request.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedStation {
    /// Station record.
    pub station: Station,
    /// Selected price tuples.
    pub prices: Vec<PriceTuple>,
}

impl EnrichedStation {
    /// Minimum retained price, if any.
    #[must_use]
    pub fn min_price(&self) -> Option<f64> {
        self.prices.iter().map(|p| p.value).reduce(f64::min)
    }

    /// Latest report timestamp among retained prices (lexical maximum).
    #[must_use]
    pub fn newest_timestamp(&self) -> Option<&str> {
        self.prices.iter().map(|p| p.timestamp.as_str()).max()
    }

    /// Shapes the result into its output form.
    #[must_use]
    pub fn project(self, simplified: bool) -> StationView {
        if simplified {
            StationView::Simplified(SimplifiedStation {
                name: self.station.name,
                brand: self.station.brand,
                location: self.station.location,
                prices: self.prices,
            })
        } else {
            StationView::Full(FullStation {
                station: self.station,
                prices: self.prices,
            })
        }
    }
}

/// Full projection: every station field plus the selected prices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct FullStation {
    /// Station record.
    #[serde(flatten)]
    pub station: Station,
    /// Selected prices.
    pub prices: Vec<PriceTuple>,
}

/// Simplified projection for lightweight clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SimplifiedStation {
    /// Display name.
    pub name: String,
    /// Brand.
    pub brand: String,
    /// Coordinate.
    pub location: GeoPoint,
    /// Selected prices.
    pub prices: Vec<PriceTuple>,
}

/// One element of a search response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(untagged)]
pub enum StationView {
    /// Full projection.
    Full(FullStation),
    /// Simplified projection.
    Simplified(SimplifiedStation),
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::geo::tests::station_at;

    fn tuple(tag: &str, value: f64, timestamp: &str) -> PriceTuple {
        PriceTuple {
            tag: tag.to_string(),
            value,
            timestamp: timestamp.to_string(),
        }
    }

    #[test]
    fn min_and_newest_over_prices() {
        let enriched = EnrichedStation {
            station: station_at("a", 60.0, 25.0),
            prices: vec![
                tuple("95", 1.9, "2024-06-01T10:00:00Z"),
                tuple("dsl", 1.7, "2024-06-02T08:00:00Z"),
            ],
        };
        assert_eq!(enriched.min_price(), Some(1.7));
        assert_eq!(enriched.newest_timestamp(), Some("2024-06-02T08:00:00Z"));
    }

    #[test]
    fn empty_prices_have_no_extremes() {
        let enriched = EnrichedStation {
            station: station_at("a", 60.0, 25.0),
            prices: Vec::new(),
        };
        assert!(enriched.min_price().is_none());
        assert!(enriched.newest_timestamp().is_none());
    }

    #[test]
    fn full_projection_flattens_station_fields() {
        let enriched = EnrichedStation {
            station: station_at("a", 60.0, 25.0),
            prices: vec![tuple("95", 1.9, "t")],
        };
        let json = serde_json::to_value(enriched.project(false)).unwrap_or_default();
        assert_eq!(json.get("id").and_then(|v| v.as_str()), Some("a"));
        assert!(json.get("address").is_some());
        assert_eq!(json.get("prices").and_then(|v| v.as_array()).map(Vec::len), Some(1));
    }

    #[test]
    fn simplified_projection_has_four_fields() {
        let enriched = EnrichedStation {
            station: station_at("a", 60.0, 25.0),
            prices: Vec::new(),
        };
        let json = serde_json::to_value(enriched.project(true)).unwrap_or_default();
        let Some(object) = json.as_object() else {
            panic!("expected object");
        };
        let mut keys: Vec<&str> = object.keys().map(String::as_str).collect();
        keys.sort_unstable();
        assert_eq!(keys, vec!["brand", "location", "name", "prices"]);
    }
}
