//! Search request model shared by the API layer and the orchestrator.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{SearchArea, Station};
use crate::error::GatewayError;

/// Attribute filters evaluated by the store.
///
/// Empty lists and `None` mean "no constraint".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StationFilter {
    /// Exact names, matched case-insensitively. Results are ordered by the
    /// position of the matching name in this list.
    pub names: Vec<String>,
    /// Exact chains, matched case-insensitively.
    pub chains: Vec<String>,
    /// Case-insensitive substring of the city.
    pub city: Option<String>,
    /// Case-insensitive substring of the zipcode.
    pub zipcode: Option<String>,
}

impl StationFilter {
    /// Returns `true` if `station` satisfies every constraint.
    #[must_use]
    pub fn matches(&self, station: &Station) -> bool {
        if !self.names.is_empty() && self.name_rank(station).is_none() {
            return false;
        }
        if !self.chains.is_empty() {
            let chain = station.chain.to_lowercase();
            if !self.chains.iter().any(|c| c.to_lowercase() == chain) {
                return false;
            }
        }
        if let Some(city) = &self.city
            && !contains_folded(&station.address.city, city)
        {
            return false;
        }
        if let Some(zipcode) = &self.zipcode
            && !contains_folded(&station.address.zipcode, zipcode)
        {
            return false;
        }
        true
    }

    /// Position of the station's name in [`Self::names`], if listed.
    #[must_use]
    pub fn name_rank(&self, station: &Station) -> Option<usize> {
        let name = station.name.to_lowercase();
        self.names.iter().position(|n| n.to_lowercase() == name)
    }
}

fn contains_folded(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Result ordering requested by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    /// Cheapest minimum price first.
    PriceAsc,
    /// Most expensive minimum price first.
    PriceDesc,
    /// Most recently reported price first.
    Newest,
}

impl FromStr for SortKey {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "priceasc" => Ok(Self::PriceAsc),
            "pricedesc" => Ok(Self::PriceDesc),
            "newest" => Ok(Self::Newest),
            other => Err(GatewayError::InvalidRequest(format!(
                "unknown sortby value: {other}"
            ))),
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::PriceAsc => "priceasc",
            Self::PriceDesc => "pricedesc",
            Self::Newest => "newest",
        };
        f.write_str(s)
    }
}

/// A fully parsed station search.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchQuery {
    /// Attribute filters.
    pub filter: StationFilter,
    /// Optional radius filter.
    pub area: Option<SearchArea>,
    /// Return one price per fuel tag.
    pub latest_only: bool,
    /// Keep only these fuel tags. Empty keeps all.
    pub fuel_types: Vec<String>,
    /// Never call the provider; serve whatever is stored.
    pub store_only: bool,
    /// Return the simplified projection.
    pub simplified: bool,
    /// Optional result ordering.
    pub sort: Option<SortKey>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::geo::tests::station_at;

    #[test]
    fn sort_key_parses_case_insensitively() {
        assert!(matches!("PriceAsc".parse::<SortKey>(), Ok(SortKey::PriceAsc)));
        assert!(matches!("pricedesc".parse::<SortKey>(), Ok(SortKey::PriceDesc)));
        assert!(matches!(" newest ".parse::<SortKey>(), Ok(SortKey::Newest)));
    }

    #[test]
    fn unknown_sort_key_is_rejected() {
        let result = "cheapest".parse::<SortKey>();
        assert!(matches!(result, Err(GatewayError::InvalidRequest(_))));
    }

    #[test]
    fn filter_matches_folded_attributes() {
        let mut station = station_at("a", 60.0, 25.0);
        station.name = "ABC Pasila".to_string();
        station.address.city = "Helsinki".to_string();
        station.address.zipcode = "00520".to_string();

        let filter = StationFilter {
            names: vec!["abc pasila".to_string()],
            chains: vec!["NESTE".to_string()],
            city: Some("HELS".to_string()),
            zipcode: Some("052".to_string()),
        };
        assert!(filter.matches(&station));

        let wrong_city = StationFilter {
            city: Some("Turku".to_string()),
            ..StationFilter::default()
        };
        assert!(!wrong_city.matches(&station));
    }

    #[test]
    fn name_rank_follows_request_order() {
        let mut first = station_at("a", 60.0, 25.0);
        first.name = "Teboil Kamppi".to_string();
        let filter = StationFilter {
            names: vec!["St1 Kallio".to_string(), "teboil kamppi".to_string()],
            ..StationFilter::default()
        };
        assert_eq!(filter.name_rank(&first), Some(1));
    }

    #[test]
    fn empty_filter_matches_everything() {
        assert!(StationFilter::default().matches(&station_at("x", 0.0, 0.0)));
    }

    #[test]
    fn display_round_trips() {
        for key in [SortKey::PriceAsc, SortKey::PriceDesc, SortKey::Newest] {
            assert!(matches!(key.to_string().parse::<SortKey>(), Ok(k) if k == key));
        }
    }
}
