//! Query parameters of the station endpoints.

use serde::Deserialize;
use utoipa::IntoParams;

use crate::domain::{GeoPoint, SearchArea, SearchQuery, SortKey, StationFilter};
use crate::error::GatewayError;

/// Default search radius in meters.
pub const DEFAULT_DISTANCE_M: f64 = 10_000.0;

/// Query parameters of `GET /api/v1/stations/search`.
///
/// Every field arrives as a string so malformed values are reported with
/// the gateway's JSON error body instead of a bare extractor rejection.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SearchParams {
    /// Comma-separated station names, matched exactly (case-insensitive).
    /// Results follow the order of this list.
    pub name: Option<String>,
    /// Comma-separated chains, matched exactly (case-insensitive).
    pub chain: Option<String>,
    /// Case-insensitive substring of the city.
    pub city: Option<String>,
    /// Case-insensitive substring of the postal code.
    pub zipcode: Option<String>,
    /// Reference latitude in degrees. Requires `longitude`.
    pub latitude: Option<String>,
    /// Reference longitude in degrees. Requires `latitude`.
    pub longitude: Option<String>,
    /// Search radius in meters around the reference point. Defaults to 10000.
    pub distance: Option<String>,
    /// Return only the latest price per fuel type.
    pub latest: Option<String>,
    /// Comma-separated fuel tags to keep (e.g. `95,dsl`).
    pub fuel_type: Option<String>,
    /// Serve stored prices only; never contact the provider.
    pub dbonly: Option<String>,
    /// Return `name`, `brand`, `location` and `prices` only.
    pub simplified: Option<String>,
    /// One of `priceasc`, `pricedesc`, `newest`.
    pub sortby: Option<String>,
}

impl SearchParams {
    /// Validates the parameters and builds a [`SearchQuery`].
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidRequest`] for unparsable numbers or
    /// flags, out-of-range coordinates, a negative distance, a reference
    /// point given with only one coordinate, or an unknown sort key.
    pub fn into_query(self) -> Result<SearchQuery, GatewayError> {
        let latitude = parse_number("latitude", self.latitude.as_deref())?;
        let longitude = parse_number("longitude", self.longitude.as_deref())?;
        let distance =
            parse_number("distance", self.distance.as_deref())?.unwrap_or(DEFAULT_DISTANCE_M);

        let area = match (latitude, longitude) {
            (Some(latitude), Some(longitude)) => {
                if !(-90.0..=90.0).contains(&latitude) {
                    return Err(invalid("latitude must be within [-90, 90]"));
                }
                if !(-180.0..=180.0).contains(&longitude) {
                    return Err(invalid("longitude must be within [-180, 180]"));
                }
                if distance < 0.0 {
                    return Err(invalid("distance must not be negative"));
                }
                Some(SearchArea {
                    center: GeoPoint::new(latitude, longitude),
                    radius_m: distance,
                })
            }
            (None, None) => None,
            _ => return Err(invalid("latitude and longitude must be given together")),
        };

        let sort = self
            .sortby
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .map(str::parse::<SortKey>)
            .transpose()?;

        Ok(SearchQuery {
            filter: StationFilter {
                names: split_list(self.name.as_deref()),
                chains: split_list(self.chain.as_deref()),
                city: non_blank(self.city),
                zipcode: non_blank(self.zipcode),
            },
            area,
            latest_only: parse_flag("latest", self.latest.as_deref())?,
            fuel_types: split_list(self.fuel_type.as_deref()),
            store_only: parse_flag("dbonly", self.dbonly.as_deref())?,
            simplified: parse_flag("simplified", self.simplified.as_deref())?,
            sort,
        })
    }
}

/// Default page size of `GET /api/v1/stations`.
pub const DEFAULT_LIST_LIMIT: u32 = 5000;

/// Query parameters of `GET /api/v1/stations`.
///
/// Read as strings for the same reason as [`SearchParams`].
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListParams {
    /// Number of stations to skip. Defaults to 0.
    pub skip: Option<String>,
    /// Maximum number of stations to return. Defaults to 5000.
    pub limit: Option<String>,
}

impl ListParams {
    /// Returns `(skip, limit)`.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidRequest`] if either value is not a
    /// non-negative integer.
    pub fn page(&self) -> Result<(u32, u32), GatewayError> {
        let skip = parse_count("skip", self.skip.as_deref())?.unwrap_or(0);
        let limit = parse_count("limit", self.limit.as_deref())?.unwrap_or(DEFAULT_LIST_LIMIT);
        Ok((skip, limit))
    }
}

fn invalid(message: &str) -> GatewayError {
    GatewayError::InvalidRequest(message.to_string())
}

fn split_list(raw: Option<&str>) -> Vec<String> {
    raw.map(|s| {
        s.split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}

fn non_blank(raw: Option<String>) -> Option<String> {
    raw.filter(|s| !s.trim().is_empty())
}

fn parse_number(field: &str, raw: Option<&str>) -> Result<Option<f64>, GatewayError> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };
    match raw.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(Some(value)),
        _ => Err(GatewayError::InvalidRequest(format!(
            "{field} is not a number: {raw}"
        ))),
    }
}

fn parse_count(field: &str, raw: Option<&str>) -> Result<Option<u32>, GatewayError> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };
    raw.parse::<u32>().map(Some).map_err(|_| {
        GatewayError::InvalidRequest(format!("{field} is not a non-negative integer: {raw}"))
    })
}

fn parse_flag(field: &str, raw: Option<&str>) -> Result<bool, GatewayError> {
    match raw.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
        None | Some("") => Ok(false),
        Some("true" | "1" | "yes" | "on") => Ok(true),
        Some("false" | "0" | "no" | "off") => Ok(false),
        Some(other) => Err(GatewayError::InvalidRequest(format!(
            "{field} is not a boolean: {other}"
        ))),
    }
}
