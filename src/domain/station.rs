//! Fuel station records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::GeoPoint;

/// Postal address of a station.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct StationAddress {
    /// Street and number.
    pub street: String,
    /// City or municipality.
    pub city: String,
    /// Postal code.
    pub zipcode: String,
    /// Country code or name as reported upstream.
    pub country: String,
}

/// A fuel station as stored locally.
///
/// The identifier comes from the upstream listing and is immutable. Once a
/// station has been persisted its record is never overwritten by later
/// synchronizations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Station {
    /// Upstream station identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Chain the station belongs to.
    pub chain: String,
    /// Brand shown on the forecourt.
    pub brand: String,
    /// Postal address.
    pub address: StationAddress,
    /// Geographic coordinate.
    pub location: GeoPoint,
    /// Whether the provider lists the station as visible.
    pub is_visible: bool,
    /// When the station was first synchronized from the provider.
    pub synced_at: DateTime<Utc>,
}
