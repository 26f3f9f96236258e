//! Database row models for stations and prices.

use chrono::{DateTime, Utc};

use crate::domain::{GeoPoint, PriceObservation, Station, StationAddress};

/// A row from the `stations` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct StationRow {
    /// Upstream station identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Chain name.
    pub chain: String,
    /// Brand name.
    pub brand: String,
    /// Street address.
    pub address_street: String,
    /// City.
    pub address_city: String,
    /// Postal code.
    pub address_zipcode: String,
    /// Country.
    pub address_country: String,
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
    /// Visibility flag.
    pub is_visible: bool,
    /// First synchronization timestamp.
    pub synced_at: DateTime<Utc>,
}

impl From<StationRow> for Station {
    fn from(row: StationRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            chain: row.chain,
            brand: row.brand,
            address: StationAddress {
                street: row.address_street,
                city: row.address_city,
                zipcode: row.address_zipcode,
                country: row.address_country,
            },
            location: GeoPoint::new(row.latitude, row.longitude),
            is_visible: row.is_visible,
            synced_at: row.synced_at,
        }
    }
}

/// A row from the `prices` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PriceRow {
    /// Auto-increment row ID.
    pub id: i64,
    /// Owning station.
    pub station_id: String,
    /// Fuel tag.
    pub tag: String,
    /// Price value.
    pub price: f64,
    /// Upstream report timestamp, verbatim.
    pub reported_at: String,
    /// Reserved delta.
    pub delta: f64,
    /// Upstream reporter id.
    pub reporter: String,
    /// Local write timestamp.
    pub persisted_at: DateTime<Utc>,
}

impl From<PriceRow> for PriceObservation {
    fn from(row: PriceRow) -> Self {
        Self {
            id: row.id,
            station_id: row.station_id,
            tag: row.tag,
            price: row.price,
            reported_at: row.reported_at,
            delta: row.delta,
            reporter: row.reporter,
            persisted_at: row.persisted_at,
        }
    }
}
