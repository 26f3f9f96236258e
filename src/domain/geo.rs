//! Great-circle distance filtering.
//!
//! The store cannot evaluate spherical distances, so the radius filter runs
//! in process over the candidates the attribute query returned.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::Station;

/// Mean Earth radius in meters (IUGG).
pub const EARTH_RADIUS_M: f64 = 6_371_008.8;

/// Latitude/longitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct GeoPoint {
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
}

impl GeoPoint {
    /// Creates a point from latitude and longitude.
    #[must_use]
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Haversine distance to `other` in meters.
    #[must_use]
    pub fn distance_m(&self, other: &Self) -> f64 {
        let lat1 = self.latitude.to_radians();
        let lat2 = other.latitude.to_radians();
        let d_lat = (other.latitude - self.latitude).to_radians();
        let d_lon = (other.longitude - self.longitude).to_radians();

        let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_M * h.sqrt().min(1.0).asin()
    }
}

/// Circle around a reference point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchArea {
    /// Reference point.
    pub center: GeoPoint,
    /// Radius in meters. Boundary is inclusive.
    pub radius_m: f64,
}

impl SearchArea {
    /// Returns `true` if `point` lies within the radius (inclusive).
    #[must_use]
    pub fn contains(&self, point: &GeoPoint) -> bool {
        self.center.distance_m(point) <= self.radius_m
    }
}

/// Keeps the stations inside `area`, preserving input order.
#[must_use]
pub fn retain_within(stations: Vec<Station>, area: &SearchArea) -> Vec<Station> {
    stations
        .into_iter()
        .filter(|station| area.contains(&station.location))
        .collect()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::domain::StationAddress;
    use chrono::Utc;

    pub(crate) fn station_at(id: &str, latitude: f64, longitude: f64) -> Station {
        Station {
            id: id.to_string(),
            name: format!("Station {id}"),
            chain: "Neste".to_string(),
            brand: "Neste".to_string(),
            address: StationAddress {
                street: "Mannerheimintie 1".to_string(),
                city: "Helsinki".to_string(),
                zipcode: "00100".to_string(),
                country: "FI".to_string(),
            },
            location: GeoPoint::new(latitude, longitude),
            is_visible: true,
            synced_at: Utc::now(),
        }
    }

    #[test]
    fn helsinki_to_tampere_is_about_160_km() {
        let helsinki = GeoPoint::new(60.1699, 24.9384);
        let tampere = GeoPoint::new(61.4978, 23.7610);
        let d = helsinki.distance_m(&tampere);
        assert!((155_000.0..165_000.0).contains(&d), "got {d}");
    }

    #[test]
    fn station_at_center_is_kept_for_zero_radius() {
        let area = SearchArea {
            center: GeoPoint::new(60.1699, 24.9384),
            radius_m: 0.0,
        };
        let kept = retain_within(vec![station_at("a", 60.1699, 24.9384)], &area);
        assert_eq!(kept.len(), 1);
    }

    #[test]
    fn boundary_is_inclusive() {
        let center = GeoPoint::new(60.0, 25.0);
        let edge = GeoPoint::new(60.01, 25.02);
        let area = SearchArea {
            center,
            radius_m: center.distance_m(&edge),
        };
        assert!(area.contains(&edge));

        let slightly_smaller = SearchArea {
            center,
            radius_m: area.radius_m - 0.5,
        };
        assert!(!slightly_smaller.contains(&edge));
    }

    #[test]
    fn retain_within_preserves_order() {
        let area = SearchArea {
            center: GeoPoint::new(60.0, 25.0),
            radius_m: 5_000.0,
        };
        let stations = vec![
            station_at("near-1", 60.001, 25.0),
            station_at("far", 61.0, 25.0),
            station_at("near-2", 60.0, 25.001),
        ];
        let ids: Vec<String> = retain_within(stations, &area)
            .into_iter()
            .map(|s| s.id)
            .collect();
        assert_eq!(ids, vec!["near-1".to_string(), "near-2".to_string()]);
    }
}
