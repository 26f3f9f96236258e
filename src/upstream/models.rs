//! Wire models for the remote price provider.
//!
//! Field names follow the provider's camelCase JSON. Token-bearing types
//! implement `Debug` by hand so secrets never reach the logs.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::domain::{GeoPoint, Station, StationAddress};
use crate::error::GatewayError;

/// Body of `POST /auth/login`.
#[derive(Clone, Serialize)]
pub struct LoginRequest {
    /// Account email.
    pub email: String,
    /// Account password.
    pub password: String,
    /// Device label.
    pub device: String,
}

impl fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginRequest")
            .field("email", &self.email)
            .field("device", &self.device)
            .finish_non_exhaustive()
    }
}

/// Body of `POST /auth/refresh`.
#[derive(Clone, Serialize)]
pub struct RefreshRequest {
    /// Refresh token to exchange.
    pub token: String,
}

impl fmt::Debug for RefreshRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefreshRequest").finish_non_exhaustive()
    }
}

/// Response of `POST /auth/login`.
#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    /// Refresh token to exchange for an access token.
    pub refresh_token: String,
}

impl fmt::Debug for LoginResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginResponse").finish_non_exhaustive()
    }
}

/// Response of `POST /auth/refresh`.
#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    /// Newly minted access token.
    pub access_token: String,
    /// Rotated refresh token, when the provider issues one.
    #[serde(default)]
    pub refresh_token: Option<String>,
}

impl fmt::Debug for TokenResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenResponse")
            .field("rotated", &self.refresh_token.is_some())
            .finish_non_exhaustive()
    }
}

/// One entry of `GET /stations`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteStation {
    /// Provider identifier.
    #[serde(rename = "_id")]
    pub id: String,
    /// Display name.
    pub name: String,
    /// Chain name.
    #[serde(default)]
    pub chain: Option<String>,
    /// Brand name.
    #[serde(default)]
    pub brand: Option<String>,
    /// Postal address.
    #[serde(default)]
    pub address: RemoteAddress,
    /// GeoJSON point.
    #[serde(default)]
    pub location: Option<RemoteLocation>,
    /// Visibility, sent either as a boolean or as `0`/`1`.
    #[serde(default, deserialize_with = "bool_or_int")]
    pub is_visible: bool,
}

/// Address block of a [`RemoteStation`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RemoteAddress {
    /// Street.
    #[serde(default)]
    pub street: Option<String>,
    /// City.
    #[serde(default)]
    pub city: Option<String>,
    /// Postal code.
    #[serde(default)]
    pub zipcode: Option<String>,
    /// Country.
    #[serde(default)]
    pub country: Option<String>,
}

/// GeoJSON point: `coordinates` is `[longitude, latitude]`.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteLocation {
    /// `[longitude, latitude]`.
    #[serde(default)]
    pub coordinates: Vec<f64>,
}

impl RemoteStation {
    /// Decodes one raw listing entry.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::MalformedPayload`] if the entry does not
    /// have the expected shape.
    pub fn from_value(value: serde_json::Value) -> Result<Self, GatewayError> {
        serde_json::from_value(value).map_err(|e| GatewayError::MalformedPayload(e.to_string()))
    }

    /// Converts into a local [`Station`] first synchronized at `synced_at`.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::MalformedPayload`] if the station has no
    /// usable coordinate.
    pub fn into_station(self, synced_at: DateTime<Utc>) -> Result<Station, GatewayError> {
        let coordinates = self
            .location
            .as_ref()
            .map(|l| l.coordinates.as_slice())
            .unwrap_or_default();
        let (Some(&longitude), Some(&latitude)) = (coordinates.first(), coordinates.get(1)) else {
            return Err(GatewayError::MalformedPayload(format!(
                "station {} has no coordinates",
                self.id
            )));
        };

        Ok(Station {
            id: self.id,
            name: self.name,
            chain: self.chain.unwrap_or_default(),
            brand: self.brand.unwrap_or_default(),
            address: StationAddress {
                street: self.address.street.unwrap_or_default(),
                city: self.address.city.unwrap_or_default(),
                zipcode: self.address.zipcode.unwrap_or_default(),
                country: self.address.country.unwrap_or_default(),
            },
            location: GeoPoint::new(latitude, longitude),
            is_visible: self.is_visible,
            synced_at,
        })
    }
}

/// One report from `GET /stations/{id}/prices`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceReportBatch {
    /// Report timestamp, kept as the provider formats it.
    pub timestamp: String,
    /// Reporting user.
    #[serde(default)]
    pub user_id: Option<String>,
    /// Prices reported together.
    #[serde(default)]
    pub prices: Vec<ReportedPrice>,
}

/// A single `(tag, value)` pair inside a [`PriceReportBatch`].
#[derive(Debug, Clone, Deserialize)]
pub struct ReportedPrice {
    /// Fuel tag.
    pub tag: String,
    /// Price value.
    pub value: f64,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Flag {
    Bool(bool),
    Int(i64),
}

fn bool_or_int<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Flag>::deserialize(deserializer)? {
        Some(Flag::Bool(b)) => b,
        Some(Flag::Int(i)) => i != 0,
        None => false,
    })
}
