//! OpenAPI document for the REST surface.

use utoipa::OpenApi;

use super::dto::{CredentialStatus, HealthResponse};
use super::handlers::{station, system};
use crate::domain::{
    FullStation, GeoPoint, PriceObservation, PriceTuple, SimplifiedStation, Station,
    StationAddress, StationView,
};
use crate::error::{ErrorBody, ErrorResponse};

/// Generated OpenAPI description of every endpoint.
#[derive(Debug, OpenApi)]
#[openapi(
    info(
        title = "fuel-price-gateway",
        description = "Fuel station search with a freshness-driven local price cache."
    ),
    paths(
        station::search_stations,
        station::list_stations,
        station::list_station_prices,
        system::health_handler,
    ),
    components(schemas(
        StationView,
        FullStation,
        SimplifiedStation,
        Station,
        StationAddress,
        GeoPoint,
        PriceTuple,
        PriceObservation,
        HealthResponse,
        CredentialStatus,
        ErrorResponse,
        ErrorBody,
    )),
    tags(
        (name = "Stations", description = "Station search and stored prices"),
        (name = "System", description = "Health and service metadata"),
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_every_route() {
        let doc = ApiDoc::openapi();
        for path in [
            "/api/v1/stations/search",
            "/api/v1/stations",
            "/api/v1/stations/{id}/prices",
            "/health",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }
}
