//! Station handlers: search, listing and stored prices.

use axum::extract::{Path, Query, State};
use axum::routing::get;
use axum::{Json, Router};

use crate::api::dto::{ListParams, SearchParams};
use crate::app_state::AppState;
use crate::domain::{PriceObservation, Station, StationView};
use crate::error::{ErrorResponse, GatewayError};

/// `GET /stations/search` — Search stations and return their prices.
///
/// # Errors
///
/// Returns [`GatewayError`] on invalid parameters, when nothing matches,
/// or when the provider is needed but no credential is held.
#[utoipa::path(
    get,
    path = "/api/v1/stations/search",
    tag = "Stations",
    summary = "Search stations",
    description = "Filters stations by attributes and distance, refreshes prices older than the freshness window from the provider and returns each station with its prices. Stations whose enrichment fails are left out.",
    params(SearchParams),
    responses(
        (status = 200, description = "Matching stations", body = Vec<StationView>),
        (status = 400, description = "Invalid parameters", body = ErrorResponse),
        (status = 401, description = "No provider credential available", body = ErrorResponse),
        (status = 404, description = "No station matches the filters", body = ErrorResponse),
    )
)]
pub async fn search_stations(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<StationView>>, GatewayError> {
    let query = params.into_query()?;
    let results = state.search.search(&query).await?;
    Ok(Json(results))
}

/// `GET /stations` — List stored stations.
///
/// # Errors
///
/// Returns [`GatewayError`] on invalid paging parameters or store failure.
#[utoipa::path(
    get,
    path = "/api/v1/stations",
    tag = "Stations",
    summary = "List stations",
    description = "Returns stored stations ordered by identifier, with offset pagination.",
    params(ListParams),
    responses(
        (status = 200, description = "Stored stations", body = Vec<Station>),
        (status = 400, description = "Invalid paging parameters", body = ErrorResponse),
    )
)]
pub async fn list_stations(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<Station>>, GatewayError> {
    let (skip, limit) = params.page()?;
    let stations = state.search.list_stations(skip, limit).await?;
    Ok(Json(stations))
}

/// `GET /stations/{id}/prices` — Stored price history of one station.
///
/// # Errors
///
/// Returns [`GatewayError::NotFound`] when the station has no stored prices.
#[utoipa::path(
    get,
    path = "/api/v1/stations/{id}/prices",
    tag = "Stations",
    summary = "Station price history",
    description = "Returns every stored price observation of the station in insertion order. Never contacts the provider.",
    params(("id" = String, Path, description = "Station identifier")),
    responses(
        (status = 200, description = "Stored observations", body = Vec<PriceObservation>),
        (status = 404, description = "No stored prices", body = ErrorResponse),
    )
)]
pub async fn list_station_prices(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<PriceObservation>>, GatewayError> {
    let observations = state.search.station_prices(&id).await?;
    Ok(Json(observations))
}

/// Station routes, nested under `/api/v1`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/stations", get(list_stations))
        .route("/stations/search", get(search_stations))
        .route("/stations/{id}/prices", get(list_station_prices))
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode};
    use chrono::Utc;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use crate::api::build_router;
    use crate::app_state::AppState;
    use crate::domain::NewPriceObservation;
    use crate::testing::{MockProvider, app_state};

    async fn get_json(state: AppState, uri: &str) -> (StatusCode, Value) {
        let app = build_router().with_state(state);
        let Ok(request) = Request::builder().uri(uri).body(Body::empty()) else {
            panic!("request");
        };
        let Ok(response) = app.oneshot(request).await else {
            panic!("router failed");
        };
        let status = response.status();
        let Ok(bytes) = to_bytes(response.into_body(), usize::MAX).await else {
            panic!("body");
        };
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    fn temp_dir() -> tempfile::TempDir {
        let Ok(dir) = tempfile::tempdir() else {
            panic!("tempdir");
        };
        dir
    }

    #[tokio::test]
    async fn search_returns_simplified_projection() {
        let mock = MockProvider::new()
            .with_prices(
                "a",
                json!([{ "timestamp": "2024-06-02T08:00:00Z", "userId": "u", "prices": [{ "tag": "95", "value": 1.9 }] }]),
            )
            .spawn()
            .await;
        let dir = temp_dir();
        let state = app_state(&mock, &dir, &["a", "b"]).await;

        let (status, body) =
            get_json(state, "/api/v1/stations/search?name=Station%20A&simplified=true").await;
        assert_eq!(status, StatusCode::OK);
        let Some(first) = body.as_array().and_then(|a| a.first()) else {
            panic!("expected one station: {body}");
        };
        assert_eq!(first.get("name").and_then(Value::as_str), Some("Station a"));
        assert!(first.get("id").is_none());
        assert_eq!(
            first.pointer("/prices/0/value").and_then(Value::as_f64),
            Some(1.9)
        );
    }

    #[tokio::test]
    async fn unknown_sort_key_is_bad_request() {
        let mock = MockProvider::new().spawn().await;
        let dir = temp_dir();
        let state = app_state(&mock, &dir, &["a", "b"]).await;

        let (status, body) = get_json(state, "/api/v1/stations/search?sortby=cheapest").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.pointer("/error/code").and_then(Value::as_u64), Some(1001));
    }

    #[tokio::test]
    async fn empty_match_is_not_found() {
        let mock = MockProvider::new().spawn().await;
        let dir = temp_dir();
        let state = app_state(&mock, &dir, &["a", "b"]).await;

        let (status, _) = get_json(state, "/api/v1/stations/search?city=Oulu").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn missing_credential_is_unauthorized() {
        let mock = MockProvider::new().login_status(401).spawn().await;
        let dir = temp_dir();
        let state = app_state(&mock, &dir, &["a", "b"]).await;

        let (status, _) = get_json(state.clone(), "/api/v1/stations/search").await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = get_json(state, "/api/v1/stations/search?dbonly=true").await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn list_and_prices_pass_through() {
        let mock = MockProvider::new().spawn().await;
        let dir = temp_dir();
        let state = app_state(&mock, &dir, &["a", "b"]).await;

        let (status, body) = get_json(state.clone(), "/api/v1/stations?skip=1&limit=10").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().map(Vec::len), Some(1));

        let (status, body) = get_json(state.clone(), "/api/v1/stations?skip=abc").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.pointer("/error/code").and_then(Value::as_u64), Some(1001));

        let (status, _) = get_json(state.clone(), "/api/v1/stations/a/prices").await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let row = NewPriceObservation {
            station_id: "a".to_string(),
            tag: "dsl".to_string(),
            price: 1.7,
            reported_at: "2024-06-01T10:00:00Z".to_string(),
            reporter: "u".to_string(),
            persisted_at: Utc::now(),
        };
        let _ = state.search.store().append_prices(&[row]).await;

        let (status, body) = get_json(state, "/api/v1/stations/a/prices").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.pointer("/0/tag").and_then(Value::as_str), Some("dsl"));
    }
}
