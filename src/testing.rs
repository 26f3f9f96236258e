//! Test fixtures: an in-process mock of the price provider.
//!
//! The mock is a small axum app bound to an ephemeral port. It counts
//! calls, records what the price endpoint received and can be told to fail
//! per endpoint or per station.

#![allow(clippy::panic)]

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU16, AtomicUsize, Ordering};
use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{Value, json};
use tokio::sync::Mutex;

use crate::app_state::AppState;
use crate::config::{EnrichmentSettings, ProviderIdentity, ProviderSettings, RenewalSettings};
use crate::domain::geo::tests::station_at;
use crate::persistence::SqliteStore;
use crate::service::{CredentialManager, StationSearchService};
use crate::upstream::ProviderClient;
use crate::upstream::client::ACCESS_TOKEN_HEADER;

/// Shared mock state. Status fields of `0` mean "answer normally".
#[derive(Debug, Default)]
pub(crate) struct MockState {
    pub(crate) login_calls: AtomicUsize,
    pub(crate) refresh_calls: AtomicUsize,
    pub(crate) station_calls: AtomicUsize,
    pub(crate) price_calls: AtomicUsize,
    pub(crate) login_status: AtomicU16,
    pub(crate) refresh_status: AtomicU16,
    pub(crate) stations: Mutex<Value>,
    pub(crate) prices: Mutex<HashMap<String, Value>>,
    pub(crate) failing: Mutex<HashMap<String, u16>>,
    pub(crate) delays: Mutex<HashMap<String, Duration>>,
    /// `(station_id, access_token, since)` per price request, in arrival order.
    pub(crate) price_requests: Mutex<Vec<(String, String, String)>>,
    /// Station ids in the order their price responses were sent.
    pub(crate) price_responses: Mutex<Vec<String>>,
}

/// Builder for a [`RunningMock`].
#[derive(Debug, Default)]
pub(crate) struct MockProvider {
    stations: Vec<Value>,
    prices: HashMap<String, Value>,
    failing: HashMap<String, u16>,
    delays: HashMap<String, Duration>,
    login_status: u16,
}

impl MockProvider {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_station(mut self, station: Value) -> Self {
        self.stations.push(station);
        self
    }

    pub(crate) fn with_prices(mut self, station_id: &str, body: Value) -> Self {
        self.prices.insert(station_id.to_string(), body);
        self
    }

    pub(crate) fn failing_prices(mut self, station_id: &str, status: u16) -> Self {
        self.failing.insert(station_id.to_string(), status);
        self
    }

    /// Holds the price response of `station_id` back for `delay`.
    pub(crate) fn delayed_prices(mut self, station_id: &str, delay: Duration) -> Self {
        self.delays.insert(station_id.to_string(), delay);
        self
    }

    pub(crate) fn login_status(mut self, status: u16) -> Self {
        self.login_status = status;
        self
    }

    pub(crate) async fn spawn(self) -> RunningMock {
        let state = Arc::new(MockState {
            login_status: AtomicU16::new(self.login_status),
            stations: Mutex::new(Value::Array(self.stations)),
            prices: Mutex::new(self.prices),
            failing: Mutex::new(self.failing),
            delays: Mutex::new(self.delays),
            ..MockState::default()
        });

        let app = Router::new()
            .route("/auth/login", post(login))
            .route("/auth/refresh", post(refresh))
            .route("/stations", get(stations))
            .route("/stations/{id}/prices", get(prices))
            .with_state(Arc::clone(&state));

        let Ok(listener) = tokio::net::TcpListener::bind("127.0.0.1:0").await else {
            panic!("cannot bind mock provider");
        };
        let Ok(addr) = listener.local_addr() else {
            panic!("mock provider has no address");
        };
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        RunningMock {
            state,
            base_url: format!("http://{addr}"),
        }
    }
}

/// A mock provider accepting connections.
#[derive(Debug)]
pub(crate) struct RunningMock {
    pub(crate) state: Arc<MockState>,
    pub(crate) base_url: String,
}

impl RunningMock {
    pub(crate) fn identity(&self) -> ProviderIdentity {
        ProviderIdentity {
            email: Some("driver@example.com".to_string()),
            password: Some("secret".to_string()),
            device: Some("test-device".to_string()),
        }
    }

    pub(crate) fn settings(&self) -> ProviderSettings {
        ProviderSettings {
            base_url: self.base_url.clone(),
            identity: self.identity(),
            user_agent: "fuel-price-gateway-tests".to_string(),
            accept_language: "en".to_string(),
            timeout: Duration::from_secs(5),
        }
    }

    pub(crate) fn client(&self) -> ProviderClient {
        let Ok(client) = ProviderClient::new(&self.settings()) else {
            panic!("mock client");
        };
        client
    }

    pub(crate) fn price_calls(&self) -> usize {
        self.state.price_calls.load(Ordering::SeqCst)
    }
}

/// Renewal settings whose lock lives inside `dir`.
pub(crate) fn renewal_settings(dir: &tempfile::TempDir) -> RenewalSettings {
    RenewalSettings {
        interval: Duration::from_millis(20),
        lock_path: dir.path().join("renewal.lock"),
        ..RenewalSettings::default()
    }
}

pub(crate) async fn memory_store() -> SqliteStore {
    let Ok(store) = SqliteStore::in_memory().await else {
        panic!("in-memory store");
    };
    store
}

/// Handler state over a fresh store seeded with `station_ids`, logged in
/// unless the mock rejects the login.
pub(crate) async fn app_state(
    mock: &RunningMock,
    dir: &tempfile::TempDir,
    station_ids: &[&str],
) -> AppState {
    let credentials = Arc::new(CredentialManager::new(
        mock.client(),
        mock.identity(),
        &renewal_settings(dir),
    ));
    let _ = credentials.acquire().await;

    let store = memory_store().await;
    for id in station_ids {
        let _ = store
            .upsert_station_if_absent(&station_at(id, 60.17, 24.94))
            .await;
    }
    let search = StationSearchService::new(
        store,
        mock.client(),
        Arc::clone(&credentials),
        &EnrichmentSettings::default(),
    );
    AppState {
        search: Arc::new(search),
        credentials,
    }
}

fn status(code: u16) -> Response {
    StatusCode::from_u16(code)
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
        .into_response()
}

fn access_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(ACCESS_TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

async fn login(State(state): State<Arc<MockState>>, Json(body): Json<Value>) -> Response {
    state.login_calls.fetch_add(1, Ordering::SeqCst);
    let forced = state.login_status.load(Ordering::SeqCst);
    if forced != 0 {
        return status(forced);
    }
    if body.get("email").and_then(Value::as_str).is_none() {
        return status(400);
    }
    Json(json!({ "refreshToken": "refresh-token" })).into_response()
}

async fn refresh(State(state): State<Arc<MockState>>) -> Response {
    let n = state.refresh_calls.fetch_add(1, Ordering::SeqCst);
    let forced = state.refresh_status.load(Ordering::SeqCst);
    if forced != 0 {
        return status(forced);
    }
    Json(json!({ "accessToken": format!("access-{n}"), "refreshToken": "refresh-token" }))
        .into_response()
}

async fn stations(State(state): State<Arc<MockState>>, headers: HeaderMap) -> Response {
    state.station_calls.fetch_add(1, Ordering::SeqCst);
    if access_token(&headers).is_none() {
        return status(401);
    }
    Json(state.stations.lock().await.clone()).into_response()
}

async fn prices(
    State(state): State<Arc<MockState>>,
    Path(id): Path<String>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    state.price_calls.fetch_add(1, Ordering::SeqCst);
    let Some(token) = access_token(&headers) else {
        return status(401);
    };
    state.price_requests.lock().await.push((
        id.clone(),
        token,
        query.get("since").cloned().unwrap_or_default(),
    ));

    let delay = state.delays.lock().await.get(&id).copied();
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }
    state.price_responses.lock().await.push(id.clone());

    if let Some(code) = state.failing.lock().await.get(&id).copied() {
        return status(code);
    }
    let body = state
        .prices
        .lock()
        .await
        .get(&id)
        .cloned()
        .unwrap_or_else(|| json!([]));
    Json(body).into_response()
}
