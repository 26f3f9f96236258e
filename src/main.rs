//! fuel-price-gateway server entry point.
//!
//! Opens the store, logs in to the price provider, imports the station
//! listing, starts credential renewal and serves the REST API.

use std::sync::Arc;

use anyhow::Context;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use fuel_price_gateway::api;
use fuel_price_gateway::app_state::AppState;
use fuel_price_gateway::config::GatewayConfig;
use fuel_price_gateway::persistence::SqliteStore;
use fuel_price_gateway::service::{CredentialManager, StationSearchService, StationSyncService};
use fuel_price_gateway::upstream::ProviderClient;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = GatewayConfig::from_env()
        .map_err(|e| anyhow::anyhow!(e))
        .context("invalid configuration")?;

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if config.log_json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
    tracing::info!(addr = %config.listen_addr, "starting fuel-price-gateway");

    // Build persistence and upstream layers
    let store = SqliteStore::connect(&config)
        .await
        .context("failed to open station store")?;
    let client = ProviderClient::new(&config.provider).context("invalid provider settings")?;

    // Obtain the provider credential; the renewal loop retries on failure
    let credentials = Arc::new(CredentialManager::new(
        client.clone(),
        config.provider.identity.clone(),
        &config.renewal,
    ));
    if let Err(e) = credentials.acquire().await {
        tracing::error!(error = %e, "provider login failed; searches need dbonly until it recovers");
    }

    // Import stations not seen before
    if config.station_sync_on_startup {
        match credentials.current_access_token() {
            Some(token) => {
                let sync = StationSyncService::new(store.clone(), client.clone());
                if let Err(e) = sync.sync_stations(&token).await {
                    tracing::warn!(error = %e, "station synchronization failed");
                }
            }
            None => tracing::warn!("skipping station synchronization: no provider credential"),
        }
    }

    let renewal_task = Arc::clone(&credentials).spawn_renewal_loop();

    // Build service layer
    let search = Arc::new(StationSearchService::new(
        store,
        client,
        Arc::clone(&credentials),
        &config.enrichment,
    ));

    // Build application state
    let app_state = AppState {
        search,
        credentials,
    };

    // Build router
    let app = Router::new()
        .merge(api::build_router())
        .merge(swagger_routes())
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(config.request_timeout))
        .layer(CorsLayer::permissive())
        .with_state(app_state);

    // Start server
    let listener = tokio::net::TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.listen_addr))?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    renewal_task.abort();
    tracing::info!("fuel-price-gateway stopped");
    Ok(())
}

#[cfg(feature = "swagger-ui")]
fn swagger_routes() -> Router<AppState> {
    use utoipa::OpenApi;
    use utoipa_swagger_ui::SwaggerUi;

    Router::new().merge(
        SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", api::openapi::ApiDoc::openapi()),
    )
}

#[cfg(not(feature = "swagger-ui"))]
fn swagger_routes() -> Router<AppState> {
    Router::new()
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    tracing::info!("shutdown signal received");
}
