//! Freshness-driven station search.
//!
//! A search loads candidates from the store, applies the radius filter,
//! then enriches every candidate independently: serve stored prices when
//! they are fresh, otherwise fetch the station's history from the provider,
//! append it and read back. Units run concurrently up to the configured cap
//! and a failing unit only removes its own station from the response.

use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use futures_util::future;
use futures_util::stream::{self, StreamExt};
use tracing::{debug, info, warn};

use super::credential_manager::CredentialManager;
use super::reducer::{select_prices, sort_stations};
use crate::config::EnrichmentSettings;
use crate::domain::geo::retain_within;
use crate::domain::price::last_persisted_at;
use crate::domain::{
    EnrichedStation, NewPriceObservation, PriceObservation, SearchQuery, Station, StationView,
};
use crate::error::GatewayError;
use crate::persistence::SqliteStore;
use crate::upstream::{PriceReportBatch, ProviderClient};

/// Orchestrates station search and price enrichment.
#[derive(Debug)]
pub struct StationSearchService {
    store: SqliteStore,
    client: ProviderClient,
    credentials: Arc<CredentialManager>,
    history_since: String,
    freshness_window: TimeDelta,
    concurrency: usize,
}

impl StationSearchService {
    /// Creates a new search service.
    #[must_use]
    pub fn new(
        store: SqliteStore,
        client: ProviderClient,
        credentials: Arc<CredentialManager>,
        settings: &EnrichmentSettings,
    ) -> Self {
        Self {
            store,
            client,
            credentials,
            history_since: settings.history_since.clone(),
            freshness_window: TimeDelta::from_std(settings.freshness_window)
                .unwrap_or(TimeDelta::MAX),
            concurrency: settings.concurrency.max(1),
        }
    }

    /// Returns a reference to the underlying store.
    #[must_use]
    pub fn store(&self) -> &SqliteStore {
        &self.store
    }

    /// Returns the credential manager the service fetches with.
    #[must_use]
    pub fn credentials(&self) -> &Arc<CredentialManager> {
        &self.credentials
    }

    /// Runs a search and returns the projected, ordered results.
    ///
    /// Without a sort key, results keep candidate order (requested name
    /// order first, then identifier order).
    ///
    /// # Errors
    ///
    /// - [`GatewayError::NotFound`] if no station survives filtering.
    /// - [`GatewayError::Unauthorized`] if no credential is held and the
    ///   search is not store-only.
    /// - [`GatewayError::Store`] if the candidate query fails.
    pub async fn search(&self, query: &SearchQuery) -> Result<Vec<StationView>, GatewayError> {
        let mut candidates = self.store.find_stations_by_filter(&query.filter).await?;
        if let Some(area) = &query.area {
            candidates = retain_within(candidates, area);
        }
        if candidates.is_empty() {
            return Err(GatewayError::NotFound(
                "no stations match the search".to_string(),
            ));
        }

        let token = if query.store_only {
            None
        } else {
            Some(self.credentials.require_access_token()?)
        };

        let candidate_count = candidates.len();
        let mut enriched = self.enrich_all(candidates, query, token.as_deref()).await;
        info!(
            candidates = candidate_count,
            returned = enriched.len(),
            store_only = query.store_only,
            "station search completed"
        );

        if let Some(sort) = query.sort {
            sort_stations(&mut enriched, sort);
        }
        Ok(enriched
            .into_iter()
            .map(|station| station.project(query.simplified))
            .collect())
    }

    /// Lists stored stations with offset pagination.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Store`] on database failure.
    pub async fn list_stations(&self, skip: u32, limit: u32) -> Result<Vec<Station>, GatewayError> {
        self.store.list_stations(skip, limit).await
    }

    /// Returns every stored observation for a station.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::NotFound`] if the station has no stored
    /// prices, or [`GatewayError::Store`] on database failure.
    pub async fn station_prices(
        &self,
        station_id: &str,
    ) -> Result<Vec<PriceObservation>, GatewayError> {
        let observations = self.store.get_prices(station_id, false).await?;
        if observations.is_empty() {
            return Err(GatewayError::NotFound(format!(
                "no prices for station {station_id}"
            )));
        }
        Ok(observations)
    }

    /// Fans out one enrichment unit per candidate and keeps the survivors
    /// in candidate order.
    ///
    /// Units complete in any order so a slow station never holds back the
    /// ones queued behind it.
    async fn enrich_all(
        &self,
        candidates: Vec<Station>,
        query: &SearchQuery,
        token: Option<&str>,
    ) -> Vec<EnrichedStation> {
        let mut survivors: Vec<(usize, EnrichedStation)> =
            stream::iter(candidates.into_iter().enumerate())
                .map(|(position, station)| async move {
                    self.enrich_station(station, query, token)
                        .await
                        .map(|enriched| (position, enriched))
                })
                .buffer_unordered(self.concurrency)
                .filter_map(future::ready)
                .collect()
                .await;
        survivors.sort_unstable_by_key(|(position, _)| *position);
        survivors.into_iter().map(|(_, enriched)| enriched).collect()
    }

    async fn enrich_station(
        &self,
        station: Station,
        query: &SearchQuery,
        token: Option<&str>,
    ) -> Option<EnrichedStation> {
        match self.try_enrich(&station, query, token).await {
            Ok(observations) => Some(EnrichedStation {
                station,
                prices: select_prices(observations, &query.fuel_types, query.latest_only),
            }),
            Err(e) => {
                warn!(station_id = %station.id, error = %e, "dropping station from results");
                None
            }
        }
    }

    async fn try_enrich(
        &self,
        station: &Station,
        query: &SearchQuery,
        token: Option<&str>,
    ) -> Result<Vec<PriceObservation>, GatewayError> {
        let observations = self.store.get_prices(&station.id, query.latest_only).await?;
        // Taken once the unit holds a slot, not when the search started.
        let now = Utc::now();
        if !should_refresh(&observations, query.store_only, now, self.freshness_window) {
            return Ok(observations);
        }

        let token = token.ok_or(GatewayError::Unauthorized)?;
        self.refresh_station(&station.id, token, now).await?;
        self.store.get_prices(&station.id, query.latest_only).await
    }

    /// Fetches a station's history and appends every reported price.
    ///
    /// Returns the number of rows written.
    ///
    /// # Errors
    ///
    /// Returns the provider error if the fetch fails, or
    /// [`GatewayError::Store`] if the append fails. Nothing is written in
    /// either case.
    pub async fn refresh_station(
        &self,
        station_id: &str,
        access_token: &str,
        now: DateTime<Utc>,
    ) -> Result<u64, GatewayError> {
        let batches = self
            .client
            .get_station_prices(station_id, access_token, &self.history_since)
            .await?;
        let observations = observations_from_batches(station_id, &batches, now);
        let written = self.store.append_prices(&observations).await?;
        debug!(station_id, written, "station prices refreshed");
        Ok(written)
    }
}

/// Decides whether stored observations must be refreshed.
///
/// Store-only requests never refresh. Otherwise a refresh is due unless the
/// most recent persistence timestamp is younger than `window`.
#[must_use]
pub fn should_refresh(
    observations: &[PriceObservation],
    store_only: bool,
    now: DateTime<Utc>,
    window: TimeDelta,
) -> bool {
    if store_only {
        return false;
    }
    last_persisted_at(observations).is_none_or(|last| now.signed_duration_since(last) >= window)
}

/// Flattens provider batches into one new observation per reported price.
#[must_use]
pub fn observations_from_batches(
    station_id: &str,
    batches: &[PriceReportBatch],
    persisted_at: DateTime<Utc>,
) -> Vec<NewPriceObservation> {
    batches
        .iter()
        .flat_map(|batch| {
            batch.prices.iter().map(move |price| NewPriceObservation {
                station_id: station_id.to_string(),
                tag: price.tag.clone(),
                price: price.value,
                reported_at: batch.timestamp.clone(),
                reporter: batch.user_id.clone().unwrap_or_default(),
                persisted_at,
            })
        })
        .collect()
}
