//! Import of the provider's station listing into the local store.

use chrono::Utc;
use tracing::{info, warn};

use crate::error::GatewayError;
use crate::persistence::SqliteStore;
use crate::upstream::{ProviderClient, RemoteStation};

/// Counts from one synchronization run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Entries in the remote listing.
    pub seen: usize,
    /// Stations stored for the first time.
    pub inserted: usize,
    /// Stations that were already stored and left untouched.
    pub existing: usize,
    /// Entries skipped because they could not be decoded.
    pub rejected: usize,
}

/// Copies newly observed stations from the provider into the store.
#[derive(Debug, Clone)]
pub struct StationSyncService {
    store: SqliteStore,
    client: ProviderClient,
}

impl StationSyncService {
    /// Creates a new sync service.
    #[must_use]
    pub fn new(store: SqliteStore, client: ProviderClient) -> Self {
        Self { store, client }
    }

    /// Lists remote stations and inserts the ones not stored yet.
    ///
    /// Existing stations are never overwritten. Malformed entries are
    /// logged and skipped.
    ///
    /// # Errors
    ///
    /// Returns the provider error if the listing fails, or
    /// [`GatewayError::Store`] if an insert fails.
    pub async fn sync_stations(&self, access_token: &str) -> Result<SyncReport, GatewayError> {
        let listing = self.client.list_stations(access_token).await?;
        let synced_at = Utc::now();
        let mut report = SyncReport {
            seen: listing.len(),
            ..SyncReport::default()
        };

        for value in listing {
            let station = match RemoteStation::from_value(value)
                .and_then(|remote| remote.into_station(synced_at))
            {
                Ok(station) => station,
                Err(e) => {
                    warn!(error = %e, "skipping malformed station entry");
                    report.rejected += 1;
                    continue;
                }
            };

            if self.store.upsert_station_if_absent(&station).await? {
                report.inserted += 1;
            } else {
                report.existing += 1;
            }
        }

        info!(
            seen = report.seen,
            inserted = report.inserted,
            existing = report.existing,
            rejected = report.rejected,
            "station listing synchronized"
        );
        Ok(report)
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::testing::{MockProvider, memory_store};
    use serde_json::json;
    use std::sync::atomic::Ordering;

    fn remote(id: &str, name: &str) -> serde_json::Value {
        json!({
            "_id": id,
            "name": name,
            "chain": "ABC",
            "brand": "ABC",
            "address": { "street": "Hämeenkatu 1", "city": "Tampere", "zipcode": "33100", "country": "FI" },
            "location": { "type": "Point", "coordinates": [23.76, 61.50] },
            "isVisible": true
        })
    }

    #[tokio::test]
    async fn sync_inserts_new_and_skips_malformed() {
        let mock = MockProvider::new()
            .with_station(remote("s1", "ABC Tampere"))
            .with_station(json!({ "_id": "broken", "name": "No location" }))
            .with_station(remote("s2", "ABC Hervanta"))
            .spawn()
            .await;
        let store = memory_store().await;
        let sync = StationSyncService::new(store.clone(), mock.client());

        let Ok(report) = sync.sync_stations("tok").await else {
            panic!("sync failed");
        };
        assert_eq!(
            report,
            SyncReport {
                seen: 3,
                inserted: 2,
                existing: 0,
                rejected: 1
            }
        );

        let Ok(Some(stored)) = store.get_station("s1").await else {
            panic!("station missing");
        };
        assert_eq!(stored.address.city, "Tampere");
        assert!((stored.location.latitude - 61.50).abs() < 1e-9);
        assert_eq!(mock.state.station_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn second_sync_leaves_existing_stations_alone() {
        let mock = MockProvider::new()
            .with_station(remote("s1", "ABC Tampere"))
            .spawn()
            .await;
        let store = memory_store().await;
        let sync = StationSyncService::new(store.clone(), mock.client());
        let _ = sync.sync_stations("tok").await;

        *mock.state.stations.lock().await = json!([remote("s1", "Renamed upstream")]);
        let Ok(report) = sync.sync_stations("tok").await else {
            panic!("sync failed");
        };
        assert_eq!(report.existing, 1);

        let Ok(Some(stored)) = store.get_station("s1").await else {
            panic!("station missing");
        };
        assert_eq!(stored.name, "ABC Tampere");
    }

    #[tokio::test]
    async fn rejected_token_fails_the_run() {
        let mock = MockProvider::new().spawn().await;
        let sync = StationSyncService::new(memory_store().await, mock.client());
        let result = sync.sync_stations("").await;
        assert!(matches!(result, Err(GatewayError::UpstreamAuth { status: 401 })));
    }
}
