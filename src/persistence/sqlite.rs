//! SQLite implementation of the station repository.

use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tokio::sync::Mutex;

use super::models::{PriceRow, StationRow};
use crate::config::GatewayConfig;
use crate::domain::price::latest_per_tag;
use crate::domain::{NewPriceObservation, PriceObservation, Station, StationFilter};
use crate::error::GatewayError;

const STATION_COLUMNS: &str = "id, name, chain, brand, address_street, address_city, \
     address_zipcode, address_country, latitude, longitude, is_visible, synced_at";

const PRICE_COLUMNS: &str =
    "id, station_id, tag, price, reported_at, delta, reporter, persisted_at";

/// SQLite-backed station and price store using `sqlx::SqlitePool`.
///
/// Writes go through an in-process gate so concurrent per-station appends
/// commit one after another instead of racing for SQLite's writer lock.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
    write_gate: Arc<Mutex<()>>,
}

impl SqliteStore {
    /// Creates a store over an existing connection pool.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            write_gate: Arc::new(Mutex::new(())),
        }
    }

    /// Opens (creating if missing) the database named in `config` and runs
    /// pending migrations.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Store`] if the URL is invalid, the database
    /// cannot be opened or a migration fails.
    pub async fn connect(config: &GatewayConfig) -> Result<Self, GatewayError> {
        let options = SqliteConnectOptions::from_str(&config.database_url)?
            .create_if_missing(true)
            .busy_timeout(Duration::from_secs(5));

        ensure_parent_dir(options.get_filename()).await?;

        let pool = SqlitePoolOptions::new()
            .max_connections(config.database_max_connections.max(1))
            .min_connections(config.database_min_connections)
            .acquire_timeout(Duration::from_secs(config.database_connect_timeout_secs))
            .connect_with(options)
            .await?;

        let store = Self::new(pool);
        store.migrate().await?;
        Ok(store)
    }

    /// Opens a private in-memory database with the schema applied.
    ///
    /// The pool keeps a single connection alive for its whole lifetime,
    /// since every SQLite memory connection is its own database.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Store`] if the database cannot be created.
    pub async fn in_memory() -> Result<Self, GatewayError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        let store = Self::new(pool);
        store.migrate().await?;
        Ok(store)
    }

    /// Applies the embedded migrations.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Store`] on migration failure.
    pub async fn migrate(&self) -> Result<(), GatewayError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    /// Returns stations matching the attribute filter.
    ///
    /// When names are given, stations matching the first listed name come
    /// first, then the second, and so on; ties keep identifier order.
    /// Matching runs on loaded rows because SQLite's `lower()` only folds
    /// ASCII.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Store`] on database failure.
    pub async fn find_stations_by_filter(
        &self,
        filter: &StationFilter,
    ) -> Result<Vec<Station>, GatewayError> {
        let rows = sqlx::query_as::<_, StationRow>(&format!(
            "SELECT {STATION_COLUMNS} FROM stations ORDER BY id"
        ))
        .fetch_all(&self.pool)
        .await?;

        let mut stations: Vec<Station> = rows
            .into_iter()
            .map(Station::from)
            .filter(|station| filter.matches(station))
            .collect();

        if !filter.names.is_empty() {
            stations.sort_by_key(|station| filter.name_rank(station).unwrap_or(usize::MAX));
        }

        Ok(stations)
    }

    /// Lists stored stations with offset pagination.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Store`] on database failure.
    pub async fn list_stations(&self, skip: u32, limit: u32) -> Result<Vec<Station>, GatewayError> {
        let rows = sqlx::query_as::<_, StationRow>(&format!(
            "SELECT {STATION_COLUMNS} FROM stations ORDER BY id LIMIT ? OFFSET ?"
        ))
        .bind(i64::from(limit))
        .bind(i64::from(skip))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Station::from).collect())
    }

    /// Loads one station by identifier.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Store`] on database failure.
    pub async fn get_station(&self, station_id: &str) -> Result<Option<Station>, GatewayError> {
        let row = sqlx::query_as::<_, StationRow>(&format!(
            "SELECT {STATION_COLUMNS} FROM stations WHERE id = ?"
        ))
        .bind(station_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Station::from))
    }

    /// Returns a station's observations in insertion order, or only the
    /// latest one per fuel tag when `latest_only` is set.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Store`] on database failure.
    pub async fn get_prices(
        &self,
        station_id: &str,
        latest_only: bool,
    ) -> Result<Vec<PriceObservation>, GatewayError> {
        let rows = sqlx::query_as::<_, PriceRow>(&format!(
            "SELECT {PRICE_COLUMNS} FROM prices WHERE station_id = ? ORDER BY id"
        ))
        .bind(station_id)
        .fetch_all(&self.pool)
        .await?;

        let observations: Vec<PriceObservation> =
            rows.into_iter().map(PriceObservation::from).collect();

        if latest_only {
            Ok(latest_per_tag(observations))
        } else {
            Ok(observations)
        }
    }

    /// Appends a batch of observations in one transaction.
    ///
    /// Either every row becomes visible or none does. Existing rows are
    /// never touched. Returns the number of rows written.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Store`] on database failure; the transaction
    /// is rolled back.
    pub async fn append_prices(
        &self,
        observations: &[NewPriceObservation],
    ) -> Result<u64, GatewayError> {
        if observations.is_empty() {
            return Ok(0);
        }

        let _gate = self.write_gate.lock().await;
        let mut tx = self.pool.begin().await?;
        let mut written = 0u64;

        for obs in observations {
            let result = sqlx::query(
                "INSERT INTO prices (station_id, tag, price, reported_at, delta, reporter, persisted_at) \
                 VALUES (?, ?, ?, ?, 0, ?, ?)",
            )
            .bind(&obs.station_id)
            .bind(&obs.tag)
            .bind(obs.price)
            .bind(&obs.reported_at)
            .bind(&obs.reporter)
            .bind(obs.persisted_at)
            .execute(&mut *tx)
            .await?;
            written = written.saturating_add(result.rows_affected());
        }

        tx.commit().await?;
        Ok(written)
    }

    /// Inserts `station` unless its identifier is already stored.
    ///
    /// Returns `true` if a row was inserted. An existing station is left
    /// untouched and is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Store`] on database failure.
    pub async fn upsert_station_if_absent(&self, station: &Station) -> Result<bool, GatewayError> {
        let _gate = self.write_gate.lock().await;
        let result = sqlx::query(&format!(
            "INSERT INTO stations ({STATION_COLUMNS}) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) ON CONFLICT (id) DO NOTHING"
        ))
        .bind(&station.id)
        .bind(&station.name)
        .bind(&station.chain)
        .bind(&station.brand)
        .bind(&station.address.street)
        .bind(&station.address.city)
        .bind(&station.address.zipcode)
        .bind(&station.address.country)
        .bind(station.location.latitude)
        .bind(station.location.longitude)
        .bind(station.is_visible)
        .bind(station.synced_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}

async fn ensure_parent_dir(path: &Path) -> Result<(), GatewayError> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| GatewayError::Store(format!("cannot create {}: {e}", parent.display()))),
        _ => Ok(()),
    }
}
