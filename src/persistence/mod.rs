//! Persistence layer: SQLite station and price store.
//!
//! Stations are inserted once and never updated. Prices are an append-only
//! history; "latest" is always a selection over it. The concrete store uses
//! `sqlx::SqlitePool` for async access.

pub mod models;
pub mod sqlite;

pub use sqlite::SqliteStore;
