//! # fuel-price-gateway
//!
//! REST gateway that finds fuel stations by attributes and distance and
//! returns their prices from a local SQLite cache, refreshing a station
//! from the remote price provider only when its stored prices are older
//! than the freshness window.
//!
//! ## Architecture
//!
//! ```text
//! Clients (HTTP)
//!     │
//!     ├── REST Handlers (api/)
//!     │
//!     ├── StationSearchService (service/enrichment)
//!     │       ├── attribute filter → SqliteStore (persistence/)
//!     │       ├── radius filter (domain/geo)
//!     │       ├── per-station refresh → ProviderClient (upstream/)
//!     │       └── reducer (service/reducer)
//!     │
//!     └── CredentialManager (service/credential_manager)
//!             ├── background renewal loop
//!             └── RenewalLock (marker file shared by all workers)
//! ```
//!
//! The credential cell is the only state shared between request handling
//! and the renewal loop; the marker file is the only state shared between
//! worker processes.

pub mod api;
pub mod app_state;
pub mod config;
pub mod domain;
pub mod error;
pub mod persistence;
pub mod service;
pub mod upstream;

#[cfg(test)]
pub(crate) mod testing;
