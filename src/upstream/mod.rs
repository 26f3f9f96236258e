//! Remote price provider boundary.
//!
//! [`ProviderClient`] is a thin request/response wrapper: it maps statuses
//! to [`crate::error::GatewayError`] and decodes bodies, nothing more.
//! Retry and freshness policy live in the service layer.

pub mod client;
pub mod models;

pub use client::ProviderClient;
pub use models::{PriceReportBatch, RemoteStation, ReportedPrice};
