//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::service::{CredentialManager, StationSearchService};

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Search and price enrichment.
    pub search: Arc<StationSearchService>,
    /// Provider credential of this worker.
    pub credentials: Arc<CredentialManager>,
}
