//! System endpoint payloads.

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

/// Health check response.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Always `"healthy"` while the process serves requests.
    pub status: String,
    /// Server time, RFC 3339.
    pub timestamp: String,
    /// Crate version.
    pub version: String,
    /// Provider credential state of this worker.
    pub credential: CredentialStatus,
}

/// Whether this worker currently holds a provider credential.
#[derive(Debug, Serialize, ToSchema)]
pub struct CredentialStatus {
    /// A credential is held and searches may reach the provider.
    pub held: bool,
    /// Assumed expiry of the held access token.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}
