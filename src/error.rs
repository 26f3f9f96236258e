//! Gateway error types with HTTP status code mapping.
//!
//! [`GatewayError`] is the central error type for the gateway. Each variant
//! maps to a specific HTTP status code and structured JSON error response.
//!
//! Errors raised while enriching a single station never reach this mapping:
//! the search orchestrator logs them and drops that station instead.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

/// Structured JSON error response body.
///
/// All error responses follow this shape:
/// ```json
/// {
///   "error": {
///     "code": 2001,
///     "message": "not found: no stations match the search",
///     "details": null
///   }
/// }
/// ```
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Structured error payload.
    pub error: ErrorBody,
}

/// Inner error body with numeric code and human-readable message.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Numeric error code (see code ranges on [`GatewayError`]).
    pub code: u32,
    /// Human-readable error message.
    pub message: String,
    /// Optional additional details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Server-side error enum with HTTP status code mapping.
///
/// # Error Code Ranges
///
/// | Range     | Category        | HTTP Status               |
/// |-----------|-----------------|---------------------------|
/// | 1000–1999 | Validation      | 400 Bad Request           |
/// | 2000–2999 | Not Found       | 404 Not Found             |
/// | 3000–3999 | Server          | 500 Internal Server Error |
/// | 4000–4999 | Credential      | 401 Unauthorized          |
/// | 5000–5999 | Upstream        | 502 Bad Gateway           |
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Login or the first token exchange against the provider failed.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// The provider rejected the access token we presented.
    #[error("upstream rejected access token (status {status})")]
    UpstreamAuth {
        /// HTTP status returned by the provider.
        status: u16,
    },

    /// The provider answered with a non-success status.
    #[error("upstream request failed with status {status}")]
    Upstream {
        /// HTTP status returned by the provider.
        status: u16,
    },

    /// The provider could not be reached at all.
    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    /// The provider answered 2xx with a body we could not decode.
    #[error("malformed upstream payload: {0}")]
    MalformedPayload(String),

    /// Persistence layer failure.
    #[error("store error: {0}")]
    Store(String),

    /// The requested resource does not exist (or a search matched nothing).
    #[error("not found: {0}")]
    NotFound(String),

    /// No usable provider credential is held by this worker.
    #[error("access token missing or invalid")]
    Unauthorized,

    /// Request validation failed.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Renewal lock marker could not be created or inspected.
    #[error("renewal lock error: {0}")]
    Lock(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::InvalidRequest(_) => 1001,
            Self::NotFound(_) => 2001,
            Self::Internal(_) => 3000,
            Self::Store(_) => 3001,
            Self::Lock(_) => 3002,
            Self::Unauthorized => 4001,
            Self::Authentication(_) => 4002,
            Self::UpstreamAuth { .. } => 4003,
            Self::Upstream { .. } => 5001,
            Self::UpstreamUnavailable(_) => 5002,
            Self::MalformedPayload(_) => 5003,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized | Self::Authentication(_) | Self::UpstreamAuth { .. } => {
                StatusCode::UNAUTHORIZED
            }
            Self::Upstream { .. } | Self::UpstreamUnavailable(_) | Self::MalformedPayload(_) => {
                StatusCode::BAD_GATEWAY
            }
            Self::Store(_) | Self::Lock(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<sqlx::Error> for GatewayError {
    fn from(err: sqlx::Error) -> Self {
        Self::Store(err.to_string())
    }
}

impl From<sqlx::migrate::MigrateError> for GatewayError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        Self::Store(err.to_string())
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::MalformedPayload(err.to_string())
        } else if let Some(status) = err.status() {
            Self::Upstream {
                status: status.as_u16(),
            }
        } else {
            Self::UpstreamUnavailable(err.to_string())
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.error_code(),
                message: self.to_string(),
                details: None,
            },
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        response
    }
}
