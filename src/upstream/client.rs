//! REST client for the remote price provider.
//!
//! Covers: login, token refresh, station listing and per-station price
//! history. Every call carries the configured `user-agent` and
//! `accept-language`; reads also carry the access token.

use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, USER_AGENT};
use reqwest::{Method, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::models::{LoginRequest, LoginResponse, PriceReportBatch, RefreshRequest, TokenResponse};
use crate::config::{ProviderIdentity, ProviderSettings};
use crate::error::GatewayError;

/// Header carrying the access token on read calls.
pub const ACCESS_TOKEN_HEADER: &str = "x-access-token";

/// Async REST client for the price provider.
#[derive(Debug, Clone)]
pub struct ProviderClient {
    http: reqwest::Client,
    base_url: Url,
    user_agent: String,
    accept_language: String,
}

impl ProviderClient {
    /// Creates a client from provider settings.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidRequest`] if the base URL does not
    /// parse, or [`GatewayError::Internal`] if the HTTP client cannot be
    /// built.
    pub fn new(settings: &ProviderSettings) -> Result<Self, GatewayError> {
        let base_url = Url::parse(&settings.base_url).map_err(|e| {
            GatewayError::InvalidRequest(format!("invalid provider base url: {e}"))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(GatewayError::InvalidRequest(format!(
                "provider base url cannot be a base: {base_url}"
            )));
        }

        let http = reqwest::Client::builder()
            .pool_max_idle_per_host(8)
            .timeout(settings.timeout)
            .build()
            .map_err(|e| GatewayError::Internal(format!("failed to build http client: {e}")))?;

        Ok(Self {
            http,
            base_url,
            user_agent: settings.user_agent.clone(),
            accept_language: settings.accept_language.clone(),
        })
    }

    /// Builds an endpoint URL from path segments, percent-encoding each.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn request(&self, method: Method, segments: &[&str]) -> RequestBuilder {
        self.http
            .request(method, self.endpoint(segments))
            .header(ACCEPT, "*/*")
            .header(USER_AGENT, &self.user_agent)
            .header(ACCEPT_LANGUAGE, &self.accept_language)
    }

    // ── Authentication ────────────────────────────────────────────────

    /// Logs in and returns the initial refresh token.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Authentication`] if the identity is
    /// incomplete, or an upstream error if the call fails.
    pub async fn login(&self, identity: &ProviderIdentity) -> Result<LoginResponse, GatewayError> {
        let (Some(email), Some(password)) = (&identity.email, &identity.password) else {
            return Err(GatewayError::Authentication(
                "provider email and password are not configured".to_string(),
            ));
        };
        let body = LoginRequest {
            email: email.clone(),
            password: password.clone(),
            device: identity.device.clone().unwrap_or_default(),
        };

        debug!("sending provider login request");
        let response = self
            .request(Method::POST, &["auth", "login"])
            .json(&body)
            .send()
            .await?;
        decode(response).await
    }

    /// Exchanges a refresh token for a new access token.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::UpstreamAuth`] if the refresh token is
    /// rejected, or another upstream error if the call fails.
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenResponse, GatewayError> {
        let body = RefreshRequest {
            token: refresh_token.to_string(),
        };

        debug!("sending provider token refresh request");
        let response = self
            .request(Method::POST, &["auth", "refresh"])
            .json(&body)
            .send()
            .await?;
        decode(response).await
    }

    // ── Read endpoints ────────────────────────────────────────────────

    /// Fetches the full station listing.
    ///
    /// Entries are returned undecoded so one malformed station does not
    /// discard the whole listing; see
    /// [`super::models::RemoteStation::from_value`].
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::UpstreamAuth`] if the access token is
    /// rejected, [`GatewayError::Upstream`] on other non-success statuses.
    pub async fn list_stations(
        &self,
        access_token: &str,
    ) -> Result<Vec<serde_json::Value>, GatewayError> {
        let response = self
            .request(Method::GET, &["stations"])
            .header(ACCESS_TOKEN_HEADER, access_token)
            .send()
            .await?;
        let stations: Vec<serde_json::Value> = decode(response).await?;
        debug!(count = stations.len(), "fetched station listing");
        Ok(stations)
    }

    /// Fetches a station's price history reported since `since`.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::UpstreamAuth`] if the access token is
    /// rejected, [`GatewayError::Upstream`] on other non-success statuses,
    /// [`GatewayError::MalformedPayload`] if the body does not decode.
    pub async fn get_station_prices(
        &self,
        station_id: &str,
        access_token: &str,
        since: &str,
    ) -> Result<Vec<PriceReportBatch>, GatewayError> {
        let response = self
            .request(Method::GET, &["stations", station_id, "prices"])
            .header(ACCESS_TOKEN_HEADER, access_token)
            .query(&[("since", since)])
            .send()
            .await?;
        let batches: Vec<PriceReportBatch> = decode(response).await?;
        debug!(station_id, batches = batches.len(), "fetched station prices");
        Ok(batches)
    }
}

/// Maps the status and decodes a JSON body.
async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, GatewayError> {
    let status = response.status();
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        warn!(status = status.as_u16(), url = %response.url(), "provider rejected credentials");
        return Err(GatewayError::UpstreamAuth {
            status: status.as_u16(),
        });
    }
    if !status.is_success() {
        warn!(status = status.as_u16(), url = %response.url(), "provider request failed");
        return Err(GatewayError::Upstream {
            status: status.as_u16(),
        });
    }

    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|e| GatewayError::MalformedPayload(e.to_string()))
}
