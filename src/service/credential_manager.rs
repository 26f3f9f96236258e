//! Provider credential lifecycle: login, proactive renewal, recovery.
//!
//! The manager owns the process-wide [`CredentialCell`]. Request handlers
//! only ever read a snapshot from it; the renewal loop is the only writer
//! after startup. A renewal builds a complete new [`Credential`] and
//! publishes it on success, so a failed renewal leaves the previous token
//! in place.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use super::renewal_lock::{LockAttempt, RenewalLock, RenewalLockGuard};
use crate::config::{ProviderIdentity, RenewalSettings};
use crate::domain::{Credential, CredentialCell};
use crate::error::GatewayError;
use crate::upstream::ProviderClient;
use crate::upstream::models::TokenResponse;

/// What one [`CredentialManager::renew_if_needed`] call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenewalOutcome {
    /// The credential is outside the look-ahead window.
    NotDue,
    /// A new access token was published.
    Renewed,
    /// No credential was held; a full login succeeded.
    Acquired,
    /// Another worker holds the renewal lock.
    Contended,
    /// Renewal was attempted and failed; the previous credential stays.
    Failed,
}

/// Owns the provider credential for this worker process.
#[derive(Debug)]
pub struct CredentialManager {
    client: ProviderClient,
    identity: ProviderIdentity,
    cell: CredentialCell,
    lock: RenewalLock,
    interval: Duration,
    lookahead: TimeDelta,
    validity: TimeDelta,
}

impl CredentialManager {
    /// Creates a manager that holds no credential yet.
    #[must_use]
    pub fn new(
        client: ProviderClient,
        identity: ProviderIdentity,
        settings: &RenewalSettings,
    ) -> Self {
        Self {
            client,
            identity,
            cell: CredentialCell::new(),
            lock: RenewalLock::from_settings(settings),
            interval: settings.interval,
            lookahead: TimeDelta::from_std(settings.lookahead).unwrap_or(TimeDelta::MAX),
            validity: TimeDelta::from_std(settings.token_validity).unwrap_or(TimeDelta::MAX),
        }
    }

    /// Logs in, exchanges the refresh token and publishes the credential.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Authentication`] if either step fails. The
    /// manager then keeps whatever it held before (usually nothing).
    pub async fn acquire(&self) -> Result<(), GatewayError> {
        let login = self
            .client
            .login(&self.identity)
            .await
            .map_err(into_authentication)?;
        let tokens = self
            .client
            .refresh(&login.refresh_token)
            .await
            .map_err(into_authentication)?;

        let credential = self.publish(tokens, login.refresh_token, Utc::now());
        info!(expires_at = %credential.expires_at, "provider credential acquired");
        Ok(())
    }

    /// Current access token, if any. Never performs I/O.
    #[must_use]
    pub fn current_access_token(&self) -> Option<String> {
        self.cell.current().map(|c| c.access_token.clone())
    }

    /// Current access token, or [`GatewayError::Unauthorized`].
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Unauthorized`] when no credential is held.
    pub fn require_access_token(&self) -> Result<String, GatewayError> {
        self.current_access_token()
            .ok_or(GatewayError::Unauthorized)
    }

    /// Expiry of the held credential, if any.
    #[must_use]
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.cell.current().map(|c| c.expires_at)
    }

    /// Renews the credential if it expires within the look-ahead window of
    /// `now`, or logs in again if none is held.
    ///
    /// The renewal lock is taken only once work is actually due.
    pub async fn renew_if_needed(&self, now: DateTime<Utc>) -> RenewalOutcome {
        let Some(current) = self.cell.current() else {
            return self.recover().await;
        };
        if !current.expires_within(now, self.lookahead) {
            return RenewalOutcome::NotDue;
        }

        let Some(_guard) = self.take_lock() else {
            return RenewalOutcome::Contended;
        };
        match self.client.refresh(&current.refresh_token).await {
            Ok(tokens) => {
                let renewed = self.publish(tokens, current.refresh_token.clone(), now);
                info!(expires_at = %renewed.expires_at, "provider credential renewed");
                RenewalOutcome::Renewed
            }
            Err(e) => {
                warn!(error = %e, "credential renewal failed; keeping previous credential");
                RenewalOutcome::Failed
            }
        }
    }

    /// Starts the background renewal loop.
    ///
    /// The loop ticks every configured interval and runs until the returned
    /// handle is aborted.
    pub fn spawn_renewal_loop(self: Arc<Self>) -> JoinHandle<()> {
        let period = self.interval.max(Duration::from_millis(10));
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let outcome = self.renew_if_needed(Utc::now()).await;
                debug!(?outcome, "credential renewal tick");
            }
        })
    }

    async fn recover(&self) -> RenewalOutcome {
        let Some(_guard) = self.take_lock() else {
            return RenewalOutcome::Contended;
        };
        match self.acquire().await {
            Ok(()) => RenewalOutcome::Acquired,
            Err(e) => {
                warn!(error = %e, "provider login retry failed");
                RenewalOutcome::Failed
            }
        }
    }

    fn take_lock(&self) -> Option<RenewalLockGuard> {
        match self.lock.try_acquire() {
            Ok(LockAttempt::Held(guard)) => Some(guard),
            Ok(LockAttempt::AlreadyHeld) => {
                debug!("renewal in progress elsewhere; skipping");
                None
            }
            Err(e) => {
                error!(error = %e, "renewal lock unavailable; skipping");
                None
            }
        }
    }

    fn publish(
        &self,
        tokens: TokenResponse,
        previous_refresh: String,
        issued_at: DateTime<Utc>,
    ) -> Arc<Credential> {
        let credential = Arc::new(Credential {
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token.unwrap_or(previous_refresh),
            expires_at: issued_at
                .checked_add_signed(self.validity)
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
        });
        self.cell.publish(Arc::clone(&credential));
        credential
    }
}

fn into_authentication(err: GatewayError) -> GatewayError {
    match err {
        GatewayError::Authentication(_) => err,
        other => GatewayError::Authentication(other.to_string()),
    }
}
