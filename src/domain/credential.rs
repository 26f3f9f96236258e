//! Provider credential and the per-process cell that publishes it.
//!
//! [`CredentialCell`] wraps a [`tokio::sync::watch`] channel. Readers take
//! an `Arc` snapshot that is never observed half-written; the renewal path
//! builds a complete new [`Credential`] and swaps it in only on success.

use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use tokio::sync::watch;

/// Access/refresh token pair issued by the provider.
///
/// The `Debug` impl never prints token material.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    /// Short-lived token sent on every read call.
    pub access_token: String,
    /// Longer-lived token used to mint new access tokens.
    pub refresh_token: String,
    /// When the access token is assumed to stop working.
    pub expires_at: DateTime<Utc>,
}

impl Credential {
    /// Returns `true` if the credential expires within `lookahead` of `now`.
    #[must_use]
    pub fn expires_within(&self, now: DateTime<Utc>, lookahead: TimeDelta) -> bool {
        now.checked_add_signed(lookahead)
            .is_none_or(|horizon| self.expires_at <= horizon)
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Current-value cell holding the published [`Credential`], if any.
#[derive(Debug, Clone)]
pub struct CredentialCell {
    sender: Arc<watch::Sender<Option<Arc<Credential>>>>,
}

impl CredentialCell {
    /// Creates an empty cell.
    #[must_use]
    pub fn new() -> Self {
        let (sender, _) = watch::channel(None);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Returns the current snapshot.
    #[must_use]
    pub fn current(&self) -> Option<Arc<Credential>> {
        self.sender.borrow().clone()
    }

    /// Replaces the published credential and returns the previous one.
    pub fn publish(&self, credential: Arc<Credential>) -> Option<Arc<Credential>> {
        self.sender.send_replace(Some(credential))
    }
}

impl Default for CredentialCell {
    fn default() -> Self {
        Self::new()
    }
}
