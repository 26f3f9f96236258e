//! Cross-process renewal lock backed by an exclusively created marker file.
//!
//! Every worker process on the host points at the same marker path. The
//! first to create it owns the renewal; everyone else sees
//! [`LockAttempt::AlreadyHeld`] and skips. Contention is an outcome, not an
//! error.
//!
//! # Leak recovery
//!
//! A process killed while holding the lock leaves the marker behind, and
//! renewals stop system-wide until it is removed. Either delete the file by
//! hand or set a staleness TTL: an older marker is then removed and the
//! create retried once. Two workers may both judge the same marker stale;
//! the later removal can then delete the marker the earlier one just
//! created. Keep the TTL well above the time a renewal takes.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::RenewalSettings;
use crate::error::GatewayError;

/// Contents written into the marker file.
#[derive(Debug, Serialize, Deserialize)]
struct Marker {
    owner: Uuid,
    pid: u32,
    created_at: DateTime<Utc>,
}

/// Result of [`RenewalLock::try_acquire`].
#[derive(Debug)]
pub enum LockAttempt {
    /// The lock is ours until the guard is dropped.
    Held(RenewalLockGuard),
    /// Another holder owns the marker.
    AlreadyHeld,
}

/// Marker-file lock shared by all workers on a host.
#[derive(Debug, Clone)]
pub struct RenewalLock {
    path: PathBuf,
    stale_after: Option<Duration>,
}

impl RenewalLock {
    /// Creates a lock over `path`. `stale_after` enables leak recovery.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, stale_after: Option<Duration>) -> Self {
        Self {
            path: path.into(),
            stale_after,
        }
    }

    /// Creates the lock described by the renewal settings.
    #[must_use]
    pub fn from_settings(settings: &RenewalSettings) -> Self {
        Self::new(settings.lock_path.clone(), settings.lock_stale_after)
    }

    /// Marker file location.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Attempts to take the lock without waiting.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Lock`] if the marker cannot be created for a
    /// reason other than it already existing.
    pub fn try_acquire(&self) -> Result<LockAttempt, GatewayError> {
        if let Some(guard) = self.create_marker()? {
            return Ok(LockAttempt::Held(guard));
        }
        if self.remove_if_stale()? {
            return Ok(self
                .create_marker()?
                .map_or(LockAttempt::AlreadyHeld, LockAttempt::Held));
        }
        debug!(path = %self.path.display(), "renewal lock already held");
        Ok(LockAttempt::AlreadyHeld)
    }

    fn create_marker(&self) -> Result<Option<RenewalLockGuard>, GatewayError> {
        let created = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&self.path);

        let mut file = match created {
            Ok(file) => file,
            Err(error) if error.kind() == ErrorKind::AlreadyExists => return Ok(None),
            Err(error) => {
                return Err(GatewayError::Lock(format!(
                    "cannot create {}: {error}",
                    self.path.display()
                )));
            }
        };

        let marker = Marker {
            owner: Uuid::new_v4(),
            pid: std::process::id(),
            created_at: Utc::now(),
        };
        let written = serde_json::to_vec(&marker)
            .map_err(std::io::Error::other)
            .and_then(|bytes| file.write_all(&bytes));
        drop(file);

        if let Err(error) = written {
            // The file exists but is not a usable marker; do not leak it.
            let _ = fs::remove_file(&self.path);
            return Err(GatewayError::Lock(format!(
                "cannot write {}: {error}",
                self.path.display()
            )));
        }

        Ok(Some(RenewalLockGuard {
            path: self.path.clone(),
            owner: marker.owner,
        }))
    }

    /// Removes the marker if it is older than the TTL. Returns `true` when
    /// the marker is gone and a retry makes sense.
    fn remove_if_stale(&self) -> Result<bool, GatewayError> {
        let Some(ttl) = self.stale_after else {
            return Ok(false);
        };

        let modified = match fs::metadata(&self.path).and_then(|m| m.modified()) {
            Ok(modified) => modified,
            Err(error) if error.kind() == ErrorKind::NotFound => return Ok(true),
            Err(error) => {
                return Err(GatewayError::Lock(format!(
                    "cannot inspect {}: {error}",
                    self.path.display()
                )));
            }
        };
        let age = SystemTime::now()
            .duration_since(modified)
            .unwrap_or_default();
        if age < ttl {
            return Ok(false);
        }

        warn!(
            path = %self.path.display(),
            age_secs = age.as_secs(),
            holder = ?read_marker(&self.path).map(|m| m.pid),
            "removing stale renewal lock marker"
        );
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(true),
            Err(error) if error.kind() == ErrorKind::NotFound => Ok(true),
            Err(error) => Err(GatewayError::Lock(format!(
                "cannot remove {}: {error}",
                self.path.display()
            ))),
        }
    }
}

/// Scoped ownership of the renewal lock. Dropping it removes the marker.
#[derive(Debug)]
pub struct RenewalLockGuard {
    path: PathBuf,
    owner: Uuid,
}

impl Drop for RenewalLockGuard {
    fn drop(&mut self) {
        match read_marker(&self.path) {
            Some(marker) if marker.owner == self.owner => {
                if let Err(error) = fs::remove_file(&self.path) {
                    warn!(path = %self.path.display(), %error, "failed to release renewal lock");
                }
            }
            _ => {
                warn!(
                    path = %self.path.display(),
                    "renewal lock marker no longer ours; leaving it in place"
                );
            }
        }
    }
}

fn read_marker(path: &Path) -> Option<Marker> {
    fs::read(path)
        .ok()
        .and_then(|bytes| serde_json::from_slice(&bytes).ok())
}
