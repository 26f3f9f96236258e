//! Service layer: business logic orchestration.
//!
//! [`StationSearchService`] runs searches and keeps prices fresh,
//! [`CredentialManager`] owns the provider credential and its renewal, and
//! [`StationSyncService`] imports the station listing.

pub mod credential_manager;
pub mod enrichment;
pub mod reducer;
pub mod renewal_lock;
pub mod station_sync;

pub use credential_manager::{CredentialManager, RenewalOutcome};
pub use enrichment::StationSearchService;
pub use renewal_lock::{LockAttempt, RenewalLock, RenewalLockGuard};
pub use station_sync::{StationSyncService, SyncReport};
