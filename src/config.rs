//! Gateway configuration loaded from environment variables.
//!
//! Follows 12-factor style: all settings come from environment variables
//! (or a `.env` file via `dotenvy`). Unset or unparsable values fall back
//! to the defaults documented on each field.

use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Top-level gateway configuration.
///
/// Loaded once at startup via [`GatewayConfig::from_env`].
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Socket address to bind the HTTP server to (e.g. `0.0.0.0:5269`).
    pub listen_addr: SocketAddr,

    /// SQLite connection string.
    pub database_url: String,

    /// Maximum number of database connections in the pool.
    pub database_max_connections: u32,

    /// Minimum idle connections in the pool.
    pub database_min_connections: u32,

    /// Timeout in seconds for acquiring a database connection.
    pub database_connect_timeout_secs: u64,

    /// Remote price provider settings.
    pub provider: ProviderSettings,

    /// Credential renewal settings.
    pub renewal: RenewalSettings,

    /// Search enrichment settings.
    pub enrichment: EnrichmentSettings,

    /// Whether to import the remote station listing at startup.
    pub station_sync_on_startup: bool,

    /// Upper bound on handling one inbound HTTP request.
    pub request_timeout: Duration,

    /// Emit logs as JSON lines instead of human-readable text.
    pub log_json: bool,
}

/// Connection settings for the remote price provider.
#[derive(Debug, Clone)]
pub struct ProviderSettings {
    /// Base URL, without trailing slash (e.g. `https://api.tankille.fi`).
    pub base_url: String,
    /// Login identity.
    pub identity: ProviderIdentity,
    /// Value of the `user-agent` header sent on every call.
    pub user_agent: String,
    /// Value of the `accept-language` header sent on every call.
    pub accept_language: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

/// Identity used to log in to the provider.
///
/// The `Debug` impl redacts the password.
#[derive(Clone, Default)]
pub struct ProviderIdentity {
    /// Account email.
    pub email: Option<String>,
    /// Account password.
    pub password: Option<String>,
    /// Device label reported at login.
    pub device: Option<String>,
}

impl fmt::Debug for ProviderIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderIdentity")
            .field("email", &self.email)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("device", &self.device)
            .finish()
    }
}

/// Timing and locking settings for credential renewal.
#[derive(Debug, Clone)]
pub struct RenewalSettings {
    /// How often the background loop checks the credential.
    pub interval: Duration,
    /// Renew when the credential expires within this window.
    pub lookahead: Duration,
    /// Validity assumed for a freshly minted access token.
    pub token_validity: Duration,
    /// Marker file used as the cross-process renewal lock.
    pub lock_path: PathBuf,
    /// Age after which a leftover marker is considered leaked.
    /// `None` disables automatic recovery.
    pub lock_stale_after: Option<Duration>,
}

impl Default for RenewalSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            lookahead: Duration::from_secs(5 * 60),
            token_validity: Duration::from_secs(60 * 60),
            lock_path: PathBuf::from("/tmp/fuel-price-gateway-token-refresh.lock"),
            lock_stale_after: None,
        }
    }
}

/// Settings for the freshness-driven price enrichment.
#[derive(Debug, Clone)]
pub struct EnrichmentSettings {
    /// Cached prices younger than this are served without a refresh.
    pub freshness_window: Duration,
    /// Lower bound sent as `since` on every price history fetch.
    pub history_since: String,
    /// Maximum number of stations enriched concurrently per request.
    pub concurrency: usize,
}

impl Default for EnrichmentSettings {
    fn default() -> Self {
        Self {
            freshness_window: Duration::from_secs(20 * 60),
            history_since: "2024-06-01T00:00:00Z".to_string(),
            concurrency: 16,
        }
    }
}

impl GatewayConfig {
    /// Loads configuration from environment variables.
    ///
    /// Falls back to sensible defaults when a variable is not set.
    /// Calls `dotenvy::dotenv().ok()` to optionally load a `.env` file.
    ///
    /// # Errors
    ///
    /// Returns an error if `LISTEN_ADDR` is set but cannot be parsed as
    /// a [`SocketAddr`].
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        dotenvy::dotenv().ok();

        let listen_addr: SocketAddr = std::env::var("LISTEN_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:5269".to_string())
            .parse()?;

        let database_url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://data/fuel_prices.db?mode=rwc".to_string());

        let database_max_connections = parse_env("DATABASE_MAX_CONNECTIONS", 10);
        let database_min_connections = parse_env("DATABASE_MIN_CONNECTIONS", 1);
        let database_connect_timeout_secs = parse_env("DATABASE_CONNECT_TIMEOUT_SECS", 5);

        let provider = ProviderSettings {
            base_url: std::env::var("PROVIDER_BASE_URL")
                .unwrap_or_else(|_| "https://api.tankille.fi".to_string())
                .trim_end_matches('/')
                .to_string(),
            identity: ProviderIdentity {
                email: non_empty_env("PROVIDER_EMAIL"),
                password: non_empty_env("PROVIDER_PASSWORD"),
                device: non_empty_env("PROVIDER_DEVICE"),
            },
            user_agent: non_empty_env("PROVIDER_USER_AGENT").unwrap_or_else(|| {
                concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")).to_string()
            }),
            accept_language: non_empty_env("PROVIDER_ACCEPT_LANGUAGE")
                .unwrap_or_else(|| "en".to_string()),
            timeout: Duration::from_secs(parse_env("PROVIDER_TIMEOUT_SECS", 15)),
        };

        let renewal_defaults = RenewalSettings::default();
        let stale_secs: u64 = parse_env("RENEWAL_LOCK_STALE_SECS", 0);
        let renewal = RenewalSettings {
            interval: Duration::from_secs(parse_env("TOKEN_RENEWAL_INTERVAL_SECS", 60)),
            lookahead: Duration::from_secs(parse_env("TOKEN_RENEWAL_LOOKAHEAD_SECS", 300)),
            token_validity: Duration::from_secs(parse_env("TOKEN_VALIDITY_SECS", 3600)),
            lock_path: non_empty_env("RENEWAL_LOCK_PATH")
                .map_or(renewal_defaults.lock_path, PathBuf::from),
            lock_stale_after: (stale_secs > 0).then(|| Duration::from_secs(stale_secs)),
        };

        let enrichment_defaults = EnrichmentSettings::default();
        let enrichment = EnrichmentSettings {
            freshness_window: Duration::from_secs(parse_env("PRICE_FRESHNESS_WINDOW_SECS", 1200)),
            history_since: non_empty_env("PRICE_HISTORY_SINCE")
                .unwrap_or(enrichment_defaults.history_since),
            concurrency: parse_env("ENRICHMENT_CONCURRENCY", enrichment_defaults.concurrency)
                .max(1),
        };

        let station_sync_on_startup = parse_env_bool("STATION_SYNC_ON_STARTUP", true);
        let request_timeout = Duration::from_secs(parse_env("REQUEST_TIMEOUT_SECS", 120));
        let log_json = std::env::var("LOG_FORMAT")
            .map(|v| v.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        Ok(Self {
            listen_addr,
            database_url,
            database_max_connections,
            database_min_connections,
            database_connect_timeout_secs,
            provider,
            renewal,
            enrichment,
            station_sync_on_startup,
            request_timeout,
            log_json,
        })
    }
}

/// Parses an environment variable as `T`, returning `default` on missing
/// or invalid values.
fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Parses an environment variable as a boolean. Accepts `"true"`, `"1"`,
/// `"false"`, `"0"` (case-insensitive). Returns `default` otherwise.
fn parse_env_bool(key: &str, default: bool) -> bool {
    match std::env::var(key).ok().as_deref().map(str::to_ascii_lowercase).as_deref() {
        Some("true") | Some("1") => true,
        Some("false") | Some("0") => false,
        _ => default,
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}
