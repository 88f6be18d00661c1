//! Centralized configuration for the Moverly client layer.
//!
//! Fixed thresholds live in constant holder structs. Runtime knobs live in the
//! builder-style config types next to the components they configure
//! (`RetryConfig`, `ConnectionConfig`, `CacheConfig`, ...) and are gathered
//! by [`ClientConfig`].

use crate::cache::CacheConfig;
use crate::network::{ConnectionConfig, ReachabilityConfig, RetryConfig};
use crate::{MoverlyError, Result};
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

/// Application-level configuration.
pub struct AppConfig;

impl AppConfig {
    pub const APP_NAME: &'static str = "Moverly";
    pub const USER_AGENT: &'static str = "Moverly-Client/0.3";
    pub const CONFIG_DIR_NAME: &'static str = "moverly";
}

/// Network-related configuration.
pub struct NetworkConfig;

impl NetworkConfig {
    pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
    pub const THIRD_GEN_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);
    pub const SLOW_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
    pub const MAX_ATTEMPTS: u32 = 3;
    pub const RETRY_BASE_DELAY: Duration = Duration::from_millis(1000);
    pub const RETRY_MAX_DELAY: Duration = Duration::from_secs(30);
    pub const ONLINE_POLL_INTERVAL: Duration = Duration::from_secs(5);
    pub const PROBE_TIMEOUT: Duration = Duration::from_secs(5);
    pub const REACHABILITY_INTERVAL: Duration = Duration::from_secs(30);
}

/// Thresholds used to classify a connection as slow.
pub struct ConnectionThresholds;

impl ConnectionThresholds {
    /// Downlink below this many Mbps is slow.
    pub const MIN_DOWNLINK_MBPS: f64 = 1.0;
    /// Round trip above this many milliseconds is slow.
    pub const MAX_RTT_MS: u32 = 200;
    /// A latency probe slower than this marks the link slow.
    pub const SLOW_PROBE_ROUND_TRIP: Duration = Duration::from_millis(1000);
}

/// Session token configuration.
pub struct SessionConfig;

impl SessionConfig {
    pub const TOKEN_FILENAME: &'static str = "auth_token";
    /// Tokens with less lifetime than this need a refresh.
    pub const REFRESH_WINDOW_SECS: i64 = 5 * 60;
    pub const CACHE_TTL: Duration = Duration::from_secs(5 * 60);
    pub const CACHE_MAX_ENTRIES: u64 = 256;
}

/// Everything [`MoverlyClient`](crate::MoverlyClient) needs to start.
///
/// Only the backend base URL is required; all other fields have defaults that
/// can be overridden with the `with_*` methods.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub(crate) api_base: Url,
    pub(crate) retry: RetryConfig,
    pub(crate) connection: ConnectionConfig,
    pub(crate) reachability: Option<ReachabilityConfig>,
    pub(crate) cache: CacheConfig,
    pub(crate) token_path: Option<PathBuf>,
}

impl ClientConfig {
    /// Create a config for the given backend base URL.
    pub fn new(api_base: Url) -> Self {
        Self {
            api_base,
            retry: RetryConfig::default(),
            connection: ConnectionConfig::default(),
            reachability: None,
            cache: CacheConfig::default(),
            token_path: None,
        }
    }

    /// Parse the backend base URL from a string.
    pub fn parse(api_base: &str) -> Result<Self> {
        let url = Url::parse(api_base)?;
        if url.cannot_be_a_base() {
            return Err(MoverlyError::Config {
                message: format!("{api_base} cannot be used as a base URL"),
            });
        }
        Ok(Self::new(url))
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    #[must_use]
    pub fn with_connection(mut self, connection: ConnectionConfig) -> Self {
        self.connection = connection;
        self
    }

    /// Enable active reachability probing to drive the offline monitor.
    #[must_use]
    pub fn with_reachability(mut self, reachability: ReachabilityConfig) -> Self {
        self.reachability = Some(reachability);
        self
    }

    #[must_use]
    pub fn with_cache(mut self, cache: CacheConfig) -> Self {
        self.cache = cache;
        self
    }

    /// Persist the session token at this path instead of keeping it in memory.
    #[must_use]
    pub fn with_token_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.token_path = Some(path.into());
        self
    }

    pub fn api_base(&self) -> &Url {
        &self.api_base
    }

    pub fn retry(&self) -> &RetryConfig {
        &self.retry
    }

    pub fn connection(&self) -> &ConnectionConfig {
        &self.connection
    }
}

/// Default location of the persisted session token (`~/.config/moverly/auth_token`).
pub fn default_token_path() -> Result<PathBuf> {
    let base = dirs::config_dir().ok_or_else(|| MoverlyError::Config {
        message: "Could not determine the user config directory".to_string(),
    })?;
    Ok(base
        .join(AppConfig::CONFIG_DIR_NAME)
        .join(SessionConfig::TOKEN_FILENAME))
}
