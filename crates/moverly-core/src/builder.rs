//! Builder for configuring MoverlyClient initialization.

use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tracing::debug;

use crate::api::{ApiClient, AuthClient};
use crate::cache::{ApiCache, MemoryApiCache};
use crate::config::ClientConfig;
use crate::error::{MoverlyError, Result};
use crate::network::{
    ConnectionMetadata, ConnectionMonitor, OfflineMonitor, OnlineSignal, ReachabilityProbe,
    RetryingFetch, SharedOnlineSignal,
};
use crate::session::{AuthSessionReader, FileTokenStorage, MemoryTokenStorage, TokenStorage};
use crate::MoverlyClient;

/// Builder for [`MoverlyClient`].
///
/// Host integrations plug in here: the online signal, the connection metadata
/// feed, token storage and the API cache all have defaults suitable for a
/// headless process.
///
/// # Example
///
/// ```rust,ignore
/// use moverly_core::{ClientConfig, MoverlyClient};
///
/// let config = ClientConfig::parse("https://api.moverly.test/v1/")?
///     .with_token_path("/tmp/moverly/auth_token");
/// let client = MoverlyClient::builder(config).build()?;
/// client.start();
/// ```
pub struct MoverlyClientBuilder {
    config: ClientConfig,
    token_storage: Option<Arc<dyn TokenStorage>>,
    online_signal: Option<Arc<dyn OnlineSignal>>,
    connection_metadata: Option<watch::Receiver<ConnectionMetadata>>,
    cache: Option<Arc<dyn ApiCache>>,
}

impl MoverlyClientBuilder {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            token_storage: None,
            online_signal: None,
            connection_metadata: None,
            cache: None,
        }
    }

    /// Use this token storage instead of the configured file or memory storage.
    pub fn with_token_storage(mut self, storage: Arc<dyn TokenStorage>) -> Self {
        self.token_storage = Some(storage);
        self
    }

    /// Drive the offline monitor from a host-provided online signal.
    ///
    /// Default: a signal that stays online, or the reachability probe's
    /// signal when reachability is configured.
    pub fn with_online_signal(mut self, signal: Arc<dyn OnlineSignal>) -> Self {
        self.online_signal = Some(signal);
        self
    }

    /// Feed host connection metadata to the connection monitor.
    ///
    /// Without a feed the monitor runs its one-shot latency probe instead.
    pub fn with_connection_metadata(mut self, rx: watch::Receiver<ConnectionMetadata>) -> Self {
        self.connection_metadata = Some(rx);
        self
    }

    /// Replace the in-memory API cache.
    pub fn with_cache(mut self, cache: Arc<dyn ApiCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn build(self) -> Result<MoverlyClient> {
        let config = self.config;

        let cache: Arc<dyn ApiCache> = match self.cache {
            Some(cache) => cache,
            None => Arc::new(MemoryApiCache::new(&config.cache)),
        };

        let storage: Arc<dyn TokenStorage> = match (self.token_storage, &config.token_path) {
            (Some(storage), _) => storage,
            (None, Some(path)) => {
                debug!("Using file token storage at {}", path.display());
                Arc::new(FileTokenStorage::new(path.clone()))
            }
            (None, None) => Arc::new(MemoryTokenStorage::new()),
        };
        let session = AuthSessionReader::new(storage);

        let (online_signal, reachability): (Arc<dyn OnlineSignal>, Option<Arc<ReachabilityProbe>>) =
            match (self.online_signal, &config.reachability) {
                (Some(_), Some(_)) => {
                    return Err(MoverlyError::Config {
                        message: "an online signal and reachability probing cannot both be set"
                            .to_string(),
                    });
                }
                (Some(signal), None) => (signal, None),
                (None, Some(reachability)) => {
                    let signal = SharedOnlineSignal::new(true);
                    let probe = ReachabilityProbe::new(reachability.clone(), signal.clone())?;
                    (Arc::new(signal), Some(Arc::new(probe)))
                }
                (None, None) => (Arc::new(SharedOnlineSignal::default()), None),
            };

        let connection = Arc::new(ConnectionMonitor::new(config.connection.clone())?);
        let offline = Arc::new(OfflineMonitor::new(Arc::clone(&cache)));
        let fetch = RetryingFetch::new(config.retry.clone())?;

        let api = Arc::new(ApiClient::new(
            config.api_base.clone(),
            fetch,
            Arc::clone(&cache),
            Arc::clone(&offline),
            Arc::clone(&connection),
            session.clone(),
        ));
        let auth = AuthClient::new(Arc::clone(&api), session.clone());

        Ok(MoverlyClient {
            config,
            cache,
            connection,
            offline,
            session,
            api,
            auth,
            online_signal,
            reachability,
            connection_metadata: Mutex::new(self.connection_metadata),
            probe_task: Mutex::new(None),
            started: AtomicBool::new(false),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::ReachabilityConfig;

    fn config() -> ClientConfig {
        ClientConfig::parse("http://127.0.0.1:9/api/").unwrap()
    }

    #[test]
    fn test_build_defaults() {
        let client = MoverlyClientBuilder::new(config()).build().unwrap();
        assert!(client.offline().online_status());
        assert!(!client.session().has_token());
        assert_eq!(client.api().base_url().as_str(), "http://127.0.0.1:9/api/");
    }

    #[test]
    fn test_online_signal_and_reachability_conflict() {
        let result = MoverlyClientBuilder::new(
            config().with_reachability(ReachabilityConfig::new(vec![
                "http://127.0.0.1:9/".to_string()
            ])),
        )
        .with_online_signal(Arc::new(SharedOnlineSignal::new(true)))
        .build();
        assert!(matches!(result, Err(MoverlyError::Config { .. })));
    }

    #[test]
    fn test_explicit_storage_wins_over_token_path() {
        let storage = Arc::new(MemoryTokenStorage::new());
        storage.store("a.b.c").unwrap();

        let client = MoverlyClientBuilder::new(config().with_token_path("/nonexistent/auth_token"))
            .with_token_storage(storage)
            .build()
            .unwrap();
        assert_eq!(client.session().token().as_deref(), Some("a.b.c"));
    }
}
