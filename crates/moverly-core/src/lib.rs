//! Moverly Core - Headless client resilience layer for the Moverly backend.
//!
//! This crate keeps data fetching usable on poor or intermittent networks:
//! it classifies connection quality, tracks online/offline transitions (and
//! drops cached API responses when the network goes away), retries
//! server-class failures with exponential backoff, and answers display
//! questions about the locally stored session token.
//!
//! # Example
//!
//! ```rust,ignore
//! use moverly_core::{ClientConfig, MoverlyClient};
//!
//! #[tokio::main]
//! async fn main() -> moverly_core::Result<()> {
//!     let client = MoverlyClient::builder(ClientConfig::parse("https://api.moverly.test/v1/")?)
//!         .build()?;
//!     client.start();
//!
//!     let locations: Vec<serde_json::Value> = client.api().get_json("locations").await?;
//!     println!("{} service areas", locations.len());
//!
//!     client.dispose();
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod cache;
pub mod cancel;
pub mod config;
pub mod envelope;
pub mod error;
pub mod network;
pub mod session;

mod builder;

// Re-export commonly used types
pub use api::{ApiClient, AuthClient, SignedIn, SmsChallenge};
pub use cache::{ApiCache, CacheConfig, CachedResponse, MemoryApiCache};
pub use cancel::{CancellationToken, CancelledError};
pub use config::ClientConfig;
pub use envelope::Envelope;
pub use error::{MoverlyError, Result};
pub use network::{
    ConnectionConfig, ConnectionInfo, ConnectionMetadata, ConnectionMonitor, EffectiveType,
    FetchOptions, LoadingStrategy, OfflineMonitor, OnlineSignal, ReachabilityConfig,
    ReachabilityProbe, RetryConfig, RetryingFetch, SharedOnlineSignal, Subscription,
};
pub use session::{AuthSessionReader, FileTokenStorage, MemoryTokenStorage, TokenStorage, UserInfo};

pub use builder::MoverlyClientBuilder;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::info;

/// Composition root owning the cache, both monitors and the API clients.
///
/// Background work only begins at [`start`](Self::start) and ends at
/// [`dispose`](Self::dispose) (or drop).
pub struct MoverlyClient {
    config: ClientConfig,
    cache: Arc<dyn ApiCache>,
    connection: Arc<ConnectionMonitor>,
    offline: Arc<OfflineMonitor>,
    session: AuthSessionReader,
    api: Arc<ApiClient>,
    auth: AuthClient,
    online_signal: Arc<dyn OnlineSignal>,
    reachability: Option<Arc<ReachabilityProbe>>,
    connection_metadata: Mutex<Option<watch::Receiver<ConnectionMetadata>>>,
    probe_task: Mutex<Option<JoinHandle<()>>>,
    started: AtomicBool,
}

impl MoverlyClient {
    /// Start configuring a client.
    pub fn builder(config: ClientConfig) -> MoverlyClientBuilder {
        MoverlyClientBuilder::new(config)
    }

    /// Build a client with default integrations.
    pub fn new(config: ClientConfig) -> Result<Self> {
        Self::builder(config).build()
    }

    /// Wire host signals into the monitors. Calling again is a no-op until
    /// [`dispose`](Self::dispose).
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(&self) {
        if self.started.swap(true, Ordering::SeqCst) {
            return;
        }

        if let Some(probe) = &self.reachability {
            let handle = probe.spawn_periodic();
            *self
                .probe_task
                .lock()
                .unwrap_or_else(PoisonError::into_inner) = Some(handle);
        }

        self.offline.start(Arc::clone(&self.online_signal));

        // A metadata feed can only be consumed once; a restart falls back to probing.
        let metadata = self
            .connection_metadata
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        self.connection.start(metadata);

        info!("Moverly client started for {}", self.config.api_base());
    }

    /// Stop every background task. Safe to call repeatedly.
    pub fn dispose(&self) {
        if !self.started.swap(false, Ordering::SeqCst) {
            return;
        }
        if let Some(task) = self
            .probe_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            task.abort();
        }
        self.offline.dispose();
        self.connection.dispose();
        info!("Moverly client disposed");
    }

    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn auth(&self) -> &AuthClient {
        &self.auth
    }

    pub fn session(&self) -> &AuthSessionReader {
        &self.session
    }

    pub fn connection(&self) -> &Arc<ConnectionMonitor> {
        &self.connection
    }

    pub fn offline(&self) -> &Arc<OfflineMonitor> {
        &self.offline
    }

    pub fn cache(&self) -> &Arc<dyn ApiCache> {
        &self.cache
    }

    /// The reachability probe, when one was configured.
    pub fn reachability(&self) -> Option<&Arc<ReachabilityProbe>> {
        self.reachability.as_ref()
    }
}

impl Drop for MoverlyClient {
    fn drop(&mut self) {
        self.dispose();
    }
}
