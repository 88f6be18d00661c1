//! ConnectionMonitor - network quality classification.
//!
//! The host pushes [`ConnectionMetadata`] through a `watch` channel whenever
//! its connection-change signal fires. Hosts without that metadata fall back
//! to a single latency probe against a small static asset.

use super::listeners::{Listeners, Subscription};
use crate::config::{AppConfig, ConnectionThresholds, NetworkConfig};
use crate::{MoverlyError, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use url::Url;

/// Coarse network class reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EffectiveType {
    #[serde(rename = "slow-2g")]
    Slow2g,
    #[serde(rename = "2g")]
    TwoG,
    #[serde(rename = "3g")]
    ThreeG,
    #[serde(rename = "4g")]
    FourG,
    #[serde(rename = "unknown")]
    Unknown,
}

impl EffectiveType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EffectiveType::Slow2g => "slow-2g",
            EffectiveType::TwoG => "2g",
            EffectiveType::ThreeG => "3g",
            EffectiveType::FourG => "4g",
            EffectiveType::Unknown => "unknown",
        }
    }

    /// Parse a host-reported label; anything unrecognised is `Unknown`.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "slow-2g" => EffectiveType::Slow2g,
            "2g" => EffectiveType::TwoG,
            "3g" => EffectiveType::ThreeG,
            "4g" => EffectiveType::FourG,
            _ => EffectiveType::Unknown,
        }
    }
}

impl std::fmt::Display for EffectiveType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw connection metadata as reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConnectionMetadata {
    pub effective_type: EffectiveType,
    pub downlink_mbps: f64,
    pub rtt_ms: u32,
    pub save_data: bool,
}

/// Classified connection snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConnectionInfo {
    pub is_slow: bool,
    pub effective_type: EffectiveType,
    pub downlink_mbps: f64,
    pub rtt_ms: u32,
    pub save_data: bool,
}

impl Default for ConnectionInfo {
    fn default() -> Self {
        Self {
            is_slow: false,
            effective_type: EffectiveType::FourG,
            downlink_mbps: 10.0,
            rtt_ms: 50,
            save_data: false,
        }
    }
}

impl From<ConnectionMetadata> for ConnectionInfo {
    fn from(meta: ConnectionMetadata) -> Self {
        Self {
            is_slow: classify_slow(&meta),
            effective_type: meta.effective_type,
            downlink_mbps: meta.downlink_mbps,
            rtt_ms: meta.rtt_ms,
            save_data: meta.save_data,
        }
    }
}

impl ConnectionInfo {
    /// How the UI should present pending content.
    pub fn loading_strategy(&self) -> LoadingStrategy {
        if self.is_slow {
            LoadingStrategy::Skeleton
        } else if self.effective_type == EffectiveType::ThreeG {
            LoadingStrategy::Spinner
        } else {
            LoadingStrategy::Minimal
        }
    }

    /// Request timeout appropriate for this connection.
    pub fn api_timeout(&self) -> Duration {
        if self.is_slow {
            NetworkConfig::SLOW_REQUEST_TIMEOUT
        } else if self.effective_type == EffectiveType::ThreeG {
            NetworkConfig::THIRD_GEN_REQUEST_TIMEOUT
        } else {
            NetworkConfig::REQUEST_TIMEOUT
        }
    }
}

/// Slow when the link is 2g-class, under 1 Mbps, or above 200 ms RTT.
pub fn classify_slow(meta: &ConnectionMetadata) -> bool {
    matches!(meta.effective_type, EffectiveType::TwoG | EffectiveType::Slow2g)
        || meta.downlink_mbps < ConnectionThresholds::MIN_DOWNLINK_MBPS
        || meta.rtt_ms > ConnectionThresholds::MAX_RTT_MS
}

/// Presentation hint for content that is still loading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadingStrategy {
    Skeleton,
    Spinner,
    Minimal,
}

impl std::fmt::Display for LoadingStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoadingStrategy::Skeleton => write!(f, "skeleton"),
            LoadingStrategy::Spinner => write!(f, "spinner"),
            LoadingStrategy::Minimal => write!(f, "minimal"),
        }
    }
}

/// Configuration for the connection monitor.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Small static asset fetched with HEAD to measure latency.
    pub probe_url: Option<Url>,
    /// Round trips slower than this mark the link slow.
    pub slow_round_trip: Duration,
    /// Give up on the probe after this long.
    pub probe_timeout: Duration,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            probe_url: None,
            slow_round_trip: ConnectionThresholds::SLOW_PROBE_ROUND_TRIP,
            probe_timeout: NetworkConfig::PROBE_TIMEOUT,
        }
    }
}

impl ConnectionConfig {
    #[must_use]
    pub fn with_probe_url(mut self, url: Url) -> Self {
        self.probe_url = Some(url);
        self
    }

    #[must_use]
    pub fn with_slow_round_trip(mut self, threshold: Duration) -> Self {
        self.slow_round_trip = threshold;
        self
    }

    #[must_use]
    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }
}

/// Classifies the current network quality and publishes snapshots.
pub struct ConnectionMonitor {
    config: ConnectionConfig,
    http: Client,
    info: RwLock<ConnectionInfo>,
    listeners: Arc<Listeners<ConnectionInfo>>,
    probed: AtomicBool,
    probe_failed: AtomicBool,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl ConnectionMonitor {
    /// Create a monitor holding the default (`4g`, fast) snapshot.
    pub fn new(config: ConnectionConfig) -> Result<Self> {
        let http = Client::builder()
            .user_agent(AppConfig::USER_AGENT)
            .timeout(config.probe_timeout)
            .build()
            .map_err(|e| MoverlyError::Network {
                message: format!("Failed to create probe client: {}", e),
                cause: None,
            })?;

        Ok(Self {
            config,
            http,
            info: RwLock::new(ConnectionInfo::default()),
            listeners: Listeners::new(),
            probed: AtomicBool::new(false),
            probe_failed: AtomicBool::new(false),
            tasks: Mutex::new(Vec::new()),
        })
    }

    /// Last computed snapshot.
    pub fn connection_info(&self) -> ConnectionInfo {
        *self.info.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a listener called on every recomputation.
    pub fn subscribe(
        &self,
        listener: impl Fn(&ConnectionInfo) + Send + Sync + 'static,
    ) -> Subscription {
        self.listeners.add(listener)
    }

    pub fn is_slow_connection(&self) -> bool {
        self.connection_info().is_slow
    }

    pub fn loading_strategy(&self) -> LoadingStrategy {
        self.connection_info().loading_strategy()
    }

    pub fn api_timeout(&self) -> Duration {
        self.connection_info().api_timeout()
    }

    /// Whether the most recent latency probe failed.
    ///
    /// A failed probe leaves the previous snapshot in place, so callers that
    /// care can tell "fast" apart from "never measured".
    pub fn probe_failed(&self) -> bool {
        self.probe_failed.load(Ordering::SeqCst)
    }

    /// Recompute from a host connection-change event.
    pub fn handle_change(&self, metadata: ConnectionMetadata) {
        let info = ConnectionInfo::from(metadata);
        debug!(
            "Connection changed: {} {:.1}Mbps {}ms slow={}",
            info.effective_type, info.downlink_mbps, info.rtt_ms, info.is_slow
        );
        self.publish(info);
    }

    /// Classify the link with a single HEAD round trip to the probe asset.
    ///
    /// Runs at most once per monitor; later calls return the current snapshot.
    /// Failures are logged and keep the previous snapshot.
    pub async fn probe_latency(&self) -> ConnectionInfo {
        if self.probed.swap(true, Ordering::SeqCst) {
            return self.connection_info();
        }

        let Some(url) = self.config.probe_url.clone() else {
            debug!("No probe URL configured, keeping default connection snapshot");
            return self.connection_info();
        };

        let started = Instant::now();
        match self.http.head(url.clone()).send().await {
            Ok(response) => {
                let elapsed = started.elapsed();
                self.probe_failed.store(false, Ordering::SeqCst);
                let is_slow = elapsed > self.config.slow_round_trip;
                debug!(
                    "Latency probe {} answered {} in {:?} (slow={})",
                    url,
                    response.status().as_u16(),
                    elapsed,
                    is_slow
                );

                let previous = self.connection_info();
                self.publish(ConnectionInfo {
                    is_slow,
                    effective_type: EffectiveType::Unknown,
                    rtt_ms: u32::try_from(elapsed.as_millis()).unwrap_or(u32::MAX),
                    ..previous
                });
            }
            Err(e) => {
                self.probe_failed.store(true, Ordering::SeqCst);
                warn!("Connection speed probe failed: {}", e);
            }
        }

        self.connection_info()
    }

    /// Start observing the host.
    ///
    /// With a metadata feed, the current value is applied and every change is
    /// classified until [`dispose`](Self::dispose). Without one, the one-shot
    /// latency probe runs in the background.
    pub fn start(self: &Arc<Self>, metadata: Option<watch::Receiver<ConnectionMetadata>>) {
        let monitor = Arc::clone(self);
        let handle = match metadata {
            Some(mut rx) => {
                info!("Connection monitor watching host metadata");
                tokio::spawn(async move {
                    let initial = *rx.borrow_and_update();
                    monitor.handle_change(initial);
                    while rx.changed().await.is_ok() {
                        let metadata = *rx.borrow_and_update();
                        monitor.handle_change(metadata);
                    }
                    debug!("Connection metadata feed closed");
                })
            }
            None => {
                info!("Connection metadata unavailable, probing latency once");
                tokio::spawn(async move {
                    monitor.probe_latency().await;
                })
            }
        };
        self.tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(handle);
    }

    /// Stop every task started by [`start`](Self::start).
    pub fn dispose(&self) {
        let tasks: Vec<JoinHandle<()>> = self
            .tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect();
        if !tasks.is_empty() {
            info!("Connection monitor stopped");
        }
        for task in tasks {
            task.abort();
        }
    }

    fn publish(&self, info: ConnectionInfo) {
        *self.info.write().unwrap_or_else(PoisonError::into_inner) = info;
        self.listeners.notify(&info);
    }
}

impl Drop for ConnectionMonitor {
    fn drop(&mut self) {
        self.dispose();
    }
}
