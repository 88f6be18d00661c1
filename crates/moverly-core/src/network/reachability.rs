//! Reachability probing for hosts without a native online/offline signal.
//!
//! HEADs a list of probe URLs and publishes the result into a
//! [`SharedOnlineSignal`], which the offline monitor consumes like any other
//! host signal.

use super::offline::SharedOnlineSignal;
use crate::config::{AppConfig, NetworkConfig};
use crate::{MoverlyError, Result};
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::debug;

/// Configuration for reachability probing.
#[derive(Debug, Clone)]
pub struct ReachabilityConfig {
    /// URLs to probe, in order of preference.
    pub probe_urls: Vec<String>,
    /// Timeout for each probe.
    pub probe_timeout: Duration,
    /// How often the periodic probe runs.
    pub interval: Duration,
}

impl ReachabilityConfig {
    pub fn new(probe_urls: Vec<String>) -> Self {
        Self {
            probe_urls,
            probe_timeout: NetworkConfig::PROBE_TIMEOUT,
            interval: NetworkConfig::REACHABILITY_INTERVAL,
        }
    }

    #[must_use]
    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }
}

/// Probes a set of endpoints to decide whether the network is reachable.
pub struct ReachabilityProbe {
    http: Client,
    config: ReachabilityConfig,
    signal: SharedOnlineSignal,
}

impl ReachabilityProbe {
    pub fn new(config: ReachabilityConfig, signal: SharedOnlineSignal) -> Result<Self> {
        let http = Client::builder()
            .user_agent(AppConfig::USER_AGENT)
            .timeout(config.probe_timeout)
            .build()
            .map_err(|e| MoverlyError::Network {
                message: format!("Failed to create probe client: {}", e),
                cause: None,
            })?;
        Ok(Self {
            http,
            config,
            signal,
        })
    }

    /// The signal this probe writes into.
    pub fn signal(&self) -> &SharedOnlineSignal {
        &self.signal
    }

    /// Probe every URL until one answers, publish and return the result.
    pub async fn check(&self) -> bool {
        let mut online = false;
        for url in &self.config.probe_urls {
            if self.probe_url(url).await {
                online = true;
                break;
            }
            debug!("Probe failed for {}", url);
        }
        self.signal.set(online);
        online
    }

    /// Success, redirects and 403 (rate limiting) all prove the network works.
    async fn probe_url(&self, url: &str) -> bool {
        match self.http.head(url).send().await {
            Ok(resp) => {
                let status = resp.status();
                status.is_success() || status.is_redirection() || status.as_u16() == 403
            }
            Err(e) => {
                debug!("Probe request failed: {}", e);
                false
            }
        }
    }

    /// Run [`check`](Self::check) now and then every configured interval.
    ///
    /// The returned handle owns the task; abort it to stop probing.
    pub fn spawn_periodic(self: &Arc<Self>) -> JoinHandle<()> {
        let probe = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(probe.config.interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                probe.check().await;
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::offline::OnlineSignal;

    #[tokio::test]
    async fn test_no_probe_urls_means_offline() {
        let signal = SharedOnlineSignal::new(true);
        let probe = ReachabilityProbe::new(ReachabilityConfig::new(Vec::new()), signal.clone())
            .unwrap();

        assert!(!probe.check().await);
        assert!(!signal.is_online());
    }

    #[tokio::test]
    async fn test_unreachable_urls_publish_offline() {
        let signal = SharedOnlineSignal::new(true);
        let config = ReachabilityConfig::new(vec!["http://127.0.0.1:9/".to_string()])
            .with_probe_timeout(Duration::from_secs(2));
        let probe = ReachabilityProbe::new(config, signal.clone()).unwrap();

        assert!(!probe.check().await);
        assert!(!probe.signal().is_online());
    }
}
