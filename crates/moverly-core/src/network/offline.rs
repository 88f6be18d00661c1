//! OfflineMonitor - online/offline tracking with cache invalidation.
//!
//! Only an online → offline edge clears the API cache. Coming back online
//! forces nothing; consumers re-request on demand.

use super::listeners::{Listeners, Subscription};
use crate::cache::ApiCache;
use crate::config::NetworkConfig;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Source of the host's online/offline signal.
pub trait OnlineSignal: Send + Sync {
    /// Current value, read by the fallback poll.
    fn is_online(&self) -> bool;

    /// Change feed, the equivalent of the host's online/offline events.
    fn changes(&self) -> watch::Receiver<bool>;
}

/// [`OnlineSignal`] backed by a `watch` channel the host writes into.
#[derive(Debug, Clone)]
pub struct SharedOnlineSignal {
    tx: Arc<watch::Sender<bool>>,
}

impl SharedOnlineSignal {
    pub fn new(online: bool) -> Self {
        let (tx, _rx) = watch::channel(online);
        Self { tx: Arc::new(tx) }
    }

    /// Publish a new value. Receivers are only woken when the value changes.
    pub fn set(&self, online: bool) {
        self.tx.send_if_modified(|current| {
            if *current == online {
                false
            } else {
                *current = online;
                true
            }
        });
    }

    /// Overwrite the value without waking change receivers, so only the
    /// fallback poll can observe it.
    pub fn set_silently(&self, online: bool) {
        self.tx.send_if_modified(|current| {
            *current = online;
            false
        });
    }
}

impl Default for SharedOnlineSignal {
    fn default() -> Self {
        Self::new(true)
    }
}

impl OnlineSignal for SharedOnlineSignal {
    fn is_online(&self) -> bool {
        *self.tx.borrow()
    }

    fn changes(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}

/// Tracks connectivity and keeps the API cache honest across outages.
pub struct OfflineMonitor {
    cache: Arc<dyn ApiCache>,
    online: AtomicBool,
    listeners: Arc<Listeners<bool>>,
    poll_interval: Duration,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl OfflineMonitor {
    /// Create a monitor that starts out online.
    pub fn new(cache: Arc<dyn ApiCache>) -> Self {
        Self {
            cache,
            online: AtomicBool::new(true),
            listeners: Listeners::new(),
            poll_interval: NetworkConfig::ONLINE_POLL_INTERVAL,
            tasks: Mutex::new(Vec::new()),
        }
    }

    /// Override the fallback poll interval (5 seconds by default).
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn online_status(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    pub fn should_show_offline_message(&self) -> bool {
        !self.online_status()
    }

    /// Register a listener called with the status on every observation.
    pub fn subscribe(&self, listener: impl Fn(&bool) + Send + Sync + 'static) -> Subscription {
        self.listeners.add(listener)
    }

    /// Manually force-clear the API cache.
    pub fn clear_cache(&self) {
        info!("Clearing API cache on request");
        self.cache.force_clear();
    }

    /// Apply an observed status.
    ///
    /// Event and poll paths both land here. Repeating the current status only
    /// re-notifies listeners; the cache is cleared once per online → offline
    /// edge.
    pub fn handle_status(&self, online: bool) {
        let was_online = self.online.swap(online, Ordering::SeqCst);

        match (was_online, online) {
            (true, false) => {
                warn!("Network went offline, clearing API cache");
                self.cache.force_clear();
            }
            (false, true) => info!("Network back online"),
            _ => {}
        }

        self.listeners.notify(&online);
    }

    /// Start observing `signal` through its change feed and a fallback poll.
    pub fn start(self: &Arc<Self>, signal: Arc<dyn OnlineSignal>) {
        self.handle_status(signal.is_online());

        let events = {
            let monitor = Arc::clone(self);
            let mut rx = signal.changes();
            tokio::spawn(async move {
                while rx.changed().await.is_ok() {
                    let online = *rx.borrow_and_update();
                    debug!("Online event: {}", online);
                    monitor.handle_status(online);
                }
            })
        };

        let poll = {
            let monitor = Arc::clone(self);
            let interval = self.poll_interval;
            tokio::spawn(async move {
                let mut ticker = tokio::time::interval(interval);
                ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
                ticker.tick().await;
                loop {
                    ticker.tick().await;
                    let online = signal.is_online();
                    if online != monitor.online_status() {
                        debug!("Poll caught missed transition to online={}", online);
                    }
                    monitor.handle_status(online);
                }
            })
        };

        info!("Offline monitor started (poll every {:?})", self.poll_interval);
        let mut tasks = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
        tasks.push(events);
        tasks.push(poll);
    }

    /// Stop the event watcher and the poll.
    pub fn dispose(&self) {
        let tasks: Vec<JoinHandle<()>> = self
            .tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect();
        if !tasks.is_empty() {
            info!("Offline monitor stopped");
        }
        for task in tasks {
            task.abort();
        }
    }

    pub fn is_running(&self) -> bool {
        !self
            .tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_empty()
    }
}

impl Drop for OfflineMonitor {
    fn drop(&mut self) {
        self.dispose();
    }
}
