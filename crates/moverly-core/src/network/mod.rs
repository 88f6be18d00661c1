//! Network resilience: connection quality, online/offline tracking and retries.
//!
//! This module provides:
//! - Connection quality classification with adaptive timeouts
//! - Online/offline monitoring that invalidates the API cache on outages
//! - Reachability probing for hosts without a native online signal
//! - Retry logic with exponential backoff and a retrying HTTP fetch

mod connection;
mod listeners;
mod offline;
mod reachability;
mod retry;

pub use connection::{
    classify_slow, ConnectionConfig, ConnectionInfo, ConnectionMetadata, ConnectionMonitor,
    EffectiveType, LoadingStrategy,
};
pub use listeners::Subscription;
pub use offline::{OfflineMonitor, OnlineSignal, SharedOnlineSignal};
pub use reachability::{ReachabilityConfig, ReachabilityProbe};
pub use retry::{
    retry_async, retry_async_cancellable, FetchOptions, RetryConfig, RetryStats, RetryingFetch,
};
