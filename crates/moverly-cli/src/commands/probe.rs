//! `moverly probe` - one-shot connection quality and reachability check.

use anyhow::Result;
use clap::Args;
use moverly_core::{
    ClientConfig, ConnectionMonitor, ReachabilityConfig, ReachabilityProbe, SharedOnlineSignal,
};
use serde_json::json;
use std::time::Duration;
use url::Url;

#[derive(Args, Debug)]
pub struct ProbeArgs {
    /// Asset to time with a HEAD request (defaults to the API base URL)
    #[arg(long)]
    url: Option<Url>,

    /// Round trip above which the link counts as slow, in milliseconds
    #[arg(long, default_value = "1000")]
    slow_ms: u64,

    /// Reachability endpoints to try, in order
    #[arg(long = "reachability")]
    reachability: Vec<String>,
}

pub async fn run(config: ClientConfig, args: ProbeArgs) -> Result<()> {
    let probe_url = args.url.unwrap_or_else(|| config.api_base().clone());
    let monitor = ConnectionMonitor::new(
        config
            .connection()
            .clone()
            .with_probe_url(probe_url.clone())
            .with_slow_round_trip(Duration::from_millis(args.slow_ms)),
    )?;

    let info = monitor.probe_latency().await;

    let online = if args.reachability.is_empty() {
        None
    } else {
        let probe = ReachabilityProbe::new(
            ReachabilityConfig::new(args.reachability),
            SharedOnlineSignal::default(),
        )?;
        Some(probe.check().await)
    };

    super::print_json(&json!({
        "probe_url": probe_url.as_str(),
        "probe_failed": monitor.probe_failed(),
        "connection": info,
        "loading_strategy": info.loading_strategy(),
        "api_timeout_ms": u64::try_from(info.api_timeout().as_millis()).unwrap_or(u64::MAX),
        "online": online,
    }))
}
