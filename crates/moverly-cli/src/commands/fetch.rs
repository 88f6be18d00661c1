//! `moverly fetch` - GET a backend path through the client stack.

use anyhow::{Context, Result};
use clap::Args;
use moverly_core::{CancellationToken, FetchOptions, MoverlyClient, MoverlyError};
use serde_json::Value;
use std::time::Duration;
use tracing::warn;

#[derive(Args, Debug)]
pub struct FetchArgs {
    /// Path relative to the API base URL
    path: String,

    /// Attempt budget for server errors
    #[arg(long)]
    attempts: Option<u32>,

    /// Per-attempt timeout in milliseconds (defaults to the connection-based timeout)
    #[arg(long)]
    timeout_ms: Option<u64>,
}

pub async fn run(client: &MoverlyClient, args: FetchArgs) -> Result<()> {
    let cancel = CancellationToken::new();
    let mut options = FetchOptions::new().with_cancel(cancel.clone());
    if let Some(attempts) = args.attempts {
        options = options.with_max_attempts(attempts);
    }
    if let Some(ms) = args.timeout_ms {
        options = options.with_timeout(Duration::from_millis(ms));
    }

    let ctrl_c = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling request");
            cancel.cancel();
        }
    });

    let result = client
        .api()
        .get_json_with::<Value>(&args.path, options)
        .await;
    ctrl_c.abort();

    match result {
        Ok(data) => super::print_json(&data),
        Err(MoverlyError::Cancelled) => {
            eprintln!("Request cancelled");
            Ok(())
        }
        Err(e) if e.is_service_unavailable() => {
            Err(e).with_context(|| format!("Service unavailable: GET {}", args.path))
        }
        Err(e) => Err(e).with_context(|| format!("GET {} failed", args.path)),
    }
}
