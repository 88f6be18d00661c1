//! Retry logic with exponential backoff, and the retrying HTTP fetch built on it.
//!
//! The backoff doubles from `base_delay` each attempt (1s, 2s, 4s, ... with
//! the defaults) and is capped at `max_delay`, so attempt budgets above three
//! keep growing instead of reusing the last delay.

use crate::cancel::CancellationToken;
use crate::config::{AppConfig, NetworkConfig};
use crate::{MoverlyError, Result};
use rand::Rng;
use reqwest::{Client, Request, Response};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Configuration for retry behavior.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts (including the first one).
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub base_delay: Duration,
    /// Maximum delay cap.
    pub max_delay: Duration,
    /// Exponential base (2.0 for doubling).
    pub exponential_base: f64,
    /// Whether to add random jitter to delays.
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: NetworkConfig::MAX_ATTEMPTS,
            base_delay: NetworkConfig::RETRY_BASE_DELAY,
            max_delay: NetworkConfig::RETRY_MAX_DELAY,
            exponential_base: 2.0,
            jitter: false,
        }
    }
}

impl RetryConfig {
    /// Create a new retry config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum number of attempts.
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Set the base delay.
    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    /// Set the maximum delay cap.
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Enable or disable jitter.
    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// Calculate the delay after a failed attempt (0-indexed).
    pub fn calculate_delay(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let multiplier = self.exponential_base.powi(exponent);
        let delay_secs = self.base_delay.as_secs_f64() * multiplier;
        let capped_secs = delay_secs.min(self.max_delay.as_secs_f64());

        let final_secs = if self.jitter {
            // Multiply by 0.5..1.5 so the mean stays put and no delay nears zero
            let mut rng = rand::rng();
            let jitter_factor = rng.random_range(0.5..1.5);
            (capped_secs * jitter_factor).min(self.max_delay.as_secs_f64())
        } else {
            capped_secs
        };

        Duration::from_secs_f64(final_secs)
    }
}

/// Statistics about a retry operation.
#[derive(Debug, Clone, Default)]
pub struct RetryStats {
    /// Number of attempts made.
    pub attempts: u32,
    /// Total delay accumulated.
    pub total_delay: Duration,
    /// Whether the operation ultimately succeeded.
    pub success: bool,
    /// Last error message if failed.
    pub last_error: Option<String>,
}

/// Retry an async operation with exponential backoff.
///
/// Returns the final result together with [`RetryStats`].
pub async fn retry_async<F, Fut, T, E>(
    config: &RetryConfig,
    operation: F,
    should_retry: impl Fn(&E) -> bool,
) -> (std::result::Result<T, E>, RetryStats)
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = std::result::Result<T, E>>,
    E: std::fmt::Display + From<crate::cancel::CancelledError>,
{
    retry_async_cancellable(config, None, operation, should_retry).await
}

/// [`retry_async`] that also stops when `cancel` fires.
///
/// Cancellation is checked before every attempt and interrupts the backoff
/// sleep; it never interrupts the operation itself, which callers race
/// against the token when they need to.
pub async fn retry_async_cancellable<F, Fut, T, E>(
    config: &RetryConfig,
    cancel: Option<&CancellationToken>,
    mut operation: F,
    should_retry: impl Fn(&E) -> bool,
) -> (std::result::Result<T, E>, RetryStats)
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = std::result::Result<T, E>>,
    E: std::fmt::Display + From<crate::cancel::CancelledError>,
{
    let mut stats = RetryStats::default();
    let max_attempts = config.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        if let Some(token) = cancel {
            if let Err(cancelled) = token.check() {
                debug!("Cancelled before attempt {}", attempt + 1);
                return (Err(cancelled.into()), stats);
            }
        }

        stats.attempts = attempt + 1;

        let error = match operation(attempt).await {
            Ok(value) => {
                stats.success = true;
                if attempt > 0 {
                    debug!("Operation succeeded after {} attempts", attempt + 1);
                }
                return (Ok(value), stats);
            }
            Err(e) => e,
        };

        stats.last_error = Some(error.to_string());

        if !should_retry(&error) {
            debug!("Error is not retryable: {}", error);
            return (Err(error), stats);
        }

        if attempt + 1 >= max_attempts {
            warn!(
                "All {} retry attempts exhausted. Last error: {}",
                max_attempts, error
            );
            return (Err(error), stats);
        }

        let delay = config.calculate_delay(attempt);
        stats.total_delay += delay;

        warn!(
            "Attempt {}/{} failed: {}. Retrying in {:?}",
            attempt + 1,
            max_attempts,
            error,
            delay
        );

        match cancel {
            Some(token) => {
                tokio::select! {
                    _ = tokio::time::sleep(delay) => {}
                    _ = token.cancelled() => {
                        debug!("Cancelled during backoff after attempt {}", attempt + 1);
                        return (Err(crate::cancel::CancelledError.into()), stats);
                    }
                }
            }
            None => tokio::time::sleep(delay).await,
        }

        attempt += 1;
    }
}

/// Per-call overrides for [`RetryingFetch::fetch_with`].
#[derive(Debug, Clone, Default)]
pub struct FetchOptions {
    /// Attempt budget; falls back to the fetcher's [`RetryConfig`].
    pub max_attempts: Option<u32>,
    /// Timeout applied to each attempt.
    pub timeout: Option<Duration>,
    /// Token that aborts the request and any pending retry.
    pub cancel: Option<CancellationToken>,
}

impl FetchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = Some(attempts);
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = Some(cancel);
        self
    }
}

/// Performs one logical HTTP request, retrying transient server failures.
///
/// A response with status ≥ 500 and any transport error are retried until the
/// attempt budget runs out; every other response (4xx included) is returned
/// as-is on the first attempt.
#[derive(Debug, Clone)]
pub struct RetryingFetch {
    client: Client,
    config: RetryConfig,
}

impl RetryingFetch {
    /// Create a fetcher with its own HTTP client.
    pub fn new(config: RetryConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(AppConfig::USER_AGENT)
            .build()
            .map_err(|e| MoverlyError::Network {
                message: format!("Failed to create HTTP client: {}", e),
                cause: None,
            })?;
        Ok(Self::with_client(client, config))
    }

    /// Use a custom HTTP client (for connection pool reuse or testing).
    pub fn with_client(client: Client, config: RetryConfig) -> Self {
        Self { client, config }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// GET a URL with the default retry budget.
    pub async fn get(&self, url: &str) -> Result<Response> {
        let request = self.client.get(url).build()?;
        self.fetch(request).await
    }

    /// Execute a request with the default retry budget.
    pub async fn fetch(&self, request: Request) -> Result<Response> {
        self.fetch_with(request, FetchOptions::default()).await
    }

    /// Execute a request with per-call overrides.
    ///
    /// The request is cloned for every attempt, so streaming bodies are
    /// rejected up front with [`MoverlyError::Validation`].
    pub async fn fetch_with(&self, request: Request, options: FetchOptions) -> Result<Response> {
        if request.try_clone().is_none() {
            return Err(MoverlyError::Validation {
                field: "body".to_string(),
                message: "streaming request bodies cannot be retried".to_string(),
            });
        }

        let config = match options.max_attempts {
            Some(attempts) => self.config.clone().with_max_attempts(attempts),
            None => self.config.clone(),
        };
        let max_attempts = config.max_attempts.max(1);
        let url = request.url().to_string();
        let method = request.method().clone();

        let (result, stats) = retry_async_cancellable(
            &config,
            options.cancel.as_ref(),
            |attempt| {
                let attempt_request = request.try_clone();
                let url = url.as_str();
                let method = &method;
                let cancel = options.cancel.as_ref();
                let timeout = options.timeout;
                async move {
                    let Some(mut attempt_request) = attempt_request else {
                        return Err(MoverlyError::Other(
                            "request could not be cloned".to_string(),
                        ));
                    };
                    if let Some(timeout) = timeout {
                        *attempt_request.timeout_mut() = Some(timeout);
                    }

                    let outcome = match cancel {
                        Some(token) => tokio::select! {
                            result = self.client.execute(attempt_request) => result,
                            _ = token.cancelled() => return Err(MoverlyError::Cancelled),
                        },
                        None => self.client.execute(attempt_request).await,
                    };

                    match outcome {
                        Ok(response) if response.status().is_server_error() => {
                            let status = response.status().as_u16();
                            debug!(
                                "{} {} attempt {}/{}: server error {}",
                                method,
                                url,
                                attempt + 1,
                                max_attempts,
                                status
                            );
                            Err(MoverlyError::ServerError {
                                status,
                                url: url.to_string(),
                            })
                        }
                        Ok(response) => {
                            debug!(
                                "{} {} attempt {}/{}: status {}",
                                method,
                                url,
                                attempt + 1,
                                max_attempts,
                                response.status().as_u16()
                            );
                            Ok(response)
                        }
                        Err(e) => {
                            debug!(
                                "{} {} attempt {}/{}: transport error: {}",
                                method,
                                url,
                                attempt + 1,
                                max_attempts,
                                e
                            );
                            if e.is_timeout() {
                                Err(MoverlyError::Timeout(timeout.unwrap_or_default()))
                            } else {
                                Err(e.into())
                            }
                        }
                    }
                }
            },
            MoverlyError::is_retryable,
        )
        .await;

        if !stats.success {
            debug!(
                "{} {} gave up after {} attempt(s), {:?} total backoff",
                method, url, stats.attempts, stats.total_delay
            );
        }

        result
    }
}
