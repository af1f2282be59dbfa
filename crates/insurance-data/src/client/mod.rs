//! Authenticated provider quote client.
//!
//! One [`ProviderClient`] serves every configured provider; per-provider
//! behavior (auth scheme, timeout, rate budget) comes from the
//! [`ProviderConfig`] passed to each call. A call is gated by the rate
//! limiter, authenticated from the credential store, bounded by the
//! provider's timeout (which cancels the in-flight request), and retried
//! with exponential backoff for transient failures only.

mod auth;
mod mapping;

pub use mapping::{lookup_path, normalize_plan};

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, warn};
use reqwest::Client;
use serde_json::Value;

use crate::credentials::CredentialStore;
use crate::errors::{QuoteError, RetryClass};
use crate::models::{NormalizedPlan, TripDetails};
use crate::registry::{ProviderConfig, RateLimiter};

/// Exponential backoff settings for transient provider failures.
#[derive(Clone, Debug)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Growth factor applied to each subsequent delay.
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(1000),
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Backoff delay after the given failed attempt (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let scale = self.multiplier.powi(attempt.saturating_sub(1) as i32);
        Duration::from_secs_f64(self.initial_delay.as_secs_f64() * scale)
    }
}

/// Run an operation under the retry policy.
///
/// Retries only errors classified [`RetryClass::WithBackoff`], sleeping
/// the policy's delay between attempts. Attempts are strictly sequential:
/// attempt N+1 never starts before attempt N's failure is observed.
pub(crate) async fn run_with_retry<T, F, Fut>(
    provider: &str,
    policy: &RetryPolicy,
    mut operation: F,
) -> Result<T, QuoteError>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, QuoteError>>,
{
    let mut attempt = 1;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(error)
                if error.retry_class() == RetryClass::WithBackoff
                    && attempt < policy.max_attempts =>
            {
                let delay = policy.delay_after(attempt);
                debug!(
                    "Provider '{}' attempt {} failed ({}), retrying in {:?}",
                    provider, attempt, error, delay
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(error) => return Err(error),
        }
    }
}

/// Trait seam over the provider HTTP client.
///
/// Lets the aggregator and service layers be exercised without live
/// provider endpoints.
#[async_trait]
pub trait PlanSource: Send + Sync {
    /// Fetch and normalize one provider's plans for a trip.
    async fn fetch_plans(
        &self,
        config: &ProviderConfig,
        trip: &TripDetails,
    ) -> Result<Vec<NormalizedPlan>, QuoteError>;
}

/// HTTP client for provider quote endpoints.
pub struct ProviderClient {
    http: Client,
    credentials: Arc<CredentialStore>,
    rate_limiter: Arc<RateLimiter>,
    retry: RetryPolicy,
}

impl ProviderClient {
    /// Create a client with the default retry policy.
    pub fn new(credentials: Arc<CredentialStore>, rate_limiter: Arc<RateLimiter>) -> Self {
        Self::with_retry_policy(credentials, rate_limiter, RetryPolicy::default())
    }

    /// Create a client with a custom retry policy.
    pub fn with_retry_policy(
        credentials: Arc<CredentialStore>,
        rate_limiter: Arc<RateLimiter>,
        retry: RetryPolicy,
    ) -> Self {
        // Timeouts are enforced per provider around each call; the
        // underlying client carries no global deadline of its own.
        let http = Client::builder().build().unwrap_or_else(|_| Client::new());

        Self {
            http,
            credentials,
            rate_limiter,
            retry,
        }
    }

    /// One authenticated request attempt against the provider.
    async fn attempt(
        &self,
        config: &ProviderConfig,
        trip: &TripDetails,
    ) -> Result<Vec<NormalizedPlan>, QuoteError> {
        let headers = auth::auth_headers(config, &self.credentials)?;

        let url = format!("{}/plans", config.base_url.trim_end_matches('/'));
        let mut request = self.http.post(&url).json(trip);
        for (name, value) in headers {
            request = request.header(name, value);
        }

        debug!("POST {} for provider '{}'", url, config.name);

        // The timeout covers the full exchange; dropping the future on
        // expiry cancels this provider's in-flight request and nothing
        // else.
        let exchange = async {
            let response = request.send().await?;
            let status = response.status();
            let body = response.text().await?;
            Ok::<_, reqwest::Error>((status, body))
        };

        let (status, body) =
            match tokio::time::timeout(Duration::from_millis(config.timeout_ms), exchange).await {
                Err(_) => {
                    return Err(QuoteError::Timeout {
                        provider: config.name.clone(),
                        timeout_ms: config.timeout_ms,
                    })
                }
                Ok(Err(error)) => return Err(transport_error(config, error)),
                Ok(Ok(pair)) => pair,
            };

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(QuoteError::RateLimited {
                provider: config.name.clone(),
            });
        }

        if !status.is_success() {
            return Err(QuoteError::Status {
                provider: config.name.clone(),
                status: status.as_u16(),
                message: body,
            });
        }

        let payload: Value =
            serde_json::from_str(&body).map_err(|error| QuoteError::InvalidResponse {
                provider: config.name.clone(),
                message: format!("Failed to parse plans response: {}", error),
            })?;

        let plans: Vec<NormalizedPlan> = mapping::extract_raw_plans(&payload)
            .iter()
            .map(|raw| mapping::normalize_plan(raw, config))
            .collect();

        debug!(
            "Provider '{}' returned {} raw plans",
            config.name,
            plans.len()
        );

        Ok(plans)
    }
}

#[async_trait]
impl PlanSource for ProviderClient {
    /// Fetch plans from one provider.
    ///
    /// An exhausted rate budget rejects the call up front - no request is
    /// made and no retry is attempted. Otherwise the exchange runs under
    /// the retry policy; only transient failures are retried.
    async fn fetch_plans(
        &self,
        config: &ProviderConfig,
        trip: &TripDetails,
    ) -> Result<Vec<NormalizedPlan>, QuoteError> {
        if !self
            .rate_limiter
            .try_acquire(&config.name, config.rate_limit_per_minute)
        {
            warn!(
                "Rate limit reached for '{}', rejecting without a request",
                config.name
            );
            return Err(QuoteError::RateLimited {
                provider: config.name.clone(),
            });
        }

        run_with_retry(&config.name, &self.retry, move || {
            self.attempt(config, trip)
        })
        .await
    }
}

fn transport_error(config: &ProviderConfig, error: reqwest::Error) -> QuoteError {
    if error.is_timeout() {
        QuoteError::Timeout {
            provider: config.name.clone(),
            timeout_ms: config.timeout_ms,
        }
    } else {
        QuoteError::Network {
            provider: config.name.clone(),
            message: error.to_string(),
        }
    }
}
