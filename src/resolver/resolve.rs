//! Pacing, timeouts and retries around a single [`Geocoder`] lookup.

use crate::resolver::error::GeocodeError;
use crate::resolver::geocoder::Geocoder;
use crate::resolver::rate_limiter::RateLimiter;
use crate::types::config::{GeocodeConfig, RetryPolicy};
use crate::types::geo_result::GeoResult;
use bon::bon;
use log::{debug, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, timeout};

/// How a lookup ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResolveOutcome {
    /// The service returned coordinates.
    Hit,
    /// The service answered without a match.
    Miss,
    /// The name was empty; nothing was sent.
    Skipped,
    /// Every attempt failed, or the failure was not worth retrying. Recorded as a miss.
    Failed,
}

/// The [`GeoResult`] for one name together with how it was obtained.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Resolution {
    pub result: GeoResult,
    pub outcome: ResolveOutcome,
    /// Service calls made, including retries.
    pub attempts: u32,
}

impl Resolution {
    fn answered(result: GeoResult, attempts: u32) -> Self {
        let outcome = if result.is_found() {
            ResolveOutcome::Hit
        } else {
            ResolveOutcome::Miss
        };
        Self {
            result,
            outcome,
            attempts,
        }
    }

    fn skipped() -> Self {
        Self {
            result: GeoResult::Miss,
            outcome: ResolveOutcome::Skipped,
            attempts: 0,
        }
    }

    fn failed(attempts: u32) -> Self {
        Self {
            result: GeoResult::Miss,
            outcome: ResolveOutcome::Failed,
            attempts,
        }
    }
}

/// Resolves place names to coordinates while staying polite to the service.
///
/// Every attempt waits for a slot on the shared [`RateLimiter`], runs under a
/// timeout, and transient failures are retried according to the [`RetryPolicy`].
/// `resolve` never fails: a lookup that cannot be completed becomes a miss.
///
/// `min_interval` is measured from the start of one request to the start of the
/// next, not as a pause after each response.
pub struct Resolver {
    geocoder: Arc<dyn Geocoder>,
    limiter: Arc<RateLimiter>,
    retry: RetryPolicy,
    timeout: Duration,
}

#[bon]
impl Resolver {
    /// Creates a resolver.
    ///
    /// # Arguments
    ///
    /// * `.geocoder(Arc<dyn Geocoder>)`: **Required.** The backend to query.
    /// * `.limiter(Arc<RateLimiter>)`: Optional. A limiter shared with other resolvers.
    ///   When omitted, a new one is created from `min_interval`.
    /// * `.min_interval(Duration)`: Optional. Defaults to 2 seconds.
    /// * `.retry(RetryPolicy)`: Optional. Defaults to [`RetryPolicy::default`].
    /// * `.timeout(Duration)`: Optional. Per-attempt timeout, defaults to 10 seconds.
    #[builder]
    pub fn new(
        geocoder: Arc<dyn Geocoder>,
        limiter: Option<Arc<RateLimiter>>,
        min_interval: Option<Duration>,
        retry: Option<RetryPolicy>,
        timeout: Option<Duration>,
    ) -> Self {
        let limiter = limiter.unwrap_or_else(|| {
            Arc::new(RateLimiter::new(
                min_interval.unwrap_or(Duration::from_secs(2)),
            ))
        });
        Self {
            geocoder,
            limiter,
            retry: retry.unwrap_or_default(),
            timeout: timeout.unwrap_or(Duration::from_secs(10)),
        }
    }
}

impl Resolver {
    pub fn from_config(geocoder: Arc<dyn Geocoder>, config: &GeocodeConfig) -> Self {
        Self::builder()
            .geocoder(geocoder)
            .min_interval(config.min_interval)
            .retry(config.retry)
            .timeout(config.request_timeout)
            .build()
    }

    /// Resolves `name`, forwarding it to the geocoder unchanged.
    pub async fn resolve(&self, name: &str) -> Resolution {
        if name.trim().is_empty() {
            return Resolution::skipped();
        }

        let mut attempt = 0;
        loop {
            attempt += 1;
            self.limiter.acquire().await;

            let response = match timeout(self.timeout, self.geocoder.geocode(name)).await {
                Ok(response) => response,
                Err(_) => Err(GeocodeError::Timeout {
                    name: name.to_string(),
                    timeout: self.timeout,
                }),
            };

            match response {
                Ok(result) => {
                    debug!("Resolved '{}' -> {:?} after {} attempt(s)", name, result, attempt);
                    return Resolution::answered(result, attempt);
                }
                Err(err) if err.is_transient() && attempt <= self.retry.max_retries => {
                    let delay = self.retry.backoff(attempt);
                    warn!(
                        "Lookup for '{}' failed (attempt {}): {}; retrying after {:?}",
                        name, attempt, err, delay
                    );
                    sleep(delay).await;
                }
                Err(err) => {
                    warn!(
                        "Giving up on '{}' after {} attempt(s), recording a miss: {}",
                        name, attempt, err
                    );
                    return Resolution::failed(attempt);
                }
            }
        }
    }
}
