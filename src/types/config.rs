//! Tunables for the resolver and the pipeline.

use bon::Builder;
use rand::Rng;
use std::time::Duration;

pub const DEFAULT_ENDPOINT: &str = "https://nominatim.openstreetmap.org";
pub const DEFAULT_USER_AGENT: &str = concat!("aqi-geo/", env!("CARGO_PKG_VERSION"));
pub const DEFAULT_CITY_COLUMN: &str = "city";

/// Bounded exponential backoff for transient geocoding failures.
///
/// # Examples
///
/// ```
/// use aqi_geo::RetryPolicy;
/// use std::time::Duration;
///
/// let policy = RetryPolicy::builder()
///     .max_retries(5)
///     .base_backoff(Duration::from_millis(100))
///     .build();
/// assert_eq!(policy.max_retries, 5);
/// assert_eq!(policy.max_backoff, Duration::from_secs(30));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Builder)]
pub struct RetryPolicy {
    /// Retries after the first attempt. `0` disables retrying.
    #[builder(default = 3)]
    pub max_retries: u32,
    #[builder(default = Duration::from_millis(500))]
    pub base_backoff: Duration,
    #[builder(default = Duration::from_secs(30))]
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl RetryPolicy {
    /// Policy that gives up after the first failed attempt.
    pub fn none() -> Self {
        Self::builder().max_retries(0).build()
    }

    /// Delay before retry number `retry` (1-based): `base * 2^(retry-1)` plus up to
    /// half a base of jitter, capped at `max_backoff`.
    pub fn backoff(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1).min(16);
        let exponential = self.base_backoff.saturating_mul(1 << exponent);
        let jitter_ceiling = u64::try_from(self.base_backoff.as_millis() / 2).unwrap_or(u64::MAX);
        let jitter = if jitter_ceiling == 0 {
            Duration::ZERO
        } else {
            Duration::from_millis(rand::thread_rng().gen_range(0..=jitter_ceiling))
        };
        exponential.saturating_add(jitter).min(self.max_backoff)
    }
}

/// Configuration for a [`crate::GeoCache`] run.
///
/// The defaults reproduce the conservative reference behavior: one request at a
/// time, two seconds apart, one lookup per row.
///
/// # Examples
///
/// ```
/// use aqi_geo::GeocodeConfig;
/// use std::time::Duration;
///
/// let config = GeocodeConfig::builder()
///     .user_agent("my-dashboard/1.0")
///     .min_interval(Duration::from_secs(1))
///     .concurrency(2)
///     .build();
/// assert_eq!(config.city_column, "city");
/// assert!(!config.dedupe_names);
/// ```
#[derive(Debug, Clone, PartialEq, Builder)]
pub struct GeocodeConfig {
    /// Base URL of a Nominatim-compatible service.
    #[builder(into, default = DEFAULT_ENDPOINT.to_string())]
    pub endpoint: String,
    /// Client identifier sent with every request.
    #[builder(into, default = DEFAULT_USER_AGENT.to_string())]
    pub user_agent: String,
    /// Minimum spacing between two consecutive requests, shared by all workers.
    #[builder(default = Duration::from_secs(2))]
    pub min_interval: Duration,
    /// Upper bound for a single lookup attempt.
    #[builder(default = Duration::from_secs(10))]
    pub request_timeout: Duration,
    #[builder(default)]
    pub retry: RetryPolicy,
    /// Lookups in flight at once. Values below 1 are treated as 1.
    #[builder(default = 1)]
    pub concurrency: usize,
    #[builder(into, default = DEFAULT_CITY_COLUMN.to_string())]
    pub city_column: String,
    /// Resolve each distinct (trimmed, case-folded) city name once and fan the
    /// result out to every row carrying it.
    #[builder(default = false)]
    pub dedupe_names: bool,
}

impl Default for GeocodeConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_matches_reference_pacing() {
        let config = GeocodeConfig::default();
        assert_eq!(config.min_interval, Duration::from_secs(2));
        assert_eq!(config.concurrency, 1);
        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
        assert!(config.user_agent.starts_with("aqi-geo/"));
    }

    #[test]
    fn test_backoff_grows_and_is_capped() {
        let policy = RetryPolicy::builder()
            .base_backoff(Duration::from_millis(100))
            .max_backoff(Duration::from_millis(1_000))
            .build();

        let first = policy.backoff(1);
        assert!(first >= Duration::from_millis(100));
        assert!(first <= Duration::from_millis(150));

        let third = policy.backoff(3);
        assert!(third >= Duration::from_millis(400));
        assert!(third <= Duration::from_millis(450));

        assert_eq!(policy.backoff(10), Duration::from_millis(1_000));
    }

    #[test]
    fn test_zero_base_backoff_has_no_jitter() {
        let policy = RetryPolicy::builder().base_backoff(Duration::ZERO).build();
        assert_eq!(policy.backoff(1), Duration::ZERO);
        assert_eq!(policy.backoff(4), Duration::ZERO);
    }
}
