//! The seam between the pipeline and an external geocoding service.

use crate::resolver::error::GeocodeError;
use crate::types::geo_result::{GeoResult, LatLon};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// A single place-name lookup against some geocoding backend.
///
/// Implementations make exactly one attempt per call. Pacing, retries and
/// timeouts are layered on top by [`crate::Resolver`].
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Looks up `name` as-is. `Ok(GeoResult::Miss)` means the service answered
    /// but had no match.
    async fn geocode(&self, name: &str) -> Result<GeoResult, GeocodeError>;
}

/// A geocoder backed by a fixed lookup table.
///
/// Names not in the table are misses. Every call is counted, which makes it handy
/// for offline fixtures and for asserting how often the pipeline reached out.
///
/// # Examples
///
/// ```
/// use aqi_geo::{Geocoder, GeoResult, LatLon, StaticGeocoder};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), aqi_geo::GeocodeError> {
/// let geocoder = StaticGeocoder::new([("Springfield", LatLon(39.80, -89.64))]);
/// assert_eq!(
///     geocoder.geocode("Springfield").await?,
///     GeoResult::Found(LatLon(39.80, -89.64))
/// );
/// assert_eq!(geocoder.geocode("Nowhereville").await?, GeoResult::Miss);
/// assert_eq!(geocoder.calls(), 2);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct StaticGeocoder {
    places: HashMap<String, LatLon>,
    latency: Duration,
    calls: AtomicUsize,
}

impl StaticGeocoder {
    pub fn new<I, S>(places: I) -> Self
    where
        I: IntoIterator<Item = (S, LatLon)>,
        S: Into<String>,
    {
        Self {
            places: places
                .into_iter()
                .map(|(name, lat_lon)| (name.into(), lat_lon))
                .collect(),
            latency: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    /// Makes every lookup take at least `latency`, like a slow remote service would.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Number of lookups served so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Geocoder for StaticGeocoder {
    async fn geocode(&self, name: &str) -> Result<GeoResult, GeocodeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        Ok(self.places.get(name).copied().into())
    }
}
