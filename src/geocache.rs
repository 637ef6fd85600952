//! This module provides the main entry point of the crate: [`GeoCache`], which makes
//! sure an input table has been geocoded exactly once and that the enriched result
//! is available from durable storage.

use crate::dataset::{city_names, merge_geo_results};
use crate::error::GeoCacheError;
use crate::resolver::geocoder::Geocoder;
use crate::resolver::nominatim::NominatimGeocoder;
use crate::resolver::resolve::{Resolution, ResolveOutcome, Resolver};
use crate::store::CacheStore;
use crate::types::cache_state::CacheState;
use crate::types::config::GeocodeConfig;
use crate::types::geo_result::GeoResult;
use bon::bon;
use futures_util::{stream, StreamExt};
use log::{debug, info};
use polars::frame::DataFrame;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Counters describing one resolving run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EnrichmentReport {
    /// Rows in the input table.
    pub rows: usize,
    /// Distinct lookups performed (equal to non-blank rows unless names are de-duplicated).
    pub lookups: usize,
    pub hits: usize,
    pub misses: usize,
    /// Lookups that failed and were recorded as misses.
    pub failures: usize,
    /// Rows with an empty or null city, which were never sent to the service.
    pub skipped: usize,
    /// Rows that reused the result of an earlier row with the same name.
    pub shared: usize,
    /// Service calls including retries.
    pub attempts: u32,
}

impl fmt::Display for EnrichmentReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} rows, {} lookups ({} hits, {} misses, {} failed), {} skipped, {} shared, {} service calls",
            self.rows,
            self.lookups,
            self.hits,
            self.misses,
            self.failures,
            self.skipped,
            self.shared,
            self.attempts
        )
    }
}

/// Where the returned table came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableSource {
    /// Loaded from an existing cache artifact without touching the geocoder.
    Cached,
    /// Freshly resolved and persisted during this call.
    Resolved(EnrichmentReport),
}

/// The enriched table, now backed by the cache artifact.
#[derive(Debug, Clone)]
pub struct GeocodedTable {
    pub frame: DataFrame,
    pub source: TableSource,
}

impl GeocodedTable {
    pub fn from_cache(&self) -> bool {
        matches!(self.source, TableSource::Cached)
    }

    pub fn report(&self) -> Option<&EnrichmentReport> {
        match &self.source {
            TableSource::Cached => None,
            TableSource::Resolved(report) => Some(report),
        }
    }
}

/// Geocodes a city table once and serves it from a [`CacheStore`] afterwards.
///
/// The existence of a stored table is the only thing consulted: when one is
/// present it is returned as-is, whatever coordinates it holds, and no lookups are
/// made. Otherwise every row is resolved, the whole table is persisted in one
/// write, and that table is returned.
///
/// # Examples
///
/// ```
/// use aqi_geo::{GeoCache, GeocodeConfig, LatLon, MemoryStore, StaticGeocoder};
/// use polars::prelude::*;
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), aqi_geo::GeoCacheError> {
/// let geocoder = Arc::new(StaticGeocoder::new([("Springfield", LatLon(39.80, -89.64))]));
/// let cache = GeoCache::builder()
///     .store(Arc::new(MemoryStore::new()))
///     .geocoder(geocoder.clone())
///     .config(GeocodeConfig::builder().min_interval(Duration::ZERO).build())
///     .build();
///
/// let input = df!("city" => ["Springfield", "Nowhereville"], "avg" => [42, 57])?;
/// let table = cache.ensure_geocoded(input.clone()).await?;
/// assert_eq!(table.frame.height(), 2);
///
/// // The second run is served from the store.
/// let again = cache.ensure_geocoded(input).await?;
/// assert!(again.from_cache());
/// assert_eq!(geocoder.calls(), 2);
/// # Ok(())
/// # }
/// ```
pub struct GeoCache {
    resolver: Resolver,
    store: Arc<dyn CacheStore>,
    config: GeocodeConfig,
    state: Mutex<CacheState>,
}

#[bon]
impl GeoCache {
    /// Creates a `GeoCache`.
    ///
    /// # Arguments
    ///
    /// * `.store(Arc<dyn CacheStore>)`: **Required.** Where the enriched table lives.
    /// * `.geocoder(Arc<dyn Geocoder>)`: **Required.** The lookup backend.
    /// * `.config(GeocodeConfig)`: Optional. Defaults to [`GeocodeConfig::default`].
    #[builder]
    pub fn new(
        store: Arc<dyn CacheStore>,
        geocoder: Arc<dyn Geocoder>,
        config: Option<GeocodeConfig>,
    ) -> Self {
        let config = config.unwrap_or_default();
        Self {
            resolver: Resolver::from_config(geocoder, &config),
            store,
            config,
            state: Mutex::new(CacheState::Uninitialized),
        }
    }
}

impl GeoCache {
    /// A `GeoCache` that geocodes through the Nominatim service named in `config`.
    ///
    /// # Errors
    ///
    /// Returns [`GeoCacheError::Geocode`] if the endpoint is invalid or the HTTP
    /// client cannot be built.
    pub fn nominatim(
        store: Arc<dyn CacheStore>,
        config: GeocodeConfig,
    ) -> Result<Self, GeoCacheError> {
        let geocoder = NominatimGeocoder::new(&config)?;
        Ok(Self::builder()
            .store(store)
            .geocoder(Arc::new(geocoder))
            .config(config)
            .build())
    }

    /// The state reached by the most recent (or currently running) call.
    pub async fn state(&self) -> CacheState {
        *self.state.lock().await
    }

    /// Returns `input` enriched with `latitude` and `longitude`, resolving and
    /// persisting it first if the store has nothing yet.
    ///
    /// # Errors
    ///
    /// * [`GeoCacheError::MissingColumn`] if the city column is absent.
    /// * [`GeoCacheError::Cache`] if the store cannot be read or written.
    ///
    /// Geocoding failures never surface here; affected rows get empty coordinates.
    pub async fn ensure_geocoded(&self, input: DataFrame) -> Result<GeocodedTable, GeoCacheError> {
        self.ensure_geocoded_with(|| async { Ok::<_, GeoCacheError>(input) })
            .await
    }

    /// Like [`GeoCache::ensure_geocoded`], but only produces the input when the
    /// store turns out to be empty.
    pub async fn ensure_geocoded_with<F, Fut>(
        &self,
        load_input: F,
    ) -> Result<GeocodedTable, GeoCacheError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<DataFrame, GeoCacheError>>,
    {
        let result = self.run(load_input).await;
        if result.is_err() {
            self.transition(CacheState::Uninitialized).await;
        }
        result
    }

    async fn run<F, Fut>(&self, load_input: F) -> Result<GeocodedTable, GeoCacheError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<DataFrame, GeoCacheError>>,
    {
        self.transition(CacheState::Uninitialized).await;

        if let Some(frame) = self.store.load().await? {
            info!(
                "Using cached geocoded table from {} ({} rows)",
                self.store.describe(),
                frame.height()
            );
            self.transition(CacheState::Ready).await;
            return Ok(GeocodedTable {
                frame,
                source: TableSource::Cached,
            });
        }

        let input = load_input().await?;
        let names = city_names(&input, &self.config.city_column)?;

        self.transition(CacheState::Resolving).await;
        info!(
            "Geocoding {} rows (concurrency {}, at least {:?} between requests)",
            names.len(),
            self.config.concurrency.max(1),
            self.config.min_interval
        );
        let (results, report) = self.resolve_rows(&names).await;
        let enriched = merge_geo_results(input, &results)?;

        self.transition(CacheState::Persisting).await;
        let frame = self.store.store(enriched).await?;
        info!("Geocoding finished: {}", report);

        self.transition(CacheState::Ready).await;
        Ok(GeocodedTable {
            frame,
            source: TableSource::Resolved(report),
        })
    }

    async fn transition(&self, next: CacheState) {
        let mut state = self.state.lock().await;
        if *state != next {
            debug!("Cache state {} -> {}", *state, next);
        }
        *state = next;
    }

    /// Maps every row to a lookup slot, resolves the slots in order with bounded
    /// concurrency, then fans the results back out to the rows.
    async fn resolve_rows(&self, names: &[Option<String>]) -> (Vec<GeoResult>, EnrichmentReport) {
        let mut lookups: Vec<&str> = Vec::new();
        let mut row_slots: Vec<Option<usize>> = Vec::with_capacity(names.len());
        let mut seen: HashMap<String, usize> = HashMap::new();

        for name in names {
            let slot = match name.as_deref() {
                Some(name) if !name.trim().is_empty() => {
                    if self.config.dedupe_names {
                        let key = normalize_name(name);
                        Some(*seen.entry(key).or_insert_with(|| {
                            lookups.push(name);
                            lookups.len() - 1
                        }))
                    } else {
                        lookups.push(name);
                        Some(lookups.len() - 1)
                    }
                }
                _ => None,
            };
            row_slots.push(slot);
        }

        let total = lookups.len();
        let resolutions: Vec<Resolution> = stream::iter(lookups.iter().enumerate())
            .map(|(index, name)| async move {
                let resolution = self.resolver.resolve(name).await;
                debug!(
                    "[{}/{}] {} -> {:?}",
                    index + 1,
                    total,
                    name,
                    resolution.outcome
                );
                resolution
            })
            .buffered(self.config.concurrency.max(1))
            .collect()
            .await;

        let mut report = EnrichmentReport {
            rows: names.len(),
            lookups: total,
            ..EnrichmentReport::default()
        };
        for resolution in &resolutions {
            report.attempts += resolution.attempts;
            match resolution.outcome {
                ResolveOutcome::Hit => report.hits += 1,
                ResolveOutcome::Miss => report.misses += 1,
                ResolveOutcome::Failed => report.failures += 1,
                ResolveOutcome::Skipped => report.skipped += 1,
            }
        }

        let results = row_slots
            .iter()
            .map(|slot| match slot {
                Some(index) => resolutions
                    .get(*index)
                    .map_or(GeoResult::Miss, |resolution| resolution.result),
                None => {
                    report.skipped += 1;
                    GeoResult::Miss
                }
            })
            .collect();
        report.shared = names.len() - report.skipped - total;

        (results, report)
    }
}

fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}
