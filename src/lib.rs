mod dataset;
mod error;
mod geocache;
mod resolver;
mod store;
mod types;
mod utils;
pub mod views;

pub use error::GeoCacheError;
pub use geocache::*;

pub use dataset::{city_names, load_dataset, merge_geo_results, LATITUDE, LONGITUDE};
pub use views::{AqiFrameExt, Page};

pub use resolver::error::GeocodeError;
pub use resolver::geocoder::{Geocoder, StaticGeocoder};
pub use resolver::nominatim::NominatimGeocoder;
pub use resolver::rate_limiter::RateLimiter;
pub use resolver::resolve::{Resolution, ResolveOutcome, Resolver};

pub use store::error::CacheError;
pub use store::file_store::{CacheFormat, FileStore, DEFAULT_CACHE_FILE_NAME};
pub use store::memory_store::MemoryStore;
pub use store::CacheStore;

pub use types::cache_state::CacheState;
pub use types::config::{
    GeocodeConfig, RetryPolicy, DEFAULT_CITY_COLUMN, DEFAULT_ENDPOINT, DEFAULT_USER_AGENT,
};
pub use types::geo_result::{GeoResult, LatLon};
pub use types::month::Month;
