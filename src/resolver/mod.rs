pub mod error;
pub mod geocoder;
pub mod nominatim;
pub mod rate_limiter;
pub mod resolve;
