pub mod cache_state;
pub mod config;
pub mod geo_result;
pub mod month;
