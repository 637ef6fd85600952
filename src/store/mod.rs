//! Durable storage for the enriched table.
//!
//! The pipeline only needs two things from a store: "give me the finished table if
//! you have one" and "keep this finished table". Anything behind that, whether a
//! file on disk or a frame in memory, is interchangeable.

pub mod error;
pub mod file_store;
pub mod memory_store;

use crate::store::error::CacheError;
use async_trait::async_trait;
use polars::frame::DataFrame;

#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Returns the stored table, or `None` when nothing has been persisted yet.
    async fn load(&self) -> Result<Option<DataFrame>, CacheError>;

    /// Persists `frame` in one piece and hands it back.
    ///
    /// Either the whole table becomes visible to later `load` calls or nothing does.
    async fn store(&self, frame: DataFrame) -> Result<DataFrame, CacheError>;

    /// Human readable location, used in log messages.
    fn describe(&self) -> String;
}
