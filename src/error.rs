use crate::resolver::error::GeocodeError;
use crate::store::error::CacheError;
use polars::error::PolarsError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GeoCacheError {
    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Geocode(#[from] GeocodeError),

    #[error("Failed to read input dataset '{0}'")]
    InputRead(PathBuf, #[source] PolarsError),

    #[error("Required column '{column}' not found in the dataset")]
    MissingColumn { column: String },

    #[error("Column '{column}' cannot be read as {expected}")]
    InvalidColumnType {
        column: String,
        expected: &'static str,
        #[source]
        source: PolarsError,
    },

    #[error("Enriched table has {found} rows but the input had {expected}")]
    RowCountMismatch { expected: usize, found: usize },

    #[error("Failed processing DataFrame: {0}")]
    DataFrameProcessing(#[from] PolarsError),

    #[error("Background task failed to complete")]
    TaskJoin(#[from] tokio::task::JoinError),
}
