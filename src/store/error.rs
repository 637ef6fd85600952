use polars::error::PolarsError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Failed to determine cache directory")]
    CacheDirResolution,

    #[error("Cache path exists but is not a directory: '{0}'")]
    NotADirectory(PathBuf),

    #[error("Failed to create cache directory '{0}'")]
    CacheDirCreation(PathBuf, #[source] std::io::Error),

    #[error("Failed to read metadata for cache file '{0}'")]
    CacheMetadataRead(PathBuf, #[source] std::io::Error),

    #[error("Unsupported cache file extension for '{0}' (expected .csv or .parquet)")]
    UnsupportedFormat(PathBuf),

    #[error("I/O error reading cache file '{0}'")]
    ReadIo(PathBuf, #[source] std::io::Error),
    #[error("Decoding error reading cache file '{0}'")]
    ReadPolars(PathBuf, #[source] PolarsError),

    // Errors while writing the temporary file (inside blocking task)
    #[error("I/O error writing cache file '{0}'")]
    WriteIo(PathBuf, #[source] std::io::Error),
    #[error("Encoding error writing cache file '{0}'")]
    WritePolars(PathBuf, #[source] PolarsError),

    #[error("Failed to move finished cache file into place at '{0}'")]
    Persist(PathBuf, #[source] std::io::Error),

    #[error("Background task failed to complete")]
    TaskJoin(#[from] tokio::task::JoinError),
}
