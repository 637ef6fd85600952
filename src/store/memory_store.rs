use crate::store::error::CacheError;
use crate::store::CacheStore;
use async_trait::async_trait;
use polars::frame::DataFrame;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Mutex;

/// Keeps the enriched table in memory. Lives as long as the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    frame: Mutex<Option<DataFrame>>,
    writes: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that already holds `frame`, as if an earlier run had persisted it.
    pub fn with_frame(frame: DataFrame) -> Self {
        Self {
            frame: Mutex::new(Some(frame)),
            writes: AtomicUsize::new(0),
        }
    }

    /// Number of successful `store` calls.
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub async fn snapshot(&self) -> Option<DataFrame> {
        self.frame.lock().await.clone()
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn load(&self) -> Result<Option<DataFrame>, CacheError> {
        Ok(self.frame.lock().await.clone())
    }

    async fn store(&self, frame: DataFrame) -> Result<DataFrame, CacheError> {
        let mut slot = self.frame.lock().await;
        *slot = Some(frame.clone());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(frame)
    }

    fn describe(&self) -> String {
        "in-memory store".to_string()
    }
}
