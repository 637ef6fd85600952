use std::fmt;

/// Lifecycle of a single [`crate::GeoCache::ensure_geocoded`] run.
///
/// `Uninitialized` moves straight to `Ready` when the cache artifact exists,
/// otherwise it goes through `Resolving` and `Persisting` first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CacheState {
    #[default]
    Uninitialized,
    Resolving,
    Persisting,
    Ready,
}

impl fmt::Display for CacheState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CacheState::Uninitialized => "uninitialized",
            CacheState::Resolving => "resolving",
            CacheState::Persisting => "persisting",
            CacheState::Ready => "ready",
        };
        f.write_str(name)
    }
}
