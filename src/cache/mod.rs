//! Offline asset cache.
//!
//! Versioned buckets of the shell's own static assets, driven through an
//! install / activate / intercept lifecycle by [`AssetCacheManager`].

mod fetcher;
mod manager;
mod manifest;
mod response;
mod storage;

pub use fetcher::{AssetFetcher, HttpFetcher};
pub use manager::{
    AssetCacheManager, CacheStatus, Interception, LifecycleState, ResponseSource,
};
pub use manifest::{Manifest, CACHE_PREFIX, DEFAULT_CACHE_VERSION, DEFAULT_MANIFEST};
pub use response::{cache_key, AssetResponse, ResponseKind};
pub use storage::{CacheStorage, FileCacheStorage, MemoryCacheStorage};
