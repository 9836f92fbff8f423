//! # Cache Provider
//!
//! The storage contract shared by the memory tier and the file tier.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use crate::cache::types::{CacheKey, CacheLookupResult, CacheResult};

/// A trait for cache providers that can store and retrieve cached data
#[async_trait]
pub trait CacheProvider: Send + Sync {
    /// Get an entry written less than `ttl` ago.
    ///
    /// Stale entries are reported as absent and left in place; the next
    /// `put` for the same key overwrites them.
    async fn get(&self, key: &CacheKey, ttl: Duration) -> CacheLookupResult;

    /// Store an entry, replacing any previous one and resetting its age
    async fn put(&self, key: &CacheKey, data: Bytes) -> CacheResult<()>;

    /// Remove an entry; removing a missing entry is not an error
    async fn remove(&self, key: &CacheKey) -> CacheResult<()>;

    /// Clear all entries from the cache
    async fn clear(&self) -> CacheResult<()>;
}
