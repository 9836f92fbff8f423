//! # Memory Cache Provider
//!
//! This module provides an in-memory cache implementation using Moka caching.

use std::time::{Duration, SystemTime};

use bytes::Bytes;
use moka::future::Cache as MokaCache;
use tracing::{debug, warn};

use crate::cache::providers::CacheProvider;
use crate::cache::types::{CacheKey, CacheLookupResult, CacheResult, CachedEntry};

/// Memory cache provider implementation using Moka
#[derive(Clone)]
pub struct MemoryCache {
    cache: MokaCache<CacheKey, CachedEntry>,
    /// Maximum size for this cache in bytes
    max_size: u64,
}

impl MemoryCache {
    /// Create a new memory cache with the specified size limit
    pub fn new(max_size_bytes: u64) -> Self {
        if max_size_bytes == 0 {
            panic!("Memory cache size must be greater than zero");
        }

        // Size based eviction, freshness is decided per lookup
        let cache = MokaCache::builder()
            .weigher(|_k, v: &CachedEntry| v.data.len().try_into().unwrap_or(u32::MAX))
            .max_capacity(max_size_bytes)
            .build();

        debug!(
            max_size = max_size_bytes,
            "Memory cache created with size limit"
        );

        Self {
            cache,
            max_size: max_size_bytes,
        }
    }

    /// Insert an entry keeping its original write time
    pub(crate) async fn put_entry(&self, key: &CacheKey, entry: CachedEntry) {
        let size = entry.data.len() as u64;
        if size > self.max_size {
            warn!(
                key = %key,
                size = size,
                max_size = self.max_size,
                "Entry too large for memory cache, skipping"
            );
            return;
        }

        self.cache.insert(key.clone(), entry).await;
    }
}

#[async_trait::async_trait]
impl CacheProvider for MemoryCache {
    async fn get(&self, key: &CacheKey, ttl: Duration) -> CacheLookupResult {
        match self.cache.get(key).await {
            Some(entry) if entry.is_fresh(ttl) => Ok(Some(entry)),
            _ => Ok(None),
        }
    }

    async fn put(&self, key: &CacheKey, data: Bytes) -> CacheResult<()> {
        self.put_entry(key, CachedEntry::new(data, SystemTime::now()))
            .await;
        Ok(())
    }

    async fn remove(&self, key: &CacheKey) -> CacheResult<()> {
        if self.cache.remove(key).await.is_some() {
            debug!(key = %key, "Removed entry from memory cache");
        }
        Ok(())
    }

    async fn clear(&self) -> CacheResult<()> {
        self.cache.invalidate_all();
        self.cache.run_pending_tasks().await;

        debug!("Memory cache cleared");
        Ok(())
    }
}
