//! # Cache Manager
//!
//! Coordinates the memory tier and the file tier. Storage failures are logged
//! and reported to callers as misses; a broken cache never fails a fetch.

use std::path::Path;
use std::time::Duration;

use bytes::Bytes;
use tracing::{debug, warn};

use crate::cache::providers::file::FileCache;
use crate::cache::providers::memory::MemoryCache;
use crate::cache::providers::provider::CacheProvider;
use crate::cache::types::{CacheConfig, CacheKey, CacheResult};

/// Cache manager handling both memory and file caching
#[derive(Clone)]
pub struct CacheManager {
    memory_cache: Option<MemoryCache>,
    file_cache: FileCache,
    enabled: bool,
}

impl CacheManager {
    /// Create a new cache manager; the disk root is created lazily on first use
    pub fn new(config: &CacheConfig) -> Self {
        // If no disk cache path provided, use system temp
        let cache_dir = config
            .disk_cache_path
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("solu-cache"));

        let memory_cache = (config.max_memory_cache_size > 0)
            .then(|| MemoryCache::new(config.max_memory_cache_size));

        Self {
            memory_cache,
            file_cache: FileCache::new(cache_dir),
            enabled: config.enabled,
        }
    }

    pub fn cache_dir(&self) -> &Path {
        self.file_cache.cache_dir()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Get a payload written less than `ttl` ago
    pub async fn get(&self, key: &CacheKey, ttl: Duration) -> Option<Bytes> {
        if !self.enabled {
            return None;
        }

        // Check memory cache first
        if let Some(memory) = &self.memory_cache {
            if let Ok(Some(entry)) = memory.get(key, ttl).await {
                debug!(key = %key, "Memory cache hit");
                return Some(entry.data);
            }
        }

        match self.file_cache.get(key, ttl).await {
            Ok(Some(entry)) => {
                debug!(key = %key, "File cache hit");
                let data = entry.data.clone();
                // Promote with the original write time so freshness is not extended
                if let Some(memory) = &self.memory_cache {
                    memory.put_entry(key, entry).await;
                }
                Some(data)
            }
            Ok(None) => {
                debug!(key = %key, "Cache miss");
                None
            }
            Err(e) => {
                warn!(key = %key, error = %e, "Cache read failed, treating as miss");
                None
            }
        }
    }

    /// Store a payload, overwriting any previous entry
    pub async fn put(&self, key: &CacheKey, data: Bytes) {
        if !self.enabled {
            return;
        }

        if let Some(memory) = &self.memory_cache {
            let _ = memory.put(key, data.clone()).await;
        }

        if let Err(e) = self.file_cache.put(key, data).await {
            warn!(key = %key, error = %e, "Cache write failed");
        }
    }

    /// Delete an entry so the next `get` reports it absent
    pub async fn invalidate(&self, key: &CacheKey) {
        if !self.enabled {
            return;
        }

        if let Some(memory) = &self.memory_cache {
            let _ = memory.remove(key).await;
        }

        if let Err(e) = self.file_cache.remove(key).await {
            warn!(key = %key, error = %e, "Cache invalidation failed");
        }
    }

    /// Clear all entries from both tiers
    pub async fn clear(&self) -> CacheResult<()> {
        if !self.enabled {
            return Ok(());
        }

        let mem_result = match &self.memory_cache {
            Some(memory) => memory.clear().await,
            None => Ok(()),
        };
        let file_result = self.file_cache.clear().await;

        // Return file cache error if any, otherwise memory cache error if any
        file_result.or(mem_result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn manager_in(dir: PathBuf) -> CacheManager {
        CacheManager::new(&CacheConfig {
            enabled: true,
            disk_cache_path: Some(dir),
            max_memory_cache_size: 1024 * 1024,
        })
    }

    #[tokio::test]
    async fn test_round_trip_through_both_tiers() {
        let dir = tempfile::tempdir().unwrap();
        let cache = manager_in(dir.path().to_path_buf());
        let key = CacheKey::new("subjects_list");

        cache.put(&key, Bytes::from_static(b"<html>")).await;
        assert_eq!(
            cache.get(&key, Duration::from_secs(60)).await,
            Some(Bytes::from_static(b"<html>"))
        );

        // a second manager over the same directory sees the file tier
        let other = manager_in(dir.path().to_path_buf());
        assert_eq!(
            other.get(&key, Duration::from_secs(60)).await,
            Some(Bytes::from_static(b"<html>"))
        );
    }

    #[tokio::test]
    async fn test_invalidate_clears_both_tiers() {
        let dir = tempfile::tempdir().unwrap();
        let cache = manager_in(dir.path().to_path_buf());
        let key = CacheKey::new("video_check_MAT_MAT2020_q1");

        cache.put(&key, Bytes::from_static(b"1")).await;
        cache.invalidate(&key).await;

        assert_eq!(cache.get(&key, Duration::MAX).await, None);
    }

    #[tokio::test]
    async fn test_promotion_keeps_file_age() {
        let dir = tempfile::tempdir().unwrap();
        let writer = manager_in(dir.path().to_path_buf());
        let key = CacheKey::new("years_ENG");
        let ttl = Duration::from_secs(100);

        writer.put(&key, Bytes::from_static(b"page")).await;
        let path = dir.path().join(key.to_filename());
        let file = std::fs::File::options().write(true).open(&path).unwrap();
        file.set_modified(std::time::SystemTime::now() - Duration::from_secs(99))
            .unwrap();

        let reader = manager_in(dir.path().to_path_buf());
        assert!(reader.get(&key, ttl).await.is_some());
        // promoted entry is just as old as the file, so a tighter ttl misses
        assert!(reader.get(&key, Duration::from_secs(50)).await.is_none());
    }

    #[tokio::test]
    async fn test_disabled_cache_is_inert() {
        let dir = tempfile::tempdir().unwrap();
        let cache = CacheManager::new(&CacheConfig {
            enabled: false,
            disk_cache_path: Some(dir.path().join("unused")),
            max_memory_cache_size: 0,
        });
        let key = CacheKey::new("subjects_list");

        cache.put(&key, Bytes::from_static(b"x")).await;
        assert_eq!(cache.get(&key, Duration::MAX).await, None);
        assert!(!dir.path().join("unused").exists());
    }

    #[tokio::test]
    async fn test_unusable_root_is_a_miss() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "not a directory").unwrap();

        let cache = CacheManager::new(&CacheConfig {
            enabled: true,
            disk_cache_path: Some(blocker.join("cache")),
            max_memory_cache_size: 0,
        });
        let key = CacheKey::new("subjects_list");

        cache.put(&key, Bytes::from_static(b"x")).await;
        assert_eq!(cache.get(&key, Duration::MAX).await, None);
    }
}
