//! # Cache Types
//!
//! This module defines common types used across the caching system.

use std::fmt;
use std::path::PathBuf;
use std::time::{Duration, SystemTime};

use bytes::Bytes;

/// Logical cache key, e.g. `subjects_list` or `years_MAT`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Stable, filename-safe address of this key
    pub fn to_filename(&self) -> String {
        use sha2::{Digest, Sha256};

        let hash = Sha256::digest(self.0.as_bytes());
        format!("{hash:x}.cache")
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CacheKey {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

impl From<String> for CacheKey {
    fn from(key: String) -> Self {
        Self::new(key)
    }
}

/// A payload read back from a provider
#[derive(Debug, Clone)]
pub struct CachedEntry {
    pub data: Bytes,
    pub written_at: SystemTime,
}

impl CachedEntry {
    pub fn new(data: Bytes, written_at: SystemTime) -> Self {
        Self { data, written_at }
    }

    /// Age relative to `now`; entries stamped in the future count as brand new
    pub fn age_at(&self, now: SystemTime) -> Duration {
        now.duration_since(self.written_at).unwrap_or_default()
    }

    pub fn is_fresh(&self, ttl: Duration) -> bool {
        self.age_at(SystemTime::now()) < ttl
    }
}

/// Configuration for the cache system
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Whether caching is enabled
    pub enabled: bool,
    /// Path for disk cache storage
    pub disk_cache_path: Option<PathBuf>,
    /// Maximum size of memory cache in bytes, 0 disables the memory tier
    pub max_memory_cache_size: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            disk_cache_path: None, // If None, we'll use system temp dir
            max_memory_cache_size: 8 * 1024 * 1024, // 8MB
        }
    }
}

/// Result of a cache operation
pub type CacheResult<T> = std::result::Result<T, std::io::Error>;

/// A type representing the result of a cache lookup operation
pub type CacheLookupResult = CacheResult<Option<CachedEntry>>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filename_is_stable_and_distinct() {
        let a = CacheKey::new("years_MAT");
        let b = CacheKey::new("years_ENG");

        assert_eq!(a.to_filename(), CacheKey::new("years_MAT").to_filename());
        assert_ne!(a.to_filename(), b.to_filename());
        assert!(a.to_filename().ends_with(".cache"));
        assert_eq!(a.to_filename().len(), 64 + ".cache".len());
    }

    #[test]
    fn test_freshness_boundary() {
        let ttl = Duration::from_secs(60);
        let now = SystemTime::now();

        let entry = CachedEntry::new(Bytes::from_static(b"x"), now - Duration::from_secs(59));
        assert!(entry.age_at(now) < ttl);

        let entry = CachedEntry::new(Bytes::from_static(b"x"), now - Duration::from_secs(61));
        assert!(entry.age_at(now) >= ttl);

        let entry = CachedEntry::new(Bytes::from_static(b"x"), now + Duration::from_secs(30));
        assert_eq!(entry.age_at(now), Duration::ZERO);
    }
}
