//! # Cache System
//!
//! Key-value byte storage with age-based freshness. Scraped catalog pages and
//! audit results are kept here so repeated requests avoid the remote host.

mod manager;
pub mod providers;
mod types;

pub use manager::CacheManager;
pub use types::{CacheConfig, CacheKey, CacheLookupResult, CacheResult, CachedEntry};

pub use providers::{CacheProvider, FileCache, MemoryCache};
