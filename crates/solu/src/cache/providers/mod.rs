//! Storage backends behind [`CacheManager`](crate::cache::CacheManager):
//! a bounded in-memory tier and the on-disk tier.

pub use self::file::FileCache;
pub use self::memory::MemoryCache;
pub use self::provider::CacheProvider;

pub mod file;
pub mod memory;
pub mod provider;
