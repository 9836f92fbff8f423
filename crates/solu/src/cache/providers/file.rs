//! # File Cache
//!
//! One file per key under a root directory. Freshness is the file's
//! modification time; writes land in a temporary file that is renamed into
//! place so readers never observe a partial payload.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use bytes::Bytes;
use tokio::fs;
use tokio::io;
use tracing::{debug, trace, warn};

use crate::cache::types::{CacheKey, CacheLookupResult, CacheResult, CachedEntry};

use super::CacheProvider;

const ENTRY_EXTENSION: &str = "cache";
const TEMP_EXTENSION: &str = "tmp";

#[derive(Debug, Clone)]
pub struct FileCache {
    cache_dir: PathBuf,
    initialized: Arc<AtomicBool>,
}

impl FileCache {
    /// Create a new file cache with the specified directory
    pub fn new(cache_dir: PathBuf) -> Self {
        Self {
            cache_dir,
            initialized: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Create the root directory on first use
    pub(crate) async fn ensure_initialized(&self) -> io::Result<()> {
        if self.initialized.load(Ordering::Acquire) {
            return Ok(());
        }

        // create_dir_all is idempotent, so racing initializers are harmless
        fs::create_dir_all(&self.cache_dir).await?;
        self.initialized.store(true, Ordering::Release);
        Ok(())
    }

    /// Get the path for a cached resource
    pub fn entry_path(&self, key: &CacheKey) -> PathBuf {
        self.cache_dir.join(key.to_filename())
    }

    fn temp_path(&self, key: &CacheKey) -> PathBuf {
        // unique per writer so concurrent puts of one key never share a temp file
        self.cache_dir.join(format!(
            "{}.{:016x}.{TEMP_EXTENSION}",
            key.to_filename(),
            rand::random::<u64>()
        ))
    }
}

#[async_trait::async_trait]
impl CacheProvider for FileCache {
    async fn get(&self, key: &CacheKey, ttl: Duration) -> CacheLookupResult {
        self.ensure_initialized().await?;

        let path = self.entry_path(key);

        let metadata = match fs::metadata(&path).await {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e),
        };

        let written_at = metadata.modified()?;
        let entry = CachedEntry::new(Bytes::new(), written_at);
        if !entry.is_fresh(ttl) {
            trace!(key = %key, ttl_secs = ttl.as_secs(), "Cache entry is stale");
            return Ok(None);
        }

        let data = match fs::read(&path).await {
            Ok(bytes) => bytes,
            // removed between the metadata call and the read
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                warn!(path = ?path, error = %e, "Failed to read cache data file");
                return Err(e);
            }
        };

        Ok(Some(CachedEntry::new(Bytes::from(data), written_at)))
    }

    async fn put(&self, key: &CacheKey, data: Bytes) -> CacheResult<()> {
        self.ensure_initialized().await?;

        let path = self.entry_path(key);
        let temp_path = self.temp_path(key);

        if let Err(e) = fs::write(&temp_path, &data).await {
            warn!(path = ?temp_path, error = %e, "Failed to write cache data file");
            let _ = fs::remove_file(&temp_path).await;
            return Err(e);
        }

        if let Err(e) = fs::rename(&temp_path, &path).await {
            warn!(
                from = ?temp_path,
                to = ?path,
                error = %e,
                "Failed to rename temporary data file"
            );
            let _ = fs::remove_file(&temp_path).await;
            return Err(e);
        }

        debug!(key = %key, size = data.len(), "Cached entry to file");
        Ok(())
    }

    async fn remove(&self, key: &CacheKey) -> CacheResult<()> {
        self.ensure_initialized().await?;

        let path = self.entry_path(key);
        match fs::remove_file(&path).await {
            Ok(()) => {
                debug!(key = %key, "Removed cache entry");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => {
                warn!(path = ?path, error = %e, "Failed to remove cache data file");
                Err(e)
            }
        }
    }

    async fn clear(&self) -> CacheResult<()> {
        self.ensure_initialized().await?;

        let mut entries = match fs::read_dir(&self.cache_dir).await {
            Ok(entries) => entries,
            Err(e) => {
                warn!(dir = ?self.cache_dir, error = %e, "Failed to read cache directory");
                return Err(e);
            }
        };

        let mut entry_count = 0;

        // Only touch files this cache wrote
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let owned = path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext == ENTRY_EXTENSION || ext == TEMP_EXTENSION);
            if !owned {
                continue;
            }

            if let Err(e) = fs::remove_file(&path).await {
                warn!(path = ?path, error = %e, "Failed to remove cache file");
            } else {
                entry_count += 1;
            }
        }

        debug!(count = entry_count, "Cleared cache entries");
        Ok(())
    }
}
