// HTML Fetcher: full GETs with transparent caching, no retries.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tracing::{debug, warn};

use crate::cache::{CacheKey, CacheManager};
use crate::error::{Result, SoluError};
use crate::transport::Transport;

#[derive(Clone)]
pub struct HtmlFetcher {
    transport: Arc<dyn Transport>,
    cache: Option<Arc<CacheManager>>,
}

impl HtmlFetcher {
    pub fn new(transport: Arc<dyn Transport>, cache: Option<Arc<CacheManager>>) -> Self {
        Self { transport, cache }
    }

    /// Fetch `url`, serving a fresh cached copy under `cache_key` when one exists.
    ///
    /// Only a 200 response with a non-empty body counts as success and is
    /// written back to the cache.
    pub async fn fetch(
        &self,
        url: &str,
        cache_key: Option<&CacheKey>,
        ttl: Duration,
    ) -> Result<Bytes> {
        if let (Some(cache), Some(key)) = (&self.cache, cache_key) {
            if let Some(body) = cache.get(key, ttl).await {
                debug!(url = %url, key = %key, "Serving page from cache");
                return Ok(body);
            }
        }

        let page = match self.transport.get(url).await {
            Ok(page) => page,
            Err(e) => {
                warn!(url = %url, error = %e, "Page fetch failed");
                return Err(e);
            }
        };

        if page.status != 200 {
            warn!(url = %url, status = page.status, "Page fetch returned non-success status");
            return Err(SoluError::StatusCode(
                reqwest::StatusCode::from_u16(page.status)
                    .unwrap_or(reqwest::StatusCode::INTERNAL_SERVER_ERROR),
            ));
        }

        if page.body.is_empty() {
            warn!(url = %url, "Page fetch returned an empty body");
            return Err(SoluError::EmptyBody(url.to_string()));
        }

        if let (Some(cache), Some(key)) = (&self.cache, cache_key) {
            cache.put(key, page.body.clone()).await;
        }

        Ok(page.body)
    }
}
