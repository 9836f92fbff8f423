//! # Builder for EngineConfig
//!
//! Fluent construction of [`EngineConfig`] instances.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use solu_engine::{AuditStrategy, EngineConfig};
//!
//! let config = EngineConfig::builder()
//!     .with_base_url("https://mirror.example.com/jamb/cbt/solu/")
//!     .unwrap()
//!     .with_probe_timeout(Duration::from_secs(4))
//!     .with_audit_strategy(AuditStrategy::ForcedFresh)
//!     .with_caching_enabled(false)
//!     .build();
//!
//! assert_eq!(config.root_path(), "/jamb/cbt/solu/");
//! ```

use std::path::PathBuf;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue};
use url::Url;

use crate::config::normalize_base_url;
use crate::error::Result;
use crate::{AuditStrategy, CacheConfig, EngineConfig, ProbePolicy};

/// Builder for creating EngineConfig instances with a fluent API
#[derive(Debug, Clone)]
pub struct EngineConfigBuilder {
    config: EngineConfig,
}

impl EngineConfigBuilder {
    /// Create a new builder with default configuration
    pub fn new() -> Self {
        Self {
            config: EngineConfig::default(),
        }
    }

    /// Set the root URL of the remote archive
    pub fn with_base_url(mut self, url: impl AsRef<str>) -> Result<Self> {
        let url = Url::parse(url.as_ref())?;
        self.config.base_url = normalize_base_url(url);
        Ok(self)
    }

    /// Set the cache configuration
    pub fn with_cache_config(mut self, cache_config: CacheConfig) -> Self {
        self.config.cache_config = Some(cache_config);
        self
    }

    /// Enable or disable caching
    pub fn with_caching_enabled(mut self, enabled: bool) -> Self {
        if enabled {
            if self.config.cache_config.is_none() {
                self.config.cache_config = Some(CacheConfig::default());
            }
        } else {
            self.config.cache_config = None;
        }
        self
    }

    /// Set the on-disk cache root, enabling caching if needed
    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        let cache_config = self
            .config
            .cache_config
            .get_or_insert_with(CacheConfig::default);
        cache_config.disk_cache_path = Some(dir.into());
        self
    }

    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.config.probe_timeout = timeout;
        self
    }

    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.config.fetch_timeout = timeout;
        self
    }

    /// Set the connection timeout (time to establish initial connection)
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    /// Set whether to follow redirects
    pub fn with_follow_redirects(mut self, follow: bool) -> Self {
        self.config.follow_redirects = follow;
        self
    }

    /// Set the user agent string
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    /// Add a custom HTTP header
    pub fn with_header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        if let (Ok(name), Ok(value)) = (
            name.as_ref().parse::<reqwest::header::HeaderName>(),
            HeaderValue::from_str(value.as_ref()),
        ) {
            self.config.headers.insert(name, value);
        }
        self
    }

    /// Set all HTTP headers, replacing any existing headers
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.config.headers = headers;
        self
    }

    /// Set whether to accept invalid certificates
    ///
    /// # Warning
    /// Disabling verification trusts whatever answers for the host. It is the
    /// default here because the archive host has served broken chains.
    pub fn danger_accept_invalid_certs(mut self, accept: bool) -> Self {
        self.config.danger_accept_invalid_certs = accept;
        self
    }

    pub fn with_catalog_ttl(mut self, ttl: Duration) -> Self {
        self.config.catalog_ttl = ttl;
        self
    }

    pub fn with_audit_ttl(mut self, ttl: Duration) -> Self {
        self.config.audit_ttl = ttl;
        self
    }

    pub fn with_audit_strategy(mut self, strategy: AuditStrategy) -> Self {
        self.config.audit_strategy = strategy;
        self
    }

    /// Force a probe policy regardless of the audit strategy
    pub fn with_probe_policy(mut self, policy: ProbePolicy) -> Self {
        self.config.probe_policy = Some(policy);
        self
    }

    /// Set the pause between sequential probes in forced-fresh audits
    pub fn with_probe_pacing(mut self, pacing: Duration) -> Self {
        self.config.probe_pacing = pacing;
        self
    }

    pub fn with_catalog_concurrency(mut self, concurrency: usize) -> Self {
        self.config.catalog_concurrency = concurrency.max(1);
        self
    }

    /// Build the EngineConfig instance
    pub fn build(self) -> EngineConfig {
        self.config
    }
}

impl Default for EngineConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
