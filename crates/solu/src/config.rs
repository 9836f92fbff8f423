use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue};
use url::Url;

use crate::{AuditStrategy, CacheConfig, ProbePolicy};

pub const DEFAULT_BASE_URL: &str = "https://examkits.com/jamb/cbt/solu/";

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36";

const ONE_DAY: Duration = Duration::from_secs(24 * 60 * 60);

/// Configurable options for the engine
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Root of the remote directory tree, always ending with `/`
    pub base_url: Url,

    /// Cache configuration, `None` disables caching entirely
    pub cache_config: Option<CacheConfig>,

    /// Timeout for a single existence probe
    pub probe_timeout: Duration,

    /// Timeout for a full page fetch
    pub fetch_timeout: Duration,

    /// Connection timeout (time to establish initial connection)
    pub connect_timeout: Duration,

    /// Whether to follow redirects
    pub follow_redirects: bool,

    /// User agent string attached to every request
    pub user_agent: String,

    /// Custom HTTP headers for requests
    pub headers: HeaderMap,

    /// Skip certificate chain verification for the remote host.
    ///
    /// The archive host has served broken chains, so verification is off by
    /// default. Production deployments should reconsider this.
    pub danger_accept_invalid_certs: bool,

    /// How long scraped catalog pages stay fresh
    pub catalog_ttl: Duration,

    /// How long a whole batched audit result stays fresh
    pub audit_ttl: Duration,

    /// Strategy used by the auditor
    pub audit_strategy: AuditStrategy,

    /// Overrides the per-strategy default probe policy
    pub probe_policy: Option<ProbePolicy>,

    /// Pause between sequential probes in forced-fresh audits
    pub probe_pacing: Duration,

    /// How many subject index pages are fetched at once when building a snapshot
    pub catalog_concurrency: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            base_url: Url::parse(DEFAULT_BASE_URL).expect("default base url is valid"),
            cache_config: Some(CacheConfig::default()),
            probe_timeout: Duration::from_secs(8),
            fetch_timeout: Duration::from_secs(12),
            connect_timeout: Duration::from_secs(5),
            follow_redirects: true,
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            headers: EngineConfig::get_default_headers(),
            danger_accept_invalid_certs: true,
            catalog_ttl: ONE_DAY,
            audit_ttl: ONE_DAY,
            audit_strategy: AuditStrategy::default(),
            probe_policy: None,
            probe_pacing: Duration::from_millis(50),
            catalog_concurrency: 8,
        }
    }
}

impl EngineConfig {
    pub fn builder() -> crate::builder::EngineConfigBuilder {
        crate::builder::EngineConfigBuilder::new()
    }

    /// Path component of the base URL, e.g. `/jamb/cbt/solu/`
    pub fn root_path(&self) -> &str {
        self.base_url.path()
    }

    /// Probe policy in effect for the configured audit strategy
    pub fn effective_probe_policy(&self) -> ProbePolicy {
        self.probe_policy
            .unwrap_or_else(|| self.audit_strategy.default_probe_policy())
    }

    pub fn get_default_headers() -> HeaderMap {
        let mut default_headers = HeaderMap::new();

        default_headers.insert(
            reqwest::header::ACCEPT,
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            ),
        );

        default_headers.insert(
            reqwest::header::ACCEPT_LANGUAGE,
            HeaderValue::from_static("en-US,en;q=0.5"),
        );
        default_headers
    }
}

/// Normalizes a base URL so that joins keep the last path segment
pub(crate) fn normalize_base_url(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_path() {
        let config = EngineConfig::default();
        assert_eq!(config.root_path(), "/jamb/cbt/solu/");
    }

    #[test]
    fn test_normalize_base_url_appends_slash() {
        let url = normalize_base_url(Url::parse("https://example.com/a/b").unwrap());
        assert_eq!(url.as_str(), "https://example.com/a/b/");

        let url = normalize_base_url(Url::parse("https://example.com/a/b/").unwrap());
        assert_eq!(url.as_str(), "https://example.com/a/b/");
    }

    #[test]
    fn test_policy_follows_strategy() {
        let mut config = EngineConfig::default();
        assert_eq!(config.effective_probe_policy(), ProbePolicy::Strict);

        config.audit_strategy = AuditStrategy::ForcedFresh;
        assert_eq!(
            config.effective_probe_policy(),
            ProbePolicy::AcceptRedirects
        );

        config.probe_policy = Some(ProbePolicy::Strict);
        assert_eq!(config.effective_probe_policy(), ProbePolicy::Strict);
    }
}
