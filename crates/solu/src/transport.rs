use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use rustls::{ClientConfig, crypto::ring};
use rustls_platform_verifier::BuilderVerifierExt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::EngineConfig;
use crate::error::{Result, SoluError};
use crate::prober::MAX_PROBE_CONCURRENCY;

/// Create a reqwest Client with the provided configuration
pub fn create_client(config: &EngineConfig) -> Result<Client> {
    let mut client_builder = Client::builder()
        .pool_max_idle_per_host(MAX_PROBE_CONCURRENCY)
        .user_agent(&config.user_agent)
        .default_headers(config.headers.clone())
        .redirect(if config.follow_redirects {
            reqwest::redirect::Policy::limited(10)
        } else {
            reqwest::redirect::Policy::none()
        });

    if config.danger_accept_invalid_certs {
        // Explicit trust decision for the archive host, see EngineConfig
        warn!("Certificate verification is disabled for all requests");
        client_builder = client_builder.danger_accept_invalid_certs(true);
    } else {
        let provider = Arc::new(ring::default_provider());
        let tls_config = ClientConfig::builder_with_provider(provider)
            .with_safe_default_protocol_versions()
            .map_err(|e| SoluError::TlsError(e.to_string()))?
            .with_platform_verifier()
            .map_err(|e| SoluError::TlsError(e.to_string()))?
            .with_no_client_auth();
        client_builder = client_builder.use_preconfigured_tls(tls_config);
    }

    if !config.connect_timeout.is_zero() {
        client_builder = client_builder.connect_timeout(config.connect_timeout);
    }

    client_builder.build().map_err(SoluError::from)
}

/// Result of a metadata-only request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeOutcome {
    pub requested_url: String,
    /// URL of the final response after redirects
    pub final_url: Option<String>,
    /// `None` on timeout, TLS or network failure
    pub status: Option<u16>,
}

impl ProbeOutcome {
    pub fn responded(url: impl Into<String>, final_url: impl Into<String>, status: u16) -> Self {
        Self {
            requested_url: url.into(),
            final_url: Some(final_url.into()),
            status: Some(status),
        }
    }

    pub fn failed(url: impl Into<String>) -> Self {
        Self {
            requested_url: url.into(),
            final_url: None,
            status: None,
        }
    }
}

/// A fully downloaded response
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub status: u16,
    pub final_url: String,
    pub body: Bytes,
}

/// Network seam shared by the prober and the fetcher
#[async_trait]
pub trait Transport: Send + Sync {
    /// Issue a HEAD request; failures are folded into the outcome
    async fn head(&self, url: &str) -> ProbeOutcome;

    /// Issue a GET request and read the whole body
    async fn get(&self, url: &str) -> Result<FetchedPage>;
}

/// [`Transport`] over a shared reqwest client
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
    probe_timeout: Duration,
    fetch_timeout: Duration,
}

impl ReqwestTransport {
    pub fn new(client: Client, probe_timeout: Duration, fetch_timeout: Duration) -> Self {
        Self {
            client,
            probe_timeout,
            fetch_timeout,
        }
    }

    pub fn from_config(config: &EngineConfig) -> Result<Self> {
        Ok(Self::new(
            create_client(config)?,
            config.probe_timeout,
            config.fetch_timeout,
        ))
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn head(&self, url: &str) -> ProbeOutcome {
        match self
            .client
            .head(url)
            .timeout(self.probe_timeout)
            .send()
            .await
        {
            Ok(response) => {
                let status = response.status().as_u16();
                debug!(url = %url, status, "Probe answered");
                ProbeOutcome::responded(url, response.url().as_str(), status)
            }
            Err(e) => {
                debug!(url = %url, error = %e, timeout = e.is_timeout(), "Probe failed");
                ProbeOutcome::failed(url)
            }
        }
    }

    async fn get(&self, url: &str) -> Result<FetchedPage> {
        let response = self
            .client
            .get(url)
            .timeout(self.fetch_timeout)
            .send()
            .await?;

        let status = response.status().as_u16();
        let final_url = response.url().to_string();
        let body = response.bytes().await?;

        debug!(url = %url, status, size = body.len(), "Fetched page");
        Ok(FetchedPage {
            status,
            final_url,
            body,
        })
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_client_with_either_trust_mode() {
        let insecure = EngineConfig::builder()
            .danger_accept_invalid_certs(true)
            .build();
        assert!(create_client(&insecure).is_ok());

        let no_redirects = EngineConfig::builder()
            .with_follow_redirects(false)
            .danger_accept_invalid_certs(true)
            .build();
        assert!(ReqwestTransport::from_config(&no_redirects).is_ok());
    }

    #[test]
    fn test_probe_outcome_constructors() {
        let ok = ProbeOutcome::responded("http://a/x", "http://a/y", 200);
        assert_eq!(ok.status, Some(200));
        assert_eq!(ok.final_url.as_deref(), Some("http://a/y"));

        let failed = ProbeOutcome::failed("http://a/x");
        assert_eq!(failed.status, None);
        assert_eq!(failed.final_url, None);
    }
}
