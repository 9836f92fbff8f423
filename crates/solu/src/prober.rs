//! # HTTP Prober
//!
//! Existence checks against arbitrary URLs, one at a time or as a concurrent
//! batch. A probe never fails: timeouts and network errors simply mean the
//! resource does not exist.

use std::sync::Arc;

use futures::StreamExt;
use futures::stream;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::transport::{ProbeOutcome, Transport};

/// Upper bound on simultaneous probes in one batch. One audit never needs
/// more than one probe per question, so this is a ceiling, not a knob.
pub const MAX_PROBE_CONCURRENCY: usize = 50;

/// Which final statuses count as "exists"
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
#[serde(rename_all = "kebab-case")]
pub enum ProbePolicy {
    /// Only 200
    #[default]
    Strict,
    /// 200 plus the redirect statuses 302, 303 and 307
    AcceptRedirects,
}

impl ProbePolicy {
    pub fn accepts(self, status: u16) -> bool {
        match self {
            ProbePolicy::Strict => status == 200,
            ProbePolicy::AcceptRedirects => matches!(status, 200 | 302 | 303 | 307),
        }
    }

    pub fn classify(self, outcome: &ProbeOutcome) -> bool {
        outcome.status.is_some_and(|status| self.accepts(status))
    }
}

/// Detailed single-URL diagnostic
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbeReport {
    /// `None` when no response was received
    pub status_code: Option<u16>,
    pub final_url: String,
    pub exists: bool,
}

#[derive(Clone)]
pub struct Prober {
    transport: Arc<dyn Transport>,
    policy: ProbePolicy,
}

impl Prober {
    pub fn new(transport: Arc<dyn Transport>, policy: ProbePolicy) -> Self {
        Self { transport, policy }
    }

    pub fn policy(&self) -> ProbePolicy {
        self.policy
    }

    /// Same transport, different acceptance policy
    pub fn with_policy(&self, policy: ProbePolicy) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            policy,
        }
    }

    pub async fn probe_one(&self, url: &str) -> bool {
        let outcome = self.transport.head(url).await;
        self.policy.classify(&outcome)
    }

    /// Probe all URLs concurrently; slot `i` of the result belongs to `urls[i]`
    pub async fn probe_batch(&self, urls: &[String]) -> Vec<bool> {
        let mut results = vec![false; urls.len()];

        let mut probes = stream::iter(urls.iter().enumerate())
            .map(|(index, url)| async move { (index, self.transport.head(url).await) })
            .buffer_unordered(MAX_PROBE_CONCURRENCY);

        while let Some((index, outcome)) = probes.next().await {
            results[index] = self.policy.classify(&outcome);
        }

        debug!(
            total = urls.len(),
            found = results.iter().filter(|exists| **exists).count(),
            policy = ?self.policy,
            "Probe batch finished"
        );
        results
    }

    pub async fn diagnose(&self, url: &str) -> ProbeReport {
        let outcome = self.transport.head(url).await;
        ProbeReport {
            status_code: outcome.status,
            exists: self.policy.classify(&outcome),
            final_url: outcome.final_url.unwrap_or_else(|| url.to_string()),
        }
    }
}
