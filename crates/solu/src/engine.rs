//! Wires the components together and answers page queries.

use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::auditor::{AuditObserver, AuditStrategy, AuditSummary, Auditor, QuestionStatus};
use crate::cache::CacheManager;
use crate::cancel::run_cancellable;
use crate::catalog::{Catalog, CatalogSnapshot, Subject, YearCode};
use crate::config::EngineConfig;
use crate::error::Result;
use crate::fetcher::HtmlFetcher;
use crate::prober::{ProbePolicy, ProbeReport, Prober};
use crate::query::PageQuery;
use crate::transport::{ReqwestTransport, Transport};

/// The audited subject/year pair of a page
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Selection {
    pub subject: Subject,
    pub year: YearCode,
    pub questions: Vec<QuestionStatus>,
    pub summary: AuditSummary,
}

/// Everything a renderer needs for one page
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageModel {
    pub catalog: CatalogSnapshot,
    pub selection: Option<Selection>,
    pub diagnostic: Option<ProbeReport>,
    pub elapsed_ms: u64,
}

pub struct Engine {
    config: EngineConfig,
    cache: Option<Arc<CacheManager>>,
    prober: Prober,
    catalog: Catalog,
    auditor: Auditor,
}

impl Engine {
    /// Build an engine on top of a real HTTP client
    pub fn new(config: EngineConfig) -> Result<Self> {
        let transport = Arc::new(ReqwestTransport::from_config(&config)?);
        Ok(Self::with_transport(config, transport))
    }

    pub fn with_transport(config: EngineConfig, transport: Arc<dyn Transport>) -> Self {
        let cache = config
            .cache_config
            .as_ref()
            .filter(|cache_config| cache_config.enabled)
            .map(|cache_config| Arc::new(CacheManager::new(cache_config)));

        let prober = Prober::new(Arc::clone(&transport), config.effective_probe_policy());
        let fetcher = HtmlFetcher::new(transport, cache.clone());
        let catalog = Catalog::new(
            fetcher,
            config.base_url.clone(),
            config.catalog_ttl,
            config.catalog_concurrency,
        );
        let auditor = Auditor::new(
            prober.clone(),
            cache.clone(),
            config.base_url.clone(),
            config.audit_strategy,
            config.audit_ttl,
            config.probe_pacing,
        )
        .with_policy_override(config.probe_policy);

        debug!(
            base_url = %config.base_url,
            caching = cache.is_some(),
            strategy = ?config.audit_strategy,
            "Engine created"
        );

        Self {
            config,
            cache,
            prober,
            catalog,
            auditor,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn auditor(&self) -> &Auditor {
        &self.auditor
    }

    pub fn cache(&self) -> Option<&CacheManager> {
        self.cache.as_deref()
    }

    pub async fn list_subjects(&self, cancel: &CancellationToken) -> Result<Vec<Subject>> {
        self.catalog.list_subjects(cancel).await
    }

    pub async fn list_years(
        &self,
        subject: &Subject,
        cancel: &CancellationToken,
    ) -> Result<Vec<YearCode>> {
        self.catalog.list_years(subject, cancel).await
    }

    pub async fn snapshot(&self, cancel: &CancellationToken) -> Result<CatalogSnapshot> {
        self.catalog.snapshot(cancel).await
    }

    pub async fn audit(
        &self,
        subject: &Subject,
        year: &YearCode,
        cancel: &CancellationToken,
    ) -> Result<Vec<QuestionStatus>> {
        self.auditor.audit(subject, year, cancel).await
    }

    pub async fn audit_with(
        &self,
        subject: &Subject,
        year: &YearCode,
        strategy: AuditStrategy,
        observer: Option<&AuditObserver>,
        cancel: &CancellationToken,
    ) -> Result<Vec<QuestionStatus>> {
        self.auditor
            .audit_with(subject, year, strategy, observer, cancel)
            .await
    }

    /// Probe question 1 of a pair, accepting redirects
    pub async fn diagnose(
        &self,
        subject: &Subject,
        year: &YearCode,
        cancel: &CancellationToken,
    ) -> Result<ProbeReport> {
        let url = self.auditor.candidate_url(subject, year, 1)?;
        run_cancellable(
            cancel,
            self.probe_url(url.as_str(), ProbePolicy::AcceptRedirects),
        )
        .await
    }

    /// Probe an arbitrary URL
    pub async fn probe_url(&self, url: &str, policy: ProbePolicy) -> ProbeReport {
        self.prober.with_policy(policy).diagnose(url).await
    }

    /// Answer a page query: the catalog, plus the audit and diagnostic of the
    /// selected pair when both subject and year are given.
    pub async fn handle(
        &self,
        query: &PageQuery,
        cancel: &CancellationToken,
    ) -> Result<PageModel> {
        let started = Instant::now();

        let diagnostic = match query.selection() {
            Some((subject, year)) if query.test => {
                Some(self.diagnose(subject, year, cancel).await?)
            }
            _ => None,
        };

        let selection = match query.selection() {
            Some((subject, year)) => {
                let questions = self.audit(subject, year, cancel).await?;
                Some(Selection {
                    subject: subject.clone(),
                    year: year.clone(),
                    summary: AuditSummary::from_statuses(&questions),
                    questions,
                })
            }
            None => None,
        };

        let catalog = self.snapshot(cancel).await?;
        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        info!(
            subject = ?query.subject.as_ref().map(Subject::as_str),
            year = ?query.year.as_ref().map(YearCode::as_str),
            degraded = catalog.is_degraded(),
            elapsed_ms,
            "Page query handled"
        );

        Ok(PageModel {
            catalog,
            selection,
            diagnostic,
            elapsed_ms,
        })
    }

    /// Drop every cached page and audit
    pub async fn clear_cache(&self) -> Result<()> {
        if let Some(cache) = &self.cache {
            cache.clear().await?;
            info!(dir = %cache.cache_dir().display(), "Cache cleared");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SoluError;
    use crate::transport::testing::StubTransport;

    const BASE: &str = "https://examkits.com/jamb/cbt/solu/";

    fn site() -> Arc<StubTransport> {
        Arc::new(
            StubTransport::with_head(|url| {
                if url.ends_with("MAT2020q1.mp4") {
                    Some(302)
                } else if url.ends_with("MAT2020q2.mp4") {
                    Some(200)
                } else {
                    Some(404)
                }
            })
            .page(
                BASE,
                200,
                r#"<a href="/jamb/cbt/solu/ENG/">E</a><a href="/jamb/cbt/solu/MAT/">M</a>"#,
            )
            .page(
                &format!("{BASE}MAT/"),
                200,
                r#"<a href="/jamb/cbt/solu/MAT/MAT2020/">2020</a>"#,
            ),
        )
    }

    fn engine(transport: Arc<StubTransport>, dir: &std::path::Path) -> Engine {
        let config = EngineConfig::builder()
            .with_cache_dir(dir)
            .with_probe_pacing(std::time::Duration::ZERO)
            .build();
        Engine::with_transport(config, transport)
    }

    #[tokio::test]
    async fn test_handle_without_selection() {
        let dir = tempfile::tempdir().unwrap();
        let transport = site();
        let engine = engine(transport.clone(), dir.path());

        let page = engine
            .handle(&PageQuery::default(), &CancellationToken::new())
            .await
            .unwrap();

        assert!(page.selection.is_none());
        assert!(page.diagnostic.is_none());
        assert_eq!(page.catalog.subjects.len(), 2);
        assert_eq!(transport.head_calls(), 0);
    }

    #[tokio::test]
    async fn test_handle_with_selection_and_diagnostic() {
        let dir = tempfile::tempdir().unwrap();
        let transport = site();
        let engine = engine(transport.clone(), dir.path());
        let query = PageQuery::from_query_str("subject=MAT&year=MAT2020&test=1").unwrap();

        let cancel = CancellationToken::new();
        let page = engine.handle(&query, &cancel).await.unwrap();

        let diagnostic = page.diagnostic.unwrap();
        assert_eq!(diagnostic.status_code, Some(302));
        assert!(diagnostic.exists);
        assert_eq!(
            diagnostic.final_url,
            format!("{BASE}MAT/MAT2020/MAT2020q1.mp4")
        );

        // The batched audit is strict, so the redirecting q1 counts as missing
        let selection = page.selection.unwrap();
        assert_eq!(selection.questions.len(), 50);
        assert_eq!(selection.summary.uploaded, 1);
        assert!(selection.questions[1].is_uploaded());
        assert_eq!(transport.head_calls(), 51);

        let json = serde_json::to_value(&page.catalog).unwrap();
        assert_eq!(json["source"], "live");
        assert_eq!(json["years"]["MAT"][0], "MAT2020");
    }

    #[tokio::test]
    async fn test_handle_with_unreachable_site() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine(Arc::new(StubTransport::new()), dir.path());
        let query = PageQuery::from_query_str("subject=MAT&year=MAT2020").unwrap();

        let cancel = CancellationToken::new();
        let page = engine.handle(&query, &cancel).await.unwrap();

        assert!(page.catalog.is_degraded());
        assert_eq!(page.catalog.subjects.len(), 12);
        assert!(page.catalog.years.values().all(Vec::is_empty));
        let selection = page.selection.unwrap();
        assert_eq!(selection.summary.missing, 50);
    }

    #[tokio::test]
    async fn test_clear_cache_forces_refetch() {
        let dir = tempfile::tempdir().unwrap();
        let transport = site();
        let engine = engine(transport.clone(), dir.path());
        let cancel = CancellationToken::new();

        engine.list_subjects(&cancel).await.unwrap();
        engine.list_subjects(&cancel).await.unwrap();
        assert_eq!(transport.get_calls(), 1);

        engine.clear_cache().await.unwrap();
        engine.list_subjects(&cancel).await.unwrap();
        assert_eq!(transport.get_calls(), 2);
    }

    #[tokio::test]
    async fn test_disabled_cache() {
        let transport = site();
        let config = EngineConfig::builder().with_caching_enabled(false).build();
        let engine = Engine::with_transport(config, transport.clone());
        let cancel = CancellationToken::new();

        assert!(engine.cache().is_none());
        engine.list_subjects(&cancel).await.unwrap();
        engine.list_subjects(&cancel).await.unwrap();
        assert_eq!(transport.get_calls(), 2);
        assert!(engine.clear_cache().await.is_ok());
    }

    #[tokio::test]
    async fn test_probe_url_with_policy() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine(site(), dir.path());
        let url = format!("{BASE}MAT/MAT2020/MAT2020q1.mp4");

        let strict = engine.probe_url(&url, ProbePolicy::Strict).await;
        let lenient = engine.probe_url(&url, ProbePolicy::AcceptRedirects).await;
        assert!(!strict.exists);
        assert!(lenient.exists);
    }

    #[tokio::test]
    async fn test_cancelled_query_sends_no_requests() {
        let dir = tempfile::tempdir().unwrap();
        let transport = site();
        let engine = engine(transport.clone(), dir.path());
        let query = PageQuery::from_query_str("subject=MAT&year=MAT2020&test=1").unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = engine.handle(&query, &cancel).await;

        assert!(matches!(result, Err(SoluError::Cancelled)));
        assert_eq!(transport.head_calls(), 0);
        assert_eq!(transport.get_calls(), 0);

        let subject = "MAT".parse().unwrap();
        let year = "MAT2020".parse().unwrap();
        let diagnostic = engine.diagnose(&subject, &year, &cancel).await;
        assert!(matches!(diagnostic, Err(SoluError::Cancelled)));
        assert_eq!(transport.head_calls(), 0);
    }
}
