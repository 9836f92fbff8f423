//! # Catalog Scraper
//!
//! Discovers subjects and, per subject, exam years by scraping the remote
//! directory listings. Unreachable pages never fail the caller: subjects fall
//! back to a fixed list, years come back empty.

mod codes;
pub mod extract;

use std::collections::BTreeMap;
use std::time::Duration;

use futures::StreamExt;
use futures::stream;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

use crate::cache::CacheKey;
use crate::cancel::run_cancellable;
use crate::error::{Result, SoluError};
use crate::fetcher::HtmlFetcher;

pub use codes::{Subject, YearCode};

/// Subjects shown when the catalog root cannot be scraped
pub const FALLBACK_SUBJECTS: [&str; 12] = [
    "ENG", "MAT", "PHY", "CHE", "BIO", "CRS", "LIT", "ACC", "COM", "GOV", "GEO", "ECO",
];

const SUBJECTS_CACHE_KEY: &str = "subjects_list";

/// Where a subject list came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CatalogSource {
    /// Scraped from the remote site (possibly via cache)
    Live,
    /// The remote site was unreachable or unrecognizable
    Fallback,
}

/// Subjects plus the years of every subject
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogSnapshot {
    pub subjects: Vec<Subject>,
    pub years: BTreeMap<Subject, Vec<YearCode>>,
    pub source: CatalogSource,
}

impl CatalogSnapshot {
    pub fn years_of(&self, subject: &Subject) -> &[YearCode] {
        self.years
            .get(subject)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn is_degraded(&self) -> bool {
        self.source == CatalogSource::Fallback
    }
}

pub fn fallback_subjects() -> Vec<Subject> {
    let mut subjects: Vec<Subject> = FALLBACK_SUBJECTS
        .iter()
        .filter_map(|code| code.parse().ok())
        .collect();
    subjects.sort();
    subjects
}

pub struct Catalog {
    fetcher: HtmlFetcher,
    base_url: Url,
    subject_pattern: Regex,
    ttl: Duration,
    concurrency: usize,
}

impl Catalog {
    pub fn new(fetcher: HtmlFetcher, base_url: Url, ttl: Duration, concurrency: usize) -> Self {
        let subject_pattern = extract::subject_pattern(base_url.path());
        Self {
            fetcher,
            base_url,
            subject_pattern,
            ttl,
            concurrency: concurrency.max(1),
        }
    }

    /// Distinct subjects in ascending order; never empty
    pub async fn list_subjects(&self, cancel: &CancellationToken) -> Result<Vec<Subject>> {
        self.load_subjects(cancel)
            .await
            .map(|(subjects, _)| subjects)
    }

    async fn load_subjects(
        &self,
        cancel: &CancellationToken,
    ) -> Result<(Vec<Subject>, CatalogSource)> {
        let key = CacheKey::new(SUBJECTS_CACHE_KEY);
        let fetched = run_cancellable(
            cancel,
            self.fetcher
                .fetch(self.base_url.as_str(), Some(&key), self.ttl),
        )
        .await?;

        let html = match fetched {
            Ok(body) => body,
            Err(e) => {
                warn!(error = %e, "Catalog root unavailable, using fallback subjects");
                return Ok((fallback_subjects(), CatalogSource::Fallback));
            }
        };

        let subjects =
            extract::extract_subjects(&String::from_utf8_lossy(&html), &self.subject_pattern);
        if subjects.is_empty() {
            warn!("No subject links found in catalog root, using fallback subjects");
            return Ok((fallback_subjects(), CatalogSource::Fallback));
        }

        debug!(count = subjects.len(), "Scraped subjects");
        Ok((subjects.into_iter().collect(), CatalogSource::Live))
    }

    /// Distinct years of `subject`, most recent first; empty when unavailable
    pub async fn list_years(
        &self,
        subject: &Subject,
        cancel: &CancellationToken,
    ) -> Result<Vec<YearCode>> {
        let url = self.subject_url(subject)?;
        let key = CacheKey::new(format!("years_{subject}"));

        let fetched = run_cancellable(
            cancel,
            self.fetcher.fetch(url.as_str(), Some(&key), self.ttl),
        )
        .await?;

        match fetched {
            Ok(html) => {
                let years = extract::extract_years(
                    &String::from_utf8_lossy(&html),
                    self.base_url.path(),
                    subject,
                );
                debug!(subject = %subject, count = years.len(), "Scraped years");
                Ok(years)
            }
            Err(e) => {
                warn!(subject = %subject, error = %e, "Subject index unavailable");
                Ok(Vec::new())
            }
        }
    }

    /// Subjects and the years of each, loaded with bounded concurrency
    pub async fn snapshot(&self, cancel: &CancellationToken) -> Result<CatalogSnapshot> {
        let (subjects, source) = self.load_subjects(cancel).await?;

        let loaded: Vec<(Subject, Result<Vec<YearCode>>)> = stream::iter(subjects.iter().cloned())
            .map(|subject| async move {
                let years = self.list_years(&subject, cancel).await;
                (subject, years)
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        let mut years = BTreeMap::new();
        for (subject, result) in loaded {
            years.insert(subject, result?);
        }

        info!(
            subjects = subjects.len(),
            source = ?source,
            "Catalog snapshot loaded"
        );
        Ok(CatalogSnapshot {
            subjects,
            years,
            source,
        })
    }

    fn subject_url(&self, subject: &Subject) -> Result<Url> {
        self.base_url
            .join(&format!("{subject}/"))
            .map_err(SoluError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheConfig, CacheManager};
    use crate::transport::testing::StubTransport;
    use std::sync::Arc;

    const BASE: &str = "https://examkits.com/jamb/cbt/solu/";
    const TTL: Duration = Duration::from_secs(86_400);

    const ROOT_HTML: &str = r#"
        <a href="/jamb/cbt/solu/ENG/">English</a>
        <a href="/jamb/cbt/solu/MAT/">Mathematics</a>
        <a href="/jamb/cbt/solu/MAT/">Mathematics</a>
    "#;

    fn catalog_with(transport: Arc<StubTransport>, dir: &std::path::Path) -> Catalog {
        let cache = Arc::new(CacheManager::new(&CacheConfig {
            enabled: true,
            disk_cache_path: Some(dir.to_path_buf()),
            max_memory_cache_size: 1024 * 1024,
        }));
        let fetcher = HtmlFetcher::new(transport, Some(cache));
        Catalog::new(fetcher, Url::parse(BASE).unwrap(), TTL, 4)
    }

    fn codes<T: ToString>(items: &[T]) -> Vec<String> {
        items.iter().map(ToString::to_string).collect()
    }

    #[tokio::test]
    async fn test_list_subjects_scrapes_distinct_codes() {
        let dir = tempfile::tempdir().unwrap();
        let transport = Arc::new(StubTransport::new().page(BASE, 200, ROOT_HTML));
        let catalog = catalog_with(transport, dir.path());

        let subjects = catalog
            .list_subjects(&CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(codes(&subjects), ["ENG", "MAT"]);
    }

    #[tokio::test]
    async fn test_list_subjects_is_cached_within_ttl() {
        let dir = tempfile::tempdir().unwrap();
        let transport = Arc::new(StubTransport::new().page(BASE, 200, ROOT_HTML));
        let catalog = catalog_with(transport.clone(), dir.path());
        let cancel = CancellationToken::new();

        let first = catalog.list_subjects(&cancel).await.unwrap();
        let second = catalog.list_subjects(&cancel).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(transport.get_calls(), 1);
    }

    #[tokio::test]
    async fn test_unreachable_root_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = catalog_with(Arc::new(StubTransport::new()), dir.path());

        let subjects = catalog
            .list_subjects(&CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(subjects, fallback_subjects());
        assert_eq!(subjects.len(), 12);
        assert!(subjects.windows(2).all(|w| w[0] < w[1]));
    }

    #[tokio::test]
    async fn test_unrecognized_root_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let transport =
            Arc::new(StubTransport::new().page(BASE, 200, "<html>under maintenance</html>"));
        let catalog = catalog_with(transport, dir.path());

        let snapshot = catalog.snapshot(&CancellationToken::new()).await.unwrap();
        assert_eq!(snapshot.source, CatalogSource::Fallback);
        assert!(snapshot.is_degraded());
        assert_eq!(snapshot.subjects, fallback_subjects());
    }

    #[tokio::test]
    async fn test_list_years_scoped_per_subject() {
        let dir = tempfile::tempdir().unwrap();
        let transport = Arc::new(
            StubTransport::new()
                .page(
                    &format!("{BASE}MAT/"),
                    200,
                    r#"<a href="/jamb/cbt/solu/MAT/MAT2019/">a</a>
                       <a href="/jamb/cbt/solu/MAT/MAT2020/">b</a>"#,
                )
                .page(
                    &format!("{BASE}ENG/"),
                    200,
                    r#"<a href="/jamb/cbt/solu/ENG/ENG2015/">c</a>"#,
                ),
        );
        let catalog = catalog_with(transport.clone(), dir.path());
        let cancel = CancellationToken::new();
        let (math, english): (Subject, Subject) = ("MAT".parse().unwrap(), "ENG".parse().unwrap());

        let mat = catalog.list_years(&math, &cancel).await.unwrap();
        let eng = catalog.list_years(&english, &cancel).await.unwrap();
        assert_eq!(codes(&mat), ["MAT2020", "MAT2019"]);
        assert_eq!(codes(&eng), ["ENG2015"]);

        let again = catalog.list_years(&math, &cancel).await.unwrap();
        assert_eq!(again, mat);
        assert_eq!(transport.get_calls(), 2);
    }

    #[tokio::test]
    async fn test_unreachable_subject_has_no_years() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = catalog_with(Arc::new(StubTransport::new()), dir.path());

        let years = catalog
            .list_years(&"PHY".parse().unwrap(), &CancellationToken::new())
            .await
            .unwrap();
        assert!(years.is_empty());
    }

    #[tokio::test]
    async fn test_snapshot_collects_years_for_every_subject() {
        let dir = tempfile::tempdir().unwrap();
        let transport = Arc::new(
            StubTransport::new()
                .page(BASE, 200, ROOT_HTML)
                .page(
                    &format!("{BASE}MAT/"),
                    200,
                    r#"<a href="/jamb/cbt/solu/MAT/MAT2020/">x</a>"#,
                ),
        );
        let catalog = catalog_with(transport, dir.path());

        let snapshot = catalog.snapshot(&CancellationToken::new()).await.unwrap();
        assert_eq!(snapshot.source, CatalogSource::Live);
        assert_eq!(codes(&snapshot.subjects), ["ENG", "MAT"]);
        assert!(snapshot.years_of(&"ENG".parse().unwrap()).is_empty());
        assert_eq!(
            codes(snapshot.years_of(&"MAT".parse().unwrap())),
            ["MAT2020"]
        );
    }

    #[tokio::test]
    async fn test_cancelled_listing() {
        let dir = tempfile::tempdir().unwrap();
        let transport = Arc::new(StubTransport::new().page(BASE, 200, ROOT_HTML));
        let catalog = catalog_with(transport, dir.path());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = catalog.list_subjects(&cancel).await;
        assert!(matches!(result, Err(SoluError::Cancelled)));
    }
}
