//! # Availability Auditor
//!
//! Checks the 50 candidate question videos of one subject/year pair.
//!
//! Two strategies are supported:
//!
//! - **Batched-cached**: one cache entry holds the whole previous result. On a
//!   miss all 50 URLs are probed concurrently and the batch is cached again.
//! - **Forced-fresh**: per-question entries are invalidated, then each URL is
//!   probed sequentially with a fixed pause between requests. Each result is
//!   written to its own entry as a trail; it is never read back.
//!
//! At most one audit per (subject, year) runs at a time. A second caller waits
//! for the first and, in batched mode, is answered from the cache it wrote.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

use crate::cache::{CacheKey, CacheManager};
use crate::cancel::run_cancellable;
use crate::catalog::{Subject, YearCode};
use crate::error::{Result, SoluError};
use crate::prober::{ProbePolicy, Prober};

/// Number of questions in every exam sitting
pub const QUESTIONS_PER_YEAR: u32 = 50;

/// How an audit gathers its results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
#[serde(rename_all = "kebab-case")]
pub enum AuditStrategy {
    /// Serve a whole cached batch, or probe all questions concurrently
    #[default]
    BatchedCached,
    /// Ignore the cache and probe one question at a time
    ForcedFresh,
}

impl AuditStrategy {
    pub fn default_probe_policy(self) -> ProbePolicy {
        match self {
            AuditStrategy::BatchedCached => ProbePolicy::Strict,
            AuditStrategy::ForcedFresh => ProbePolicy::AcceptRedirects,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionState {
    Uploaded,
    Missing,
}

/// Availability of one question video
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionStatus {
    pub question_number: u32,
    pub status: QuestionState,
    /// The URL that was probed, whatever the outcome
    pub checked_url: String,
    /// Present only when uploaded
    #[serde(default)]
    pub url: Option<String>,
    /// Time of the successful check, present only when uploaded
    #[serde(default, rename = "uploadDate", alias = "checkedAt")]
    pub checked_at: Option<DateTime<Utc>>,
}

impl QuestionStatus {
    fn from_probe(question_number: u32, url: String, exists: bool, now: DateTime<Utc>) -> Self {
        if exists {
            Self {
                question_number,
                status: QuestionState::Uploaded,
                url: Some(url.clone()),
                checked_url: url,
                checked_at: Some(now),
            }
        } else {
            Self {
                question_number,
                status: QuestionState::Missing,
                checked_url: url,
                url: None,
                checked_at: None,
            }
        }
    }

    pub fn is_uploaded(&self) -> bool {
        self.status == QuestionState::Uploaded
    }
}

/// Totals for one audit
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AuditSummary {
    pub uploaded: usize,
    pub missing: usize,
    /// Share of uploaded questions, 0 to 100
    pub percentage: f64,
}

impl AuditSummary {
    pub fn from_statuses(statuses: &[QuestionStatus]) -> Self {
        let uploaded = statuses.iter().filter(|q| q.is_uploaded()).count();
        let missing = statuses.len() - uploaded;
        let percentage = if statuses.is_empty() {
            0.0
        } else {
            uploaded as f64 * 100.0 / statuses.len() as f64
        };
        Self {
            uploaded,
            missing,
            percentage,
        }
    }
}

/// Progress notifications emitted while an audit runs
#[derive(Debug, Clone, PartialEq)]
pub enum AuditEvent {
    Started {
        subject: Subject,
        year: YearCode,
        strategy: AuditStrategy,
        total: u32,
    },
    /// The whole result came from the batch cache
    CacheHit { subject: Subject, year: YearCode },
    QuestionChecked {
        question_number: u32,
        uploaded: bool,
    },
    Finished { summary: AuditSummary },
}

pub type AuditObserver = dyn Fn(&AuditEvent) + Send + Sync;

fn notify(observer: Option<&AuditObserver>, event: AuditEvent) {
    if let Some(observer) = observer {
        observer(&event);
    }
}

fn batch_key(subject: &Subject, year: &YearCode) -> CacheKey {
    CacheKey::new(format!("batch_video_{subject}_{year}"))
}

fn question_key(subject: &Subject, year: &YearCode, question: u32) -> CacheKey {
    CacheKey::new(format!("video_check_{subject}_{year}_q{question}"))
}

/// A cached batch is only trusted when it is complete and in order
fn decode_batch(raw: &[u8]) -> Option<Vec<QuestionStatus>> {
    let statuses: Vec<QuestionStatus> = serde_json::from_slice(raw).ok()?;
    let complete = statuses.len() == QUESTIONS_PER_YEAR as usize
        && statuses
            .iter()
            .zip(1..)
            .all(|(status, n)| status.question_number == n);
    complete.then_some(statuses)
}

type AuditLock = Arc<tokio::sync::Mutex<()>>;
type InFlightMap = Mutex<HashMap<(Subject, YearCode), AuditLock>>;

/// A handle on one pair's audit lock.
///
/// Dropping it removes the lock from the in-flight map once no other audit
/// holds it, also when the audit future is dropped midway.
struct InFlightSlot<'a> {
    in_flight: &'a InFlightMap,
    pair: (Subject, YearCode),
    lock: AuditLock,
}

impl<'a> InFlightSlot<'a> {
    fn enter(in_flight: &'a InFlightMap, subject: &Subject, year: &YearCode) -> Self {
        let pair = (subject.clone(), year.clone());
        let lock = in_flight.lock().entry(pair.clone()).or_default().clone();
        Self {
            in_flight,
            pair,
            lock,
        }
    }
}

impl Drop for InFlightSlot<'_> {
    fn drop(&mut self) {
        let mut in_flight = self.in_flight.lock();
        drop(std::mem::take(&mut self.lock));
        if in_flight
            .get(&self.pair)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            in_flight.remove(&self.pair);
        }
    }
}

pub struct Auditor {
    prober: Prober,
    cache: Option<Arc<CacheManager>>,
    base_url: Url,
    strategy: AuditStrategy,
    policy_override: Option<ProbePolicy>,
    ttl: Duration,
    pacing: Duration,
    in_flight: InFlightMap,
}

impl Auditor {
    pub fn new(
        prober: Prober,
        cache: Option<Arc<CacheManager>>,
        base_url: Url,
        strategy: AuditStrategy,
        ttl: Duration,
        pacing: Duration,
    ) -> Self {
        Self {
            prober,
            cache,
            base_url,
            strategy,
            policy_override: None,
            ttl,
            pacing,
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    /// Use `policy` regardless of strategy
    pub fn with_policy_override(mut self, policy: Option<ProbePolicy>) -> Self {
        self.policy_override = policy;
        self
    }

    pub fn strategy(&self) -> AuditStrategy {
        self.strategy
    }

    /// `<root>/<SUBJECT>/<YEAR>/<YEAR>q<N>.mp4`
    pub fn candidate_url(&self, subject: &Subject, year: &YearCode, question: u32) -> Result<Url> {
        self.base_url
            .join(&format!("{subject}/{year}/{year}q{question}.mp4"))
            .map_err(SoluError::from)
    }

    pub fn candidate_urls(&self, subject: &Subject, year: &YearCode) -> Result<Vec<String>> {
        (1..=QUESTIONS_PER_YEAR)
            .map(|n| self.candidate_url(subject, year, n).map(String::from))
            .collect()
    }

    /// Audit with the configured strategy
    pub async fn audit(
        &self,
        subject: &Subject,
        year: &YearCode,
        cancel: &CancellationToken,
    ) -> Result<Vec<QuestionStatus>> {
        self.audit_with(subject, year, self.strategy, None, cancel)
            .await
    }

    /// Audit with an explicit strategy, reporting progress to `observer`.
    ///
    /// Always yields exactly [`QUESTIONS_PER_YEAR`] entries numbered from 1.
    pub async fn audit_with(
        &self,
        subject: &Subject,
        year: &YearCode,
        strategy: AuditStrategy,
        observer: Option<&AuditObserver>,
        cancel: &CancellationToken,
    ) -> Result<Vec<QuestionStatus>> {
        if cancel.is_cancelled() {
            return Err(SoluError::Cancelled);
        }

        let slot = InFlightSlot::enter(&self.in_flight, subject, year);

        let result = match run_cancellable(cancel, slot.lock.lock()).await {
            Err(e) => Err(e),
            Ok(_guard) => {
                notify(
                    observer,
                    AuditEvent::Started {
                        subject: subject.clone(),
                        year: year.clone(),
                        strategy,
                        total: QUESTIONS_PER_YEAR,
                    },
                );

                let policy = self
                    .policy_override
                    .unwrap_or(strategy.default_probe_policy());
                let prober = self.prober.with_policy(policy);
                match strategy {
                    AuditStrategy::BatchedCached => {
                        self.audit_batched(&prober, subject, year, observer, cancel)
                            .await
                    }
                    AuditStrategy::ForcedFresh => {
                        self.audit_fresh(&prober, subject, year, observer, cancel)
                            .await
                    }
                }
            }
        };

        drop(slot);

        let statuses = result?;
        let summary = AuditSummary::from_statuses(&statuses);
        info!(
            subject = %subject,
            year = %year,
            strategy = ?strategy,
            uploaded = summary.uploaded,
            missing = summary.missing,
            "Audit finished"
        );
        notify(observer, AuditEvent::Finished { summary });
        Ok(statuses)
    }

    async fn audit_batched(
        &self,
        prober: &Prober,
        subject: &Subject,
        year: &YearCode,
        observer: Option<&AuditObserver>,
        cancel: &CancellationToken,
    ) -> Result<Vec<QuestionStatus>> {
        let key = batch_key(subject, year);

        if let Some(cache) = &self.cache {
            if let Some(raw) = cache.get(&key, self.ttl).await {
                match decode_batch(&raw) {
                    Some(statuses) => {
                        debug!(subject = %subject, year = %year, "Serving audit from cache");
                        notify(
                            observer,
                            AuditEvent::CacheHit {
                                subject: subject.clone(),
                                year: year.clone(),
                            },
                        );
                        return Ok(statuses);
                    }
                    None => {
                        warn!(key = %key, "Discarding malformed cached audit");
                    }
                }
            }
        }

        let urls = self.candidate_urls(subject, year)?;
        let found = run_cancellable(cancel, prober.probe_batch(&urls)).await?;

        let now = Utc::now();
        let statuses: Vec<QuestionStatus> = urls
            .into_iter()
            .zip(found)
            .zip(1..)
            .map(|((url, exists), n)| QuestionStatus::from_probe(n, url, exists, now))
            .collect();

        for status in &statuses {
            notify(
                observer,
                AuditEvent::QuestionChecked {
                    question_number: status.question_number,
                    uploaded: status.is_uploaded(),
                },
            );
        }

        if let Some(cache) = &self.cache {
            match serde_json::to_vec(&statuses) {
                Ok(json) => cache.put(&key, Bytes::from(json)).await,
                Err(e) => warn!(key = %key, error = %e, "Failed to encode audit for cache"),
            }
        }

        Ok(statuses)
    }

    async fn audit_fresh(
        &self,
        prober: &Prober,
        subject: &Subject,
        year: &YearCode,
        observer: Option<&AuditObserver>,
        cancel: &CancellationToken,
    ) -> Result<Vec<QuestionStatus>> {
        if let Some(cache) = &self.cache {
            for n in 1..=QUESTIONS_PER_YEAR {
                cache.invalidate(&question_key(subject, year, n)).await;
            }
        }

        let urls = self.candidate_urls(subject, year)?;
        let mut statuses = Vec::with_capacity(urls.len());

        for (url, n) in urls.into_iter().zip(1..) {
            if n > 1 && !self.pacing.is_zero() {
                run_cancellable(cancel, tokio::time::sleep(self.pacing)).await?;
            }

            let exists = run_cancellable(cancel, prober.probe_one(&url)).await?;

            if let Some(cache) = &self.cache {
                let marker = if exists { "1" } else { "0" };
                let key = question_key(subject, year, n);
                cache.put(&key, Bytes::from_static(marker.as_bytes())).await;
            }

            notify(
                observer,
                AuditEvent::QuestionChecked {
                    question_number: n,
                    uploaded: exists,
                },
            );
            statuses.push(QuestionStatus::from_probe(n, url, exists, Utc::now()));
        }

        Ok(statuses)
    }
}
