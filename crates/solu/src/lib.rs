//! # Solu Engine
//!
//! A library for auditing the JAMB CBT solutions video archive.
//! It scrapes the archive's directory listings for subjects and exam years
//! and checks which of the 50 question videos of a sitting are uploaded.
//!
//! ## Features
//!
//! - Two-tier caching (memory and disk) with TTL-based freshness
//! - Bounded-concurrency existence probes with selectable acceptance policy
//! - Catalog scraping with fallback data when the remote site is unreachable
//! - Batched-cached and forced-fresh audit strategies
//! - Cooperative cancellation of every long-running operation

pub mod auditor;
pub mod builder;
pub mod cache;
mod cancel;
pub mod catalog;
pub mod config;
pub mod engine;
pub mod error;
pub mod fetcher;
pub mod prober;
pub mod query;
pub mod transport;

pub use auditor::{
    AuditEvent, AuditObserver, AuditStrategy, AuditSummary, Auditor, QUESTIONS_PER_YEAR,
    QuestionState, QuestionStatus,
};
pub use builder::EngineConfigBuilder;
pub use cache::{CacheConfig, CacheManager};
pub use catalog::{Catalog, CatalogSnapshot, CatalogSource, Subject, YearCode};
pub use config::{DEFAULT_BASE_URL, EngineConfig};
pub use engine::{Engine, PageModel, Selection};
pub use error::{Result, SoluError};
pub use fetcher::HtmlFetcher;
pub use prober::{MAX_PROBE_CONCURRENCY, ProbePolicy, ProbeReport, Prober};
pub use query::PageQuery;
pub use transport::{ReqwestTransport, Transport, create_client};

// Re-exported so callers can pass cancellation tokens without a direct dependency
pub use tokio_util::sync::CancellationToken;
