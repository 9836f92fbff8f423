use crate::{
    error::{CliError, Result},
    output::{OutputManager, write_output},
};
use indicatif::{ProgressBar, ProgressStyle};
use solu_engine::{
    AuditEvent, AuditObserver, AuditStrategy, AuditSummary, CancellationToken, Engine, PageQuery,
    ProbePolicy, Selection, Subject, YearCode,
};
use std::time::Duration;
use tracing::debug;

pub struct CommandExecutor {
    engine: Engine,
    output: OutputManager,
    cancel: CancellationToken,
    show_progress: bool,
}

impl CommandExecutor {
    pub fn new(
        engine: Engine,
        output: OutputManager,
        cancel: CancellationToken,
        show_progress: bool,
    ) -> Self {
        Self {
            engine,
            output,
            cancel,
            show_progress,
        }
    }

    pub async fn subjects(&self) -> Result<()> {
        let pb = self.create_spinner("Loading subjects...");
        let subjects = self.engine.list_subjects(&self.cancel).await;
        pb.finish_and_clear();

        write_output(&self.output.subjects(&subjects?)?)
    }

    pub async fn years(&self, subject: &Subject) -> Result<()> {
        let pb = self.create_spinner(&format!("Loading years for {subject}..."));
        let years = self.engine.list_years(subject, &self.cancel).await;
        pb.finish_and_clear();

        write_output(&self.output.years(subject, &years?)?)
    }

    pub async fn catalog(&self) -> Result<()> {
        let pb = self.create_spinner("Loading catalog...");
        let catalog = self.engine.snapshot(&self.cancel).await;
        pb.finish_and_clear();

        write_output(&self.output.catalog(&catalog?)?)
    }

    pub async fn audit(
        &self,
        subject: &Subject,
        year: &YearCode,
        fresh: bool,
        test: bool,
    ) -> Result<()> {
        let diagnostic = if test {
            Some(self.engine.diagnose(subject, year, &self.cancel).await?)
        } else {
            None
        };

        let strategy = if fresh {
            AuditStrategy::ForcedFresh
        } else {
            self.engine.config().audit_strategy
        };
        debug!(subject = %subject, year = %year, strategy = ?strategy, "Running audit");

        let pb = self.create_audit_bar();
        let progress = pb.clone();
        let observer: &AuditObserver = &move |event: &AuditEvent| match event {
            AuditEvent::CacheHit { .. } => progress.set_message("cached"),
            AuditEvent::QuestionChecked {
                question_number, ..
            } => progress.set_position(u64::from(*question_number)),
            AuditEvent::Started { .. } | AuditEvent::Finished { .. } => {}
        };

        let questions = self
            .engine
            .audit_with(subject, year, strategy, Some(observer), &self.cancel)
            .await;
        pb.finish_and_clear();
        let questions = questions?;

        let selection = Selection {
            subject: subject.clone(),
            year: year.clone(),
            summary: AuditSummary::from_statuses(&questions),
            questions,
        };
        write_output(&self.output.audit(&selection, diagnostic.as_ref())?)
    }

    pub async fn query(&self, raw: &str) -> Result<()> {
        let query = PageQuery::from_query_str(raw)?;

        let pb = self.create_spinner("Handling query...");
        let page = self.engine.handle(&query, &self.cancel).await;
        pb.finish_and_clear();

        write_output(&self.output.page(&page?)?)
    }

    pub async fn probe(&self, url: &str, strict: bool) -> Result<()> {
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(CliError::invalid_input(format!(
                "expected an http(s) URL, got {url}"
            )));
        }

        let policy = if strict {
            ProbePolicy::Strict
        } else {
            ProbePolicy::AcceptRedirects
        };

        let pb = self.create_spinner("Probing...");
        let report = tokio::select! {
            report = self.engine.probe_url(url, policy) => report,
            _ = self.cancel.cancelled() => {
                pb.finish_and_clear();
                return Err(CliError::Cancelled);
            }
        };
        pb.finish_and_clear();

        write_output(&self.output.probe(&report)?)
    }

    pub async fn clear_cache(&self) -> Result<()> {
        self.engine.clear_cache().await?;
        if let Some(cache) = self.engine.cache() {
            write_output(&format!("✓ Cache cleared: {}\n", cache.cache_dir().display()))?;
        } else {
            write_output("Caching is disabled, nothing to clear\n")?;
        }
        Ok(())
    }

    fn create_spinner(&self, message: &str) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }

        let pb = ProgressBar::new_spinner();
        pb.enable_steady_tick(Duration::from_millis(120));
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
            pb.set_style(style.tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ "));
        }
        pb.set_message(message.to_string());
        pb
    }

    fn create_audit_bar(&self) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }

        let pb = ProgressBar::new(u64::from(solu_engine::QUESTIONS_PER_YEAR));
        if let Ok(style) = ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")
        {
            pb.set_style(style.progress_chars("█▉▊▋▌▍▎▏  "));
        }
        pb
    }
}
