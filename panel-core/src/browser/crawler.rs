use std::cell::RefCell;
use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::Serialize;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, info, info_span, warn, Instrument, Span};
use uuid::Uuid;

use crate::config::{CrawlSection, ExhaustionPolicy, PanelConfig, SiteSection};
use crate::store::{ChapterReference, PageRecord};

use super::error::{AttemptError, BrowserError, CrawlError, CrawlResult, ResolveError};
use super::metrics::CrawlMetrics;
use super::pacing::PagePacer;
use super::resolver::{PageImageResolver, ResolverConfig};
use super::retry::{retry, RetryOutcome};
use super::session::BrowserSession;

#[derive(Debug, Clone)]
pub struct CrawlerConfig {
    pub last_page_selector: String,
    pub next_page_id: String,
    pub max_attempts: usize,
    pub page_delay_ms: [u64; 2],
    pub error_sentinel: String,
    pub on_exhausted: ExhaustionPolicy,
    pub resolver: ResolverConfig,
}

impl CrawlerConfig {
    pub fn from_config(config: &PanelConfig) -> Self {
        Self::from_sections(&config.site, &config.crawl)
    }

    pub fn from_sections(site: &SiteSection, crawl: &CrawlSection) -> Self {
        Self {
            last_page_selector: site.last_page_selector.clone(),
            next_page_id: site.next_page_id.clone(),
            max_attempts: crawl.max_attempts,
            page_delay_ms: crawl.page_delay_ms,
            error_sentinel: crawl.error_sentinel.clone(),
            on_exhausted: crawl.on_exhausted,
            resolver: ResolverConfig::from_sections(site, crawl),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CrawlPhase {
    Init,
    Resolving,
    Retrying,
    Recording,
    Advancing,
    Done,
    Aborted,
}

/// Progress of one chapter crawl. Only the crawler mutates it.
#[derive(Debug, Clone)]
pub(crate) struct CrawlState {
    total_pages: usize,
    current_page: usize,
    phase: CrawlPhase,
    results: Vec<PageRecord>,
}

impl CrawlState {
    fn new(total_pages: usize) -> Self {
        Self {
            total_pages,
            current_page: 1,
            phase: CrawlPhase::Init,
            results: Vec::with_capacity(total_pages),
        }
    }

    fn phase(&self) -> CrawlPhase {
        self.phase
    }

    fn results(&self) -> &[PageRecord] {
        &self.results
    }

    fn enter(&mut self, phase: CrawlPhase) {
        debug!(page = self.current_page, from = ?self.phase, to = ?phase, "crawl transition");
        self.phase = phase;
    }

    fn record(&mut self, value: String) {
        self.enter(CrawlPhase::Recording);
        self.results.push(PageRecord::new(self.current_page - 1, value));
    }

    fn is_last_page(&self) -> bool {
        self.current_page >= self.total_pages
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CrawlReport {
    pub run_id: Uuid,
    pub chapter: ChapterReference,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub total_pages: usize,
    pub records: Vec<PageRecord>,
    pub metrics: CrawlMetrics,
}

impl CrawlReport {
    pub fn values(&self) -> Vec<String> {
        self.records.iter().map(|record| record.value.clone()).collect()
    }
}

/// Walks every page of a chapter and resolves each page's image location.
#[derive(Debug)]
pub struct PaginationCrawler {
    config: CrawlerConfig,
    resolver: PageImageResolver,
    pacer: PagePacer,
    span: Span,
}

impl PaginationCrawler {
    pub fn new(config: CrawlerConfig) -> Self {
        let span = info_span!("crawler");
        let resolver = PageImageResolver::new(config.resolver.clone());
        let pacer = PagePacer::new(config.page_delay_ms);
        Self {
            config,
            resolver,
            pacer,
            span,
        }
    }

    /// Routes every event of this crawler, and of its resolver, through `span`.
    pub fn with_span(mut self, span: Span) -> Self {
        self.resolver = self.resolver.with_span(span.clone());
        self.span = span;
        self
    }

    pub fn config(&self) -> &CrawlerConfig {
        &self.config
    }

    /// Crawls `chapter` with `session`, which is shut down before returning
    /// whether the crawl finished or aborted.
    pub async fn run<S>(
        &self,
        mut session: S,
        chapter: &ChapterReference,
    ) -> CrawlResult<CrawlReport>
    where
        S: BrowserSession,
    {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let span = info_span!(
            parent: &self.span,
            "crawl",
            run_id = %run_id,
            chapter = %chapter.title
        );
        let metrics = RefCell::new(CrawlMetrics::default());
        let tabs_before = self.resolver.tabs_opened();

        let outcome = self
            .drive(&mut session, chapter, &metrics)
            .instrument(span.clone())
            .await;

        if let Err(err) = session.shutdown().await {
            warn!(parent: &span, error = %err, "failed to shut down browser session");
        }

        let mut metrics = metrics.into_inner();
        metrics.tabs_opened = self.resolver.tabs_opened() - tabs_before;

        match outcome {
            Ok(state) => {
                info!(
                    parent: &span,
                    pages = state.total_pages,
                    resolved = metrics.pages_resolved,
                    degraded = metrics.pages_degraded,
                    attempts = metrics.resolve_attempts,
                    wait_ms = metrics.pacing_wait_ms,
                    "chapter crawl finished"
                );
                Ok(CrawlReport {
                    run_id,
                    chapter: chapter.clone(),
                    started_at,
                    finished_at: Utc::now(),
                    total_pages: state.total_pages,
                    records: state.results,
                    metrics,
                })
            }
            Err(err) => {
                warn!(
                    parent: &span,
                    error = %err,
                    phase = ?CrawlPhase::Aborted,
                    "chapter crawl aborted"
                );
                Err(err)
            }
        }
    }

    async fn drive<S>(
        &self,
        session: &mut S,
        chapter: &ChapterReference,
        metrics: &RefCell<CrawlMetrics>,
    ) -> CrawlResult<CrawlState>
    where
        S: BrowserSession,
    {
        session
            .navigate(&chapter.url)
            .await
            .map_err(CrawlError::Navigation)?;
        let total_pages = self.page_count(session).await?;
        info!(
            total_pages,
            url = %chapter.url,
            delay_ms = ?self.pacer.range_ms(),
            "chapter opened"
        );

        let mut state = CrawlState::new(total_pages);
        loop {
            state.enter(CrawlPhase::Resolving);
            let value = self.resolve_page(session, state.current_page, metrics).await?;
            state.record(value);

            if state.is_last_page() {
                state.enter(CrawlPhase::Done);
                return Ok(state);
            }

            state.enter(CrawlPhase::Advancing);
            self.advance(session, state.current_page, metrics).await?;
            state.current_page += 1;
        }
    }

    async fn page_count<S>(&self, session: &mut S) -> CrawlResult<usize>
    where
        S: BrowserSession,
    {
        let selector = &self.config.last_page_selector;
        let failure = |reason: String| CrawlError::PageCount {
            selector: selector.clone(),
            reason,
        };
        let indicator = session
            .find_by_selector(selector)
            .await
            .map_err(|err| failure(err.to_string()))?;
        let text = session
            .text(&indicator)
            .await
            .map_err(|err| failure(err.to_string()))?
            .unwrap_or_default();
        parse_page_count(&text).ok_or_else(|| failure(format!("no page number in {text:?}")))
    }

    async fn resolve_page<S>(
        &self,
        session: &mut S,
        page: usize,
        metrics: &RefCell<CrawlMetrics>,
    ) -> CrawlResult<String>
    where
        S: BrowserSession,
    {
        let lock = AsyncMutex::new(session);
        let lock = &lock;
        let outcome = retry(self.config.max_attempts, move |attempt| {
            self.attempt_page(lock, page, attempt, metrics)
        })
        .await;

        match outcome {
            Ok(RetryOutcome { result, attempts }) => {
                metrics.borrow_mut().record_resolved();
                info!(page, attempts, image = %result, "page resolved");
                Ok(result)
            }
            Err(err) => {
                let attempts = err.attempts();
                match err.into_inner() {
                    AttemptError::Reload(err) => Err(CrawlError::Navigation(err)),
                    AttemptError::Resolve(last) => self.on_exhausted(page, attempts, last, metrics),
                }
            }
        }
    }

    async fn attempt_page<S>(
        &self,
        session: &AsyncMutex<&mut S>,
        page: usize,
        attempt: usize,
        metrics: &RefCell<CrawlMetrics>,
    ) -> Result<String, AttemptError>
    where
        S: BrowserSession,
    {
        let mut session = session.lock().await;
        if attempt > 0 {
            debug!(
                page,
                attempt = attempt + 1,
                phase = ?CrawlPhase::Retrying,
                "reloading before retry"
            );
            session.reload().await.map_err(AttemptError::Reload)?;
            metrics.borrow_mut().record_reload();
        }
        metrics.borrow_mut().record_attempt();
        match self.resolver.resolve(&mut **session).await {
            Ok(image) => Ok(image),
            Err(err) => {
                metrics.borrow_mut().record_failure();
                warn!(page, attempt = attempt + 1, error = %err, "page resolution failed");
                Err(AttemptError::Resolve(err))
            }
        }
    }

    fn on_exhausted(
        &self,
        page: usize,
        attempts: usize,
        last: ResolveError,
        metrics: &RefCell<CrawlMetrics>,
    ) -> CrawlResult<String> {
        match self.config.on_exhausted {
            ExhaustionPolicy::RecordSentinel => {
                metrics.borrow_mut().record_degraded();
                warn!(page, attempts, error = %last, "recording error sentinel");
                Ok(self.config.error_sentinel.clone())
            }
            ExhaustionPolicy::Abort => Err(CrawlError::RetriesExhausted {
                page,
                attempts,
                source: last,
            }),
        }
    }

    async fn advance<S>(
        &self,
        session: &mut S,
        page: usize,
        metrics: &RefCell<CrawlMetrics>,
    ) -> CrawlResult<()>
    where
        S: BrowserSession,
    {
        let advance_error = |source: BrowserError| CrawlError::Advance { page, source };
        let next = session
            .find_by_id(&self.config.next_page_id)
            .await
            .map_err(advance_error)?;
        session.click(&next).await.map_err(advance_error)?;
        let waited = self.pacer.wait().await;
        metrics.borrow_mut().record_wait(waited);
        debug!(page, delay_ms = waited, "advanced to next page");
        Ok(())
    }
}

/// First run of one to three digits in `text`, if it is a positive number.
pub fn parse_page_count(text: &str) -> Option<usize> {
    static PAGE_NUMBER: OnceLock<Regex> = OnceLock::new();
    let pattern = PAGE_NUMBER.get_or_init(|| Regex::new(r"\d{1,3}").expect("page number pattern"));
    pattern
        .find(text)
        .and_then(|found| found.as_str().parse::<usize>().ok())
        .filter(|count| *count > 0)
}
