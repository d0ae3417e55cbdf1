use std::cell::Cell;
use std::collections::HashSet;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, info_span, warn, Instrument, Span};
use url::Url;

use crate::config::{CrawlSection, SiteSection};

use super::error::{BrowserError, BrowserResult, ResolveError, ResolveResult};
use super::session::{BrowserSession, TabHandle};

#[derive(Debug, Clone)]
pub struct ResolverConfig {
    pub carrier_id: String,
    pub source_attribute: String,
    pub image_tag: String,
    pub settle_delay: Duration,
}

impl ResolverConfig {
    pub fn from_sections(site: &SiteSection, crawl: &CrawlSection) -> Self {
        Self {
            carrier_id: site.image_carrier_id.clone(),
            source_attribute: site.source_attribute.clone(),
            image_tag: site.image_tag.clone(),
            settle_delay: Duration::from_millis(crawl.settle_delay_ms),
        }
    }
}

/// Resolves the real image behind a page's carrier element by opening the
/// carrier's target in a background tab and reading the first image there.
#[derive(Debug)]
pub struct PageImageResolver {
    config: ResolverConfig,
    span: Span,
    tabs_opened: Cell<u64>,
}

impl PageImageResolver {
    pub fn new(config: ResolverConfig) -> Self {
        let span = info_span!("resolver", carrier = %config.carrier_id);
        Self {
            config,
            span,
            tabs_opened: Cell::new(0),
        }
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    pub fn tabs_opened(&self) -> u64 {
        self.tabs_opened.get()
    }

    /// One resolution attempt. Whatever the outcome, every tab opened during
    /// the call is closed and focus is back on the tab that had it before.
    pub async fn resolve<S>(&self, session: &mut S) -> ResolveResult<String>
    where
        S: BrowserSession,
    {
        let span = self.span.clone();
        self.resolve_with_cleanup(session).instrument(span).await
    }

    async fn resolve_with_cleanup<S>(&self, session: &mut S) -> ResolveResult<String>
    where
        S: BrowserSession,
    {
        let checkpoint = TabCheckpoint::take(session).await?;
        let outcome = self.extract(session).await;
        let cleanup = checkpoint.restore(session).await;
        match (outcome, cleanup) {
            (Ok(url), Ok(())) => Ok(url),
            (Ok(_), Err(err)) => Err(ResolveError::Cleanup(err)),
            (Err(err), Ok(())) => Err(err),
            (Err(err), Err(cleanup)) => {
                warn!(error = %cleanup, "tab cleanup failed after resolution error");
                Err(err)
            }
        }
    }

    async fn extract<S>(&self, session: &mut S) -> ResolveResult<String>
    where
        S: BrowserSession,
    {
        let config = &self.config;
        let carrier = session
            .find_by_id(&config.carrier_id)
            .await
            .map_err(|source| ResolveError::CarrierMissing {
                id: config.carrier_id.clone(),
                source,
            })?;
        let webpage = session
            .attribute(&carrier, &config.source_attribute)
            .await?
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .ok_or_else(|| ResolveError::CarrierWithoutSource {
                id: config.carrier_id.clone(),
                attribute: config.source_attribute.clone(),
            })?;
        debug!(webpage = %webpage, "opening carrier target");

        let tab = session.open_background(&webpage).await?;
        self.tabs_opened.set(self.tabs_opened.get() + 1);
        sleep(config.settle_delay).await;

        session.switch_to(&tab).await?;
        let image = session
            .find_by_selector(&config.image_tag)
            .await
            .map_err(|source| ResolveError::ImageMissing {
                tag: config.image_tag.clone(),
                source,
            })?;
        let value = session
            .attribute(&image, &config.source_attribute)
            .await?
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .ok_or_else(|| ResolveError::ImageWithoutSource {
                tag: config.image_tag.clone(),
                attribute: config.source_attribute.clone(),
            })?;
        Url::parse(&value).map_err(|err| ResolveError::MalformedUrl {
            value: value.clone(),
            reason: err.to_string(),
        })?;
        debug!(image = %value, "image resolved");
        Ok(value)
    }
}

/// Handles open before a resolution attempt; anything outside this set is
/// closed when the attempt ends.
#[derive(Debug)]
struct TabCheckpoint {
    origin: TabHandle,
    baseline: HashSet<TabHandle>,
}

impl TabCheckpoint {
    async fn take<S>(session: &mut S) -> BrowserResult<Self>
    where
        S: BrowserSession,
    {
        let origin = session.current_handle();
        let baseline = session.current_handles().await?.into_iter().collect();
        Ok(Self { origin, baseline })
    }

    async fn restore<S>(&self, session: &mut S) -> BrowserResult<()>
    where
        S: BrowserSession,
    {
        let mut first_error: Option<BrowserError> = None;
        match session.current_handles().await {
            Ok(handles) => {
                for handle in handles
                    .into_iter()
                    .filter(|handle| !self.baseline.contains(handle))
                {
                    if let Err(err) = session.close(&handle).await {
                        warn!(handle = %handle, error = %err, "failed to close extra tab");
                        first_error.get_or_insert(err);
                    }
                }
            }
            Err(err) => {
                first_error.get_or_insert(err);
            }
        }
        if let Err(err) = session.switch_to(&self.origin).await {
            first_error.get_or_insert(err);
        }
        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}
