use thiserror::Error;

use super::retry::Transient;

pub type BrowserResult<T> = Result<T, BrowserError>;
pub type ResolveResult<T> = Result<T, ResolveError>;
pub type CrawlResult<T> = Result<T, CrawlError>;

/// Failures of the remote browser channel itself.
#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("chromium launch failed: {0}")]
    Launch(String),
    #[error("navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },
    #[error("element not found: {0}")]
    ElementNotFound(String),
    #[error("unknown tab handle {0}")]
    UnknownHandle(String),
    #[error("session error: {0}")]
    Session(String),
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl BrowserError {
    pub fn is_navigation(&self) -> bool {
        matches!(self, BrowserError::Navigation { .. })
    }
}

impl From<chromiumoxide::error::CdpError> for BrowserError {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        BrowserError::Session(err.to_string())
    }
}

impl From<tokio::task::JoinError> for BrowserError {
    fn from(err: tokio::task::JoinError) -> Self {
        BrowserError::Session(err.to_string())
    }
}

/// A single failed attempt to resolve one page's image.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("image carrier #{id} not found: {source}")]
    CarrierMissing { id: String, source: BrowserError },
    #[error("image carrier #{id} has no {attribute} attribute")]
    CarrierWithoutSource { id: String, attribute: String },
    #[error("secondary page has no <{tag}> element: {source}")]
    ImageMissing { tag: String, source: BrowserError },
    #[error("<{tag}> on secondary page has no {attribute} attribute")]
    ImageWithoutSource { tag: String, attribute: String },
    #[error("resolved image location {value:?} is not a valid url: {reason}")]
    MalformedUrl { value: String, reason: String },
    #[error("tab cleanup failed: {0}")]
    Cleanup(BrowserError),
    #[error(transparent)]
    Browser(#[from] BrowserError),
}

impl Transient for ResolveError {
    fn is_transient(&self) -> bool {
        true
    }
}

/// Terminal failure of a chapter crawl.
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("navigation failed: {0}")]
    Navigation(#[source] BrowserError),
    #[error("cannot determine page count from {selector}: {reason}")]
    PageCount { selector: String, reason: String },
    #[error("page {page} unresolved after {attempts} attempts: {source}")]
    RetriesExhausted {
        page: usize,
        attempts: usize,
        source: ResolveError,
    },
    #[error("cannot advance past page {page}: {source}")]
    Advance { page: usize, source: BrowserError },
}

/// Errors surfacing from one resolution attempt inside the crawl loop.
#[derive(Debug, Error)]
pub(crate) enum AttemptError {
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    #[error("reload failed: {0}")]
    Reload(BrowserError),
}

impl Transient for AttemptError {
    fn is_transient(&self) -> bool {
        matches!(self, AttemptError::Resolve(_))
    }
}
