mod chromium;
mod crawler;
mod error;
mod metrics;
mod pacing;
mod resolver;
mod retry;
mod session;

pub use chromium::{ChromiumLauncher, ChromiumSession, LaunchOverrides};
pub use crawler::{parse_page_count, CrawlPhase, CrawlReport, CrawlerConfig, PaginationCrawler};
pub use error::{BrowserError, BrowserResult, CrawlError, CrawlResult, ResolveError, ResolveResult};
pub use metrics::CrawlMetrics;
pub use pacing::PagePacer;
pub use resolver::{PageImageResolver, ResolverConfig};
pub use retry::{retry, RetryError, RetryOutcome, Transient};
pub use session::{BrowserSession, TabHandle};
