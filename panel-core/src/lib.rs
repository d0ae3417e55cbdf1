pub mod browser;
pub mod config;
pub mod error;
pub mod store;

pub use browser::{
    BrowserError, BrowserSession, ChromiumLauncher, ChromiumSession, CrawlError, CrawlReport,
    CrawlerConfig, PaginationCrawler, TabHandle,
};
pub use config::{
    load_panel_config, ChromiumSection, CrawlSection, ExhaustionPolicy, PanelConfig,
    PathsSection, SiteSection,
};
pub use error::{ConfigError, Result};
pub use store::{ChapterReference, MenuError, MenuRow, MenuStore, PageRecord, StoreError};
