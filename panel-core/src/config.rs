use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::error::{ConfigError, Result};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PanelConfig {
    pub paths: PathsSection,
    pub chromium: ChromiumSection,
    #[serde(default)]
    pub crawl: CrawlSection,
    #[serde(default)]
    pub site: SiteSection,
}

impl PanelConfig {
    pub fn resolve_path<P: AsRef<Path>>(&self, candidate: P) -> PathBuf {
        let path = candidate.as_ref();
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            Path::new(&self.paths.base_dir).join(path)
        }
    }

    pub fn registry_path(&self) -> PathBuf {
        self.resolve_path(&self.paths.registry)
    }

    pub fn menus_dir(&self) -> PathBuf {
        self.resolve_path(&self.paths.menus_dir)
    }

    pub fn links_dir(&self) -> PathBuf {
        self.resolve_path(&self.paths.links_dir)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PathsSection {
    pub base_dir: String,
    pub registry: String,
    pub menus_dir: String,
    pub links_dir: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChromiumSection {
    pub executable_path: Option<String>,
    pub headless: bool,
    pub sandbox: bool,
    pub disable_gpu: bool,
    pub user_agent: Option<String>,
    pub window_size: Option<[u32; 2]>,
    pub request_timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExhaustionPolicy {
    /// Store the error sentinel for the page and move on.
    RecordSentinel,
    /// Abort the whole crawl, discarding what was recorded.
    Abort,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlSection {
    pub max_attempts: usize,
    pub settle_delay_ms: u64,
    pub page_delay_ms: [u64; 2],
    pub error_sentinel: String,
    pub on_exhausted: ExhaustionPolicy,
}

impl Default for CrawlSection {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            settle_delay_ms: 1200,
            page_delay_ms: [2000, 3500],
            error_sentinel: "URL error occurs".to_string(),
            on_exhausted: ExhaustionPolicy::RecordSentinel,
        }
    }
}

/// Per-site locators used to walk a chapter.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SiteSection {
    pub last_page_selector: String,
    pub image_carrier_id: String,
    pub next_page_id: String,
    pub image_tag: String,
    pub source_attribute: String,
}

impl Default for SiteSection {
    fn default() -> Self {
        Self {
            last_page_selector: "#pageSelect option:nth-last-child(1)".to_string(),
            image_carrier_id: "mangaFile".to_string(),
            next_page_id: "next".to_string(),
            image_tag: "img".to_string(),
            source_attribute: "src".to_string(),
        }
    }
}

pub fn load_panel_config<P: AsRef<Path>>(path: P) -> Result<PanelConfig> {
    load_toml(path)
}

fn load_toml<T, P>(path: P) -> Result<T>
where
    T: DeserializeOwned,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        source,
        path: path.to_path_buf(),
    })?;
    toml::from_str(&content).map_err(|source| ConfigError::Parse {
        source,
        path: path.to_path_buf(),
    })
}
