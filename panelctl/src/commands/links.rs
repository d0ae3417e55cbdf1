use std::fs;
use std::path::PathBuf;

use clap::Args;
use panel_core::browser::{ChromiumLauncher, CrawlReport, LaunchOverrides, PaginationCrawler};
use panel_core::store::records::{self, Lookup};
use panel_core::store::PageRecord;
use panel_core::CrawlerConfig;
use serde::Serialize;
use tracing::{info, info_span, warn};

use crate::{AppContext, DisplayFallback, Result};

/// List the chapters of a comic's chapter menu.
#[derive(Args, Debug, Clone)]
pub struct ListMenuArgs {
    pub name: String,
    #[arg(default_value = "")]
    pub pattern: String,
}

/// Crawl one chapter and store its page image locations.
#[derive(Args, Debug, Clone)]
pub struct FetchUrlArgs {
    pub name: String,
    /// Identity number shown by `list-menu`
    pub identity: usize,
    /// Run Chromium with a visible window
    #[arg(long)]
    pub headed: bool,
}

/// List the stored link files of a comic.
#[derive(Args, Debug, Clone)]
pub struct ListUrlArgs {
    pub name: String,
    #[arg(default_value = "")]
    pub pattern: String,
}

/// Show the pages of a link file that could not be resolved.
#[derive(Args, Debug, Clone)]
pub struct ErrorUrlArgs {
    pub name: String,
    /// File tag shown by `list-url`
    pub tag: usize,
}

#[derive(Debug, Serialize)]
pub struct ChapterEntry {
    pub identity: usize,
    pub title: String,
}

#[derive(Debug, Serialize)]
pub struct ChapterListing {
    pub comic: String,
    pub chapters: Vec<ChapterEntry>,
    pub last_update: Option<String>,
    pub state: Option<String>,
}

impl DisplayFallback for ChapterListing {
    fn display(&self) -> String {
        let mut lines = vec!["------ START ------".to_string()];
        for chapter in &self.chapters {
            lines.push(format!("Identity Number {:4} : {}", chapter.identity, chapter.title));
        }
        lines.push("------ INFO -------".to_string());
        lines.push(format!("Last Update: {}", self.last_update.as_deref().unwrap_or("")));
        lines.push(format!("Comic State: {}", self.state.as_deref().unwrap_or("")));
        lines.push("------- END -------".to_string());
        lines.join("\n")
    }
}

#[derive(Debug, Serialize)]
pub struct FileEntry {
    pub tag: usize,
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct FileListing {
    pub directory: PathBuf,
    pub files: Vec<FileEntry>,
}

impl DisplayFallback for FileListing {
    fn display(&self) -> String {
        let mut lines = vec!["------ START ------".to_string()];
        for file in &self.files {
            lines.push(format!("FILE TAG {:4} : {:>20}", file.tag, file.name));
        }
        lines.push("------- END -------".to_string());
        lines.join("\n")
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorListing {
    pub file: PathBuf,
    pub errors: Vec<PageRecord>,
}

impl DisplayFallback for ErrorListing {
    fn display(&self) -> String {
        let mut lines = vec![format!("File {}", self.file.display())];
        for error in &self.errors {
            lines.push(format!("Page {} error - {}", error.index, error.value));
        }
        lines.join("\n")
    }
}

#[derive(Debug, Serialize)]
pub struct FetchSummary {
    pub file: PathBuf,
    pub report: CrawlReport,
}

impl DisplayFallback for FetchSummary {
    fn display(&self) -> String {
        let metrics = &self.report.metrics;
        format!(
            "{} ({} pages) -> {}\nresolved {} ({:.1}%) | degraded {} | attempts {} | reloads {} | waited {} ms",
            self.report.chapter.title,
            self.report.total_pages,
            self.file.display(),
            metrics.pages_resolved,
            metrics.resolution_rate(),
            metrics.pages_degraded,
            metrics.resolve_attempts,
            metrics.reloads,
            metrics.pacing_wait_ms
        )
    }
}

pub fn list_menu(context: &AppContext, args: &ListMenuArgs) -> Result<ChapterListing> {
    let comic = context.comic(&args.name)?;
    let rows = records::find_matching(context.menu_file(&comic), &args.pattern, 0)?;
    let last = rows.last().map(|(_, row)| row.clone());
    let chapters = rows
        .into_iter()
        .map(|(identity, row)| ChapterEntry {
            identity,
            title: row.into_iter().next().unwrap_or_default(),
        })
        .collect();
    Ok(ChapterListing {
        comic: comic.primary_name,
        chapters,
        last_update: last.as_ref().and_then(|row| row.get(2).cloned()),
        state: last.as_ref().and_then(|row| row.get(3).cloned()),
    })
}

pub async fn fetch_url(context: &AppContext, args: &FetchUrlArgs) -> Result<FetchSummary> {
    let comic = context.comic(&args.name)?;
    let chapter = records::read_chapter(context.menu_file(&comic), args.identity)?;
    let file = context.links_file(&comic, &chapter.title);

    let launcher = ChromiumLauncher::new(context.config().chromium.clone());
    let session = launcher
        .launch_with_overrides(LaunchOverrides {
            headless: args.headed.then_some(false),
        })
        .await?;
    let crawler = PaginationCrawler::new(CrawlerConfig::from_config(context.config())).with_span(
        info_span!("fetch_url", comic = %comic.primary_name, identity = args.identity),
    );
    let report = crawler.run(session, &chapter).await?;

    if let Err(err) = records::write_indexed(&file, report.values()) {
        if let Err(cleanup) = fs::remove_file(&file) {
            warn!(file = %file.display(), error = %cleanup, "failed to remove partial link file");
        }
        return Err(err.into());
    }
    info!(file = %file.display(), pages = report.total_pages, "link file written");
    Ok(FetchSummary { file, report })
}

pub fn list_url(context: &AppContext, args: &ListUrlArgs) -> Result<FileListing> {
    let comic = context.comic(&args.name)?;
    let directory = context.links_dir(&comic);
    let files = if directory.is_dir() {
        records::find_matching(&directory, &args.pattern, 0)?
            .into_iter()
            .map(|(tag, row)| FileEntry {
                tag,
                name: row.into_iter().next().unwrap_or_default(),
            })
            .collect()
    } else {
        Vec::new()
    };
    Ok(FileListing { directory, files })
}

pub fn error_url(context: &AppContext, args: &ErrorUrlArgs) -> Result<ErrorListing> {
    let comic = context.comic(&args.name)?;
    let directory = context.links_dir(&comic);
    let name = records::read_at(&directory, args.tag, Lookup::Directory)?
        .into_iter()
        .next()
        .unwrap_or_default();
    let file = directory.join(name);
    let errors = records::find_errors(&file, &context.config().crawl.error_sentinel)?;
    Ok(ErrorListing { file, errors })
}
