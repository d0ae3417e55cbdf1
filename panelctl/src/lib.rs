pub mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use panel_core::browser::{BrowserError, CrawlError};
use panel_core::store::{MenuError, MenuRow, MenuStore, StoreError};
use panel_core::{load_panel_config, PanelConfig};
use serde::Serialize;
use thiserror::Error;

use commands::links::{ErrorUrlArgs, FetchUrlArgs, ListMenuArgs, ListUrlArgs};
use commands::menu::{AddArgs, ListArgs, StateChangeArgs};

pub type Result<T> = std::result::Result<T, AppError>;

pub const EXIT_USAGE: i32 = 1;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(#[from] panel_core::ConfigError),
    #[error("browser error: {0}")]
    Browser(#[from] BrowserError),
    #[error("crawl failed: {0}")]
    Crawl(#[from] CrawlError),
    #[error("registry error: {0}")]
    Menu(#[from] MenuError),
    #[error("record error: {0}")]
    Store(#[from] StoreError),
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl AppError {
    /// Process exit status for this failure; each kind has its own value.
    pub fn exit_code(&self) -> i32 {
        match self {
            AppError::Config(_) | AppError::Serialize(_) => 2,
            AppError::Browser(err) if err.is_navigation() => 3,
            AppError::Browser(_) => 2,
            AppError::Crawl(CrawlError::Navigation(_)) => 3,
            AppError::Crawl(CrawlError::PageCount { .. }) => 32,
            AppError::Crawl(_) => 2,
            AppError::Menu(MenuError::NotFound(_)) => 11,
            AppError::Menu(MenuError::Update { .. }) => 12,
            AppError::Menu(MenuError::Duplicate { .. }) => 103,
            AppError::Menu(MenuError::Store(err)) | AppError::Store(err) => store_exit_code(err),
        }
    }
}

fn store_exit_code(err: &StoreError) -> i32 {
    match err {
        StoreError::Index { .. } => 18,
        StoreError::Format { .. } | StoreError::Io { .. } => 16,
    }
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Web comic page crawler and registry", long_about = None)]
pub struct Cli {
    /// Path to panel.toml
    #[arg(long, default_value = "configs/panel.toml")]
    pub config: PathBuf,
    /// Override paths.base_dir
    #[arg(long)]
    pub base_dir: Option<PathBuf>,
    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    Add(AddArgs),
    List(ListArgs),
    StateChange(StateChangeArgs),
    ListMenu(ListMenuArgs),
    FetchUrl(FetchUrlArgs),
    ListUrl(ListUrlArgs),
    ErrorUrl(ErrorUrlArgs),
}

pub async fn run(cli: Cli) -> Result<()> {
    let context = AppContext::new(&cli)?;

    match &cli.command {
        Commands::Add(args) => render(&commands::menu::add(context.menu(), args)?, cli.format),
        Commands::List(args) => render(&commands::menu::list(context.menu(), args)?, cli.format),
        Commands::StateChange(args) => render(
            &commands::menu::state_change(context.menu(), args)?,
            cli.format,
        ),
        Commands::ListMenu(args) => {
            render(&commands::links::list_menu(&context, args)?, cli.format)
        }
        Commands::FetchUrl(args) => render(
            &commands::links::fetch_url(&context, args).await?,
            cli.format,
        ),
        Commands::ListUrl(args) => render(&commands::links::list_url(&context, args)?, cli.format),
        Commands::ErrorUrl(args) => {
            render(&commands::links::error_url(&context, args)?, cli.format)
        }
    }
}

fn render<T>(value: &T, format: OutputFormat) -> Result<()>
where
    T: Serialize + DisplayFallback,
{
    match format {
        OutputFormat::Text => {
            println!("{}", value.display());
            Ok(())
        }
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(value)?;
            println!("{}", json);
            Ok(())
        }
    }
}

pub trait DisplayFallback {
    fn display(&self) -> String;
}

/// Loaded configuration plus the file layout derived from it.
#[derive(Debug)]
pub struct AppContext {
    config: PanelConfig,
    menu: MenuStore,
}

impl AppContext {
    pub fn new(cli: &Cli) -> Result<Self> {
        let mut config = load_panel_config(&cli.config)?;
        if let Some(base_dir) = &cli.base_dir {
            config.paths.base_dir = base_dir.to_string_lossy().into_owned();
        }
        Ok(Self::from_config(config))
    }

    pub fn from_config(config: PanelConfig) -> Self {
        let menu = MenuStore::new(config.registry_path());
        Self { config, menu }
    }

    pub fn config(&self) -> &PanelConfig {
        &self.config
    }

    pub fn menu(&self) -> &MenuStore {
        &self.menu
    }

    pub fn comic(&self, name: &str) -> Result<MenuRow> {
        Ok(self.menu.find(name)?)
    }

    /// `<menus_dir>/<name>_menu.csv`
    pub fn menu_file(&self, comic: &MenuRow) -> PathBuf {
        self.config
            .menus_dir()
            .join(format!("{}_menu.csv", comic.primary_name))
    }

    pub fn links_dir(&self, comic: &MenuRow) -> PathBuf {
        self.config.links_dir().join(&comic.primary_name)
    }

    /// `<links_dir>/<name>/<name>_<chapter>.csv`
    pub fn links_file(&self, comic: &MenuRow, chapter_title: &str) -> PathBuf {
        let chapter = chapter_title.replace(['/', '\\'], "_");
        self.links_dir(comic)
            .join(format!("{}_{}.csv", comic.primary_name, chapter))
    }
}
