use clap::Args;
use panel_core::store::{MenuRow, MenuStore};
use serde::Serialize;

use crate::{DisplayFallback, Result};

/// Track a new comic in the registry.
#[derive(Args, Debug, Clone)]
pub struct AddArgs {
    /// Primary (romanized) name
    pub name: String,
    /// Secondary (original script) name
    pub secondary: String,
    /// Site id of the comic, if known
    #[arg(long)]
    pub id: Option<String>,
}

/// List tracked comics whose name matches a pattern.
#[derive(Args, Debug, Clone)]
pub struct ListArgs {
    /// Case-insensitive regex; lists everything when omitted
    #[arg(default_value = "")]
    pub pattern: String,
}

/// Flip a comic between in-progress and complete.
#[derive(Args, Debug, Clone)]
pub struct StateChangeArgs {
    /// Either name or the site id
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct RegistryEntry {
    pub action: &'static str,
    pub row: MenuRow,
}

impl DisplayFallback for RegistryEntry {
    fn display(&self) -> String {
        format!(
            "{}: {} | {} | {} | {}",
            self.action,
            self.row.primary_name,
            self.row.secondary_name,
            self.row.external_id,
            self.row.status
        )
    }
}

#[derive(Debug, Serialize)]
pub struct ListedComic {
    pub position: usize,
    #[serde(flatten)]
    pub row: MenuRow,
}

#[derive(Debug, Serialize)]
pub struct RegistryListing {
    pub comics: Vec<ListedComic>,
}

impl DisplayFallback for RegistryListing {
    fn display(&self) -> String {
        if self.comics.is_empty() {
            return "No tracked comics match".to_string();
        }
        self.comics
            .iter()
            .map(|comic| {
                format!(
                    "{:4} | {} | {} | {} | {}",
                    comic.position,
                    comic.row.primary_name,
                    comic.row.secondary_name,
                    comic.row.external_id,
                    comic.row.status
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

pub fn add(menu: &MenuStore, args: &AddArgs) -> Result<RegistryEntry> {
    let row = MenuRow::new(&args.name, &args.secondary, args.id.clone());
    menu.insert(row.clone())?;
    Ok(RegistryEntry {
        action: "added",
        row,
    })
}

pub fn list(menu: &MenuStore, args: &ListArgs) -> Result<RegistryListing> {
    let comics = menu
        .list(&args.pattern)?
        .into_iter()
        .map(|(position, row)| ListedComic { position, row })
        .collect();
    Ok(RegistryListing { comics })
}

pub fn state_change(menu: &MenuStore, args: &StateChangeArgs) -> Result<RegistryEntry> {
    let row = menu.toggle_status(&args.name)?;
    Ok(RegistryEntry {
        action: "status changed",
        row,
    })
}
