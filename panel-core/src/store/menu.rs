use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, info_span, warn, Span};

use super::error::{MenuError, MenuResult, StoreError, StoreResult};
use super::models::{next_status, MenuPatch, MenuRow, PLACEHOLDER_ID};
use super::records;

const NAME_COLUMN: usize = 0;

/// Persists the full registry. Swappable so tests can fail a rewrite midway.
pub trait RegistryWriter: Send + Sync {
    fn write(&self, path: &Path, rows: &[MenuRow]) -> StoreResult<()>;
}

pub struct DelimitedRegistryWriter;

impl RegistryWriter for DelimitedRegistryWriter {
    fn write(&self, path: &Path, rows: &[MenuRow]) -> StoreResult<()> {
        records::write_rows(path, rows.iter().map(MenuRow::to_fields))
    }
}

/// The registry of tracked comics. Every mutation rewrites the whole file
/// behind a `.bkp` copy that is restored if the rewrite fails.
pub struct MenuStore {
    path: PathBuf,
    writer: Arc<dyn RegistryWriter>,
    span: Span,
}

impl std::fmt::Debug for MenuStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MenuStore").field("path", &self.path).finish()
    }
}

impl MenuStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let span = info_span!("menu_store", registry = %path.display());
        Self {
            path,
            writer: Arc::new(DelimitedRegistryWriter),
            span,
        }
    }

    pub fn with_writer(mut self, writer: Arc<dyn RegistryWriter>) -> Self {
        self.writer = writer;
        self
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn backup_path(&self) -> PathBuf {
        let mut name = OsString::from(self.path.as_os_str());
        name.push(".bkp");
        PathBuf::from(name)
    }

    /// All rows in file order; a registry that does not exist yet is empty.
    pub fn rows(&self) -> StoreResult<Vec<MenuRow>> {
        self.recover_backup()?;
        self.read_rows()
    }

    /// Puts back a `.bkp` left behind by a rewrite that never finished; it is
    /// the last complete copy of the registry.
    pub fn recover_backup(&self) -> StoreResult<bool> {
        let backup = self.backup_path();
        if !backup.exists() {
            return Ok(false);
        }
        let _entered = self.span.enter();
        warn!(backup = %backup.display(), "restoring registry from leftover backup");
        fs::rename(&backup, &self.path).map_err(|err| StoreError::io(&self.path, err))?;
        Ok(true)
    }

    fn read_rows(&self) -> StoreResult<Vec<MenuRow>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        Ok(records::read_all(&self.path)?
            .iter()
            .map(|fields| MenuRow::from_fields(fields.as_slice()))
            .collect())
    }

    /// Fails with the first row (1-based line) that already carries one of
    /// `names` as either name, ignoring case, or `external_id` as its id.
    pub fn check_duplicate(&self, names: &[&str], external_id: Option<&str>) -> MenuResult<()> {
        let names: Vec<String> = names
            .iter()
            .filter(|name| !name.is_empty())
            .map(|name| name.to_lowercase())
            .collect();
        let external_id = external_id.filter(|id| !id.is_empty() && *id != PLACEHOLDER_ID);
        for (position, row) in self.rows()?.into_iter().enumerate() {
            let primary = row.primary_name.to_lowercase();
            let secondary = row.secondary_name.to_lowercase();
            let name_taken = names
                .iter()
                .any(|name| *name == primary || *name == secondary);
            let id_taken = external_id.is_some_and(|id| id == row.external_id);
            if name_taken || id_taken {
                let _entered = self.span.enter();
                warn!(line = position + 1, name = %row.primary_name, "duplicate registry entry");
                return Err(MenuError::Duplicate {
                    line: position + 1,
                    row,
                });
            }
        }
        Ok(())
    }

    /// Adds `row` at the top of the registry after the duplicate check.
    pub fn insert(&self, row: MenuRow) -> MenuResult<()> {
        let external_id = row.has_external_id().then_some(row.external_id.as_str());
        self.check_duplicate(&[&row.primary_name, &row.secondary_name], external_id)?;
        let name = row.primary_name.clone();
        self.transaction(move |rows| rows.insert(0, row))?;
        let _entered = self.span.enter();
        info!(name = %name, "registry entry added");
        Ok(())
    }

    /// Applies `patch` to every row whose names or id equal `match_key`
    /// (ignoring case) and returns how many rows changed.
    pub fn update_fields(&self, match_key: &str, patch: &MenuPatch) -> MenuResult<usize> {
        if patch.is_empty() || !self.rows()?.iter().any(|row| row.matches_key(match_key)) {
            return Ok(0);
        }
        let updated = self.transaction(|rows| {
            let mut updated = 0usize;
            for row in rows.iter_mut().filter(|row| row.matches_key(match_key)) {
                patch.apply(row);
                updated += 1;
            }
            updated
        })?;
        let _entered = self.span.enter();
        info!(key = match_key, updated, "registry entries updated");
        Ok(updated)
    }

    pub fn find(&self, name: &str) -> MenuResult<MenuRow> {
        self.rows()?
            .into_iter()
            .find(|row| row.matches_key(name))
            .ok_or_else(|| MenuError::NotFound(name.to_string()))
    }

    /// Rows whose primary name matches `pattern`, with their positions.
    pub fn list(&self, pattern: &str) -> MenuResult<Vec<(usize, MenuRow)>> {
        self.recover_backup()?;
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        Ok(records::find_matching(&self.path, pattern, NAME_COLUMN)?
            .into_iter()
            .map(|(position, fields)| (position, MenuRow::from_fields(fields.as_slice())))
            .collect())
    }

    /// Flips the status of the entry matching `name` and returns it as stored.
    pub fn toggle_status(&self, name: &str) -> MenuResult<MenuRow> {
        let mut row = self.find(name)?;
        let status = next_status(&row.status);
        self.update_fields(name, &MenuPatch::status(status))?;
        row.status = status.to_string();
        Ok(row)
    }

    fn transaction<T>(&self, mutate: impl FnOnce(&mut Vec<MenuRow>) -> T) -> MenuResult<T> {
        self.recover_backup()?;
        let _entered = self.span.enter();
        let backup = self.backup_path();
        let existed = self.path.exists();
        if existed {
            fs::copy(&self.path, &backup).map_err(|err| StoreError::io(&backup, err))?;
            debug!(backup = %backup.display(), "registry backed up");
        }

        let outcome = self.read_rows().and_then(|mut rows| {
            let value = mutate(&mut rows);
            self.writer.write(&self.path, &rows).map(|()| value)
        });

        match outcome {
            Ok(value) => {
                if existed {
                    if let Err(err) = fs::remove_file(&backup) {
                        warn!(
                            backup = %backup.display(),
                            error = %err,
                            "failed to remove registry backup"
                        );
                    }
                }
                Ok(value)
            }
            Err(err) => {
                let mut reason = err.to_string();
                if let Err(restore) = self.rollback(existed, &backup) {
                    reason = format!("{reason}; rollback failed: {restore}");
                }
                warn!(error = %reason, "registry rewrite failed");
                Err(MenuError::Update {
                    path: self.path.clone(),
                    reason,
                })
            }
        }
    }

    fn rollback(&self, existed: bool, backup: &Path) -> std::io::Result<()> {
        if existed {
            fs::rename(backup, &self.path)
        } else if self.path.exists() {
            fs::remove_file(&self.path)
        } else {
            Ok(())
        }
    }
}
