use std::io;
use std::path::PathBuf;

use thiserror::Error;

use super::models::MenuRow;

pub type StoreResult<T> = Result<T, StoreError>;
pub type MenuResult<T> = Result<T, MenuError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("index {index} out of range for {path} ({len} entries)")]
    Index {
        path: PathBuf,
        index: usize,
        len: usize,
    },
    #[error("malformed record file {path}: {reason}")]
    Format { path: PathBuf, reason: String },
    #[error("io error on {path}: {source}")]
    Io { path: PathBuf, source: io::Error },
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        StoreError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn format(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        StoreError::Format {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum MenuError {
    #[error("duplicate of registry line {line}: {row:?}")]
    Duplicate { line: usize, row: MenuRow },
    #[error("registry update of {path} failed and was rolled back: {reason}")]
    Update { path: PathBuf, reason: String },
    #[error("no registry entry matches {0:?}")]
    NotFound(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}
