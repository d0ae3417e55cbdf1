use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failure to load the panelfetch TOML configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read panel config {path}: {source}")]
    Io { source: io::Error, path: PathBuf },
    #[error("invalid panel config {path}: {source}")]
    Parse {
        source: toml::de::Error,
        path: PathBuf,
    },
}

pub type Result<T> = std::result::Result<T, ConfigError>;
