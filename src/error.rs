//! Errors for the fallible edges (config, sample files, metrics store).
//! Link encoding, aggregation and classification never fail.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PanelError {
    #[error("config error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("invalid inventory: {0}")]
    Inventory(String),

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path}:{line}: bad sample: {source}")]
    Sample {
        path: PathBuf,
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("metrics store unavailable: {0}")]
    Store(String),
}

pub type Result<T> = std::result::Result<T, PanelError>;
