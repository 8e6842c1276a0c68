//! Harness error type.

use std::path::PathBuf;

use thiserror::Error;

use apicompat_core::CompatError;

#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("failed reading '{path}': {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid surface '{origin}': {message}")]
    InvalidSurface { origin: String, message: String },
    #[error("unknown rule id '{0}'")]
    UnknownRule(String),
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error(transparent)]
    Compat(#[from] CompatError),
}
