use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the bot
#[derive(Error, Debug)]
pub enum BotError {
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Telegram API error: {0}")]
    Telegram(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Missing required credential: {0}")]
    MissingCredential(&'static str),
}

impl From<reqwest::Error> for BotError {
    fn from(err: reqwest::Error) -> Self {
        BotError::Telegram(err.to_string())
    }
}

/// Catalog store errors
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Catalog file {path} is corrupt: {reason}")]
    Corrupt { path: PathBuf, reason: String },

    #[error("Failed to encode {kind}: {reason}")]
    Encode { kind: &'static str, reason: String },

    #[error("{kind} entry '{key}' already exists")]
    DuplicateKey { kind: &'static str, key: String },

    #[error("{kind} entry '{key}' not found")]
    NotFound { kind: &'static str, key: String },
}

impl CatalogError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CatalogError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn corrupt(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        CatalogError::Corrupt {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, BotError>;
