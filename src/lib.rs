//! Regwatch: a recent-regulatory-content harvester
//!
//! This crate discovers article links on curated listing pages, extracts clean
//! article text, infers publication dates, filters by age and language, and
//! records the survivors idempotently in a SQLite store.

pub mod config;
pub mod crawler;
pub mod extract;
pub mod output;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for regwatch operations
#[derive(Debug, Error)]
pub enum RegwatchError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read registry file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in registry: {0}")]
    InvalidUrl(String),

    #[error("Invalid value for {key}: {value:?}")]
    InvalidTunable { key: String, value: String },
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing domain in URL")]
    MissingDomain,
}

// Re-export commonly used types
pub use config::{Registry, SourceConfig, Tunables};
pub use crawler::{CandidateOutcome, Coordinator};
pub use extract::{ArticleOutcome, ArticleRecord, SkipReason};
pub use storage::{ArticleStore, SqliteStorage, StoredArticle};
