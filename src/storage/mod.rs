//! Storage module for persisting harvest results
//!
//! This module handles all database operations, including:
//! - SQLite database initialization and schema management
//! - Idempotent article upserts keyed by URL
//! - Recency queries for downstream digests
//! - Run tracking

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{ArticleStore, StorageError, StorageResult};

use chrono::{DateTime, Utc};
use std::path::Path;

/// Initializes or opens a storage database
pub fn open_storage(path: &Path) -> StorageResult<SqliteStorage> {
    SqliteStorage::new(path)
}

/// An article as stored in the database
#[derive(Debug, Clone, PartialEq)]
pub struct StoredArticle {
    pub id: i64,
    pub url: String,
    pub title: String,
    pub raw_text: String,
    pub published_at: DateTime<Utc>,
    pub date_source: String,
    pub fingerprint: String,
    pub inserted_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Represents a harvest run
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub registry_hash: String,
    pub status: RunStatus,
    pub sources_total: u64,
    pub sources_failed: u64,
    pub candidates: u64,
    pub persisted: u64,
    pub skipped: u64,
    pub failed: u64,
}

/// Status of a harvest run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}
