//! Storage traits and error types

use crate::extract::ArticleRecord;
use crate::output::RunStats;
use crate::storage::{RunRecord, RunStatus, StoredArticle};
use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("Invalid timestamp in column {column}: {value}")]
    InvalidTimestamp { column: &'static str, value: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Persistence sink for extracted articles and run bookkeeping
///
/// Methods take `&self` so one store can be shared between concurrent
/// extraction tasks; implementations synchronize internally.
pub trait ArticleStore: Send + Sync {
    // ===== Articles =====

    /// Inserts or replaces the article with the record's URL
    ///
    /// Idempotent on `url`: the latest write wins for every field except
    /// `inserted_at`, which keeps the first write's time.
    fn upsert_article(&self, record: &ArticleRecord) -> StorageResult<StoredArticle>;

    /// Gets an article by URL
    fn get_article(&self, url: &str) -> StorageResult<Option<StoredArticle>>;

    /// Articles published at or after `since`, newest first
    fn list_recent_articles(
        &self,
        since: DateTime<Utc>,
        limit: usize,
    ) -> StorageResult<Vec<StoredArticle>>;

    /// Articles published in the last `days` days, newest first
    fn list_recent_articles_days(
        &self,
        days: i64,
        limit: usize,
    ) -> StorageResult<Vec<StoredArticle>> {
        let since = Duration::try_days(days)
            .and_then(|window| Utc::now().checked_sub_signed(window))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        self.list_recent_articles(since, limit)
    }

    /// Total number of stored articles
    fn count_articles(&self) -> StorageResult<u64>;

    // ===== Runs =====

    /// Records the start of a run, returning its ID
    fn create_run(&self, registry_hash: &str) -> StorageResult<i64>;

    /// Records the end of a run with its final counters
    fn complete_run(&self, run_id: i64, status: RunStatus, stats: &RunStats)
        -> StorageResult<()>;

    /// Gets a run by ID
    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord>;

    /// Gets the most recent run
    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>>;
}
