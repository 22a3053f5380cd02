//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the ArticleStore trait.

use crate::extract::ArticleRecord;
use crate::output::RunStats;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{ArticleStore, StorageError, StorageResult};
use crate::storage::{RunRecord, RunStatus, StoredArticle};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

const ARTICLE_COLUMNS: &str =
    "id, url, title, raw_text, published_at, date_source, fingerprint, inserted_at, updated_at";

const RUN_COLUMNS: &str = "id, started_at, finished_at, registry_hash, status, sources_total, \
     sources_failed, candidates, persisted, skipped, failed";

/// Formats a timestamp for storage (fixed precision, `Z` suffix)
pub fn to_db_timestamp(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn from_db_timestamp(column: &'static str, value: String) -> StorageResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| StorageError::InvalidTimestamp { column, value })
}

/// Raw article row before timestamp parsing
struct ArticleRow {
    id: i64,
    url: String,
    title: String,
    raw_text: String,
    published_at: String,
    date_source: String,
    fingerprint: String,
    inserted_at: String,
    updated_at: String,
}

impl ArticleRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            url: row.get(1)?,
            title: row.get(2)?,
            raw_text: row.get(3)?,
            published_at: row.get(4)?,
            date_source: row.get(5)?,
            fingerprint: row.get(6)?,
            inserted_at: row.get(7)?,
            updated_at: row.get(8)?,
        })
    }

    fn into_article(self) -> StorageResult<StoredArticle> {
        Ok(StoredArticle {
            id: self.id,
            url: self.url,
            title: self.title,
            raw_text: self.raw_text,
            published_at: from_db_timestamp("published_at", self.published_at)?,
            date_source: self.date_source,
            fingerprint: self.fingerprint,
            inserted_at: from_db_timestamp("inserted_at", self.inserted_at)?,
            updated_at: from_db_timestamp("updated_at", self.updated_at)?,
        })
    }
}

fn run_from_row(row: &Row<'_>) -> rusqlite::Result<RunRecord> {
    Ok(RunRecord {
        id: row.get(0)?,
        started_at: row.get(1)?,
        finished_at: row.get(2)?,
        registry_hash: row.get(3)?,
        status: RunStatus::from_db_string(&row.get::<_, String>(4)?)
            .unwrap_or(RunStatus::Running),
        sources_total: row.get::<_, i64>(5)? as u64,
        sources_failed: row.get::<_, i64>(6)? as u64,
        candidates: row.get::<_, i64>(7)? as u64,
        persisted: row.get::<_, i64>(8)? as u64,
        skipped: row.get::<_, i64>(9)? as u64,
        failed: row.get::<_, i64>(10)? as u64,
    })
}

/// SQLite storage backend
///
/// The connection sits behind a mutex; every method holds it only for the
/// duration of its statements.
pub struct SqliteStorage {
    conn: Mutex<Connection>,
}

impl SqliteStorage {
    /// Opens or creates the database at `path`
    pub fn new(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
            PRAGMA busy_timeout = 5000;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Creates an in-memory database
    pub fn open_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ArticleStore for SqliteStorage {
    // ===== Articles =====

    fn upsert_article(&self, record: &ArticleRecord) -> StorageResult<StoredArticle> {
        let conn = self.conn();
        let now = to_db_timestamp(&Utc::now());

        conn.execute(
            "INSERT INTO articles
                (url, title, raw_text, published_at, date_source, fingerprint, inserted_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)
             ON CONFLICT(url) DO UPDATE SET
                title = excluded.title,
                raw_text = excluded.raw_text,
                published_at = excluded.published_at,
                date_source = excluded.date_source,
                fingerprint = excluded.fingerprint,
                updated_at = excluded.updated_at",
            params![
                record.url,
                record.title,
                record.text,
                to_db_timestamp(&record.published_at),
                record.date_source.as_str(),
                record.fingerprint,
                now,
            ],
        )?;

        let row = conn.query_row(
            &format!("SELECT {} FROM articles WHERE url = ?1", ARTICLE_COLUMNS),
            params![record.url],
            ArticleRow::from_row,
        )?;
        drop(conn);

        row.into_article()
    }

    fn get_article(&self, url: &str) -> StorageResult<Option<StoredArticle>> {
        let row = self
            .conn()
            .query_row(
                &format!("SELECT {} FROM articles WHERE url = ?1", ARTICLE_COLUMNS),
                params![url],
                ArticleRow::from_row,
            )
            .optional()?;

        row.map(ArticleRow::into_article).transpose()
    }

    fn list_recent_articles(
        &self,
        since: DateTime<Utc>,
        limit: usize,
    ) -> StorageResult<Vec<StoredArticle>> {
        let rows = {
            let conn = self.conn();
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM articles WHERE published_at >= ?1
                 ORDER BY published_at DESC, id DESC LIMIT ?2",
                ARTICLE_COLUMNS
            ))?;

            let rows = stmt
                .query_map(
                    params![to_db_timestamp(&since), limit as i64],
                    ArticleRow::from_row,
                )?
                .collect::<Result<Vec<_>, _>>()?;
            rows
        };

        rows.into_iter().map(ArticleRow::into_article).collect()
    }

    fn count_articles(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn()
            .query_row("SELECT COUNT(*) FROM articles", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    // ===== Runs =====

    fn create_run(&self, registry_hash: &str) -> StorageResult<i64> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO runs (started_at, registry_hash, status) VALUES (?1, ?2, ?3)",
            params![
                to_db_timestamp(&Utc::now()),
                registry_hash,
                RunStatus::Running.to_db_string()
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    fn complete_run(
        &self,
        run_id: i64,
        status: RunStatus,
        stats: &RunStats,
    ) -> StorageResult<()> {
        let updated = self.conn().execute(
            "UPDATE runs SET status = ?1, finished_at = ?2, sources_total = ?3,
                sources_failed = ?4, candidates = ?5, persisted = ?6, skipped = ?7, failed = ?8
             WHERE id = ?9",
            params![
                status.to_db_string(),
                to_db_timestamp(&Utc::now()),
                stats.sources_total as i64,
                stats.sources_failed as i64,
                stats.candidates as i64,
                stats.persisted as i64,
                stats.skipped_total() as i64,
                stats.failed as i64,
                run_id
            ],
        )?;

        if updated == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord> {
        self.conn()
            .query_row(
                &format!("SELECT {} FROM runs WHERE id = ?1", RUN_COLUMNS),
                params![run_id],
                run_from_row,
            )
            .optional()?
            .ok_or(StorageError::RunNotFound(run_id))
    }

    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>> {
        let run = self
            .conn()
            .query_row(
                &format!("SELECT {} FROM runs ORDER BY id DESC LIMIT 1", RUN_COLUMNS),
                [],
                run_from_row,
            )
            .optional()?;
        Ok(run)
    }
}
