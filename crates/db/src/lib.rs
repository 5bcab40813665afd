// crates/db/src/lib.rs
//! Data-access façade for AgencyDesk.
//!
//! `Database` wraps a SQLite pool. Each entity module adds an `impl Database`
//! block with typed reads and writes; every committed write is announced on
//! the [`ChangeBus`] so subscribers can re-fetch.
#![allow(clippy::too_many_arguments)]

mod fallback;
pub mod feed;
mod migrations;
mod queries;
pub mod realtime;

pub use fallback::OrEmpty;
pub use feed::{ConversationFeed, FeedState};
pub use queries::*;
pub use realtime::{ChangeBus, Notification, Subscription};

use agencydesk_core::ValidationError;
use agencydesk_types::{ChangeEvent, ChangeOp, Table};
use sqlx::error::ErrorKind;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{ConnectOptions, SqlitePool};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlx(sqlx::Error),

    #[error("Failed to determine data directory")]
    NoDataDir,

    #[error("Failed to create database directory: {0}")]
    CreateDir(#[from] std::io::Error),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Not allowed: {0}")]
    Forbidden(String),

    /// A schema constraint rejected the write. The message is readable text,
    /// never the raw SQL.
    #[error("Constraint violation: {0}")]
    Constraint(String),

    #[error(transparent)]
    Invalid(#[from] ValidationError),

    #[error("Malformed JSON column: {0}")]
    Serde(#[from] serde_json::Error),
}

impl DbError {
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            let detail = db_err
                .message()
                .split_once(": ")
                .map(|(_, rest)| rest.to_string())
                .unwrap_or_default();
            let summary = match db_err.kind() {
                ErrorKind::UniqueViolation => Some("a record with the same value already exists"),
                ErrorKind::ForeignKeyViolation => Some("a referenced record does not exist"),
                ErrorKind::NotNullViolation => Some("a required field is missing"),
                ErrorKind::CheckViolation => Some("a field has a value that is not allowed"),
                _ => None,
            };
            if let Some(summary) = summary {
                return if detail.is_empty() {
                    DbError::Constraint(summary.to_string())
                } else {
                    DbError::Constraint(format!("{summary} ({detail})"))
                };
            }
        }
        DbError::Sqlx(err)
    }
}

pub type DbResult<T> = Result<T, DbError>;

/// Main database handle wrapping a SQLite connection pool.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
    db_path: PathBuf,
    changes: ChangeBus,
}

impl Database {
    /// Open (or create) the database at the given path and run migrations.
    pub async fn new(path: &Path) -> DbResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", path.display()))?
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(std::time::Duration::from_secs(30))
            .log_slow_statements(
                tracing::log::LevelFilter::Warn,
                std::time::Duration::from_secs(5),
            );

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await?;

        let db = Self {
            pool,
            db_path: path.to_owned(),
            changes: ChangeBus::default(),
        };
        db.run_migrations().await?;

        info!("Database opened at {}", path.display());
        Ok(db)
    }

    /// Create an in-memory database (for testing).
    ///
    /// Uses `shared_cache(true)` so all pool connections share the same
    /// in-memory database. Without this, each connection gets its own
    /// separate database, breaking `tokio::try_join!` and concurrent queries.
    pub async fn new_in_memory() -> DbResult<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?
            .shared_cache(true)
            .foreign_keys(true)
            .busy_timeout(std::time::Duration::from_secs(5));
        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await?;
        let db = Self {
            pool,
            db_path: PathBuf::new(),
            changes: ChangeBus::default(),
        };
        db.run_migrations().await?;
        Ok(db)
    }

    /// Open the database at the default location: `<data dir>/agencydesk/agencydesk.db`
    pub async fn open_default() -> DbResult<Self> {
        let path = default_db_path()?;
        Self::new(&path).await
    }

    /// Run all inline migrations.
    ///
    /// Uses a `_migrations` table to track which migrations have already been
    /// applied, so that non-idempotent statements (e.g. ALTER TABLE ADD COLUMN)
    /// are only executed once.
    async fn run_migrations(&self) -> DbResult<()> {
        sqlx::query("CREATE TABLE IF NOT EXISTS _migrations (version INTEGER PRIMARY KEY)")
            .execute(&self.pool)
            .await?;

        let row: (i64,) = sqlx::query_as("SELECT COALESCE(MAX(version), 0) FROM _migrations")
            .fetch_one(&self.pool)
            .await?;
        let current_version = row.0 as usize;

        for (i, migration) in migrations::MIGRATIONS.iter().enumerate() {
            let version = i + 1; // 1-based
            if version > current_version {
                match sqlx::query(migration).execute(&self.pool).await {
                    Ok(_) => {}
                    Err(e) if e.to_string().contains("duplicate column name") => {
                        // Column already exists from a previous run without tracking.
                    }
                    Err(e) => return Err(DbError::Sqlx(e)),
                }
                sqlx::query("INSERT INTO _migrations (version) VALUES (?)")
                    .bind(version as i64)
                    .execute(&self.pool)
                    .await?;
            }
        }

        Ok(())
    }

    /// Get a reference to the underlying connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Get the path to the database file.
    /// Returns an empty path for in-memory databases.
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// Round-trip a trivial query; used by the health endpoint.
    pub async fn ping(&self) -> DbResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    /// The bus every committed write is published on.
    pub fn changes(&self) -> &ChangeBus {
        &self.changes
    }

    pub(crate) fn notify(&self, table: Table, op: ChangeOp, id: &str) {
        self.changes.publish(ChangeEvent::new(table, op, id));
    }
}

/// Returns the default database path: `<data dir>/agencydesk/agencydesk.db`
pub fn default_db_path() -> DbResult<PathBuf> {
    agencydesk_core::paths::db_path().ok_or(DbError::NoDataDir)
}

/// Current time as unix seconds, the unit of every `*_at` column.
pub(crate) fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

pub(crate) fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_database() {
        let db = Database::new_in_memory()
            .await
            .expect("should create in-memory database");

        for table in ["profiles", "clients", "projects", "tasks", "messages", "blog_posts"] {
            let count: (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM {table}"))
                .fetch_one(db.pool())
                .await
                .unwrap_or_else(|_| panic!("{table} table should exist"));
            assert_eq!(count.0, 0);
        }
    }

    #[tokio::test]
    async fn test_migrations_idempotent() {
        let db = Database::new_in_memory()
            .await
            .expect("first open should succeed");

        db.run_migrations()
            .await
            .expect("second migration run should succeed");

        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM clients")
            .fetch_one(db.pool())
            .await
            .expect("clients table should still exist");
        assert_eq!(count.0, 0);
    }

    #[tokio::test]
    async fn test_file_based_database() {
        let tmp = tempfile::tempdir().expect("should create temp dir");
        let db_path = tmp.path().join("nested").join("test.db");

        let db = Database::new(&db_path)
            .await
            .expect("should create file-based database");

        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM leads")
            .fetch_one(db.pool())
            .await
            .expect("leads table should exist");
        assert_eq!(count.0, 0);

        assert!(db_path.exists(), "database file should be created on disk");
        assert_eq!(db.db_path(), db_path.as_path());
    }

    #[tokio::test]
    async fn test_foreign_keys_enforced() {
        let db = Database::new_in_memory().await.unwrap();
        let err = sqlx::query(
            "INSERT INTO projects (id, client_id, name, status, progress, value, created_at, updated_at)
             VALUES ('p1', 'missing-client', 'Orphan', 'active', 0, 0, 0, 0)",
        )
        .execute(db.pool())
        .await
        .map_err(DbError::from)
        .unwrap_err();
        assert!(matches!(err, DbError::Constraint(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn test_check_violation_is_readable() {
        let db = Database::new_in_memory().await.unwrap();
        let err = sqlx::query(
            "INSERT INTO profiles (id, email, role, created_at, updated_at)
             VALUES ('u1', 'a@b.c', 'owner', 0, 0)",
        )
        .execute(db.pool())
        .await
        .map_err(DbError::from)
        .unwrap_err();
        match err {
            DbError::Constraint(msg) => {
                assert!(msg.starts_with("a field has a value that is not allowed"));
                assert!(!msg.contains("INSERT"));
            }
            other => panic!("expected constraint error, got {other:?}"),
        }
    }

    #[test]
    fn test_default_db_path() {
        let path = default_db_path().expect("should resolve default path");
        assert!(path.to_string_lossy().ends_with("agencydesk.db"));
    }
}
