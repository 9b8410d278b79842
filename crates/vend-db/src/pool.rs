//! # Database Handle
//!
//! Opens the SQLite file an import writes into and hands out repositories.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  DbConfig::new("vend.db")          DbConfig::in_memory()               │
//! │    WAL journal, NORMAL sync          one connection, never recycled    │
//! │    busy timeout for long upserts     (the database dies with it)       │
//! │            │                                   │                        │
//! │            └──────────────┬────────────────────┘                        │
//! │                           ▼                                             │
//! │              Database::new ── vend_sync_runs migration                 │
//! │                           │                                             │
//! │          ┌────────────────┼────────────────┐                            │
//! │          ▼                ▼                ▼                            │
//! │       schema()        records()          runs()                        │
//! │     DDL, watermark   batched upsert     run log                        │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A file database uses WAL so a reporting tool can read the imported
//! tables while an import is writing them.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::migrations;
use crate::repository::records::RecordRepository;
use crate::repository::runs::SyncRunRepository;
use crate::repository::schema::SchemaRepository;

/// Where the database lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DbLocation {
    File(PathBuf),
    Memory,
}

impl fmt::Display for DbLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DbLocation::File(path) => write!(f, "{}", path.display()),
            DbLocation::Memory => write!(f, ":memory:"),
        }
    }
}

/// How to open the database.
///
/// ```rust,ignore
/// let config = DbConfig::new("vend.db").max_connections(2);
/// ```
#[derive(Debug, Clone)]
pub struct DbConfig {
    pub location: DbLocation,

    /// Pool size. Imports write one table at a time, so a handful is plenty.
    pub max_connections: u32,

    /// How long a statement waits on a locked database before failing.
    pub busy_timeout: Duration,

    /// How long to wait for a free pooled connection.
    pub acquire_timeout: Duration,

    /// Apply the bookkeeping migrations on open.
    pub run_migrations: bool,
}

impl DbConfig {
    /// A file database, created on first use.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            location: DbLocation::File(path.into()),
            max_connections: 5,
            busy_timeout: Duration::from_secs(30),
            acquire_timeout: Duration::from_secs(30),
            run_migrations: true,
        }
    }

    /// A private in-memory database, for tests.
    pub fn in_memory() -> Self {
        DbConfig {
            location: DbLocation::Memory,
            max_connections: 1,
            busy_timeout: Duration::from_secs(5),
            acquire_timeout: Duration::from_secs(5),
            run_migrations: true,
        }
    }

    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    pub fn run_migrations(mut self, run: bool) -> Self {
        self.run_migrations = run;
        self
    }

    fn connect_options(&self) -> SqliteConnectOptions {
        match &self.location {
            DbLocation::Memory => SqliteConnectOptions::new()
                .in_memory(true)
                .busy_timeout(self.busy_timeout),
            DbLocation::File(path) => SqliteConnectOptions::new()
                .filename(path)
                .create_if_missing(true)
                .journal_mode(SqliteJournalMode::Wal)
                .synchronous(SqliteSynchronous::Normal)
                .busy_timeout(self.busy_timeout),
        }
    }

    fn pool_options(&self) -> SqlitePoolOptions {
        let options = SqlitePoolOptions::new()
            .max_connections(self.max_connections.max(1))
            .acquire_timeout(self.acquire_timeout);

        match self.location {
            // Every new connection would be a new, empty database.
            DbLocation::Memory => options
                .min_connections(1)
                .idle_timeout(None::<Duration>)
                .max_lifetime(None::<Duration>),
            DbLocation::File(_) => options,
        }
    }
}

// =============================================================================
// Database
// =============================================================================

/// An open import database.
///
/// The import engine only sees it as a [`RelationalStore`](crate::RelationalStore).
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
    location: DbLocation,
}

impl Database {
    /// Opens (creating if needed) the database and applies migrations.
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        info!(location = %config.location, "Opening database");

        let pool = config
            .pool_options()
            .connect_with(config.connect_options())
            .await
            .map_err(|e| DbError::ConnectionFailed(format!("{}: {}", config.location, e)))?;
        debug!(max_connections = config.max_connections, "Pool ready");

        let db = Database {
            pool,
            location: config.location,
        };
        if config.run_migrations {
            migrations::run_migrations(&db.pool).await?;
        }
        Ok(db)
    }

    pub fn location(&self) -> &DbLocation {
        &self.location
    }

    /// The underlying pool, for ad-hoc queries.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// DDL and introspection on imported tables.
    pub fn schema(&self) -> SchemaRepository {
        SchemaRepository::new(self.pool.clone())
    }

    /// Batched writes into imported tables.
    pub fn records(&self) -> RecordRepository {
        RecordRepository::new(self.pool.clone())
    }

    /// The sync run log.
    pub fn runs(&self) -> SyncRunRepository {
        SyncRunRepository::new(self.pool.clone())
    }

    /// Waits for in-flight queries and closes every connection.
    pub async fn close(&self) {
        debug!(location = %self.location, "Closing database");
        self.pool.close().await;
    }

    pub async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_database_is_migrated() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        assert!(db.health_check().await);
        assert_eq!(db.location(), &DbLocation::Memory);
        let (total, applied) = migrations::migration_status(db.pool()).await.unwrap();
        assert_eq!(total, applied);
    }

    #[tokio::test]
    async fn test_in_memory_state_survives_across_queries() {
        let db = Database::new(DbConfig::in_memory().run_migrations(false))
            .await
            .unwrap();

        sqlx::query("CREATE TABLE t (x TEXT)").execute(db.pool()).await.unwrap();
        sqlx::query("INSERT INTO t VALUES ('a')").execute(db.pool()).await.unwrap();
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM t")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_file_database_is_created() {
        let path = std::env::temp_dir().join(format!("vend-db-{}.db", uuid::Uuid::new_v4()));
        let db = Database::new(DbConfig::new(&path).max_connections(2)).await.unwrap();

        assert!(path.exists());
        assert_eq!(db.location().to_string(), path.display().to_string());
        db.close().await;
        let _ = std::fs::remove_file(&path);
    }
}
