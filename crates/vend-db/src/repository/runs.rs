//! # Sync Run Repository
//!
//! One row in `vend_sync_runs` per class pass.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   start(class) ──► running ──┬──► succeed(counts) ──► succeeded        │
//! │                              └──► fail(counts, error) ──► failed       │
//! │                                                                         │
//! │   A run left in `running` means the process died mid-pass; tables     │
//! │   committed before that point keep their last upserted state.          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};

/// Lifecycle state of a sync run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, sqlx::Type)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Running,
    Succeeded,
    Failed,
}

/// Counters recorded when a run finishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct RunCounts {
    pub resources: i64,
    pub rows_written: i64,
    pub skipped: i64,
}

/// A row of `vend_sync_runs`.
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct SyncRun {
    pub id: String,
    pub class: String,
    pub status: RunStatus,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub resources: i64,
    pub rows_written: i64,
    pub skipped: i64,
    pub error: Option<String>,
}

const SELECT_RUN: &str = r#"
    SELECT id, class, status, started_at, finished_at,
           resources, rows_written, skipped, error
    FROM vend_sync_runs
"#;

/// Repository for the sync run log.
#[derive(Debug, Clone)]
pub struct SyncRunRepository {
    pool: SqlitePool,
}

impl SyncRunRepository {
    /// Creates a new SyncRunRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SyncRunRepository { pool }
    }

    /// Records the start of a class pass.
    pub async fn start(&self, class: &str) -> DbResult<SyncRun> {
        let run = SyncRun {
            id: Uuid::new_v4().to_string(),
            class: class.to_string(),
            status: RunStatus::Running,
            started_at: Utc::now(),
            finished_at: None,
            resources: 0,
            rows_written: 0,
            skipped: 0,
            error: None,
        };

        sqlx::query(
            r#"
            INSERT INTO vend_sync_runs (id, class, status, started_at)
            VALUES (?1, ?2, ?3, ?4)
            "#,
        )
        .bind(&run.id)
        .bind(&run.class)
        .bind(run.status)
        .bind(run.started_at)
        .execute(&self.pool)
        .await?;

        debug!(run_id = %run.id, class = %class, "Sync run started");
        Ok(run)
    }

    /// Marks a run as succeeded.
    pub async fn succeed(&self, id: &str, counts: RunCounts) -> DbResult<()> {
        self.finish(id, RunStatus::Succeeded, counts, None).await
    }

    /// Marks a run as failed.
    pub async fn fail(&self, id: &str, counts: RunCounts, error: &str) -> DbResult<()> {
        self.finish(id, RunStatus::Failed, counts, Some(error)).await
    }

    async fn finish(
        &self,
        id: &str,
        status: RunStatus,
        counts: RunCounts,
        error: Option<&str>,
    ) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE vend_sync_runs SET
                status = ?2,
                finished_at = ?3,
                resources = ?4,
                rows_written = ?5,
                skipped = ?6,
                error = ?7
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(status)
        .bind(Utc::now())
        .bind(counts.resources)
        .bind(counts.rows_written)
        .bind(counts.skipped)
        .bind(error)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Sync run", id));
        }
        Ok(())
    }

    /// Most recent run for a class.
    pub async fn latest(&self, class: &str) -> DbResult<Option<SyncRun>> {
        let sql = format!("{} WHERE class = ?1 ORDER BY started_at DESC LIMIT 1", SELECT_RUN);
        let run = sqlx::query_as::<_, SyncRun>(&sql)
            .bind(class)
            .fetch_optional(&self.pool)
            .await?;

        Ok(run)
    }

    /// Most recent runs across all classes, newest first.
    pub async fn recent(&self, limit: u32) -> DbResult<Vec<SyncRun>> {
        let sql = format!("{} ORDER BY started_at DESC LIMIT ?1", SELECT_RUN);
        let runs = sqlx::query_as::<_, SyncRun>(&sql)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(runs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};

    #[tokio::test]
    async fn test_run_lifecycle() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let runs = db.runs();

        let run = runs.start("Product").await.unwrap();
        assert_eq!(run.status, RunStatus::Running);

        let counts = RunCounts {
            resources: 3,
            rows_written: 7,
            skipped: 1,
        };
        runs.succeed(&run.id, counts).await.unwrap();

        let latest = runs.latest("Product").await.unwrap().unwrap();
        assert_eq!(latest.id, run.id);
        assert_eq!(latest.status, RunStatus::Succeeded);
        assert_eq!(latest.rows_written, 7);
        assert!(latest.finished_at.is_some());
        assert!(latest.error.is_none());
    }

    #[tokio::test]
    async fn test_failed_run_keeps_error() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let runs = db.runs();

        let run = runs.start("Customer").await.unwrap();
        runs.fail(&run.id, RunCounts::default(), "HTTP 401").await.unwrap();

        let recent = runs.recent(10).await.unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].status, RunStatus::Failed);
        assert_eq!(recent[0].error.as_deref(), Some("HTTP 401"));
        assert!(runs.latest("Outlet").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_finishing_unknown_run_is_not_found() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let err = db.runs().succeed("missing", RunCounts::default()).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }
}
