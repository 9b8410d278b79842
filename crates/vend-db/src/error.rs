//! # Database Error Types
//!
//! ```text
//! sqlx::Error ──┐
//! CoreError ────┼──► DbError ──► SyncError::{SchemaMigration, Upsert, Database}
//! MigrateError ─┘                      (vend-sync, aborts the class pass)
//! ```

use thiserror::Error;
use vend_core::CoreError;

/// Store operation errors.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// A UNIQUE index rejected a row, e.g. two rows with the same `id`
    /// reached a plain INSERT.
    #[error("Unique constraint failed on {constraint}")]
    UniqueViolation { constraint: String },

    /// A table or column name that cannot be quoted into DDL.
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(#[from] CoreError),

    /// Another connection held the write lock past the busy timeout.
    #[error("Database is locked: {0}")]
    Busy(String),

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// The store refused a statement (DDL on a read-only file, bad SQL, ...).
    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    #[error("Connection pool exhausted")]
    PoolExhausted,

    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }
}

const UNIQUE_FAILED: &str = "UNIQUE constraint failed: ";

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::not_found("Row", "unknown"),

            sqlx::Error::Database(db_err) => {
                let message = db_err.message();
                if let Some(constraint) = message.strip_prefix(UNIQUE_FAILED) {
                    DbError::UniqueViolation {
                        constraint: constraint.to_string(),
                    }
                } else if message.contains("database is locked") {
                    DbError::Busy(message.to_string())
                } else {
                    DbError::QueryFailed(message.to_string())
                }
            }

            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,
            sqlx::Error::PoolClosed => DbError::ConnectionFailed("pool is closed".to_string()),

            other => DbError::Internal(other.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

pub type DbResult<T> = Result<T, DbError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use vend_core::ValidationError;

    #[test]
    fn test_core_error_converts() {
        let err: DbError = CoreError::InvalidTableName {
            name: String::new(),
            source: ValidationError::Empty,
        }
        .into();
        assert!(matches!(err, DbError::InvalidIdentifier(_)));
        assert!(err.to_string().starts_with("Invalid identifier"));
    }

    #[tokio::test]
    async fn test_unique_index_violation_names_the_column() {
        let db = Database::new(DbConfig::in_memory().run_migrations(false))
            .await
            .unwrap();
        sqlx::query("CREATE TABLE t (id TEXT UNIQUE)")
            .execute(db.pool())
            .await
            .unwrap();

        let err: DbError = sqlx::query("INSERT INTO t VALUES ('1'), ('1')")
            .execute(db.pool())
            .await
            .unwrap_err()
            .into();

        assert!(matches!(err, DbError::UniqueViolation { ref constraint } if constraint == "t.id"));
    }

    #[tokio::test]
    async fn test_bad_statement_is_query_failed() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let err: DbError = sqlx::query("SELECT * FROM missing_table")
            .execute(db.pool())
            .await
            .unwrap_err()
            .into();

        assert!(matches!(err, DbError::QueryFailed(ref m) if m.contains("no such table")));
    }
}
