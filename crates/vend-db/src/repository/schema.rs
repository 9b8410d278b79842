//! # Schema Repository
//!
//! Introspection and additive DDL for imported tables.
//!
//! ## Type Mapping
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  ColumnType      SQLite declared type     Affinity                     │
//! │  ──────────      ────────────────────     ────────                     │
//! │  String          TEXT                     TEXT                         │
//! │  Decimal         NUMERIC                  NUMERIC                      │
//! │  Boolean         BOOLEAN                  NUMERIC (stored 0 / 1)       │
//! │  DateTime        DATETIME                 NUMERIC (RFC 3339 text kept) │
//! │  Text            TEXT                     TEXT                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Nothing here alters or drops an existing column.

use std::collections::BTreeSet;

use sqlx::SqlitePool;
use tracing::debug;

use vend_core::policy::{CREATED_AT_COLUMN, UPDATED_AT_COLUMN};
use vend_core::validation::{validate_column_name, validate_table_name};
use vend_core::ColumnType;

use super::quote_identifier;
use crate::error::DbResult;

/// Declared SQLite type for a semantic column type.
pub fn sql_type(column_type: ColumnType) -> &'static str {
    match column_type {
        ColumnType::String | ColumnType::Text => "TEXT",
        ColumnType::Decimal => "NUMERIC",
        ColumnType::Boolean => "BOOLEAN",
        ColumnType::DateTime => "DATETIME",
    }
}

/// Name of the index created for a column: `index_<table>_on_<column>`.
pub fn index_name(table: &str, column: &str) -> String {
    format!("index_{}_on_{}", table, column)
}

/// Repository for table, column and index operations.
#[derive(Debug, Clone)]
pub struct SchemaRepository {
    pool: SqlitePool,
}

impl SchemaRepository {
    /// Creates a new SchemaRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SchemaRepository { pool }
    }

    /// Returns true if the table exists, under any ASCII casing of its name.
    pub async fn table_exists(&self, table: &str) -> DbResult<bool> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1 COLLATE NOCASE",
        )
        .bind(table)
        .fetch_one(&self.pool)
        .await?;

        Ok(count > 0)
    }

    /// Creates a table with only the nullable audit timestamp columns.
    ///
    /// There is no storage-engine primary key: `id` is added later as a
    /// plain column with a unique index.
    pub async fn create_table(&self, table: &str) -> DbResult<()> {
        validate_table_name(table)?;

        let sql = format!(
            "CREATE TABLE IF NOT EXISTS {} ({} DATETIME NULL, {} DATETIME NULL)",
            quote_identifier(table),
            quote_identifier(CREATED_AT_COLUMN),
            quote_identifier(UPDATED_AT_COLUMN),
        );
        sqlx::query(&sql).execute(&self.pool).await?;

        debug!(table = %table, "Created table");
        Ok(())
    }

    /// Column names of a table. Empty if the table does not exist.
    pub async fn column_names(&self, table: &str) -> DbResult<BTreeSet<String>> {
        let names: Vec<String> = sqlx::query_scalar("SELECT name FROM pragma_table_info(?1)")
            .bind(table)
            .fetch_all(&self.pool)
            .await?;

        Ok(names.into_iter().collect())
    }

    /// Adds a nullable column.
    pub async fn add_column(
        &self,
        table: &str,
        column: &str,
        column_type: ColumnType,
    ) -> DbResult<()> {
        validate_table_name(table)?;
        validate_column_name(table, column)?;

        let sql = format!(
            "ALTER TABLE {} ADD COLUMN {} {}",
            quote_identifier(table),
            quote_identifier(column),
            sql_type(column_type),
        );
        sqlx::query(&sql).execute(&self.pool).await?;

        debug!(table = %table, column = %column, column_type = %column_type, "Added column");
        Ok(())
    }

    /// Creates an index on one column if it does not exist yet.
    pub async fn add_index(&self, table: &str, column: &str, unique: bool) -> DbResult<()> {
        validate_table_name(table)?;
        validate_column_name(table, column)?;

        let sql = format!(
            "CREATE {}INDEX IF NOT EXISTS {} ON {} ({})",
            if unique { "UNIQUE " } else { "" },
            quote_identifier(&index_name(table, column)),
            quote_identifier(table),
            quote_identifier(column),
        );
        sqlx::query(&sql).execute(&self.pool).await?;

        debug!(table = %table, column = %column, unique, "Added index");
        Ok(())
    }

    /// `MAX(column)` rendered as text, or `None` for an empty table.
    pub async fn max_value(&self, table: &str, column: &str) -> DbResult<Option<String>> {
        let sql = format!(
            "SELECT CAST(MAX({}) AS TEXT) FROM {}",
            quote_identifier(column),
            quote_identifier(table),
        );
        let max: Option<String> = sqlx::query_scalar(&sql).fetch_one(&self.pool).await?;

        Ok(max)
    }

    /// Names of the indexes on a table.
    pub async fn index_names(&self, table: &str) -> DbResult<BTreeSet<String>> {
        let names: Vec<String> = sqlx::query_scalar("SELECT name FROM pragma_index_list(?1)")
            .bind(table)
            .fetch_all(&self.pool)
            .await?;

        Ok(names.into_iter().collect())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};

    async fn repo() -> SchemaRepository {
        Database::new(DbConfig::in_memory()).await.unwrap().schema()
    }

    #[tokio::test]
    async fn test_create_table_has_audit_columns_only() {
        let schema = repo().await;
        assert!(!schema.table_exists("outlets").await.unwrap());

        schema.create_table("outlets").await.unwrap();

        assert!(schema.table_exists("outlets").await.unwrap());
        let columns: Vec<_> = schema.column_names("outlets").await.unwrap().into_iter().collect();
        assert_eq!(columns, vec!["created_at", "updated_at"]);
    }

    #[tokio::test]
    async fn test_table_lookup_ignores_case() {
        let schema = repo().await;
        schema.create_table("order_lines").await.unwrap();

        assert!(schema.table_exists("Order_Lines").await.unwrap());
        schema.create_table("Order_Lines").await.unwrap();
        assert_eq!(schema.column_names("ORDER_LINES").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_create_table_is_idempotent() {
        let schema = repo().await;
        schema.create_table("taxes").await.unwrap();
        schema.create_table("taxes").await.unwrap();
        assert!(schema.table_exists("taxes").await.unwrap());
    }

    #[tokio::test]
    async fn test_add_column_and_indexes() {
        let schema = repo().await;
        schema.create_table("register_sales").await.unwrap();
        schema.add_column("register_sales", "id", ColumnType::String).await.unwrap();
        schema
            .add_column("register_sales", "outlet_id", ColumnType::String)
            .await
            .unwrap();
        schema.add_index("register_sales", "id", true).await.unwrap();
        schema.add_index("register_sales", "outlet_id", false).await.unwrap();
        schema.add_index("register_sales", "outlet_id", false).await.unwrap();

        let columns = schema.column_names("register_sales").await.unwrap();
        assert!(columns.contains("id"));
        assert!(columns.contains("outlet_id"));

        let indexes = schema.index_names("register_sales").await.unwrap();
        assert!(indexes.contains("index_register_sales_on_id"));
        assert!(indexes.contains("index_register_sales_on_outlet_id"));
    }

    #[tokio::test]
    async fn test_quoted_identifiers_survive_odd_names() {
        let schema = repo().await;
        schema.create_table("odd \"table\"").await.unwrap();
        schema
            .add_column("odd \"table\"", "group", ColumnType::Text)
            .await
            .unwrap();

        let columns = schema.column_names("odd \"table\"").await.unwrap();
        assert!(columns.contains("group"));
    }

    #[tokio::test]
    async fn test_invalid_identifier_is_rejected_before_ddl() {
        let schema = repo().await;
        assert!(schema.create_table("").await.is_err());
    }

    #[tokio::test]
    async fn test_max_value() {
        let schema = repo().await;
        schema.create_table("users").await.unwrap();
        assert_eq!(schema.max_value("users", "updated_at").await.unwrap(), None);

        sqlx::query(
            "INSERT INTO users (updated_at) VALUES ('2024-01-01T00:00:00Z'), ('2024-03-01T00:00:00Z')",
        )
        .execute(&schema.pool)
        .await
        .unwrap();

        assert_eq!(
            schema.max_value("users", "updated_at").await.unwrap().as_deref(),
            Some("2024-03-01T00:00:00Z")
        );
    }

    #[test]
    fn test_sql_type_mapping() {
        assert_eq!(sql_type(ColumnType::String), "TEXT");
        assert_eq!(sql_type(ColumnType::Decimal), "NUMERIC");
        assert_eq!(sql_type(ColumnType::Boolean), "BOOLEAN");
        assert_eq!(sql_type(ColumnType::DateTime), "DATETIME");
        assert_eq!(sql_type(ColumnType::Text), "TEXT");
        assert_eq!(index_name("users", "id"), "index_users_on_id");
    }
}
