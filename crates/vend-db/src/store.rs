//! # Relational Store Boundary
//!
//! The operations the import engine needs from a relational store, and
//! nothing more.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     RelationalStore                                     │
//! │                                                                         │
//! │  SchemaManager ──► table_exists / create_table                         │
//! │                    column_names / add_column / add_index               │
//! │  ResourceFetcher ─► max_value            (high-watermark)              │
//! │  UpsertEngine ───► upsert                (batched, keyed by `id`)      │
//! │                                                                         │
//! │  impl for Database  → SQLite repositories                             │
//! │  impl in tests      → anything that records calls                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::BTreeSet;

use async_trait::async_trait;
use vend_core::ColumnType;

use crate::error::DbResult;
use crate::pool::Database;
use crate::repository::records::{UpsertRow, UpsertStrategy};

/// Relational store operations used by the importer.
#[async_trait]
pub trait RelationalStore: Send + Sync {
    /// Returns true if the table exists.
    async fn table_exists(&self, table: &str) -> DbResult<bool>;

    /// Creates a table holding only the nullable audit timestamp columns.
    async fn create_table(&self, table: &str) -> DbResult<()>;

    /// Column names of a table; empty if it does not exist.
    async fn column_names(&self, table: &str) -> DbResult<BTreeSet<String>>;

    /// Returns true if the column exists on the table.
    async fn column_exists(&self, table: &str, column: &str) -> DbResult<bool> {
        Ok(self.column_names(table).await?.contains(column))
    }

    /// Adds a nullable column of the given semantic type.
    async fn add_column(&self, table: &str, column: &str, column_type: ColumnType) -> DbResult<()>;

    /// Adds a unique or lookup index on one column.
    async fn add_index(&self, table: &str, column: &str, unique: bool) -> DbResult<()>;

    /// Maximum value of a column rendered as text; `None` if the table is empty.
    async fn max_value(&self, table: &str, column: &str) -> DbResult<Option<String>>;

    /// Inserts new ids and overwrites existing ones, in one batch.
    async fn upsert(
        &self,
        table: &str,
        rows: &[UpsertRow],
        strategy: UpsertStrategy,
    ) -> DbResult<u64>;
}

#[async_trait]
impl RelationalStore for Database {
    async fn table_exists(&self, table: &str) -> DbResult<bool> {
        self.schema().table_exists(table).await
    }

    async fn create_table(&self, table: &str) -> DbResult<()> {
        self.schema().create_table(table).await
    }

    async fn column_names(&self, table: &str) -> DbResult<BTreeSet<String>> {
        self.schema().column_names(table).await
    }

    async fn add_column(&self, table: &str, column: &str, column_type: ColumnType) -> DbResult<()> {
        self.schema().add_column(table, column, column_type).await
    }

    async fn add_index(&self, table: &str, column: &str, unique: bool) -> DbResult<()> {
        self.schema().add_index(table, column, unique).await
    }

    async fn max_value(&self, table: &str, column: &str) -> DbResult<Option<String>> {
        self.schema().max_value(table, column).await
    }

    async fn upsert(
        &self,
        table: &str,
        rows: &[UpsertRow],
        strategy: UpsertStrategy,
    ) -> DbResult<u64> {
        self.records().upsert(table, rows, strategy).await
    }
}
