//! # Schema Manager
//!
//! Brings a table up to the shape of a batch of flat records, additively.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  ensure_table("order_lines", records)                                  │
//! │                                                                         │
//! │  table_exists? ──no──► create_table (created_at, updated_at)           │
//! │        │                                                                │
//! │        ▼                                                                │
//! │  column_names ──► plan_columns(existing, records)   (vend-core, pure)  │
//! │        │                                                                │
//! │        ▼                                                                │
//! │  for each planned column: add_column                                   │
//! │  for every column, old or new (CREATE INDEX IF NOT EXISTS):            │
//! │     id     ──► unique index                                           │
//! │     *_id   ──► lookup index                                           │
//! │                                                                         │
//! │  Existing columns are never altered, retyped or dropped.               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use tracing::{debug, info};

use vend_core::schema::plan_columns;
use vend_core::{policy, ColumnSpec, FlatRecord, IndexKind};
use vend_db::RelationalStore;

use crate::error::{SyncError, SyncResult};

fn migration_error(table: &str, err: impl std::fmt::Display) -> SyncError {
    SyncError::SchemaMigration {
        table: table.to_string(),
        reason: err.to_string(),
    }
}

/// Applies additive DDL for imported tables.
#[derive(Clone)]
pub struct SchemaManager {
    store: Arc<dyn RelationalStore>,
}

impl SchemaManager {
    pub fn new(store: Arc<dyn RelationalStore>) -> Self {
        SchemaManager { store }
    }

    /// Ensures `table` exists with a column for every key in `records`.
    ///
    /// ## Returns
    /// The columns that were added, `id` first.
    pub async fn ensure_table(
        &self,
        table: &str,
        records: &[FlatRecord],
    ) -> SyncResult<Vec<ColumnSpec>> {
        let exists = self
            .store
            .table_exists(table)
            .await
            .map_err(|e| migration_error(table, e))?;
        if !exists {
            self.store
                .create_table(table)
                .await
                .map_err(|e| migration_error(table, e))?;
            info!(table = %table, "Created table");
        }

        let existing = self
            .store
            .column_names(table)
            .await
            .map_err(|e| migration_error(table, e))?;
        let planned = plan_columns(table, &existing, records).map_err(|e| migration_error(table, e))?;

        for column in &planned {
            self.store
                .add_column(table, &column.name, column.column_type)
                .await
                .map_err(|e| migration_error(table, e))?;
            debug!(
                table = %table,
                column = %column.name,
                column_type = %column.column_type,
                "Column added"
            );
        }

        let columns = existing
            .iter()
            .map(String::as_str)
            .chain(planned.iter().map(|c| c.name.as_str()));
        self.ensure_indexes(table, columns).await?;

        Ok(planned)
    }

    /// Creates any missing index for `id` and `*_id` columns, whether the
    /// column was added now or found on a table built elsewhere.
    async fn ensure_indexes<'a>(
        &self,
        table: &str,
        columns: impl Iterator<Item = &'a str>,
    ) -> SyncResult<()> {
        for column in columns {
            let unique = match policy::index_kind(column) {
                IndexKind::None => continue,
                IndexKind::Unique => true,
                IndexKind::Lookup => false,
            };
            self.store
                .add_index(table, column, unique)
                .await
                .map_err(|e| migration_error(table, e))?;
        }
        Ok(())
    }
}
