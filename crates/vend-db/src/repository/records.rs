//! # Record Repository
//!
//! Batched writes of flat records, keyed by `id`.
//!
//! ## Upsert Strategies
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  NATIVE (default)                                                      │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │ BEGIN                                                           │   │
//! │  │ for each column set (rows grouped, chunked under bind limit):   │   │
//! │  │   INSERT INTO "t" ("id", "a", "b") VALUES (?,?,?), (?,?,?) ...  │   │
//! │  │   ON CONFLICT ("id") DO UPDATE SET "a" = excluded."a", ...      │   │
//! │  │ COMMIT                                                          │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                                                         │
//! │  CHECK_THEN_WRITE (stores without ON CONFLICT, or no unique index)     │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │ BEGIN                                                           │   │
//! │  │ for each row:                                                   │   │
//! │  │   UPDATE "t" SET "a" = ?, "b" = ? WHERE "id" = ?               │   │
//! │  │   if no row changed: INSERT INTO "t" ("id", "a", "b") ...       │   │
//! │  │ COMMIT                                                          │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                                                         │
//! │  Both converge: applying the same rows twice leaves the same state.    │
//! │  Columns absent from a row are left untouched on existing rows.        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::SecondsFormat;
use serde::{Deserialize, Serialize};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::debug;

use vend_core::policy::ID_COLUMN;
use vend_core::validation::{validate_column_name, validate_table_name};
use vend_core::{FlatRecord, Scalar};

use super::quote_identifier;
use crate::error::{DbError, DbResult};

/// Upper bound on bound parameters per statement.
///
/// SQLite builds before 3.32 cap host parameters at 999.
pub const MAX_BIND_PARAMETERS: usize = 999;

// =============================================================================
// Types
// =============================================================================

/// How a batch of rows is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpsertStrategy {
    /// `INSERT ... ON CONFLICT ("id") DO UPDATE`.
    #[default]
    Native,
    /// `UPDATE`, then `INSERT` when nothing was updated.
    CheckThenWrite,
}

impl fmt::Display for UpsertStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpsertStrategy::Native => write!(f, "native"),
            UpsertStrategy::CheckThenWrite => write!(f, "check_then_write"),
        }
    }
}

impl FromStr for UpsertStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "native" => Ok(UpsertStrategy::Native),
            "check_then_write" => Ok(UpsertStrategy::CheckThenWrite),
            other => Err(format!(
                "unknown upsert strategy '{}' (expected native or check_then_write)",
                other
            )),
        }
    }
}

/// One row to write: its identifier and the remaining columns.
#[derive(Debug, Clone, PartialEq)]
pub struct UpsertRow {
    pub id: String,
    pub attributes: BTreeMap<String, Scalar>,
}

impl UpsertRow {
    /// Creates a row.
    pub fn new(id: impl Into<String>, attributes: BTreeMap<String, Scalar>) -> Self {
        UpsertRow {
            id: id.into(),
            attributes,
        }
    }

    /// Partitions a flat record into id and attributes. `None` without an id.
    pub fn from_record(record: FlatRecord) -> Option<Self> {
        let (id, attributes) = record.into_parts();
        id.map(|id| UpsertRow { id, attributes })
    }

    fn column_key(&self) -> Vec<&str> {
        self.attributes.keys().map(String::as_str).collect()
    }
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for writing imported rows.
#[derive(Debug, Clone)]
pub struct RecordRepository {
    pool: SqlitePool,
}

impl RecordRepository {
    /// Creates a new RecordRepository.
    pub fn new(pool: SqlitePool) -> Self {
        RecordRepository { pool }
    }

    /// Writes all rows into `table` in one transaction.
    ///
    /// Every column referenced by a row must already exist. Ids are expected
    /// to be unique within `rows`.
    ///
    /// ## Returns
    /// Number of rows inserted or updated.
    pub async fn upsert(
        &self,
        table: &str,
        rows: &[UpsertRow],
        strategy: UpsertStrategy,
    ) -> DbResult<u64> {
        if rows.is_empty() {
            return Ok(0);
        }
        validate_table_name(table)?;
        for row in rows {
            for column in row.attributes.keys() {
                validate_column_name(table, column)?;
            }
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        let written = match strategy {
            UpsertStrategy::Native => {
                let mut written = 0;
                for (columns, group) in group_by_columns(rows) {
                    let per_statement = (MAX_BIND_PARAMETERS / (columns.len() + 1)).max(1);
                    for chunk in group.chunks(per_statement) {
                        let mut builder = native_upsert(table, &columns, chunk);
                        written += builder.build().execute(&mut *tx).await?.rows_affected();
                    }
                }
                written
            }
            UpsertStrategy::CheckThenWrite => {
                let mut written = 0;
                for row in rows {
                    let mut update = update_by_id(table, row);
                    let mut affected = update.build().execute(&mut *tx).await?.rows_affected();
                    if affected == 0 {
                        let columns = row.column_key();
                        let mut insert = insert_rows(table, &columns, &[row]);
                        affected = insert.build().execute(&mut *tx).await?.rows_affected();
                    }
                    written += affected;
                }
                written
            }
        };

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        debug!(table = %table, rows = rows.len(), written, strategy = %strategy, "Upserted rows");
        Ok(written)
    }

    /// Counts rows in a table.
    pub async fn count(&self, table: &str) -> DbResult<i64> {
        let sql = format!("SELECT COUNT(*) FROM {}", quote_identifier(table));
        let count: i64 = sqlx::query_scalar(&sql).fetch_one(&self.pool).await?;
        Ok(count)
    }
}

// =============================================================================
// Statement Builders
// =============================================================================

/// Groups rows by their attribute column set, in order of first appearance.
fn group_by_columns(rows: &[UpsertRow]) -> Vec<(Vec<&str>, Vec<&UpsertRow>)> {
    let mut groups: Vec<(Vec<&str>, Vec<&UpsertRow>)> = Vec::new();
    let mut positions: BTreeMap<Vec<&str>, usize> = BTreeMap::new();

    for row in rows {
        let key = row.column_key();
        match positions.get(&key) {
            Some(&index) => groups[index].1.push(row),
            None => {
                positions.insert(key.clone(), groups.len());
                groups.push((key, vec![row]));
            }
        }
    }

    groups
}

fn column_list(columns: &[&str]) -> String {
    std::iter::once(ID_COLUMN)
        .chain(columns.iter().copied())
        .map(quote_identifier)
        .collect::<Vec<_>>()
        .join(", ")
}

fn insert_rows<'args>(
    table: &str,
    columns: &[&str],
    rows: &[&UpsertRow],
) -> QueryBuilder<'args, Sqlite> {
    let mut builder = QueryBuilder::new(format!(
        "INSERT INTO {} ({}) VALUES ",
        quote_identifier(table),
        column_list(columns)
    ));

    for (i, row) in rows.iter().enumerate() {
        if i > 0 {
            builder.push(", ");
        }
        builder.push("(");
        builder.push_bind(row.id.clone());
        for column in columns {
            builder.push(", ");
            push_scalar(&mut builder, row.attributes.get(*column));
        }
        builder.push(")");
    }

    builder
}

fn native_upsert<'args>(
    table: &str,
    columns: &[&str],
    rows: &[&UpsertRow],
) -> QueryBuilder<'args, Sqlite> {
    let mut builder = insert_rows(table, columns, rows);

    builder.push(format!(" ON CONFLICT ({}) DO ", quote_identifier(ID_COLUMN)));
    if columns.is_empty() {
        builder.push("NOTHING");
    } else {
        let assignments = columns
            .iter()
            .map(|column| {
                let quoted = quote_identifier(column);
                format!("{} = excluded.{}", quoted, quoted)
            })
            .collect::<Vec<_>>()
            .join(", ");
        builder.push("UPDATE SET ");
        builder.push(assignments);
    }

    builder
}

fn update_by_id<'args>(table: &str, row: &UpsertRow) -> QueryBuilder<'args, Sqlite> {
    let id = quote_identifier(ID_COLUMN);
    let mut builder = QueryBuilder::new(format!("UPDATE {} SET ", quote_identifier(table)));

    if row.attributes.is_empty() {
        builder.push(format!("{} = {}", id, id));
    }
    for (i, (column, value)) in row.attributes.iter().enumerate() {
        if i > 0 {
            builder.push(", ");
        }
        builder.push(format!("{} = ", quote_identifier(column)));
        push_scalar(&mut builder, Some(value));
    }

    builder.push(format!(" WHERE {} = ", id));
    builder.push_bind(row.id.clone());
    builder
}

/// Binds a scalar with its native SQLite storage class.
///
/// Date-times are bound as RFC 3339 UTC text with a fixed layout, so
/// `MAX()` over the column orders them chronologically.
fn push_scalar(builder: &mut QueryBuilder<'_, Sqlite>, value: Option<&Scalar>) {
    match value {
        None | Some(Scalar::Null) => builder.push_bind(None::<String>),
        Some(Scalar::Bool(b)) => builder.push_bind(*b),
        Some(Scalar::Integer(n)) => builder.push_bind(*n),
        Some(Scalar::Float(x)) => builder.push_bind(*x),
        Some(Scalar::Text(s)) => builder.push_bind(s.clone()),
        Some(Scalar::DateTime(dt)) => {
            builder.push_bind(dt.to_rfc3339_opts(SecondsFormat::Secs, true))
        }
    };
}

// =============================================================================
// Unit Tests
// =============================================================================
