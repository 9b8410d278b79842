//! # Repository Module
//!
//! SQLite repositories behind the relational store boundary.
//!
//! ## Repositories
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  SchemaRepository        tables / columns / indexes, watermark query   │
//! │  ├── table_exists, create_table                                        │
//! │  ├── column_names, add_column, add_index                               │
//! │  └── max_value                                                         │
//! │                                                                         │
//! │  RecordRepository        batched writes keyed by `id`                  │
//! │  └── upsert(table, rows, strategy)                                     │
//! │                                                                         │
//! │  SyncRunRepository       vend_sync_runs bookkeeping                    │
//! │  └── start, succeed, fail, latest, recent                              │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Imported tables are only known at run time, so statements are assembled
//! with [`QueryBuilder`](sqlx::QueryBuilder) and every identifier goes
//! through [`quote_identifier`].

pub mod records;
pub mod runs;
pub mod schema;

/// Double-quotes an SQLite identifier, doubling embedded quotes.
///
/// ## Example
/// ```rust
/// use vend_db::repository::quote_identifier;
///
/// assert_eq!(quote_identifier("order_lines"), "\"order_lines\"");
/// assert_eq!(quote_identifier("say \"hi\""), "\"say \"\"hi\"\"\"");
/// ```
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
