//! # Import Batch
//!
//! The per-class accumulator the flattener writes into.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        ImportBatch lifecycle                            │
//! │                                                                         │
//! │  Importer::import_class                                                │
//! │  ├── ImportBatch::new(stamp)          one batch per class pass         │
//! │  ├── Flattener::flatten(..., &mut)    every resource, in fetch order   │
//! │  ├── issues()                         logged, counted, never fatal     │
//! │  └── into_tables()                    schema → upsert, then dropped    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::policy;
use crate::types::FlatRecord;

// =============================================================================
// Skippable Record Issues
// =============================================================================

/// A shape the importer cannot map. Reported, never fatal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "issue", rename_all = "snake_case")]
pub enum SkippableRecordIssue {
    /// The resource (or nested object in an array) has no usable `id`.
    MissingId { table: String },

    /// An array element that is not a mapping.
    NonObjectArrayElement {
        table: String,
        key: String,
        kind: &'static str,
    },

    /// Nesting went deeper than the flattener allows.
    DepthExceeded {
        table: String,
        key: String,
        max_depth: usize,
    },

    /// A date-time column whose value could not be parsed; kept as text.
    UnparseableDate {
        table: String,
        column: String,
        value: String,
    },

    /// An attribute whose key cannot become a column name; the attribute
    /// is dropped, the rest of the row is kept.
    InvalidColumn {
        table: String,
        column: String,
        reason: String,
    },
}

impl SkippableRecordIssue {
    /// Table the issue was found on.
    pub fn table(&self) -> &str {
        match self {
            SkippableRecordIssue::MissingId { table }
            | SkippableRecordIssue::NonObjectArrayElement { table, .. }
            | SkippableRecordIssue::DepthExceeded { table, .. }
            | SkippableRecordIssue::UnparseableDate { table, .. }
            | SkippableRecordIssue::InvalidColumn { table, .. } => table,
        }
    }

    /// True if data was dropped, false if it was kept in degraded form.
    pub fn drops_data(&self) -> bool {
        !matches!(self, SkippableRecordIssue::UnparseableDate { .. })
    }
}

impl fmt::Display for SkippableRecordIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkippableRecordIssue::MissingId { table } => {
                write!(f, "{}: resource has no id, skipped", table)
            }
            SkippableRecordIssue::NonObjectArrayElement { table, key, kind } => {
                write!(f, "{}.{}: {} array element skipped", table, key, kind)
            }
            SkippableRecordIssue::DepthExceeded {
                table,
                key,
                max_depth,
            } => write!(
                f,
                "{}.{}: nesting deeper than {} levels skipped",
                table, key, max_depth
            ),
            SkippableRecordIssue::UnparseableDate {
                table,
                column,
                value,
            } => write!(
                f,
                "{}.{}: '{}' is not a date-time, stored as text",
                table, column, value
            ),
            SkippableRecordIssue::InvalidColumn {
                table,
                column,
                reason,
            } => write!(f, "{}: column {:?} skipped, {}", table, column, reason),
        }
    }
}

// =============================================================================
// Import Batch
// =============================================================================

/// Table name → flat records, accumulated across one class pass.
///
/// Records keep insertion order within a table. Order across tables is not
/// meaningful.
#[derive(Debug, Clone)]
pub struct ImportBatch {
    stamp: DateTime<Utc>,
    tables: BTreeMap<String, Vec<FlatRecord>>,
    issues: Vec<SkippableRecordIssue>,
}

impl ImportBatch {
    /// Creates an empty batch. `stamp` fills `updated_at` on records that
    /// arrive without one.
    pub fn new(stamp: DateTime<Utc>) -> Self {
        ImportBatch {
            stamp,
            tables: BTreeMap::new(),
            issues: Vec::new(),
        }
    }

    pub fn stamp(&self) -> DateTime<Utc> {
        self.stamp
    }

    /// Appends a record to a table.
    pub fn push(&mut self, table: impl Into<String>, record: FlatRecord) {
        self.tables.entry(table.into()).or_default().push(record);
    }

    /// Records a skipped shape.
    pub fn report(&mut self, issue: SkippableRecordIssue) {
        self.issues.push(issue);
    }

    /// Records for one table, in insertion order.
    pub fn records(&self, table: &str) -> &[FlatRecord] {
        self.tables.get(table).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Names of all tables touched by this batch.
    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }

    /// Total number of records across all tables.
    pub fn record_count(&self) -> usize {
        self.tables.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn issues(&self) -> &[SkippableRecordIssue] {
        &self.issues
    }

    /// Consumes the batch, yielding each table with its records
    /// deduplicated by `id` (see [`coalesce_by_id`]).
    ///
    /// SQLite compares identifiers without regard to ASCII case, so table
    /// and column names that differ only in case are folded onto the first
    /// spelling seen (see [`fold_column_case`]).
    pub fn into_tables(self) -> impl Iterator<Item = (String, Vec<FlatRecord>)> {
        let mut positions: BTreeMap<String, usize> = BTreeMap::new();
        let mut folded: Vec<(String, Vec<FlatRecord>)> = Vec::with_capacity(self.tables.len());

        for (table, records) in self.tables {
            match positions.get(&table.to_ascii_lowercase()) {
                Some(&index) => folded[index].1.extend(records),
                None => {
                    positions.insert(table.to_ascii_lowercase(), folded.len());
                    folded.push((table, records));
                }
            }
        }

        folded
            .into_iter()
            .map(|(table, records)| (table, coalesce_by_id(fold_column_case(records))))
    }
}

/// Renames columns that differ only in ASCII case to one spelling per table.
///
/// The bookkeeping columns keep their own spelling; any other column keeps
/// the first spelling met in record order. Within one record, colliding
/// columns collapse and the one sorting last wins.
pub fn fold_column_case(records: Vec<FlatRecord>) -> Vec<FlatRecord> {
    let mut spellings: BTreeMap<String, String> = [
        policy::ID_COLUMN,
        policy::CREATED_AT_COLUMN,
        policy::UPDATED_AT_COLUMN,
    ]
    .into_iter()
    .map(|column| (column.to_ascii_lowercase(), column.to_string()))
    .collect();

    records
        .into_iter()
        .map(|record| {
            record
                .into_iter()
                .map(|(column, value)| {
                    let spelling = spellings
                        .entry(column.to_ascii_lowercase())
                        .or_insert(column)
                        .clone();
                    (spelling, value)
                })
                .collect::<FlatRecord>()
        })
        .collect()
}

/// Merges records sharing an `id`, keeping first-seen order.
///
/// Later records overlay earlier ones column by column, which is the state
/// sequential upserts of the same records would converge to. Records without
/// an id are dropped.
pub fn coalesce_by_id(records: Vec<FlatRecord>) -> Vec<FlatRecord> {
    let mut positions: BTreeMap<String, usize> = BTreeMap::new();
    let mut merged: Vec<FlatRecord> = Vec::with_capacity(records.len());

    for record in records {
        let Some(id) = record.id() else {
            continue;
        };
        match positions.get(&id) {
            Some(&index) => merged[index].merge(record),
            None => {
                positions.insert(id, merged.len());
                merged.push(record);
            }
        }
    }

    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Scalar;

    fn record(pairs: &[(&str, &str)]) -> FlatRecord {
        pairs.iter().map(|(k, v)| (*k, Scalar::text(*v))).collect()
    }

    #[test]
    fn test_push_keeps_insertion_order() {
        let mut batch = ImportBatch::new(Utc::now());
        batch.push("orders", record(&[("id", "2")]));
        batch.push("orders", record(&[("id", "1")]));
        batch.push("customers", record(&[("id", "9")]));

        let ids: Vec<_> = batch.records("orders").iter().filter_map(FlatRecord::id).collect();
        assert_eq!(ids, vec!["2", "1"]);
        assert_eq!(batch.record_count(), 3);
        assert_eq!(batch.table_names().count(), 2);
        assert!(batch.records("missing").is_empty());
    }

    #[test]
    fn test_coalesce_merges_later_attributes() {
        let merged = coalesce_by_id(vec![
            record(&[("id", "9"), ("email", "old@b.co"), ("name", "A")]),
            record(&[("id", "3"), ("email", "c@d.co")]),
            record(&[("id", "9"), ("email", "new@b.co")]),
        ]);

        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].get("email"), Some(&Scalar::text("new@b.co")));
        assert_eq!(merged[0].get("name"), Some(&Scalar::text("A")));
        assert_eq!(merged[1].id().as_deref(), Some("3"));
    }

    #[test]
    fn test_into_tables_coalesces() {
        let mut batch = ImportBatch::new(Utc::now());
        batch.push("customers", record(&[("id", "9")]));
        batch.push("customers", record(&[("id", "9"), ("email", "a@b.co")]));

        let tables: Vec<_> = batch.into_tables().collect();
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].1.len(), 1);
    }

    #[test]
    fn test_columns_differing_in_case_share_one_spelling() {
        let mut batch = ImportBatch::new(Utc::now());
        batch.push("products", record(&[("id", "p1"), ("name", "a")]));
        batch.push("products", record(&[("id", "p2"), ("Name", "b")]));
        batch.push("products", record(&[("id", "p3"), ("NAME", "c"), ("name", "d")]));

        let tables: Vec<_> = batch.into_tables().collect();
        let records = &tables[0].1;
        assert_eq!(records.len(), 3);
        for record in records {
            assert_eq!(record.column_names().collect::<Vec<_>>(), vec!["id", "name"]);
        }
        assert_eq!(records[1].get("name"), Some(&Scalar::text("b")));
        assert_eq!(records[2].get("name"), Some(&Scalar::text("d")));
    }

    #[test]
    fn test_bookkeeping_columns_keep_their_spelling() {
        let folded = fold_column_case(vec![record(&[("ID", "x"), ("id", "7"), ("Updated_At", "u")])]);

        assert_eq!(folded[0].id().as_deref(), Some("7"));
        assert!(folded[0].contains("updated_at"));
        assert!(!folded[0].contains("Updated_At"));
    }

    #[test]
    fn test_tables_differing_in_case_are_merged() {
        let mut batch = ImportBatch::new(Utc::now());
        batch.push("order_lines", record(&[("id", "1")]));
        batch.push("order_Lines", record(&[("id", "2")]));

        let tables: Vec<_> = batch.into_tables().collect();
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].0, "order_Lines");
        assert_eq!(tables[0].1.len(), 2);
    }

    #[test]
    fn test_invalid_column_display() {
        let issue = SkippableRecordIssue::InvalidColumn {
            table: "products".to_string(),
            column: String::new(),
            reason: "identifier must not be empty".to_string(),
        };
        assert_eq!(
            issue.to_string(),
            "products: column \"\" skipped, identifier must not be empty"
        );
        assert!(issue.drops_data());
    }

    #[test]
    fn test_issue_display() {
        let issue = SkippableRecordIssue::NonObjectArrayElement {
            table: "products".to_string(),
            key: "tags".to_string(),
            kind: "scalar",
        };
        assert_eq!(issue.to_string(), "products.tags: scalar array element skipped");
        assert_eq!(issue.table(), "products");
        assert!(issue.drops_data());
    }
}
