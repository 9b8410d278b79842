//! # Schema Evolution Planning
//!
//! Pure half of schema migration: `(existing columns, observed records) →
//! columns to add`. The DDL side effect lives in vend-sync's `SchemaManager`.
//!
//! ## Inference Rules
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Column Type Inference                               │
//! │                                                                         │
//! │  Evaluated once per distinct column across the whole batch.            │
//! │  The first non-null value decides; all-null columns get Text.          │
//! │                                                                         │
//! │  `id`, `*_id`             → String   (opaque upstream identifiers)     │
//! │  date-time rule matches   → DateTime                                   │
//! │  integer / fractional     → Decimal  (tolerates large and fractional)  │
//! │  boolean                  → Boolean                                    │
//! │  anything else            → Text                                       │
//! │                                                                         │
//! │  ADDITIVE ONLY: columns already present are never retyped or dropped.  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CoreResult;
use crate::policy::{self, IndexKind};
use crate::types::{FlatRecord, Scalar};
use crate::validation::validate_column_name;

/// Semantic column type understood by the relational store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    String,
    Decimal,
    Boolean,
    DateTime,
    Text,
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnType::String => write!(f, "string"),
            ColumnType::Decimal => write!(f, "decimal"),
            ColumnType::Boolean => write!(f, "boolean"),
            ColumnType::DateTime => write!(f, "datetime"),
            ColumnType::Text => write!(f, "text"),
        }
    }
}

/// A column to be added, with the index it receives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSpec {
    pub name: String,
    pub column_type: ColumnType,
    pub index: IndexKind,
}

impl ColumnSpec {
    /// Builds the spec for a column name and its inferred type.
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        let name = name.into();
        let index = policy::index_kind(&name);
        ColumnSpec {
            name,
            column_type,
            index,
        }
    }
}

/// Infers the column type for a key given its first definitive value.
///
/// Name-based rules win over the value: `customer_id = 42` is still a
/// string column.
///
/// ## Example
/// ```rust
/// use vend_core::schema::{infer_column_type, ColumnType};
/// use vend_core::Scalar;
///
/// assert_eq!(infer_column_type("outlet_id", Some(&Scalar::Integer(1))), ColumnType::String);
/// assert_eq!(infer_column_type("price", Some(&Scalar::Integer(3))), ColumnType::Decimal);
/// assert_eq!(infer_column_type("note", None), ColumnType::Text);
/// ```
pub fn infer_column_type(key: &str, value: Option<&Scalar>) -> ColumnType {
    if policy::is_identifier_column(key) {
        return ColumnType::String;
    }
    if policy::is_date_time_field(key) {
        return ColumnType::DateTime;
    }
    match value {
        Some(Scalar::Integer(_)) | Some(Scalar::Float(_)) => ColumnType::Decimal,
        Some(Scalar::Bool(_)) => ColumnType::Boolean,
        Some(Scalar::DateTime(_)) => ColumnType::DateTime,
        _ => ColumnType::Text,
    }
}

/// Infers one type per distinct column observed across the records.
///
/// The first non-null value for a column decides its type.
pub fn infer_columns(records: &[FlatRecord]) -> BTreeMap<String, ColumnType> {
    let mut first_values: BTreeMap<&str, Option<&Scalar>> = BTreeMap::new();

    for record in records {
        for (name, value) in record.iter() {
            let slot = first_values.entry(name.as_str()).or_insert(None);
            if slot.is_none() && !value.is_null() {
                *slot = Some(value);
            }
        }
    }

    first_values
        .into_iter()
        .map(|(name, value)| (name.to_string(), infer_column_type(name, value)))
        .collect()
}

/// Plans the additive schema change for a table.
///
/// Returns the columns observed in `records` that are not in `existing`,
/// `id` first, then in name order. Existing columns are never returned,
/// whatever type the new values suggest. Names are compared ignoring ASCII
/// case, as SQLite does, so `Name` is already present when `name` is.
pub fn plan_columns(
    table: &str,
    existing: &BTreeSet<String>,
    records: &[FlatRecord],
) -> CoreResult<Vec<ColumnSpec>> {
    let mut planned = Vec::new();
    let mut taken: BTreeSet<String> = existing.iter().map(|n| n.to_ascii_lowercase()).collect();

    for (name, column_type) in infer_columns(records) {
        if !taken.insert(name.to_ascii_lowercase()) {
            continue;
        }
        validate_column_name(table, &name)?;
        planned.push(ColumnSpec::new(name, column_type));
    }

    planned.sort_by_key(|spec| spec.name != policy::ID_COLUMN);
    Ok(planned)
}
