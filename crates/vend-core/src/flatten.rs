//! # Flattener
//!
//! Structural recursion from a [`Resource`](crate::Resource) tree into
//! per-table [`FlatRecord`]s.
//!
//! ## Decomposition
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  orders { id: "1", name: "A",                                           │
//! │           customer: { id: "9", email: "a@b.co" },                       │
//! │           lines: [ { id: "10", sku: "x" }, { id: "11", sku: "y" } ],    │
//! │           loyalty: { points: 3 } }                                      │
//! │                                                                         │
//! │  ─────────────────────────────── flatten ─────────────────────────────  │
//! │                                                                         │
//! │  orders       { id: "1", name: "A", customer_id: "9",                   │
//! │                 loyalty_points: 3, updated_at: <stamp> }                │
//! │  customers    { id: "9", email: "a@b.co", updated_at: <stamp> }         │
//! │  order_lines  { id: "10", sku: "x", order_id: "1", updated_at: ... }    │
//! │               { id: "11", sku: "y", order_id: "1", updated_at: ... }    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Rules per attribute
//! - **Array**: each mapping element becomes a child row in
//!   [`array_table_name`](crate::policy::array_table_name) of the full
//!   column name (prefix included), carrying `<singular parent>_id`. Other
//!   elements are reported and dropped.
//! - **Mapping with an `id`**: becomes a row in the pluralised key's table;
//!   the current row gets `<key>_id`.
//! - **Mapping without an `id`**: inlined as `<key>_<attr>` columns.
//! - **Scalar**: kept if present. Date-time columns are parsed, identifier
//!   columns are normalised to text.
//!
//! Keys ending in a reserved suffix are rewritten first. Keys that cannot be
//! a column name (empty, too long, control characters) are reported and
//! dropped without affecting the rest of the row. Rows without an
//! `updated_at` are stamped with the batch stamp.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

use crate::batch::{ImportBatch, SkippableRecordIssue};
use crate::policy;
use crate::types::{Attributes, FlatRecord, Node, Scalar};
use crate::validation::validate_identifier;

/// Default limit on nested object/array levels below a resource.
pub const DEFAULT_MAX_DEPTH: usize = 16;

/// Textual date-time layouts accepted besides RFC 3339.
const DATE_TIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];

/// Parses an upstream date-time value, assuming UTC when no offset is given.
///
/// ## Example
/// ```rust
/// use vend_core::flatten::parse_date_time;
/// use vend_core::Scalar;
///
/// assert!(parse_date_time(&Scalar::text("2024-03-01 10:00:00")).is_some());
/// assert!(parse_date_time(&Scalar::text("1979-06-30")).is_some());
/// assert!(parse_date_time(&Scalar::text("soon")).is_none());
/// ```
pub fn parse_date_time(value: &Scalar) -> Option<DateTime<Utc>> {
    let text = match value {
        Scalar::DateTime(dt) => return Some(*dt),
        Scalar::Text(text) => text.trim(),
        _ => return None,
    };

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in DATE_TIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Decomposes resource trees into an [`ImportBatch`].
#[derive(Debug, Clone, Copy)]
pub struct Flattener {
    max_depth: usize,
}

impl Default for Flattener {
    fn default() -> Self {
        Flattener {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl Flattener {
    /// Creates a flattener that drops nesting beyond `max_depth` levels.
    pub fn new(max_depth: usize) -> Self {
        Flattener { max_depth }
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Flattens one resource destined for `table` into the batch.
    ///
    /// A resource without an `id` produces no rows in any table; it is
    /// reported on the batch instead.
    pub fn flatten(&self, table: &str, attrs: &Attributes, batch: &mut ImportBatch) {
        self.flatten_row(table, attrs, None, 0, batch);
    }

    /// Flattens one row and its descendants, returning the row id.
    fn flatten_row(
        &self,
        table: &str,
        attrs: &Attributes,
        parent_key: Option<(&str, &str)>,
        depth: usize,
        batch: &mut ImportBatch,
    ) -> Option<String> {
        let Some(id) = identifier_of(attrs) else {
            batch.report(SkippableRecordIssue::MissingId {
                table: table.to_string(),
            });
            return None;
        };

        let mut record = FlatRecord::new();
        self.flatten_attributes(table, &id, "", attrs, &mut record, depth, batch);

        if let Some((column, parent_id)) = parent_key {
            record.insert(column, parent_id);
        }
        record.insert(policy::ID_COLUMN, id.as_str());
        if !record.contains(policy::UPDATED_AT_COLUMN) {
            record.insert(policy::UPDATED_AT_COLUMN, batch.stamp());
        }

        batch.push(table, record);
        Some(id)
    }

    /// Walks one attribute mapping into `record`, columns prefixed by `prefix`.
    #[allow(clippy::too_many_arguments)]
    fn flatten_attributes(
        &self,
        table: &str,
        row_id: &str,
        prefix: &str,
        attrs: &Attributes,
        record: &mut FlatRecord,
        depth: usize,
        batch: &mut ImportBatch,
    ) {
        for (key, node) in attrs {
            let key = policy::rewrite_reserved_key(key);
            let column = format!("{}{}", prefix, key);

            match node {
                Node::Scalar(value) => {
                    if usable_column(table, &column, batch) {
                        self.flatten_scalar(table, &column, value, record, batch);
                    }
                }

                Node::Array(_) | Node::Object(_) if depth >= self.max_depth => {
                    batch.report(SkippableRecordIssue::DepthExceeded {
                        table: table.to_string(),
                        key: column,
                        max_depth: self.max_depth,
                    });
                }

                Node::Array(items) => {
                    if !usable_column(table, &column, batch) {
                        continue;
                    }
                    let child_table = policy::array_table_name(table, &column);
                    let foreign_key = policy::parent_foreign_key(table);
                    for item in items {
                        match item {
                            Node::Object(child) => {
                                self.flatten_row(
                                    &child_table,
                                    child,
                                    Some((foreign_key.as_str(), row_id)),
                                    depth + 1,
                                    batch,
                                );
                            }
                            other => batch.report(SkippableRecordIssue::NonObjectArrayElement {
                                table: table.to_string(),
                                key: column.clone(),
                                kind: other.kind(),
                            }),
                        }
                    }
                }

                Node::Object(child) if identifier_of(child).is_some() => {
                    let foreign_key = policy::nested_object_foreign_key(&column);
                    if !usable_column(table, &foreign_key, batch) {
                        continue;
                    }
                    let child_table = policy::object_table_name(&key);
                    if let Some(child_id) =
                        self.flatten_row(&child_table, child, None, depth + 1, batch)
                    {
                        record.insert(foreign_key, child_id);
                    }
                }

                Node::Object(child) => {
                    let nested_prefix = format!("{}_", column);
                    self.flatten_attributes(
                        table,
                        row_id,
                        &nested_prefix,
                        child,
                        record,
                        depth + 1,
                        batch,
                    );
                }
            }
        }
    }

    fn flatten_scalar(
        &self,
        table: &str,
        column: &str,
        value: &Scalar,
        record: &mut FlatRecord,
        batch: &mut ImportBatch,
    ) {
        if !value.is_present() {
            return;
        }

        if policy::is_date_time_field(column) {
            match parse_date_time(value) {
                Some(dt) => record.insert(column, dt),
                None => {
                    batch.report(SkippableRecordIssue::UnparseableDate {
                        table: table.to_string(),
                        column: column.to_string(),
                        value: value.to_string(),
                    });
                    record.insert(column, value.clone());
                }
            }
            return;
        }

        if policy::is_identifier_column(column) {
            if let Some(id) = value.as_identifier() {
                record.insert(column, id);
                return;
            }
        }

        record.insert(column, value.clone());
    }
}

/// Reports and returns false if `column` cannot be used as a column name.
fn usable_column(table: &str, column: &str, batch: &mut ImportBatch) -> bool {
    match validate_identifier(column) {
        Ok(()) => true,
        Err(err) => {
            batch.report(SkippableRecordIssue::InvalidColumn {
                table: table.to_string(),
                column: column.to_string(),
                reason: err.to_string(),
            });
            false
        }
    }
}

fn identifier_of(attrs: &Attributes) -> Option<String> {
    attrs
        .get(policy::ID_COLUMN)
        .and_then(Node::as_scalar)
        .and_then(Scalar::as_identifier)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Resource;
    use chrono::TimeZone;
    use serde_json::{json, Value};

    fn stamp() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    fn flatten(table: &str, value: Value) -> ImportBatch {
        let resource = Resource::from_json(value).unwrap();
        let mut batch = ImportBatch::new(stamp());
        Flattener::default().flatten(table, resource.attrs(), &mut batch);
        batch
    }

    fn text<'a>(record: &'a FlatRecord, column: &str) -> Option<&'a str> {
        record.get(column).and_then(Scalar::as_str)
    }

    #[test]
    fn test_nested_array_becomes_child_table() {
        let batch = flatten(
            "orders",
            json!({"id": "1", "name": "A", "lines": [{"id": "10", "sku": "x"}, {"id": "11", "sku": "y"}]}),
        );

        let orders = batch.records("orders");
        assert_eq!(orders.len(), 1);
        assert_eq!(text(&orders[0], "name"), Some("A"));
        assert!(!orders[0].contains("lines"));

        let lines = batch.records("order_lines");
        assert_eq!(lines.len(), 2);
        assert_eq!(text(&lines[0], "id"), Some("10"));
        assert_eq!(text(&lines[0], "sku"), Some("x"));
        assert_eq!(text(&lines[0], "order_id"), Some("1"));
        assert_eq!(text(&lines[1], "id"), Some("11"));
        assert_eq!(text(&lines[1], "order_id"), Some("1"));
        assert!(batch.issues().is_empty());
    }

    #[test]
    fn test_nested_object_sets_foreign_key() {
        let batch = flatten(
            "sales",
            json!({"id": "5", "customer": {"id": "9", "email": "a@b.co"}}),
        );

        let customers = batch.records("customers");
        assert_eq!(customers.len(), 1);
        assert_eq!(text(&customers[0], "email"), Some("a@b.co"));
        assert_eq!(text(&batch.records("sales")[0], "customer_id"), Some("9"));
    }

    #[test]
    fn test_missing_id_produces_no_rows() {
        let batch = flatten("orders", json!({"name": "A", "lines": [{"id": "10"}]}));

        assert!(batch.is_empty());
        assert_eq!(
            batch.issues(),
            &[SkippableRecordIssue::MissingId {
                table: "orders".to_string()
            }]
        );
    }

    #[test]
    fn test_scalar_array_elements_are_reported() {
        let batch = flatten("products", json!({"id": "1", "tags": ["a", {"id": "t1"}, 3]}));

        assert_eq!(batch.records("product_tags").len(), 1);
        assert_eq!(batch.issues().len(), 2);
        assert!(matches!(
            &batch.issues()[0],
            SkippableRecordIssue::NonObjectArrayElement { key, kind: "scalar", .. } if key == "tags"
        ));
    }

    #[test]
    fn test_date_fields_are_parsed() {
        let batch = flatten(
            "taxes",
            json!({
                "id": "1",
                "created_at": "2024-01-02 03:04:05",
                "valid_from": "2024-02-01",
                "year_to_date": 120
            }),
        );

        let row = &batch.records("taxes")[0];
        assert_eq!(
            row.get("created_at"),
            Some(&Scalar::DateTime(Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap()))
        );
        assert_eq!(
            row.get("valid_from"),
            Some(&Scalar::DateTime(Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap()))
        );
        assert_eq!(row.get("year_to_date"), Some(&Scalar::Integer(120)));
    }

    #[test]
    fn test_unparseable_date_is_kept_and_reported() {
        let batch = flatten("users", json!({"id": "1", "seen_at": "yesterday"}));

        assert_eq!(text(&batch.records("users")[0], "seen_at"), Some("yesterday"));
        assert!(matches!(
            &batch.issues()[0],
            SkippableRecordIssue::UnparseableDate { column, .. } if column == "seen_at"
        ));
    }

    #[test]
    fn test_updated_at_is_stamped_when_missing() {
        let batch = flatten(
            "outlets",
            json!({"id": "1", "children": [{"id": "2", "updated_at": "2023-01-01T00:00:00Z"}]}),
        );

        let parent = &batch.records("outlets")[0];
        assert_eq!(parent.get("updated_at"), Some(&Scalar::DateTime(stamp())));

        let child = &batch.records("outlet_children")[0];
        assert_eq!(
            child.get("updated_at"),
            Some(&Scalar::DateTime(Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap()))
        );
    }

    #[test]
    fn test_absent_values_dropped_falsy_values_kept() {
        let batch = flatten(
            "products",
            json!({"id": "1", "note": null, "blank": "  ", "active": false, "count": 0}),
        );

        let row = &batch.records("products")[0];
        assert!(!row.contains("note"));
        assert!(!row.contains("blank"));
        assert_eq!(row.get("active"), Some(&Scalar::Bool(false)));
        assert_eq!(row.get("count"), Some(&Scalar::Integer(0)));
    }

    #[test]
    fn test_reserved_suffixes_are_rewritten() {
        let batch = flatten("products", json!({"id": "1", "price_set": 2, "row_sel": "a"}));

        let row = &batch.records("products")[0];
        assert!(row.contains("price_set_"));
        assert!(row.contains("row_sel_"));
        assert!(!row.contains("price_set"));
    }

    #[test]
    fn test_object_without_id_is_inlined() {
        let batch = flatten(
            "customers",
            json!({"id": "1", "contact": {"email": "a@b.co", "phone": ""}}),
        );

        let row = &batch.records("customers")[0];
        assert_eq!(text(&row, "contact_email"), Some("a@b.co"));
        assert!(!row.contains("contact_phone"));
        assert!(batch.records("contacts").is_empty());
    }

    #[test]
    fn test_numeric_identifiers_become_text() {
        let batch = flatten("registers", json!({"id": 7, "outlet_id": 3}));

        let row = &batch.records("registers")[0];
        assert_eq!(text(&row, "id"), Some("7"));
        assert_eq!(text(&row, "outlet_id"), Some("3"));
    }

    #[test]
    fn test_depth_guard() {
        let batch = {
            let resource = Resource::from_json(json!({
                "id": "1",
                "a": {"id": "2", "b": {"id": "3"}}
            }))
            .unwrap();
            let mut batch = ImportBatch::new(stamp());
            Flattener::new(1).flatten("roots", resource.attrs(), &mut batch);
            batch
        };

        assert_eq!(batch.records("as").len(), 1);
        assert!(batch.records("bs").is_empty());
        assert!(matches!(
            &batch.issues()[0],
            SkippableRecordIssue::DepthExceeded { key, max_depth: 1, .. } if key == "b"
        ));
    }

    #[test]
    fn test_shared_object_appears_once_per_reference() {
        let mut batch = ImportBatch::new(stamp());
        let flattener = Flattener::default();
        for sale in [
            json!({"id": "1", "customer": {"id": "9", "email": "old@b.co"}}),
            json!({"id": "2", "customer": {"id": "9", "email": "new@b.co"}}),
        ] {
            let resource = Resource::from_json(sale).unwrap();
            flattener.flatten("register_sales", resource.attrs(), &mut batch);
        }

        assert_eq!(batch.records("customers").len(), 2);
        let tables: Vec<_> = batch.into_tables().collect();
        let (_, customers) = tables.iter().find(|(t, _)| t == "customers").unwrap();
        assert_eq!(customers.len(), 1);
        assert_eq!(text(&customers[0], "email"), Some("new@b.co"));
    }

    #[test]
    fn test_unusable_keys_are_dropped_and_reported() {
        let long_key = "k".repeat(200);
        let batch = flatten(
            "products",
            json!({"id": "p2", "": "x", "bad\u{0}key": "y", long_key.clone(): "z", "name": "ok"}),
        );

        let row = &batch.records("products")[0];
        assert_eq!(text(row, "name"), Some("ok"));
        assert_eq!(row.len(), 3);
        assert_eq!(batch.issues().len(), 3);
        assert!(batch.issues().iter().all(|issue| matches!(
            issue,
            SkippableRecordIssue::InvalidColumn { table, .. } if table == "products"
        )));
    }

    #[test]
    fn test_arrays_inside_inlined_objects_get_their_own_table() {
        let batch = flatten(
            "orders",
            json!({"id": "1", "meta": {"lines": [{"id": "m1"}]}, "lines": [{"id": "l1"}]}),
        );

        let meta_lines = batch.records("order_meta_lines");
        assert_eq!(meta_lines.len(), 1);
        assert_eq!(text(&meta_lines[0], "id"), Some("m1"));
        assert_eq!(text(&meta_lines[0], "order_id"), Some("1"));

        let lines = batch.records("order_lines");
        assert_eq!(lines.len(), 1);
        assert_eq!(text(&lines[0], "id"), Some("l1"));
    }
}
