//! # Naming Policy
//!
//! Every suffix-based classification the importer relies on, in one place.
//!
//! ## Policy Tables
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Column Name Classification                          │
//! │                                                                         │
//! │  IDENTIFIERS                                                           │
//! │  `id`            → unique index, string type                           │
//! │  `*_id`          → lookup index, string type                           │
//! │                                                                         │
//! │  DATE-TIME FIELDS                                                      │
//! │  `*_at`, `*_date`                 → date-time (suffix rule)            │
//! │  EXPLICIT_DATE_FIELDS             → date-time (inclusion list)         │
//! │  IGNORED_DATE_FIELDS              → never date-time (exclusion list)   │
//! │                                                                         │
//! │  RESERVED SUFFIXES                                                     │
//! │  `*_sel`, `*_set` → `*_sel_`, `*_set_` (upsert control vocabulary)     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::inflect;

// =============================================================================
// Control Columns
// =============================================================================

/// Identifier column present on every imported table.
pub const ID_COLUMN: &str = "id";

/// Audit column stamped on every flat record; source of the high-watermark.
pub const UPDATED_AT_COLUMN: &str = "updated_at";

/// Audit column created with every table.
pub const CREATED_AT_COLUMN: &str = "created_at";

/// Suffix of foreign-key and other lookup columns.
pub const FOREIGN_KEY_SUFFIX: &str = "_id";

// =============================================================================
// Date-Time Policy
// =============================================================================

/// Business fields that are date-times but do not follow the suffix rule.
pub const EXPLICIT_DATE_FIELDS: &[&str] = &["valid_from", "valid_to", "date_of_birth"];

/// Fields that match the suffix rule but are not date-times.
pub const IGNORED_DATE_FIELDS: &[&str] = &["year_to_date"];

/// Suffixes that mark a date-time field.
pub const DATE_SUFFIXES: &[&str] = &["_date", "_at"];

/// Returns true if the column holds a date-time value.
///
/// ## Example
/// ```rust
/// use vend_core::policy::is_date_time_field;
///
/// assert!(is_date_time_field("created_at"));
/// assert!(is_date_time_field("valid_from"));
/// assert!(!is_date_time_field("year_to_date"));
/// assert!(!is_date_time_field("name"));
/// ```
pub fn is_date_time_field(key: &str) -> bool {
    if IGNORED_DATE_FIELDS.contains(&key) {
        return false;
    }
    DATE_SUFFIXES.iter().any(|suffix| key.ends_with(suffix)) || EXPLICIT_DATE_FIELDS.contains(&key)
}

// =============================================================================
// Identifier Policy
// =============================================================================

/// Returns true for `id` and any `*_id` column.
pub fn is_identifier_column(key: &str) -> bool {
    key == ID_COLUMN || key.ends_with(FOREIGN_KEY_SUFFIX)
}

/// Index kind a column receives when it is first added.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexKind {
    /// No index.
    None,
    /// Unique index (`id`).
    Unique,
    /// Non-unique lookup index (`*_id`).
    Lookup,
}

/// Returns the index a newly added column should get.
pub fn index_kind(column: &str) -> IndexKind {
    if column == ID_COLUMN {
        IndexKind::Unique
    } else if column.ends_with(FOREIGN_KEY_SUFFIX) {
        IndexKind::Lookup
    } else {
        IndexKind::None
    }
}

/// Foreign-key column a child row uses to point at its parent table.
///
/// `orders` → `order_id`, `register_sales` → `register_sale_id`.
pub fn parent_foreign_key(parent_table: &str) -> String {
    format!("{}{}", inflect::singularize(parent_table), FOREIGN_KEY_SUFFIX)
}

/// Foreign-key column recorded on a parent for a nested single object.
///
/// `customer` → `customer_id`.
pub fn nested_object_foreign_key(key: &str) -> String {
    format!("{}{}", key, FOREIGN_KEY_SUFFIX)
}

// =============================================================================
// Table Naming
// =============================================================================

/// Table name for a resource class (`RegisterSale` → `register_sales`).
pub fn class_table_name(class_name: &str) -> String {
    inflect::pluralize(&inflect::underscore(class_name))
}

/// Table for a nested single object (`customer` → `customers`).
pub fn object_table_name(key: &str) -> String {
    inflect::pluralize(key)
}

/// Table for the elements of a nested array.
///
/// The pluralised key is scoped under the singular parent name, unless it
/// already is: `lines` under `orders` → `order_lines`, while
/// `register_sale_products` under `register_sales` stays as-is.
pub fn array_table_name(parent_table: &str, key: &str) -> String {
    let plural = inflect::pluralize(key);
    let parent = inflect::singularize(parent_table);
    let scope = format!("{}_", parent);
    if plural.starts_with(&scope) || plural == parent_table {
        plural
    } else {
        format!("{}{}", scope, plural)
    }
}

// =============================================================================
// Reserved Suffix Policy
// =============================================================================

/// Suffixes that collide with the upsert primitive's control vocabulary.
pub const RESERVED_SUFFIXES: &[&str] = &["_sel", "_set"];

/// Marker appended to keys ending in a reserved suffix.
pub const RESERVED_MARKER: char = '_';

/// Rewrites a key that would collide with a reserved suffix.
///
/// ## Example
/// ```rust
/// use vend_core::policy::rewrite_reserved_key;
///
/// assert_eq!(rewrite_reserved_key("price_set"), "price_set_");
/// assert_eq!(rewrite_reserved_key("name"), "name");
/// ```
pub fn rewrite_reserved_key(key: &str) -> String {
    if RESERVED_SUFFIXES.iter().any(|suffix| key.ends_with(suffix)) {
        let mut rewritten = String::with_capacity(key.len() + 1);
        rewritten.push_str(key);
        rewritten.push(RESERVED_MARKER);
        rewritten
    } else {
        key.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_date_time_rule() {
        assert!(is_date_time_field("created_at"));
        assert!(is_date_time_field("sale_date"));
        assert!(is_date_time_field("valid_from"));
        assert!(is_date_time_field("valid_to"));
        assert!(is_date_time_field("date_of_birth"));
        assert!(!is_date_time_field("year_to_date"));
        assert!(!is_date_time_field("dated"));
        assert!(!is_date_time_field("status"));
    }

    #[test]
    fn test_identifier_columns_and_indexes() {
        assert!(is_identifier_column("id"));
        assert!(is_identifier_column("outlet_id"));
        assert!(!is_identifier_column("identity"));

        assert_eq!(index_kind("id"), IndexKind::Unique);
        assert_eq!(index_kind("customer_id"), IndexKind::Lookup);
        assert_eq!(index_kind("name"), IndexKind::None);
    }

    #[test]
    fn test_foreign_keys() {
        assert_eq!(parent_foreign_key("orders"), "order_id");
        assert_eq!(parent_foreign_key("register_sales"), "register_sale_id");
        assert_eq!(parent_foreign_key("taxes"), "tax_id");
        assert_eq!(nested_object_foreign_key("customer"), "customer_id");
    }

    #[test]
    fn test_table_names() {
        assert_eq!(class_table_name("RegisterSale"), "register_sales");
        assert_eq!(class_table_name("PaymentType"), "payment_types");
        assert_eq!(class_table_name("Tax"), "taxes");
        assert_eq!(object_table_name("customer"), "customers");
        assert_eq!(array_table_name("orders", "lines"), "order_lines");
        assert_eq!(
            array_table_name("register_sales", "register_sale_products"),
            "register_sale_products"
        );
        assert_eq!(
            array_table_name("register_sales", "register_sale_payments"),
            "register_sale_payments"
        );
    }

    #[test]
    fn test_reserved_suffix_rewrite() {
        assert_eq!(rewrite_reserved_key("tax_set"), "tax_set_");
        assert_eq!(rewrite_reserved_key("row_sel"), "row_sel_");
        assert_eq!(rewrite_reserved_key("settings"), "settings");
    }
}
