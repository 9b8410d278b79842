//! # Domain Types
//!
//! The two shapes data takes on its way from the Vend API to SQLite.
//!
//! ## Type Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Resource → FlatRecord                              │
//! │                                                                         │
//! │  Resource (tree, untyped, transient)                                   │
//! │  ├── "id"       → Node::Scalar(Text)                                   │
//! │  ├── "customer" → Node::Object { "id", "email", ... }                  │
//! │  └── "lines"    → Node::Array [ Node::Object, Node::Object ]           │
//! │           │                                                             │
//! │           ▼  Flattener                                                  │
//! │  FlatRecord (column → Scalar, one table)                               │
//! │  ├── orders       { id, customer_id, updated_at }                      │
//! │  ├── customers    { id, email, updated_at }                            │
//! │  └── order_lines  { id, sku, order_id, updated_at }                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

// =============================================================================
// Scalar
// =============================================================================

/// A leaf value: either straight from upstream JSON or produced by the
/// flattener (date-time parsing).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Scalar {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    DateTime(DateTime<Utc>),
}

impl Scalar {
    /// Creates a text scalar.
    pub fn text(value: impl Into<String>) -> Self {
        Scalar::Text(value.into())
    }

    /// Returns true for `Null`.
    pub fn is_null(&self) -> bool {
        matches!(self, Scalar::Null)
    }

    /// Returns true if the value carries information worth a column.
    ///
    /// Null, empty and whitespace-only strings are absent; `false` and `0`
    /// are present.
    pub fn is_present(&self) -> bool {
        match self {
            Scalar::Null => false,
            Scalar::Text(s) => !s.trim().is_empty(),
            _ => true,
        }
    }

    /// Returns the text content, if this is a text scalar.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Scalar::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Renders the value as an opaque identifier string.
    ///
    /// Upstream identifiers are strings, but some endpoints return numeric
    /// ids; both are normalised to text here.
    pub fn as_identifier(&self) -> Option<String> {
        match self {
            Scalar::Text(s) if !s.trim().is_empty() => Some(s.clone()),
            Scalar::Integer(n) => Some(n.to_string()),
            Scalar::Float(f) if f.fract() == 0.0 && f.is_finite() => Some(f.to_string()),
            _ => None,
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Null => write!(f, "null"),
            Scalar::Bool(b) => write!(f, "{}", b),
            Scalar::Integer(n) => write!(f, "{}", n),
            Scalar::Float(x) => write!(f, "{}", x),
            Scalar::Text(s) => write!(f, "{}", s),
            Scalar::DateTime(dt) => write!(f, "{}", dt.to_rfc3339()),
        }
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Scalar::Text(value.to_string())
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Scalar::Text(value)
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Scalar::Integer(value)
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Scalar::Float(value)
    }
}

impl From<bool> for Scalar {
    fn from(value: bool) -> Self {
        Scalar::Bool(value)
    }
}

impl From<DateTime<Utc>> for Scalar {
    fn from(value: DateTime<Utc>) -> Self {
        Scalar::DateTime(value)
    }
}

// =============================================================================
// Resource Tree
// =============================================================================

/// Attribute mapping of a resource or nested object.
pub type Attributes = BTreeMap<String, Node>;

/// One node of a resource tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Scalar(Scalar),
    Object(Attributes),
    Array(Vec<Node>),
}

impl Node {
    /// Returns the scalar inside, if any.
    pub fn as_scalar(&self) -> Option<&Scalar> {
        match self {
            Node::Scalar(s) => Some(s),
            _ => None,
        }
    }

    /// Short shape name used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Node::Scalar(_) => "scalar",
            Node::Object(_) => "object",
            Node::Array(_) => "array",
        }
    }
}

impl From<Value> for Node {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Node::Scalar(Scalar::Null),
            Value::Bool(b) => Node::Scalar(Scalar::Bool(b)),
            // Integers past i64 keep their exact digits as text.
            Value::Number(n) => match (n.as_i64(), n.as_u64(), n.as_f64()) {
                (Some(i), _, _) => Node::Scalar(Scalar::Integer(i)),
                (None, Some(_), _) => Node::Scalar(Scalar::Text(n.to_string())),
                (None, None, Some(f)) => Node::Scalar(Scalar::Float(f)),
                (None, None, None) => Node::Scalar(Scalar::Text(n.to_string())),
            },
            Value::String(s) => Node::Scalar(Scalar::Text(s)),
            Value::Array(items) => Node::Array(items.into_iter().map(Node::from).collect()),
            Value::Object(map) => Node::Object(
                map.into_iter()
                    .map(|(key, value)| (key, Node::from(value)))
                    .collect(),
            ),
        }
    }
}

impl From<Scalar> for Node {
    fn from(value: Scalar) -> Self {
        Node::Scalar(value)
    }
}

/// A tree-shaped record fetched from upstream.
///
/// Produced by the transport boundary and consumed once by the flattener.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Resource {
    attrs: Attributes,
}

impl Resource {
    /// Creates a resource from its attributes.
    pub fn new(attrs: Attributes) -> Self {
        Resource { attrs }
    }

    /// Builds a resource from a JSON object. Non-objects are rejected.
    ///
    /// ## Example
    /// ```rust
    /// use vend_core::Resource;
    ///
    /// let resource = Resource::from_json(serde_json::json!({"id": "1"})).unwrap();
    /// assert_eq!(resource.id().as_deref(), Some("1"));
    /// assert!(Resource::from_json(serde_json::json!([1, 2])).is_none());
    /// ```
    pub fn from_json(value: Value) -> Option<Self> {
        match Node::from(value) {
            Node::Object(attrs) => Some(Resource { attrs }),
            _ => None,
        }
    }

    /// The attribute mapping.
    pub fn attrs(&self) -> &Attributes {
        &self.attrs
    }

    /// Consumes the resource, returning its attributes.
    pub fn into_attrs(self) -> Attributes {
        self.attrs
    }

    /// The upstream identifier, if the resource has a usable one.
    pub fn id(&self) -> Option<String> {
        self.attrs
            .get(crate::policy::ID_COLUMN)
            .and_then(Node::as_scalar)
            .and_then(Scalar::as_identifier)
    }
}

impl<'de> Deserialize<'de> for Resource {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let map = serde_json::Map::<String, Value>::deserialize(deserializer)?;
        Ok(Resource::from_json(Value::Object(map)).unwrap_or_default())
    }
}

// =============================================================================
// Flat Record
// =============================================================================

/// A column → value mapping destined for exactly one table.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct FlatRecord {
    columns: BTreeMap<String, Scalar>,
}

impl FlatRecord {
    /// Creates an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a column, replacing any previous value.
    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<Scalar>) {
        self.columns.insert(column.into(), value.into());
    }

    /// Returns a column value.
    pub fn get(&self, column: &str) -> Option<&Scalar> {
        self.columns.get(column)
    }

    /// Returns true if the column is set (even to null).
    pub fn contains(&self, column: &str) -> bool {
        self.columns.contains_key(column)
    }

    /// The record identifier, if present.
    pub fn id(&self) -> Option<String> {
        self.columns
            .get(crate::policy::ID_COLUMN)
            .and_then(Scalar::as_identifier)
    }

    /// Iterates columns in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Scalar)> {
        self.columns.iter()
    }

    /// Column names in name order.
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    /// Number of columns.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Returns true if the record has no columns.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Overlays another record's columns onto this one; `other` wins.
    pub fn merge(&mut self, other: FlatRecord) {
        self.columns.extend(other.columns);
    }

    /// Splits the record into its identifier and the remaining attributes.
    pub fn into_parts(mut self) -> (Option<String>, BTreeMap<String, Scalar>) {
        let id = self
            .columns
            .remove(crate::policy::ID_COLUMN)
            .and_then(|v| v.as_identifier());
        (id, self.columns)
    }
}

impl IntoIterator for FlatRecord {
    type Item = (String, Scalar);
    type IntoIter = std::collections::btree_map::IntoIter<String, Scalar>;

    fn into_iter(self) -> Self::IntoIter {
        self.columns.into_iter()
    }
}

impl<K: Into<String>, V: Into<Scalar>> FromIterator<(K, V)> for FlatRecord {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        FlatRecord {
            columns: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
