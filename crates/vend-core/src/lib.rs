//! # vend-core: Pure Mapping Logic for Vend Sync
//!
//! This crate turns tree-shaped Vend resources into relational rows and
//! decides how the relational schema has to grow to hold them. It contains
//! no I/O.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Vend Sync Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    vend-sync (Importer)                         │   │
//! │  │    fetch ──► flatten ──► ensure schema ──► upsert               │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ vend-core (THIS CRATE) ★                        │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │  flatten  │  │  schema   │  │  policy   │  │   │
//! │  │   │ Resource  │  │ Flattener │  │ inference │  │ suffixes  │  │   │
//! │  │   │FlatRecord │  │   batch   │  │  planning │  │  inflect  │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    vend-db (Database Layer)                     │   │
//! │  │          SQLite DDL, watermark query, batched upserts           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Resource trees, scalars and flat records
//! - [`batch`] - Per-class accumulator and skippable record issues
//! - [`flatten`] - Recursive decomposition into per-table records
//! - [`schema`] - Column type inference and additive schema planning
//! - [`policy`] - Suffix-based naming and date-time policy tables
//! - [`inflect`] - Pluralisation for table and foreign-key names
//! - [`validation`] - Identifier checks before DDL
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use chrono::Utc;
//! use vend_core::{Flattener, ImportBatch, Resource};
//!
//! let resource = Resource::from_json(serde_json::json!({
//!     "id": "1",
//!     "name": "A",
//!     "lines": [{"id": "10", "sku": "x"}, {"id": "11", "sku": "y"}]
//! }))
//! .unwrap();
//!
//! let mut batch = ImportBatch::new(Utc::now());
//! Flattener::default().flatten("orders", resource.attrs(), &mut batch);
//!
//! assert_eq!(batch.records("orders").len(), 1);
//! assert_eq!(batch.records("order_lines").len(), 2);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod batch;
pub mod error;
pub mod flatten;
pub mod inflect;
pub mod policy;
pub mod schema;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use batch::{ImportBatch, SkippableRecordIssue};
pub use error::{CoreError, CoreResult, ValidationError};
pub use flatten::Flattener;
pub use policy::IndexKind;
pub use schema::{ColumnSpec, ColumnType};
pub use types::*;
