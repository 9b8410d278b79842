//! # Error Types
//!
//! Domain-specific error types for vend-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  vend-core errors (this file)                                          │
//! │  ├── CoreError        - General mapping errors                         │
//! │  └── ValidationError  - Identifier validation failures                 │
//! │                                                                         │
//! │  vend-db errors (separate crate)                                       │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  vend-sync errors (separate crate)                                     │
//! │  └── SyncError        - Fetch / migration / upsert failures            │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → SyncError → CLI         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Resources that cannot be imported (no `id`, scalar array elements) are
//! NOT errors. They are reported as [`SkippableRecordIssue`](crate::SkippableRecordIssue)
//! values collected in the [`ImportBatch`](crate::ImportBatch).

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core mapping errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A table name cannot be used in DDL.
    #[error("Invalid table name '{name}': {source}")]
    InvalidTableName {
        name: String,
        #[source]
        source: ValidationError,
    },

    /// A column name cannot be used in DDL.
    #[error("Invalid column name '{name}' on {table}: {source}")]
    InvalidColumnName {
        table: String,
        name: String,
        #[source]
        source: ValidationError,
    },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Identifier validation errors.
///
/// Upstream attribute keys become column names verbatim, so they are checked
/// before any DDL is generated from them.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// Identifier is empty.
    #[error("identifier must not be empty")]
    Empty,

    /// Identifier is too long for the store.
    #[error("identifier must be at most {max} characters")]
    TooLong { max: usize },

    /// Identifier contains a character the store cannot carry.
    #[error("identifier contains forbidden character {0:?}")]
    ForbiddenCharacter(char),
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
