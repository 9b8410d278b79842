//! # Validation Module
//!
//! Identifier validation for table and column names.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Flattener                                                    │
//! │  └── Reserved suffix rewriting (`_sel` → `_sel_`)                      │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Schema planning                                              │
//! │  └── THIS MODULE: identifier checks before DDL is generated            │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  └── Every identifier is double-quoted, embedded quotes are doubled    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::{CoreError, CoreResult, ValidationError};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Longest identifier accepted for tables and columns.
pub const MAX_IDENTIFIER_LEN: usize = 128;

/// Validates a raw identifier.
///
/// ## Rules
/// - Must not be empty
/// - At most [`MAX_IDENTIFIER_LEN`] characters
/// - No control characters (NUL in particular cannot be quoted)
///
/// ## Example
/// ```rust
/// use vend_core::validation::validate_identifier;
///
/// assert!(validate_identifier("supply_price").is_ok());
/// assert!(validate_identifier("").is_err());
/// ```
pub fn validate_identifier(name: &str) -> ValidationResult<()> {
    if name.is_empty() {
        return Err(ValidationError::Empty);
    }

    if name.chars().count() > MAX_IDENTIFIER_LEN {
        return Err(ValidationError::TooLong {
            max: MAX_IDENTIFIER_LEN,
        });
    }

    if let Some(c) = name.chars().find(|c| c.is_control()) {
        return Err(ValidationError::ForbiddenCharacter(c));
    }

    Ok(())
}

/// Validates a table name.
pub fn validate_table_name(name: &str) -> CoreResult<()> {
    validate_identifier(name).map_err(|source| CoreError::InvalidTableName {
        name: name.to_string(),
        source,
    })
}

/// Validates a column name on a given table.
pub fn validate_column_name(table: &str, name: &str) -> CoreResult<()> {
    validate_identifier(name).map_err(|source| CoreError::InvalidColumnName {
        table: table.to_string(),
        name: name.to_string(),
        source,
    })
}
