//! # Sync Error Types
//!
//! Error types for import operations.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Import Error Categories                           │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │  Configuration  │  │     Fetch       │  │     Store               │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  InvalidConfig  │  │  Fetch          │  │  SchemaMigration        │ │
//! │  │  MissingToken   │  │  HttpStatus     │  │  Upsert                 │ │
//! │  │  InvalidUrl     │  │  Decode         │  │  Database               │ │
//! │  │  UnknownClass   │  │                 │  │                         │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! │                                                                         │
//! │  Every Fetch and Store error aborts the current class only.            │
//! │  Records the importer cannot map are not errors at all: they are      │
//! │  `vend_core::SkippableRecordIssue`s, logged and counted.               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

/// Result type alias for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Import error type covering all possible sync failures.
#[derive(Debug, Error)]
pub enum SyncError {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Invalid sync configuration.
    #[error("Invalid sync configuration: {0}")]
    InvalidConfig(String),

    /// No API token configured.
    #[error("Vend API token not configured. Set [vend].token or VEND_TOKEN.")]
    MissingToken,

    /// Invalid store address or URL.
    #[error("Invalid Vend address: {0}")]
    InvalidUrl(String),

    /// Failed to load config file.
    #[error("Failed to load config: {0}")]
    ConfigLoadFailed(String),

    /// Failed to save config file.
    #[error("Failed to save config: {0}")]
    ConfigSaveFailed(String),

    /// A class name that does not map to a known resource class.
    #[error("Unknown resource class: '{0}'")]
    UnknownResourceClass(String),

    // =========================================================================
    // Fetch Errors
    // =========================================================================
    /// Transport failure while listing a class.
    #[error("Fetch failed for {class}: {reason}")]
    Fetch { class: String, reason: String },

    /// The API answered with a non-success status.
    #[error("HTTP {status} from {url}")]
    HttpStatus { status: u16, url: String },

    /// A response body could not be decoded.
    #[error("Failed to decode response: {0}")]
    Decode(String),

    // =========================================================================
    // Store Errors
    // =========================================================================
    /// The store refused additive DDL for a table.
    #[error("Schema migration failed for {table}: {reason}")]
    SchemaMigration { table: String, reason: String },

    /// The batched write for a table failed.
    #[error("Upsert failed for {table}: {reason}")]
    Upsert { table: String, reason: String },

    /// Any other store failure (watermark read, run log).
    #[error("Database error: {0}")]
    Database(String),
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<vend_db::DbError> for SyncError {
    fn from(err: vend_db::DbError) -> Self {
        SyncError::Database(err.to_string())
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        SyncError::Decode(err.to_string())
    }
}

impl From<url::ParseError> for SyncError {
    fn from(err: url::ParseError) -> Self {
        SyncError::InvalidUrl(err.to_string())
    }
}

impl From<reqwest::Error> for SyncError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            return SyncError::HttpStatus {
                status: status.as_u16(),
                url: err.url().map(|u| u.to_string()).unwrap_or_default(),
            };
        }
        if err.is_decode() {
            return SyncError::Decode(err.to_string());
        }
        SyncError::Fetch {
            class: String::new(),
            reason: err.to_string(),
        }
    }
}

impl From<std::io::Error> for SyncError {
    fn from(err: std::io::Error) -> Self {
        SyncError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::de::Error> for SyncError {
    fn from(err: toml::de::Error) -> Self {
        SyncError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::ser::Error> for SyncError {
    fn from(err: toml::ser::Error) -> Self {
        SyncError::ConfigSaveFailed(err.to_string())
    }
}

// =============================================================================
// Error Categorization
// =============================================================================

impl SyncError {
    /// Returns true if the HTTP client may retry the request.
    ///
    /// ## Retryable Errors
    /// - Connection failures and timeouts
    /// - 429 Too Many Requests
    /// - 5xx responses
    pub fn is_retryable(&self) -> bool {
        match self {
            SyncError::Fetch { .. } => true,
            SyncError::HttpStatus { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    /// Returns true if the error ends the current class pass.
    ///
    /// Configuration errors abort the whole import instead.
    pub fn aborts_class(&self) -> bool {
        matches!(
            self,
            SyncError::Fetch { .. }
                | SyncError::HttpStatus { .. }
                | SyncError::Decode(_)
                | SyncError::SchemaMigration { .. }
                | SyncError::Upsert { .. }
                | SyncError::Database(_)
        )
    }

    /// Returns true if this error indicates a configuration problem.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            SyncError::InvalidConfig(_)
                | SyncError::MissingToken
                | SyncError::InvalidUrl(_)
                | SyncError::ConfigLoadFailed(_)
                | SyncError::ConfigSaveFailed(_)
                | SyncError::UnknownResourceClass(_)
        )
    }

    /// Attaches the class being fetched to a transport error.
    pub fn for_class(self, class: &str) -> Self {
        match self {
            SyncError::Fetch { reason, .. } => SyncError::Fetch {
                class: class.to_string(),
                reason,
            },
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_errors() {
        let fetch = SyncError::Fetch {
            class: "Product".into(),
            reason: "connection reset".into(),
        };
        assert!(fetch.is_retryable());

        let throttled = SyncError::HttpStatus {
            status: 429,
            url: "https://x".into(),
        };
        assert!(throttled.is_retryable());

        let unavailable = SyncError::HttpStatus {
            status: 503,
            url: "https://x".into(),
        };
        assert!(unavailable.is_retryable());

        let unauthorized = SyncError::HttpStatus {
            status: 401,
            url: "https://x".into(),
        };
        assert!(!unauthorized.is_retryable());
        assert!(!SyncError::Decode("bad json".into()).is_retryable());
        assert!(!SyncError::MissingToken.is_retryable());
    }

    #[test]
    fn test_class_aborting_errors() {
        let schema = SyncError::SchemaMigration {
            table: "products".into(),
            reason: "database is locked".into(),
        };
        assert!(schema.aborts_class());
        assert!(!schema.is_config_error());

        assert!(SyncError::UnknownResourceClass("Widget".into()).is_config_error());
        assert!(!SyncError::UnknownResourceClass("Widget".into()).aborts_class());
    }

    #[test]
    fn test_for_class_fills_in_fetch_errors_only() {
        let err = SyncError::Fetch {
            class: String::new(),
            reason: "timed out".into(),
        }
        .for_class("Customer");
        assert_eq!(err.to_string(), "Fetch failed for Customer: timed out");

        let err = SyncError::Decode("eof".into()).for_class("Customer");
        assert!(matches!(err, SyncError::Decode(_)));
    }
}
