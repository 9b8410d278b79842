//! # vend-sync: Import Engine for Vend Sync
//!
//! Pulls resources from the Vend API and materialises them as relational
//! tables, one class at a time, resuming from what is already stored.
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Vend Sync Import                                │
//! │                                                                         │
//! │   Vend API                                                             │
//! │   (HTTPS, paged)                                                       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌──────────────┐  ResourceSource   ┌──────────────────┐               │
//! │  │  VendClient  │──────────────────►│ ResourceFetcher  │◄── watermark  │
//! │  │  (client.rs) │                   │  (fetcher.rs)    │    (vend-db)  │
//! │  └──────────────┘                   └────────┬─────────┘               │
//! │                                              │ ResourceStream          │
//! │                                              ▼                         │
//! │                                     ┌──────────────────┐               │
//! │                                     │    Importer      │               │
//! │                                     │  (importer.rs)   │               │
//! │                                     │                  │               │
//! │                                     │ Flattener        │ (vend-core)   │
//! │                                     │ ImportBatch      │               │
//! │                                     └───┬──────────┬───┘               │
//! │                                         │          │                   │
//! │                                         ▼          ▼                   │
//! │                             SchemaManager      UpsertEngine            │
//! │                             (schema.rs)        (upsert.rs)             │
//! │                                         │          │                   │
//! │                                         ▼          ▼                   │
//! │                                   RelationalStore (vend-db)            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`importer`] - `Importer`, one pass per resource class
//! - [`fetcher`] - Watermark lookup and listing concatenation
//! - [`schema`] - Additive table and column migration
//! - [`upsert`] - Batched writes keyed by `id`
//! - [`client`] - Vend HTTP client with pagination and backoff
//! - [`source`] - The `ResourceSource` boundary
//! - [`resource_class`] - Known Vend resource classes
//! - [`progress`] - Progress reporting hooks
//! - [`config`] - Importer configuration (TOML + environment)
//! - [`error`] - Sync error types
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use vend_db::Database;
//! use vend_sync::{Importer, SyncConfig, VendClient};
//!
//! let config = SyncConfig::load(None)?;
//! config.validate()?;
//!
//! let db = Arc::new(Database::new(config.database.db_config()).await?);
//! let client = Arc::new(VendClient::new(&config.vend)?);
//!
//! let importer = Importer::new(client, db, &config.import);
//! let summary = importer.import(&config.import.classes).await;
//! println!("Wrote {} rows", summary.total_rows());
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod client;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod importer;
pub mod progress;
pub mod resource_class;
pub mod schema;
pub mod source;
pub mod upsert;

#[cfg(test)]
mod testing;

// =============================================================================
// Re-exports
// =============================================================================

pub use client::VendClient;
pub use config::{DatabaseSettings, ImportSettings, SyncConfig, VendSettings};
pub use error::{SyncError, SyncResult};
pub use fetcher::ResourceFetcher;
pub use importer::{ClassSummary, ImportSummary, Importer};
pub use progress::{ConsoleProgress, ImportProgress, NoOpProgress};
pub use resource_class::ResourceClass;
pub use schema::SchemaManager;
pub use source::{Listing, ResourceSource, ResourceStream};
pub use upsert::UpsertEngine;
