//! # vend-db: Relational Store for Vend Sync
//!
//! SQLite realisation of the relational store boundary the importer writes
//! through.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Vend Sync Data Flow                              │
//! │                                                                         │
//! │  Importer (vend-sync)                                                  │
//! │       │  SchemaManager / UpsertEngine / ResourceFetcher                │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     vend-db (THIS CRATE)                        │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │               │    │  (embedded)  │  │   │
//! │  │   │               │    │ SchemaRepo    │    │              │  │   │
//! │  │   │ SqlitePool    │◄───│ RecordRepo    │    │ 001_sync_    │  │   │
//! │  │   │ store.rs impl │    │ SyncRunRepo   │    │   runs.sql   │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database                             │   │
//! │  │   outlets, products, register_sales, ... + vend_sync_runs       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`store`] - The `RelationalStore` boundary trait
//! - [`migrations`] - Embedded bookkeeping migrations
//! - [`error`] - Database error types
//! - [`repository`] - Schema, record and sync-run repositories
//!
//! ## Usage
//!
//! ```rust,ignore
//! use vend_db::{Database, DbConfig, RelationalStore};
//!
//! let db = Database::new(DbConfig::new("vend.db")).await?;
//! if !db.table_exists("outlets").await? {
//!     db.create_table("outlets").await?;
//! }
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod store;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig, DbLocation};
pub use store::RelationalStore;

pub use repository::records::{RecordRepository, UpsertRow, UpsertStrategy};
pub use repository::runs::{RunCounts, RunStatus, SyncRun, SyncRunRepository};
pub use repository::schema::SchemaRepository;
