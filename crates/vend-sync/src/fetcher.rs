//! # Resource Fetcher
//!
//! Turns a class into one lazy stream of resources, resuming from the
//! destination table's high-watermark.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  fetch(RegisterSale)                                                   │
//! │                                                                         │
//! │  1. watermark = MAX(register_sales.updated_at)    (read once)          │
//! │        table missing or no updated_at column ──► None (full fetch)     │
//! │                                                                         │
//! │  2. default listing  ── since: watermark ──┐                           │
//! │     VOIDED listing   ── since: watermark ──┤ concatenated in order     │
//! │                                            ▼                           │
//! │                                  ResourceStream                        │
//! │                                                                         │
//! │  Listings without since support always get a full fetch.               │
//! │  Transport retries live in the source, not here.                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures_util::stream::{self, StreamExt};
use tracing::{debug, warn};

use vend_core::flatten::parse_date_time;
use vend_core::policy::UPDATED_AT_COLUMN;
use vend_core::Scalar;
use vend_db::RelationalStore;

use crate::error::SyncResult;
use crate::resource_class::ResourceClass;
use crate::source::{ResourceSource, ResourceStream};

/// Builds the resource stream for one class pass.
#[derive(Clone)]
pub struct ResourceFetcher {
    source: Arc<dyn ResourceSource>,
    store: Arc<dyn RelationalStore>,
}

impl ResourceFetcher {
    pub fn new(source: Arc<dyn ResourceSource>, store: Arc<dyn RelationalStore>) -> Self {
        ResourceFetcher { source, store }
    }

    /// Latest `updated_at` already stored in `table`.
    pub async fn watermark(&self, table: &str) -> SyncResult<Option<DateTime<Utc>>> {
        if !self.store.table_exists(table).await? {
            return Ok(None);
        }
        if !self.store.column_exists(table, UPDATED_AT_COLUMN).await? {
            return Ok(None);
        }

        let Some(raw) = self.store.max_value(table, UPDATED_AT_COLUMN).await? else {
            return Ok(None);
        };

        let watermark = parse_date_time(&Scalar::text(raw.as_str()));
        if watermark.is_none() {
            warn!(table = %table, value = %raw, "Unreadable high-watermark, fetching everything");
        }
        Ok(watermark)
    }

    /// Opens every listing of `class` as one concatenated stream.
    pub async fn fetch(&self, class: ResourceClass) -> SyncResult<ResourceStream> {
        let table = class.table_name();
        let watermark = self.watermark(&table).await?;

        let streams: Vec<ResourceStream> = self
            .source
            .listings(class)
            .iter()
            .map(|listing| {
                let since = if listing.supports_since { watermark } else { None };
                debug!(
                    class = %class,
                    state = listing.state.unwrap_or("default"),
                    since = ?since,
                    "Opening listing"
                );
                self.source.open(listing, since)
            })
            .collect();

        Ok(stream::iter(streams).flatten().boxed())
    }
}
