//! # Importer
//!
//! Drives each resource class end to end.
//!
//! ## Class Pass
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         import([Outlet, Product, ...])                  │
//! │                                                                         │
//! │  for each class (sequentially):                                        │
//! │                                                                         │
//! │   run log: start ─────────────────────────────────────────────┐        │
//! │                                                               │        │
//! │   ResourceFetcher::fetch(class)                               │        │
//! │        │ resource by resource                                 │        │
//! │        ▼                                                      │        │
//! │   Flattener::flatten ──► ImportBatch (owned by this pass)     │        │
//! │        │ stream exhausted                                     │        │
//! │        ▼                                                      │        │
//! │   for each table in the batch:                                │        │
//! │        SchemaManager::ensure_table   (whole batch seen first) │        │
//! │        UpsertEngine::upsert          (one batch per table)    │        │
//! │                                                               ▼        │
//! │   run log: succeed / fail ◄──────────────────────────── ClassSummary   │
//! │                                                                         │
//! │  A failing class keeps the tables it already committed and does not   │
//! │  stop the classes after it.                                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use futures_util::TryStreamExt;
use serde::Serialize;
use tracing::{error, info, warn};

use vend_core::{Flattener, ImportBatch};
use vend_db::{Database, RelationalStore, RunCounts, SyncRunRepository};

use crate::config::ImportSettings;
use crate::error::SyncResult;
use crate::fetcher::ResourceFetcher;
use crate::progress::{ImportProgress, NoOpProgress};
use crate::resource_class::ResourceClass;
use crate::schema::SchemaManager;
use crate::source::ResourceSource;
use crate::upsert::UpsertEngine;

// =============================================================================
// Summaries
// =============================================================================

/// Outcome of one class pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassSummary {
    pub class: ResourceClass,
    /// Resources consumed from the fetcher.
    pub resources: u64,
    /// Rows written per table.
    pub rows: BTreeMap<String, u64>,
    /// Columns added per table.
    pub columns_added: BTreeMap<String, Vec<String>>,
    /// Skippable record issues seen while flattening.
    pub skipped: u64,
    /// Why the pass was aborted, if it was.
    pub error: Option<String>,
}

impl ClassSummary {
    fn new(class: ResourceClass) -> Self {
        ClassSummary {
            class,
            resources: 0,
            rows: BTreeMap::new(),
            columns_added: BTreeMap::new(),
            skipped: 0,
            error: None,
        }
    }

    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }

    pub fn rows_written(&self) -> u64 {
        self.rows.values().sum()
    }

    fn counts(&self) -> RunCounts {
        RunCounts {
            resources: to_i64(self.resources),
            rows_written: to_i64(self.rows_written()),
            skipped: to_i64(self.skipped),
        }
    }
}

fn to_i64(n: u64) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

/// Outcome of an import, one entry per class in the order imported.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ImportSummary {
    pub classes: Vec<ClassSummary>,
}

impl ImportSummary {
    /// True if every class pass succeeded.
    pub fn is_success(&self) -> bool {
        self.classes.iter().all(ClassSummary::succeeded)
    }

    /// Classes whose pass was aborted.
    pub fn failed(&self) -> Vec<ResourceClass> {
        self.classes
            .iter()
            .filter(|c| !c.succeeded())
            .map(|c| c.class)
            .collect()
    }

    pub fn class(&self, class: ResourceClass) -> Option<&ClassSummary> {
        self.classes.iter().find(|c| c.class == class)
    }

    pub fn total_rows(&self) -> u64 {
        self.classes.iter().map(ClassSummary::rows_written).sum()
    }
}

// =============================================================================
// Importer
// =============================================================================

/// Imports resource classes into the relational store.
pub struct Importer {
    fetcher: ResourceFetcher,
    schema: SchemaManager,
    upserts: UpsertEngine,
    flattener: Flattener,
    runs: SyncRunRepository,
    progress: Arc<dyn ImportProgress>,
}

impl Importer {
    /// Creates an importer writing to `db`.
    pub fn new(source: Arc<dyn ResourceSource>, db: Arc<Database>, settings: &ImportSettings) -> Self {
        Self::with_progress(source, db, settings, Arc::new(NoOpProgress))
    }

    /// Creates an importer with a custom progress reporter.
    pub fn with_progress(
        source: Arc<dyn ResourceSource>,
        db: Arc<Database>,
        settings: &ImportSettings,
        progress: Arc<dyn ImportProgress>,
    ) -> Self {
        let runs = db.runs();
        let store: Arc<dyn RelationalStore> = db;

        Importer {
            fetcher: ResourceFetcher::new(source, store.clone()),
            schema: SchemaManager::new(store.clone()),
            upserts: UpsertEngine::new(store, settings.upsert_strategy),
            flattener: Flattener::new(settings.max_depth),
            runs,
            progress,
        }
    }

    /// Imports each class in turn. Never stops early: failures are
    /// recorded per class in the summary and the run log.
    pub async fn import(&self, classes: &[ResourceClass]) -> ImportSummary {
        let mut summary = ImportSummary::default();
        for &class in classes {
            summary.classes.push(self.import_class(class).await);
        }

        info!(
            classes = summary.classes.len(),
            failed = summary.failed().len(),
            rows = summary.total_rows(),
            "Import finished"
        );
        summary
    }

    /// Runs one class pass and records it in the run log.
    pub async fn import_class(&self, class: ResourceClass) -> ClassSummary {
        self.progress.class_started(class.name());
        info!(class = %class, "Import started");

        let run = match self.runs.start(class.name()).await {
            Ok(run) => Some(run),
            Err(e) => {
                warn!(class = %class, "Could not record sync run: {}", e);
                None
            }
        };

        let mut summary = ClassSummary::new(class);
        let result = self.run_class(class, &mut summary).await;
        self.progress.class_finished(class.name());

        let logged = match result {
            Ok(()) => {
                info!(
                    class = %class,
                    resources = summary.resources,
                    rows = summary.rows_written(),
                    skipped = summary.skipped,
                    "Import succeeded"
                );
                match &run {
                    Some(run) => self.runs.succeed(&run.id, summary.counts()).await,
                    None => Ok(()),
                }
            }
            Err(e) => {
                error!(class = %class, error = %e, "Import failed, class aborted");
                let message = e.to_string();
                let logged = match &run {
                    Some(run) => self.runs.fail(&run.id, summary.counts(), &message).await,
                    None => Ok(()),
                };
                summary.error = Some(message);
                logged
            }
        };
        if let Err(e) = logged {
            warn!(class = %class, "Could not finish sync run: {}", e);
        }

        summary
    }

    async fn run_class(&self, class: ResourceClass, summary: &mut ClassSummary) -> SyncResult<()> {
        let table = class.table_name();
        let mut batch = ImportBatch::new(Utc::now());

        let mut resources = self.fetcher.fetch(class).await?;
        while let Some(resource) = resources.try_next().await? {
            self.flattener.flatten(&table, resource.attrs(), &mut batch);
            summary.resources += 1;
            self.progress.resource_consumed();
        }

        for issue in batch.issues() {
            if issue.drops_data() {
                warn!(class = %class, "{}", issue);
            } else {
                info!(class = %class, "{}", issue);
            }
        }
        summary.skipped = batch.issues().len() as u64;

        for (table, records) in batch.into_tables() {
            let added = self.schema.ensure_table(&table, &records).await?;
            if !added.is_empty() {
                summary
                    .columns_added
                    .insert(table.clone(), added.into_iter().map(|c| c.name).collect());
            }

            let written = self.upserts.upsert(&table, records).await?;
            summary.rows.insert(table, written);
        }

        Ok(())
    }
}
