//! # Upsert Engine
//!
//! Writes one table's flat records as a single batch keyed by `id`.

use std::sync::Arc;

use tracing::debug;

use vend_core::FlatRecord;
use vend_db::{RelationalStore, UpsertRow, UpsertStrategy};

use crate::error::{SyncError, SyncResult};

/// Batched, idempotent writer for imported tables.
#[derive(Clone)]
pub struct UpsertEngine {
    store: Arc<dyn RelationalStore>,
    strategy: UpsertStrategy,
}

impl UpsertEngine {
    pub fn new(store: Arc<dyn RelationalStore>, strategy: UpsertStrategy) -> Self {
        UpsertEngine { store, strategy }
    }

    pub fn strategy(&self) -> UpsertStrategy {
        self.strategy
    }

    /// Inserts new ids and overwrites existing ones.
    ///
    /// Records without an `id` cannot be keyed and are left out. The
    /// table's columns must already cover every record.
    ///
    /// ## Returns
    /// Number of rows written.
    pub async fn upsert(&self, table: &str, records: Vec<FlatRecord>) -> SyncResult<u64> {
        let rows: Vec<UpsertRow> = records.into_iter().filter_map(UpsertRow::from_record).collect();
        if rows.is_empty() {
            return Ok(0);
        }

        let written = self
            .store
            .upsert(table, &rows, self.strategy)
            .await
            .map_err(|e| SyncError::Upsert {
                table: table.to_string(),
                reason: e.to_string(),
            })?;

        debug!(table = %table, rows = rows.len(), written, "Batch committed");
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::SchemaManager;
    use crate::testing::memory_db;
    use vend_core::Scalar;

    fn record(pairs: &[(&str, Scalar)]) -> FlatRecord {
        pairs.iter().cloned().collect()
    }

    async fn names(db: &vend_db::Database) -> Vec<(String, Option<String>)> {
        sqlx::query_as("SELECT id, name FROM outlets ORDER BY id")
            .fetch_all(db.pool())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_inserts_then_overwrites() {
        for strategy in [UpsertStrategy::Native, UpsertStrategy::CheckThenWrite] {
            let db = memory_db().await;
            let schema = SchemaManager::new(db.clone());
            let engine = UpsertEngine::new(db.clone(), strategy);

            let first = vec![
                record(&[("id", Scalar::text("1")), ("name", Scalar::text("Main"))]),
                record(&[("id", Scalar::text("2")), ("name", Scalar::text("Annex"))]),
            ];
            schema.ensure_table("outlets", &first).await.unwrap();
            assert_eq!(engine.upsert("outlets", first).await.unwrap(), 2);

            let second = vec![record(&[("id", Scalar::text("2")), ("name", Scalar::text("Warehouse"))])];
            engine.upsert("outlets", second.clone()).await.unwrap();
            engine.upsert("outlets", second).await.unwrap();

            assert_eq!(
                names(&db).await,
                vec![
                    ("1".to_string(), Some("Main".to_string())),
                    ("2".to_string(), Some("Warehouse".to_string())),
                ],
                "strategy {}",
                strategy
            );
        }
    }

    #[tokio::test]
    async fn test_records_without_id_are_left_out() {
        let db = memory_db().await;
        let engine = UpsertEngine::new(db.clone(), UpsertStrategy::Native);

        let written = engine
            .upsert("outlets", vec![record(&[("name", Scalar::text("nameless"))])])
            .await
            .unwrap();
        assert_eq!(written, 0);
    }

    #[tokio::test]
    async fn test_missing_column_is_an_upsert_error() {
        let db = memory_db().await;
        let schema = SchemaManager::new(db.clone());
        let engine = UpsertEngine::new(db.clone(), UpsertStrategy::Native);

        schema
            .ensure_table("taxes", &[record(&[("id", Scalar::text("1"))])])
            .await
            .unwrap();
        let err = engine
            .upsert("taxes", vec![record(&[("id", Scalar::text("1")), ("rate", Scalar::Float(0.15))])])
            .await
            .unwrap_err();

        assert!(matches!(err, SyncError::Upsert { ref table, .. } if table == "taxes"));
    }
}
