//! SQLite-backed store.
//!
//! Reads go straight to `stockbook-db`. A committed batch runs inside one
//! SQL transaction, after which the collections it touched are re-read and
//! published to subscribers. A failed re-read after a successful commit is
//! logged and leaves the previous snapshot in place; the write still stands.

use async_trait::async_trait;
use tracing::{debug, info, warn};

use super::live::{by_id, LedgerWatch, LiveFeed, Touched};
use super::LedgerStore;
use crate::error::StoreResult;
use stockbook_core::{Entity, LedgerWrite, Product, Transaction, WriteBatch};
use stockbook_db::{Database, DbConfig};

/// A [`LedgerStore`] persisted in SQLite.
#[derive(Debug)]
pub struct SqliteStore {
    db: Database,
    feed: LiveFeed,
}

impl SqliteStore {
    /// Connects (running migrations when configured) and publishes the
    /// initial snapshots.
    pub async fn open(config: DbConfig) -> StoreResult<Self> {
        let db = Database::new(config).await?;
        Self::new(db).await
    }

    /// Wraps an open database.
    pub async fn new(db: Database) -> StoreResult<Self> {
        let store = SqliteStore {
            db,
            feed: LiveFeed::new(),
        };
        store.refresh(Touched::ALL).await?;
        info!("SQLite store ready");
        Ok(store)
    }

    /// The underlying database, for queries the store does not cover.
    pub fn database(&self) -> &Database {
        &self.db
    }

    async fn refresh(&self, touched: Touched) -> StoreResult<()> {
        if touched.products {
            let products = self.db.products().list_all().await?;
            self.feed.publish_products(by_id(products, |p| p.id.as_str()));
        }
        if touched.entities {
            let entities = self.db.entities().list_all().await?;
            self.feed.publish_entities(by_id(entities, |e| e.id.as_str()));
        }
        if touched.transactions {
            let transactions = self.db.transactions().list_all().await?;
            self.feed.publish_transactions(transactions);
        }
        Ok(())
    }

    /// Publishes after a write that is already durable.
    async fn publish(&self, touched: Touched) {
        if let Err(e) = self.refresh(touched).await {
            warn!(error = %e, "Write committed but live snapshot refresh failed");
        }
    }
}

#[async_trait]
impl LedgerStore for SqliteStore {
    async fn product(&self, id: &str) -> StoreResult<Option<Product>> {
        Ok(self.db.products().get_by_id(id).await?)
    }

    async fn products(&self) -> StoreResult<Vec<Product>> {
        Ok(self.db.products().list_all().await?)
    }

    async fn entity(&self, id: &str) -> StoreResult<Option<Entity>> {
        Ok(self.db.entities().get_by_id(id).await?)
    }

    async fn entities(&self) -> StoreResult<Vec<Entity>> {
        Ok(self.db.entities().list_all().await?)
    }

    async fn transaction(&self, id: &str) -> StoreResult<Option<Transaction>> {
        Ok(self.db.transactions().get_by_id(id).await?)
    }

    async fn transactions(&self) -> StoreResult<Vec<Transaction>> {
        Ok(self.db.transactions().list_all().await?)
    }

    async fn apply(&self, write: &LedgerWrite) -> StoreResult<bool> {
        let changed = self.db.apply(write).await?;
        if changed {
            self.publish(Touched::from_writes([write])).await;
        }
        Ok(changed)
    }

    async fn commit(&self, batch: WriteBatch) -> StoreResult<()> {
        let applied = self.db.apply_batch(batch.writes()).await?;
        let skipped = applied.iter().filter(|changed| !**changed).count();
        debug!(writes = batch.len(), skipped, "SQLite batch committed");

        self.publish(Touched::from_writes(&batch)).await;
        Ok(())
    }

    async fn clear_transactions(&self) -> StoreResult<u64> {
        let removed = self.db.clear_transactions().await?;
        self.publish(Touched {
            transactions: true,
            ..Touched::default()
        })
        .await;
        Ok(removed)
    }

    fn watch(&self) -> LedgerWatch {
        self.feed.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use chrono::DateTime;
    use stockbook_core::{EntityType, Money};
    use stockbook_db::DbError;

    fn entity(id: &str) -> Entity {
        let now = DateTime::from_timestamp_millis(1_000).unwrap();
        Entity {
            id: id.to_string(),
            name: "Acme Textiles".to_string(),
            phone: None,
            email: None,
            address: None,
            entity_type: EntityType::Supplier,
            balance: Money::zero(),
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_failed_batch_rolls_back() {
        let store = SqliteStore::open(DbConfig::in_memory()).await.unwrap();
        store
            .apply(&LedgerWrite::InsertEntity(entity("s-1")))
            .await
            .unwrap();

        let batch = WriteBatch::from(vec![
            LedgerWrite::AdjustBalance {
                entity_id: "s-1".to_string(),
                delta: Money::from_units(-500),
            },
            LedgerWrite::InsertEntity(entity("s-1")),
        ]);
        let err = store.commit(batch).await.unwrap_err();
        assert!(matches!(err, StoreError::Db(DbError::UniqueViolation { .. })));

        let stored = store.entity("s-1").await.unwrap().unwrap();
        assert_eq!(stored.balance, Money::zero());
    }

    #[tokio::test]
    async fn test_commit_publishes_touched_collections() {
        let store = SqliteStore::open(DbConfig::in_memory()).await.unwrap();
        let mut watch = store.watch();

        store
            .commit(WriteBatch::from(vec![LedgerWrite::InsertEntity(entity(
                "s-1",
            ))]))
            .await
            .unwrap();

        assert!(watch.entities_changed().await);
        assert!(watch.entities().contains_key("s-1"));
        assert!(watch.products().is_empty());
    }

    #[tokio::test]
    async fn test_commit_stands_when_refresh_fails() {
        let store = SqliteStore::open(DbConfig::in_memory()).await.unwrap();
        store
            .apply(&LedgerWrite::InsertEntity(entity("s-1")))
            .await
            .unwrap();

        // A row no reader can decode makes every entity listing fail.
        sqlx::query(
            "INSERT INTO entities (id, name, type, balance, created_at, updated_at) \
             VALUES ('bad', 'Broken', 'customer', 0, ?1, ?1)",
        )
        .bind(i64::MAX)
        .execute(store.database().pool())
        .await
        .unwrap();

        store
            .commit(WriteBatch::from(vec![LedgerWrite::AdjustBalance {
                entity_id: "s-1".to_string(),
                delta: Money::from_units(75),
            }]))
            .await
            .unwrap();

        let stored = store.entity("s-1").await.unwrap().unwrap();
        assert_eq!(stored.balance, Money::from_units(75));
        // The last good snapshot is kept.
        assert_eq!(store.watch().entities()["s-1"].balance, Money::zero());
    }

    #[tokio::test]
    async fn test_balance_overflow_leaves_row_readable() {
        let store = SqliteStore::open(DbConfig::in_memory()).await.unwrap();
        store
            .apply(&LedgerWrite::InsertEntity(entity("s-1")))
            .await
            .unwrap();
        let half = Money::from_units(i64::MAX / 2 + 1);
        let adjust = || {
            WriteBatch::from(vec![LedgerWrite::AdjustBalance {
                entity_id: "s-1".to_string(),
                delta: half,
            }])
        };

        store.commit(adjust()).await.unwrap();
        let err = store.commit(adjust()).await.unwrap_err();
        assert!(err.is_overflow());

        assert_eq!(store.entity("s-1").await.unwrap().unwrap().balance, half);
        assert_eq!(store.entities().await.unwrap().len(), 1);
    }
}
