//! # Transaction Repository
//!
//! Database operations for the ledger.
//!
//! ## Ordering
//! Every list is newest first: `date DESC, id DESC`. Ids are time-ordered,
//! so two entries recorded in the same millisecond still come back in
//! recording order.
//!
//! There is no update: ledger entries are inserted and deleted, never
//! edited.

use sqlx::{SqliteExecutor, SqlitePool};
use tracing::{debug, info};

use super::from_millis;
use crate::error::DbResult;
use stockbook_core::{EntityType, Money, Transaction, TransactionType};

const TRANSACTION_COLUMNS: &str =
    "id, product_id, type, quantity, price, total, entity_id, entity_type, date, notes";

#[derive(Debug, sqlx::FromRow)]
struct TransactionRow {
    id: String,
    product_id: String,
    #[sqlx(rename = "type")]
    tx_type: TransactionType,
    quantity: i64,
    price: i64,
    total: i64,
    entity_id: Option<String>,
    entity_type: Option<EntityType>,
    date: i64,
    notes: Option<String>,
}

impl TryFrom<TransactionRow> for Transaction {
    type Error = crate::error::DbError;

    fn try_from(row: TransactionRow) -> DbResult<Self> {
        Ok(Transaction {
            date: from_millis("transactions", "date", row.date)?,
            id: row.id,
            product_id: row.product_id,
            tx_type: row.tx_type,
            quantity: row.quantity,
            price: Money::from_units(row.price),
            total: Money::from_units(row.total),
            entity_id: row.entity_id,
            entity_type: row.entity_type,
            notes: row.notes,
        })
    }
}

/// Repository for ledger reads.
#[derive(Debug, Clone)]
pub struct TransactionRepository {
    pool: SqlitePool,
}

impl TransactionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        TransactionRepository { pool }
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Transaction>> {
        let sql = format!("SELECT {TRANSACTION_COLUMNS} FROM transactions WHERE id = ?1");
        let row = sqlx::query_as::<_, TransactionRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Transaction::try_from).transpose()
    }

    /// The whole ledger, newest first.
    pub async fn list_all(&self) -> DbResult<Vec<Transaction>> {
        let sql = format!(
            "SELECT {TRANSACTION_COLUMNS} FROM transactions ORDER BY date DESC, id DESC"
        );
        let rows = sqlx::query_as::<_, TransactionRow>(&sql)
            .fetch_all(&self.pool)
            .await?;

        debug!(count = rows.len(), "Loaded transactions");
        rows.into_iter().map(Transaction::try_from).collect()
    }

    /// Entries for one product, newest first. Works for deleted products.
    pub async fn list_for_product(&self, product_id: &str) -> DbResult<Vec<Transaction>> {
        let sql = format!(
            "SELECT {TRANSACTION_COLUMNS} FROM transactions WHERE product_id = ?1 \
             ORDER BY date DESC, id DESC"
        );
        let rows = sqlx::query_as::<_, TransactionRow>(&sql)
            .bind(product_id)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Transaction::try_from).collect()
    }

    /// Entries for one counterparty, newest first.
    pub async fn list_for_entity(&self, entity_id: &str) -> DbResult<Vec<Transaction>> {
        let sql = format!(
            "SELECT {TRANSACTION_COLUMNS} FROM transactions WHERE entity_id = ?1 \
             ORDER BY date DESC, id DESC"
        );
        let rows = sqlx::query_as::<_, TransactionRow>(&sql)
            .bind(entity_id)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Transaction::try_from).collect()
    }

    /// Signed sum of a product's ledger (in = +quantity, out = −quantity).
    pub async fn stock_sum(&self, product_id: &str) -> DbResult<i64> {
        let sum: i64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(CASE type WHEN 'in' THEN quantity ELSE -quantity END), 0)
            FROM transactions
            WHERE product_id = ?1
            "#,
        )
        .bind(product_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(sum)
    }

    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM transactions")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

// =============================================================================
// Writes
// =============================================================================

pub async fn insert<'e, E>(executor: E, tx: &Transaction) -> DbResult<()>
where
    E: SqliteExecutor<'e>,
{
    debug!(
        id = %tx.id,
        product_id = %tx.product_id,
        tx_type = %tx.tx_type,
        quantity = tx.quantity,
        "Inserting transaction"
    );

    sqlx::query(
        r#"
        INSERT INTO transactions (
            id, product_id, type, quantity, price, total,
            entity_id, entity_type, date, notes
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
        "#,
    )
    .bind(&tx.id)
    .bind(&tx.product_id)
    .bind(tx.tx_type)
    .bind(tx.quantity)
    .bind(tx.price.units())
    .bind(tx.total.units())
    .bind(&tx.entity_id)
    .bind(tx.entity_type)
    .bind(tx.date.timestamp_millis())
    .bind(&tx.notes)
    .execute(executor)
    .await?;

    Ok(())
}

pub async fn delete<'e, E>(executor: E, id: &str) -> DbResult<bool>
where
    E: SqliteExecutor<'e>,
{
    debug!(id = %id, "Deleting transaction");

    let result = sqlx::query("DELETE FROM transactions WHERE id = ?1")
        .bind(id)
        .execute(executor)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Removes the whole ledger. Stock and balances are not touched.
pub async fn delete_all<'e, E>(executor: E) -> DbResult<u64>
where
    E: SqliteExecutor<'e>,
{
    let result = sqlx::query("DELETE FROM transactions")
        .execute(executor)
        .await?;

    info!(removed = result.rows_affected(), "Cleared transactions");
    Ok(result.rows_affected())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use chrono::DateTime;

    fn entry(id: &str, tx_type: TransactionType, qty: i64, ms: i64) -> Transaction {
        Transaction {
            id: id.to_string(),
            product_id: "p-1".to_string(),
            tx_type,
            quantity: qty,
            price: Money::from_units(10),
            total: Money::from_units(10 * qty),
            entity_id: None,
            entity_type: None,
            date: DateTime::from_timestamp_millis(ms).unwrap(),
            notes: Some("note".to_string()),
        }
    }

    #[tokio::test]
    async fn test_list_orders_newest_first_with_id_tie_break() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        insert(db.pool(), &entry("a", TransactionType::In, 5, 100))
            .await
            .unwrap();
        insert(db.pool(), &entry("c", TransactionType::Out, 1, 200))
            .await
            .unwrap();
        insert(db.pool(), &entry("b", TransactionType::Out, 2, 200))
            .await
            .unwrap();

        let ids: Vec<String> = db
            .transactions()
            .list_all()
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.id)
            .collect();
        assert_eq!(ids, vec!["c", "b", "a"]);
    }

    #[tokio::test]
    async fn test_stock_sum() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        assert_eq!(db.transactions().stock_sum("p-1").await.unwrap(), 0);

        insert(db.pool(), &entry("a", TransactionType::In, 5, 1))
            .await
            .unwrap();
        insert(db.pool(), &entry("b", TransactionType::Out, 2, 2))
            .await
            .unwrap();
        assert_eq!(db.transactions().stock_sum("p-1").await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_round_trip_and_delete_all() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let tx = entry("a", TransactionType::In, 5, 1_700_000_000_123);
        insert(db.pool(), &tx).await.unwrap();

        assert_eq!(db.transactions().get_by_id("a").await.unwrap(), Some(tx));
        assert_eq!(delete_all(db.pool()).await.unwrap(), 1);
        assert_eq!(db.transactions().count().await.unwrap(), 0);
        assert!(!delete(db.pool(), "a").await.unwrap());
    }
}
