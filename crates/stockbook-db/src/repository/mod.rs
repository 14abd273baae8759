//! # Repository Module
//!
//! Per-collection database access for Stockbook.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Reads vs Writes                                      │
//! │                                                                         │
//! │  Reads go through a repository handle that owns a pool clone:          │
//! │                                                                         │
//! │       db.products().get_by_id("p-1")                                    │
//! │       db.transactions().list_all()                                      │
//! │                                                                         │
//! │  Writes are free functions generic over the executor, so the same SQL  │
//! │  runs on a pooled connection or inside an open transaction:            │
//! │                                                                         │
//! │       product::adjust_stock(&mut *tx, "p-1", -2)                        │
//! │                                                                         │
//! │  apply_write() maps one LedgerWrite onto those functions.              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`ProductRepository`](product::ProductRepository) - products
//! - [`EntityRepository`](entity::EntityRepository) - customers and suppliers
//! - [`TransactionRepository`](transaction::TransactionRepository) - the ledger

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;
use tracing::debug;

use crate::error::{DbError, DbResult};
use stockbook_core::LedgerWrite;

pub mod entity;
pub mod product;
pub mod transaction;

/// Converts a stored epoch-millisecond column back into a timestamp.
pub(crate) fn from_millis(
    table: &'static str,
    column: &'static str,
    ms: i64,
) -> DbResult<DateTime<Utc>> {
    DateTime::from_timestamp_millis(ms)
        .ok_or_else(|| DbError::invalid_data(table, column, format!("{ms} is out of range")))
}

/// Applies one write on an open connection.
///
/// ## Returns
/// * `Ok(true)` - The write changed a row
/// * `Ok(false)` - The target row does not exist; nothing changed
///
/// Inserts of an existing id fail with [`DbError::UniqueViolation`].
pub async fn apply_write(conn: &mut SqliteConnection, write: &LedgerWrite) -> DbResult<bool> {
    debug!(write = %write, "Applying write");

    match write {
        LedgerWrite::InsertProduct(p) => product::insert(&mut *conn, p).await.map(|_| true),
        LedgerWrite::UpdateProduct { before, after } => {
            let found = product::update_details(&mut *conn, after).await?;
            if found && before.stock != after.stock {
                product::set_stock(&mut *conn, &after.id, after.stock).await?;
            }
            Ok(found)
        }
        LedgerWrite::RemoveProduct(p) => product::delete(&mut *conn, &p.id).await,
        LedgerWrite::InsertEntity(e) => entity::insert(&mut *conn, e).await.map(|_| true),
        LedgerWrite::UpdateEntity { before, after } => {
            let found = entity::update_details(&mut *conn, after).await?;
            if found && before.balance != after.balance {
                entity::set_balance(&mut *conn, &after.id, after.balance).await?;
            }
            Ok(found)
        }
        LedgerWrite::RemoveEntity(e) => entity::delete(&mut *conn, &e.id).await,
        LedgerWrite::InsertTransaction(t) => {
            transaction::insert(&mut *conn, t).await.map(|_| true)
        }
        LedgerWrite::RemoveTransaction(t) => transaction::delete(&mut *conn, &t.id).await,
        LedgerWrite::AdjustStock { product_id, delta } => {
            product::adjust_stock(&mut *conn, product_id, *delta).await
        }
        LedgerWrite::AdjustBalance { entity_id, delta } => {
            entity::adjust_balance(&mut *conn, entity_id, *delta).await
        }
    }
}
