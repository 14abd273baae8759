//! # Ledger Stores
//!
//! The persistence seam of the engine.
//!
//! ## Commit Strategies
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  WriteBatch [ w0, w1, w2 ]                                              │
//! │                                                                         │
//! │  Atomic stores (MemoryStore, SqliteStore) override `commit`:           │
//! │     all of w0..w2 land, or none do                                     │
//! │                                                                         │
//! │  Any other store gets the default `commit`:                            │
//! │     apply w0 ✓ ── apply w1 ✓ ── apply w2 ✗                              │
//! │                                   │                                     │
//! │                  apply inverse(w1), inverse(w0)                         │
//! │                                   │                                     │
//! │           Err(Compensated { step: 2, undone: 2, .. })                   │
//! │     or    Err(CompensationFailed { .. }) if an undo fails              │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Implementations
//! - [`MemoryStore`] - in-process collections behind one lock
//! - [`SqliteStore`] - `stockbook-db` with one SQL transaction per batch

use async_trait::async_trait;
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::error::{StoreError, StoreResult};
use stockbook_core::{Entity, LedgerWrite, Product, Transaction, WriteBatch};

pub mod live;
pub mod memory;
pub mod sqlite;

pub use live::{LedgerWatch, LiveFeed, Touched};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// Durable keyed collections of products, entities and transactions.
///
/// Reads return `None` for absent ids. Writes go through [`apply`] one at a
/// time or through [`commit`] as a batch.
///
/// [`apply`]: LedgerStore::apply
/// [`commit`]: LedgerStore::commit
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// A fresh, time-ordered record id.
    fn allocate_id(&self) -> String {
        Uuid::now_v7().to_string()
    }

    async fn product(&self, id: &str) -> StoreResult<Option<Product>>;

    async fn products(&self) -> StoreResult<Vec<Product>>;

    async fn entity(&self, id: &str) -> StoreResult<Option<Entity>>;

    async fn entities(&self) -> StoreResult<Vec<Entity>>;

    async fn transaction(&self, id: &str) -> StoreResult<Option<Transaction>>;

    /// The whole ledger, newest first.
    async fn transactions(&self) -> StoreResult<Vec<Transaction>>;

    /// Applies one write.
    ///
    /// Returns `false` when the write's target does not exist (adjusting a
    /// deleted product, removing an absent transaction). That is a no-op,
    /// not an error.
    async fn apply(&self, write: &LedgerWrite) -> StoreResult<bool>;

    /// Applies a batch, all or nothing.
    ///
    /// The default applies writes in order and compensates on failure; see
    /// [`commit_with_compensation`].
    async fn commit(&self, batch: WriteBatch) -> StoreResult<()> {
        commit_with_compensation(self, batch).await
    }

    /// Removes every transaction without touching stock or balances.
    async fn clear_transactions(&self) -> StoreResult<u64>;

    /// Subscribes to live collection snapshots.
    fn watch(&self) -> LedgerWatch;
}

/// Applies `batch` write by write, undoing applied writes if one fails.
///
/// Writes that were no-ops (`apply` returned `false`) changed nothing and
/// are not undone. Undo runs newest first.
pub async fn commit_with_compensation<S>(store: &S, batch: WriteBatch) -> StoreResult<()>
where
    S: LedgerStore + ?Sized,
{
    let mut applied: Vec<LedgerWrite> = Vec::with_capacity(batch.len());

    for (step, write) in batch.into_iter().enumerate() {
        match store.apply(&write).await {
            Ok(true) => applied.push(write),
            Ok(false) => debug!(step, write = %write, "Write target missing, skipped"),
            Err(err) => {
                let kind = write.kind();
                let reason = err.to_string();
                warn!(
                    step,
                    kind,
                    error = %reason,
                    to_undo = applied.len(),
                    "Batch write failed, compensating"
                );

                let undone = applied.len();
                for done in applied.iter().rev() {
                    let undo = done.inverse();
                    if let Err(undo_err) = store.apply(&undo).await {
                        error!(
                            step,
                            kind,
                            undo = %undo,
                            error = %undo_err,
                            "Compensation failed, store is inconsistent"
                        );
                        return Err(StoreError::CompensationFailed {
                            step,
                            kind,
                            reason,
                            undo_kind: undo.kind(),
                            undo_reason: undo_err.to_string(),
                        });
                    }
                }

                return Err(StoreError::Compensated {
                    step,
                    kind,
                    reason,
                    undone,
                });
            }
        }
    }

    Ok(())
}
