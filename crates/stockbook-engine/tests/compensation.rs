//! The default `commit` on a store without atomic batches.

mod common;

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use common::*;
use stockbook_core::{Entity, LedgerWrite, Money, Product, Transaction};
use stockbook_engine::{
    EngineError, LedgerEngine, LedgerStore, LedgerWatch, MemoryStore, StoreError, StoreResult,
};

/// Delegates to a [`MemoryStore`] one write at a time and fails chosen
/// `apply` calls. It keeps the trait's default `commit`.
#[derive(Debug, Default)]
struct FlakyStore {
    inner: MemoryStore,
    calls: AtomicUsize,
    failing: Mutex<HashSet<usize>>,
}

impl FlakyStore {
    /// Fails the given `apply` calls, counted from zero starting now.
    fn fail_calls(&self, calls: &[usize]) {
        self.calls.store(0, Ordering::SeqCst);
        *self.failing.lock().unwrap() = calls.iter().copied().collect();
    }
}

#[async_trait]
impl LedgerStore for FlakyStore {
    async fn product(&self, id: &str) -> StoreResult<Option<Product>> {
        self.inner.product(id).await
    }

    async fn products(&self) -> StoreResult<Vec<Product>> {
        self.inner.products().await
    }

    async fn entity(&self, id: &str) -> StoreResult<Option<Entity>> {
        self.inner.entity(id).await
    }

    async fn entities(&self) -> StoreResult<Vec<Entity>> {
        self.inner.entities().await
    }

    async fn transaction(&self, id: &str) -> StoreResult<Option<Transaction>> {
        self.inner.transaction(id).await
    }

    async fn transactions(&self) -> StoreResult<Vec<Transaction>> {
        self.inner.transactions().await
    }

    async fn apply(&self, write: &LedgerWrite) -> StoreResult<bool> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.lock().unwrap().contains(&call) {
            return Err(StoreError::Unavailable(format!("injected failure on {}", write.kind())));
        }
        self.inner.apply(write).await
    }

    async fn clear_transactions(&self) -> StoreResult<u64> {
        self.inner.clear_transactions().await
    }

    fn watch(&self) -> LedgerWatch {
        self.inner.watch()
    }
}

fn engine() -> LedgerEngine<FlakyStore> {
    LedgerEngine::new(FlakyStore::default()).with_clock(clock())
}

#[tokio::test]
async fn test_failed_write_is_compensated() {
    let engine = engine();
    let p = scenario_product(&engine).await;
    let buyer = customer(&engine, "Sara Haddad").await;

    // insert_transaction (0), adjust_stock (1), adjust_balance (2) fails.
    engine.store().fail_calls(&[2]);
    let err = engine
        .record_transaction(sale(&p, 2, 100).with_entity(&buyer.id))
        .await
        .unwrap_err();

    match err {
        EngineError::Store(StoreError::Compensated {
            step, kind, undone, ..
        }) => {
            assert_eq!(step, 2);
            assert_eq!(kind, "adjust_balance");
            assert_eq!(undone, 2);
        }
        other => panic!("expected a compensated failure, got {other:?}"),
    }

    assert_eq!(stock_of(&engine, &p).await, 5);
    assert_eq!(balance_of(&engine, &buyer).await, Money::zero());
    // Only the seed transaction is left.
    assert_eq!(engine.transactions().await.unwrap().len(), 1);
    assert!(engine.audit_stock().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_first_write_failure_needs_no_undo() {
    let engine = engine();
    let p = scenario_product(&engine).await;

    engine.store().fail_calls(&[0]);
    let err = engine.record_transaction(sale(&p, 1, 100)).await.unwrap_err();

    assert!(matches!(
        err,
        EngineError::Store(StoreError::Compensated {
            step: 0,
            undone: 0,
            ..
        })
    ));
    assert_eq!(stock_of(&engine, &p).await, 5);
}

#[tokio::test]
async fn test_failed_undo_is_reported() {
    let engine = engine();
    let p = scenario_product(&engine).await;
    let buyer = customer(&engine, "Omar Khalil").await;

    // adjust_balance (2) fails, then undoing adjust_stock (3) fails too.
    engine.store().fail_calls(&[2, 3]);
    let err = engine
        .record_transaction(sale(&p, 2, 100).with_entity(&buyer.id))
        .await
        .unwrap_err();

    match &err {
        EngineError::Store(store_err @ StoreError::CompensationFailed { undo_kind, .. }) => {
            assert_eq!(*undo_kind, "adjust_stock");
            assert!(!store_err.is_clean());
        }
        other => panic!("expected a failed compensation, got {other:?}"),
    }

    // Nothing was undone: the sale is still on the ledger and in stock.
    assert_eq!(stock_of(&engine, &p).await, 3);
    assert_eq!(engine.transactions().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_bulk_delete_reports_progress() {
    let engine = engine();
    let p = scenario_product(&engine).await;
    let first = engine.record_transaction(sale(&p, 1, 100)).await.unwrap();
    let second = engine.record_transaction(sale(&p, 1, 100)).await.unwrap();
    let third = engine.record_transaction(sale(&p, 1, 100)).await.unwrap();

    // Each reverting delete is adjust_stock + remove_transaction. The second
    // delete's adjust_stock is call 2.
    engine.store().fail_calls(&[2]);
    let ids = [first.id.clone(), second.id.clone(), third.id.clone()];
    let err = engine.delete_transactions(&ids, true).await.unwrap_err();

    match err {
        EngineError::PartialBatch {
            completed, total, ..
        } => {
            assert_eq!(completed, 1);
            assert_eq!(total, 3);
        }
        other => panic!("expected a partial batch, got {other:?}"),
    }

    // The first deletion stays; the rest are untouched.
    assert!(engine.transaction(&first.id).await.unwrap().is_none());
    assert!(engine.transaction(&second.id).await.unwrap().is_some());
    assert!(engine.transaction(&third.id).await.unwrap().is_some());
    assert_eq!(stock_of(&engine, &p).await, 3);
}
