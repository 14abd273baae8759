//! In-process store.
//!
//! All three collections live behind one `RwLock`. A batch is applied to a
//! copy of the state and swapped in only if every write succeeded, so
//! commits are atomic without any compensation.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;

use super::live::{order_newest_first, LedgerWatch, LiveFeed, Touched};
use super::LedgerStore;
use crate::error::{StoreError, StoreResult};
use stockbook_core::{Entity, LedgerWrite, Product, Transaction, WriteBatch};

#[derive(Debug, Clone, Default)]
struct MemoryState {
    products: BTreeMap<String, Product>,
    entities: BTreeMap<String, Entity>,
    transactions: BTreeMap<String, Transaction>,
}

impl MemoryState {
    fn apply(&mut self, write: &LedgerWrite) -> StoreResult<bool> {
        match write {
            LedgerWrite::InsertProduct(p) => insert_new(&mut self.products, "product", p.id.clone(), p.clone()),
            LedgerWrite::UpdateProduct { before, after } => {
                let Some(current) = self.products.get_mut(&after.id) else {
                    return Ok(false);
                };
                // Stock is only written when the override changed it, so
                // deltas applied since `before` was read survive.
                let stock = if before.stock != after.stock {
                    after.stock
                } else {
                    current.stock
                };
                *current = Product {
                    stock,
                    created_at: current.created_at,
                    ..after.clone()
                };
                Ok(true)
            }
            LedgerWrite::RemoveProduct(p) => Ok(self.products.remove(&p.id).is_some()),
            LedgerWrite::InsertEntity(e) => insert_new(&mut self.entities, "entity", e.id.clone(), e.clone()),
            LedgerWrite::UpdateEntity { before, after } => {
                let Some(current) = self.entities.get_mut(&after.id) else {
                    return Ok(false);
                };
                let balance = if before.balance != after.balance {
                    after.balance
                } else {
                    current.balance
                };
                *current = Entity {
                    balance,
                    entity_type: current.entity_type,
                    created_at: current.created_at,
                    ..after.clone()
                };
                Ok(true)
            }
            LedgerWrite::RemoveEntity(e) => Ok(self.entities.remove(&e.id).is_some()),
            LedgerWrite::InsertTransaction(t) => {
                insert_new(&mut self.transactions, "transaction", t.id.clone(), t.clone())
            }
            LedgerWrite::RemoveTransaction(t) => Ok(self.transactions.remove(&t.id).is_some()),
            LedgerWrite::AdjustStock { product_id, delta } => {
                let Some(product) = self.products.get_mut(product_id) else {
                    return Ok(false);
                };
                product.stock = product
                    .stock
                    .checked_add(*delta)
                    .ok_or_else(|| StoreError::overflow("stock", product_id))?;
                Ok(true)
            }
            LedgerWrite::AdjustBalance { entity_id, delta } => {
                let Some(entity) = self.entities.get_mut(entity_id) else {
                    return Ok(false);
                };
                entity.balance = entity
                    .balance
                    .checked_add(*delta)
                    .ok_or_else(|| StoreError::overflow("balance", entity_id))?;
                Ok(true)
            }
        }
    }

    fn ledger(&self) -> Vec<Transaction> {
        let mut all: Vec<Transaction> = self.transactions.values().cloned().collect();
        order_newest_first(&mut all);
        all
    }
}

fn insert_new<T>(
    map: &mut BTreeMap<String, T>,
    kind: &'static str,
    id: String,
    value: T,
) -> StoreResult<bool> {
    if map.contains_key(&id) {
        return Err(StoreError::Duplicate { kind, id });
    }
    map.insert(id, value);
    Ok(true)
}

/// A [`LedgerStore`] kept entirely in memory.
///
/// ## Usage
/// ```rust
/// use stockbook_engine::{LedgerEngine, MemoryStore};
///
/// let engine = LedgerEngine::new(MemoryStore::new());
/// assert!(engine.watch().products().is_empty());
/// ```
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
    feed: LiveFeed,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, MemoryState>> {
        self.state
            .read()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, MemoryState>> {
        self.state
            .write()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))
    }

    fn publish(&self, state: &MemoryState, touched: Touched) {
        if touched.products {
            self.feed.publish_products(state.products.clone());
        }
        if touched.entities {
            self.feed.publish_entities(state.entities.clone());
        }
        if touched.transactions {
            self.feed.publish_transactions(state.ledger());
        }
    }
}

#[async_trait]
impl LedgerStore for MemoryStore {
    async fn product(&self, id: &str) -> StoreResult<Option<Product>> {
        Ok(self.read()?.products.get(id).cloned())
    }

    async fn products(&self) -> StoreResult<Vec<Product>> {
        Ok(self.read()?.products.values().cloned().collect())
    }

    async fn entity(&self, id: &str) -> StoreResult<Option<Entity>> {
        Ok(self.read()?.entities.get(id).cloned())
    }

    async fn entities(&self) -> StoreResult<Vec<Entity>> {
        Ok(self.read()?.entities.values().cloned().collect())
    }

    async fn transaction(&self, id: &str) -> StoreResult<Option<Transaction>> {
        Ok(self.read()?.transactions.get(id).cloned())
    }

    async fn transactions(&self) -> StoreResult<Vec<Transaction>> {
        Ok(self.read()?.ledger())
    }

    async fn apply(&self, write: &LedgerWrite) -> StoreResult<bool> {
        let mut state = self.write()?;
        let changed = state.apply(write)?;
        if changed {
            self.publish(&state, Touched::from_writes([write]));
        }
        Ok(changed)
    }

    async fn commit(&self, batch: WriteBatch) -> StoreResult<()> {
        let mut state = self.write()?;

        let mut next = state.clone();
        for write in &batch {
            next.apply(write)?;
        }
        *state = next;

        debug!(writes = batch.len(), "Memory batch committed");
        self.publish(&state, Touched::from_writes(&batch));
        Ok(())
    }

    async fn clear_transactions(&self) -> StoreResult<u64> {
        let mut state = self.write()?;
        let removed = state.transactions.len() as u64;
        state.transactions.clear();
        self.publish(&state, Touched {
            transactions: true,
            ..Touched::default()
        });
        Ok(removed)
    }

    fn watch(&self) -> LedgerWatch {
        self.feed.subscribe()
    }
}
