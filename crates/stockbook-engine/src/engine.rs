//! # Ledger Engine
//!
//! Every operation follows the same three steps.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   intent (NewTransaction, ProductPatch, id, ...)                        │
//! │      │                                                                  │
//! │      ▼                                                                  │
//! │   1. READ     current product / entity / transaction from the store     │
//! │      │                                                                  │
//! │      ▼                                                                  │
//! │   2. PLAN     stockbook_core::ledger::plan_*  (pure, may reject)        │
//! │      │        ──► WriteBatch [ insert, adjust stock, adjust balance ]   │
//! │      ▼                                                                  │
//! │   3. COMMIT   store.commit(batch)   all writes or none                  │
//! │      │                                                                  │
//! │      ▼                                                                  │
//! │   store publishes new snapshots ──► LedgerWatch subscribers             │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Nothing is written when planning fails, so validation errors and
//! `InsufficientStock` never leave a trace.
//!
//! The stock check under [`StockPolicy::Reject`](stockbook_core::StockPolicy)
//! reads, compares, then writes. Two writers racing on one product can both
//! pass it. The engine assumes a single writer.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::error::{EngineError, EngineResult};
use crate::store::{LedgerStore, LedgerWatch};
use stockbook_core::ledger::{
    plan_create_entity, plan_create_product, plan_delete_entity, plan_delete_product,
    plan_delete_transaction, plan_record, plan_update_entity, plan_update_product,
};
use stockbook_core::reports::{stock_drift, StockDrift};
use stockbook_core::{
    truncate_to_millis, BalanceOverride, Entity, EntityPatch, LedgerPolicy, NewEntity,
    NewProduct, NewTransaction, Product, ProductPatch, StockOverride, Transaction,
};

// =============================================================================
// Outcomes
// =============================================================================

/// A created product and the seed transaction recording its opening stock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductCreated {
    pub product: Product,
    pub seed: Option<Transaction>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductUpdated {
    pub product: Product,
    /// Set when the update overwrote stock outside the ledger.
    pub stock_override: Option<StockOverride>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityUpdated {
    pub entity: Entity,
    /// Set when the update overwrote the balance outside the ledger.
    pub balance_override: Option<BalanceOverride>,
}

// =============================================================================
// Engine
// =============================================================================

/// Applies ledger rules on top of a [`LedgerStore`].
///
/// ## Usage
/// ```rust,no_run
/// use stockbook_core::{Money, NewProduct, NewTransaction, TransactionType};
/// use stockbook_engine::{LedgerEngine, MemoryStore};
///
/// # async fn demo() -> stockbook_engine::EngineResult<()> {
/// let engine = LedgerEngine::new(MemoryStore::new());
///
/// let created = engine
///     .create_product(NewProduct {
///         name: "Linen Shirt".into(),
///         cost: Money::from_units(40),
///         price: Money::from_units(75),
///         stock: 5,
///         ..Default::default()
///     })
///     .await?;
///
/// let sale = NewTransaction::new(&created.product.id, TransactionType::Out, 2, Money::from_units(75));
/// engine.record_transaction(sale).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct LedgerEngine<S> {
    store: S,
    clock: Arc<dyn Clock>,
    policy: LedgerPolicy,
}

impl<S: LedgerStore> LedgerEngine<S> {
    /// Wall-clock time, default policy.
    pub fn new(store: S) -> Self {
        LedgerEngine {
            store,
            clock: Arc::new(SystemClock),
            policy: LedgerPolicy::default(),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_policy(mut self, policy: LedgerPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn policy(&self) -> LedgerPolicy {
        self.policy
    }

    /// Subscribes to live snapshots of all three collections.
    pub fn watch(&self) -> LedgerWatch {
        self.store.watch()
    }

    // Stored timestamps have millisecond precision; truncating here keeps
    // returned records equal to what a later read gives back.
    fn now(&self) -> DateTime<Utc> {
        truncate_to_millis(self.clock.now())
    }

    async fn lookup_entity(&self, id: Option<&str>) -> EngineResult<Option<Entity>> {
        match id.map(str::trim).filter(|id| !id.is_empty()) {
            Some(id) => Ok(self.store.entity(id).await?),
            None => Ok(None),
        }
    }

    // =========================================================================
    // Transactions
    // =========================================================================

    /// Records a stock movement and applies its effects.
    ///
    /// ## Effects
    /// - `in` adds `quantity` to the product's stock, `out` subtracts it
    /// - with a known counterparty, `out` raises its balance by the total
    ///   and `in` lowers it (unless the balance policy is `disabled`)
    ///
    /// A missing product or entity only drops the matching effect; the
    /// transaction is still recorded with the ids it was given.
    pub async fn record_transaction(&self, input: NewTransaction) -> EngineResult<Transaction> {
        let product = self.store.product(input.product_id.trim()).await?;
        let entity = self.lookup_entity(input.entity_id.as_deref()).await?;

        let planned = plan_record(
            input,
            self.store.allocate_id(),
            self.now(),
            product.as_ref(),
            entity.as_ref(),
            self.policy,
        )?;

        let transaction = planned.transaction;
        debug!(id = %transaction.id, writes = planned.batch.len(), "Committing transaction");
        self.store.commit(planned.batch).await?;

        if product.is_none() {
            debug!(product_id = %transaction.product_id, "Recorded against a missing product");
        }
        info!(
            id = %transaction.id,
            product_id = %transaction.product_id,
            kind = %transaction.tx_type,
            quantity = transaction.quantity,
            total = %transaction.total,
            "Transaction recorded"
        );
        Ok(transaction)
    }

    /// Deletes one transaction. Returns `false` when the id does not exist.
    ///
    /// With `revert_stock`, the product gets the opposite stock delta if it
    /// still exists. The counterparty balance is reverted only under the
    /// `symmetric` balance policy.
    pub async fn delete_transaction(&self, id: &str, revert_stock: bool) -> EngineResult<bool> {
        let Some(transaction) = self.store.transaction(id).await? else {
            debug!(id, "Transaction not found, nothing to delete");
            return Ok(false);
        };

        let (product, entity) = if revert_stock {
            (
                self.store.product(&transaction.product_id).await?,
                self.lookup_entity(transaction.entity_id.as_deref()).await?,
            )
        } else {
            (None, None)
        };

        let batch = plan_delete_transaction(
            &transaction,
            revert_stock,
            product.as_ref(),
            entity.as_ref(),
            self.policy,
        );
        self.store.commit(batch).await?;

        info!(id, revert_stock, "Transaction deleted");
        Ok(true)
    }

    /// Deletes transactions one after another.
    ///
    /// Returns how many were removed; absent ids are skipped. The first
    /// failure stops the run with [`EngineError::PartialBatch`]. Deletions
    /// made before it stay.
    pub async fn delete_transactions<I>(&self, ids: &[I], revert_stock: bool) -> EngineResult<usize>
    where
        I: AsRef<str>,
    {
        let total = ids.len();
        let mut removed = 0;

        for (completed, id) in ids.iter().enumerate() {
            match self.delete_transaction(id.as_ref(), revert_stock).await {
                Ok(true) => removed += 1,
                Ok(false) => {}
                Err(err) => {
                    warn!(completed, total, error = %err, "Bulk delete stopped");
                    return Err(EngineError::PartialBatch {
                        completed,
                        total,
                        source: Box::new(err),
                    });
                }
            }
        }

        info!(removed, total, revert_stock, "Bulk delete complete");
        Ok(removed)
    }

    /// Removes the whole ledger. Stock and balances are left as they are.
    pub async fn clear_transactions(&self) -> EngineResult<u64> {
        let removed = self.store.clear_transactions().await?;
        warn!(removed, "Ledger cleared without reverting stock or balances");
        Ok(removed)
    }

    // =========================================================================
    // Products
    // =========================================================================

    /// Creates a product. A positive opening stock is recorded as a seed
    /// `in` transaction at cost, attributed to the product's supplier.
    pub async fn create_product(&self, input: NewProduct) -> EngineResult<ProductCreated> {
        let supplier = self.lookup_entity(input.supplier_id.as_deref()).await?;

        let planned = plan_create_product(
            input,
            self.store.allocate_id(),
            self.store.allocate_id(),
            self.now(),
            supplier.as_ref(),
            self.policy,
        )?;

        self.store.commit(planned.batch).await?;

        info!(
            id = %planned.product.id,
            name = %planned.product.name,
            stock = planned.product.stock,
            seeded = planned.seed.is_some(),
            "Product created"
        );
        Ok(ProductCreated {
            product: planned.product,
            seed: planned.seed,
        })
    }

    /// Applies a partial update.
    ///
    /// ## Errors
    /// [`EngineError::NotFound`] when the product does not exist.
    pub async fn update_product(&self, id: &str, patch: ProductPatch) -> EngineResult<ProductUpdated> {
        let current = self
            .store
            .product(id)
            .await?
            .ok_or_else(|| EngineError::not_found("product", id))?;

        let planned = plan_update_product(&current, patch, self.now(), self.policy)?;
        self.store.commit(planned.batch).await?;

        if let Some(change) = planned.stock_override {
            warn!(
                id,
                previous = change.previous,
                new = change.new,
                "Manual stock override, ledger no longer sums to stock"
            );
        }
        info!(id, "Product updated");

        Ok(ProductUpdated {
            product: planned.product,
            stock_override: planned.stock_override,
        })
    }

    /// Removes a product. Its transactions remain and resolve as deleted.
    pub async fn delete_product(&self, id: &str) -> EngineResult<bool> {
        let Some(current) = self.store.product(id).await? else {
            debug!(id, "Product not found, nothing to delete");
            return Ok(false);
        };

        self.store.commit(plan_delete_product(&current)).await?;
        info!(id, "Product deleted");
        Ok(true)
    }

    // =========================================================================
    // Entities
    // =========================================================================

    pub async fn create_entity(&self, input: NewEntity) -> EngineResult<Entity> {
        let planned = plan_create_entity(input, self.store.allocate_id(), self.now())?;
        self.store.commit(planned.batch).await?;

        info!(
            id = %planned.entity.id,
            kind = %planned.entity.entity_type,
            "Entity created"
        );
        Ok(planned.entity)
    }

    /// Applies a partial update. The entity type cannot change.
    pub async fn update_entity(&self, id: &str, patch: EntityPatch) -> EngineResult<EntityUpdated> {
        let current = self
            .store
            .entity(id)
            .await?
            .ok_or_else(|| EngineError::not_found("entity", id))?;

        let planned = plan_update_entity(&current, patch, self.now())?;
        self.store.commit(planned.batch).await?;

        if let Some(change) = planned.balance_override {
            warn!(
                id,
                previous = %change.previous,
                new = %change.new,
                "Manual balance override"
            );
        }
        info!(id, "Entity updated");

        Ok(EntityUpdated {
            entity: planned.entity,
            balance_override: planned.balance_override,
        })
    }

    /// Removes an entity. Transactions naming it are kept.
    pub async fn delete_entity(&self, id: &str) -> EngineResult<bool> {
        let Some(current) = self.store.entity(id).await? else {
            debug!(id, "Entity not found, nothing to delete");
            return Ok(false);
        };

        self.store.commit(plan_delete_entity(&current)).await?;
        info!(id, "Entity deleted");
        Ok(true)
    }

    // =========================================================================
    // Reads
    // =========================================================================

    pub async fn product(&self, id: &str) -> EngineResult<Option<Product>> {
        Ok(self.store.product(id).await?)
    }

    pub async fn products(&self) -> EngineResult<Vec<Product>> {
        Ok(self.store.products().await?)
    }

    pub async fn entity(&self, id: &str) -> EngineResult<Option<Entity>> {
        Ok(self.store.entity(id).await?)
    }

    pub async fn entities(&self) -> EngineResult<Vec<Entity>> {
        Ok(self.store.entities().await?)
    }

    pub async fn transaction(&self, id: &str) -> EngineResult<Option<Transaction>> {
        Ok(self.store.transaction(id).await?)
    }

    /// The ledger, newest first.
    pub async fn transactions(&self) -> EngineResult<Vec<Transaction>> {
        Ok(self.store.transactions().await?)
    }

    /// Products whose stock no longer equals the sum of their ledger.
    pub async fn audit_stock(&self) -> EngineResult<Vec<StockDrift>> {
        let products: BTreeMap<String, Product> = self
            .store
            .products()
            .await?
            .into_iter()
            .map(|p| (p.id.clone(), p))
            .collect();
        let transactions = self.store.transactions().await?;

        let drift = stock_drift(&products, &transactions);
        if !drift.is_empty() {
            warn!(products = drift.len(), "Stock drift detected");
        }
        Ok(drift)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
