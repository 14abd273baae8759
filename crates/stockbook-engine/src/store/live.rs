//! # Live Collections
//!
//! Full-collection snapshots published after every committed change.
//!
//! ```text
//! store commit ──► LiveFeed::publish_*  (send_replace, never blocks)
//!                        │
//!                        ├──► watch<Arc<BTreeMap<id, Product>>>
//!                        ├──► watch<Arc<BTreeMap<id, Entity>>>
//!                        └──► watch<Arc<Vec<Transaction>>>   newest first
//!                                   │
//!                        LedgerWatch (one per subscriber)
//!                           borrow the latest, or await the next change
//! ```
//!
//! A subscriber that falls behind only ever sees the newest snapshot; there
//! is no backlog of intermediate states to drain.

use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::watch;

use stockbook_core::{Entity, LedgerWrite, Product, Transaction};

pub type ProductSnapshot = Arc<BTreeMap<String, Product>>;
pub type EntitySnapshot = Arc<BTreeMap<String, Entity>>;
pub type TransactionSnapshot = Arc<Vec<Transaction>>;

/// Sorts a ledger newest first: `date` descending, then `id` descending.
pub fn order_newest_first(transactions: &mut [Transaction]) {
    transactions.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| b.id.cmp(&a.id)));
}

/// Which collections a set of writes touched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Touched {
    pub products: bool,
    pub entities: bool,
    pub transactions: bool,
}

impl Touched {
    pub const ALL: Touched = Touched {
        products: true,
        entities: true,
        transactions: true,
    };

    pub fn from_writes<'a, I>(writes: I) -> Self
    where
        I: IntoIterator<Item = &'a LedgerWrite>,
    {
        writes.into_iter().fold(Touched::default(), |mut t, write| {
            match write {
                LedgerWrite::InsertProduct(_)
                | LedgerWrite::UpdateProduct { .. }
                | LedgerWrite::RemoveProduct(_)
                | LedgerWrite::AdjustStock { .. } => t.products = true,
                LedgerWrite::InsertEntity(_)
                | LedgerWrite::UpdateEntity { .. }
                | LedgerWrite::RemoveEntity(_)
                | LedgerWrite::AdjustBalance { .. } => t.entities = true,
                LedgerWrite::InsertTransaction(_) | LedgerWrite::RemoveTransaction(_) => {
                    t.transactions = true
                }
            }
            t
        })
    }
}

/// Publishing side, owned by a store.
#[derive(Debug)]
pub struct LiveFeed {
    products: watch::Sender<ProductSnapshot>,
    entities: watch::Sender<EntitySnapshot>,
    transactions: watch::Sender<TransactionSnapshot>,
}

impl Default for LiveFeed {
    fn default() -> Self {
        Self::new()
    }
}

impl LiveFeed {
    /// Creates a feed whose first snapshots are empty collections.
    pub fn new() -> Self {
        let (products, _) = watch::channel(ProductSnapshot::default());
        let (entities, _) = watch::channel(EntitySnapshot::default());
        let (transactions, _) = watch::channel(TransactionSnapshot::default());
        LiveFeed {
            products,
            entities,
            transactions,
        }
    }

    pub fn publish_products(&self, products: BTreeMap<String, Product>) {
        self.products.send_replace(Arc::new(products));
    }

    pub fn publish_entities(&self, entities: BTreeMap<String, Entity>) {
        self.entities.send_replace(Arc::new(entities));
    }

    /// Publishes the ledger. The input is re-sorted newest first.
    pub fn publish_transactions(&self, mut transactions: Vec<Transaction>) {
        order_newest_first(&mut transactions);
        self.transactions.send_replace(Arc::new(transactions));
    }

    pub fn subscribe(&self) -> LedgerWatch {
        LedgerWatch {
            products: self.products.subscribe(),
            entities: self.entities.subscribe(),
            transactions: self.transactions.subscribe(),
        }
    }
}

/// Subscriber side: one receiver per collection.
#[derive(Debug, Clone)]
pub struct LedgerWatch {
    pub products: watch::Receiver<ProductSnapshot>,
    pub entities: watch::Receiver<EntitySnapshot>,
    pub transactions: watch::Receiver<TransactionSnapshot>,
}

impl LedgerWatch {
    /// Latest products snapshot, keyed by id.
    pub fn products(&self) -> ProductSnapshot {
        self.products.borrow().clone()
    }

    pub fn entities(&self) -> EntitySnapshot {
        self.entities.borrow().clone()
    }

    /// Latest ledger, newest first.
    pub fn transactions(&self) -> TransactionSnapshot {
        self.transactions.borrow().clone()
    }

    /// Waits for the next products snapshot. `false` once the store is gone.
    pub async fn products_changed(&mut self) -> bool {
        self.products.changed().await.is_ok()
    }

    pub async fn entities_changed(&mut self) -> bool {
        self.entities.changed().await.is_ok()
    }

    pub async fn transactions_changed(&mut self) -> bool {
        self.transactions.changed().await.is_ok()
    }
}

pub(crate) fn by_id<T, F>(items: Vec<T>, id: F) -> BTreeMap<String, T>
where
    F: Fn(&T) -> &str,
{
    items
        .into_iter()
        .map(|item| (id(&item).to_string(), item))
        .collect()
}
