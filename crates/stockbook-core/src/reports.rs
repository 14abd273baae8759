//! # Reports
//!
//! Read-side views computed from collection snapshots.
//!
//! Every function here takes the same `BTreeMap` / slice shapes the live
//! feed publishes, so a dashboard can recompute on each snapshot without
//! touching the store.
//!
//! Dangling references are normal: a transaction may name a product or an
//! entity that was deleted later. Those resolve to [`Resolved::Deleted`]
//! instead of failing.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::money::Money;
use crate::types::{Entity, Product, Transaction, TransactionType};

// =============================================================================
// Stock
// =============================================================================

/// Products at or below their reorder threshold, lowest stock first.
pub fn low_stock<'a, I>(products: I) -> Vec<&'a Product>
where
    I: IntoIterator<Item = &'a Product>,
{
    let mut low: Vec<&Product> = products.into_iter().filter(|p| p.is_low_stock()).collect();
    low.sort_by(|a, b| a.stock.cmp(&b.stock).then_with(|| a.name.cmp(&b.name)));
    low
}

/// Σ stock × cost over products with positive stock, saturating at
/// `i64::MAX`.
pub fn inventory_value<'a, I>(products: I) -> Money
where
    I: IntoIterator<Item = &'a Product>,
{
    products.into_iter().map(Product::stock_value).sum()
}

/// A product whose cached stock disagrees with its ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StockDrift {
    pub product_id: String,
    pub cached: i64,
    pub ledger: i64,
}

impl StockDrift {
    pub fn difference(&self) -> i64 {
        self.cached.saturating_sub(self.ledger)
    }
}

/// Signed sum of every transaction per product id.
pub fn ledger_stock(transactions: &[Transaction]) -> BTreeMap<&str, i64> {
    let mut sums: BTreeMap<&str, i64> = BTreeMap::new();
    for tx in transactions {
        *sums.entry(tx.product_id.as_str()).or_default() += tx.stock_delta();
    }
    sums
}

/// Products whose `stock` differs from the signed sum of their
/// transactions.
///
/// Drift appears after a manual stock override, after deleting a
/// transaction without reverting it, or after clearing the ledger.
pub fn stock_drift(
    products: &BTreeMap<String, Product>,
    transactions: &[Transaction],
) -> Vec<StockDrift> {
    let sums = ledger_stock(transactions);
    products
        .values()
        .filter_map(|p| {
            let ledger = sums.get(p.id.as_str()).copied().unwrap_or(0);
            (ledger != p.stock).then(|| StockDrift {
                product_id: p.id.clone(),
                cached: p.stock,
                ledger,
            })
        })
        .collect()
}

// =============================================================================
// Reference Resolution
// =============================================================================

/// A reference from a transaction to a product or entity.
#[derive(Debug, PartialEq, Eq)]
pub enum Resolved<'a, T> {
    Present(&'a T),
    /// The referenced id no longer exists.
    Deleted(&'a str),
}

impl<T> Clone for Resolved<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Resolved<'_, T> {}

impl<'a, T> Resolved<'a, T> {
    pub fn present(&self) -> Option<&'a T> {
        match *self {
            Resolved::Present(value) => Some(value),
            Resolved::Deleted(_) => None,
        }
    }

    pub fn is_deleted(&self) -> bool {
        matches!(self, Resolved::Deleted(_))
    }
}

pub fn resolve<'a, T>(collection: &'a BTreeMap<String, T>, id: &'a str) -> Resolved<'a, T> {
    match collection.get(id) {
        Some(value) => Resolved::Present(value),
        None => Resolved::Deleted(id),
    }
}

/// A transaction with its references resolved for display.
#[derive(Debug, Clone, Copy)]
pub struct TransactionView<'a> {
    pub transaction: &'a Transaction,
    pub product: Resolved<'a, Product>,
    /// `None` when the transaction has no counterparty.
    pub entity: Option<Resolved<'a, Entity>>,
}

impl TransactionView<'_> {
    pub fn product_name(&self) -> Option<&str> {
        self.product.present().map(|p| p.name.as_str())
    }

    pub fn entity_name(&self) -> Option<&str> {
        self.entity
            .and_then(|e| e.present())
            .map(|e| e.name.as_str())
    }
}

pub fn describe_transaction<'a>(
    transaction: &'a Transaction,
    products: &'a BTreeMap<String, Product>,
    entities: &'a BTreeMap<String, Entity>,
) -> TransactionView<'a> {
    TransactionView {
        transaction,
        product: resolve(products, &transaction.product_id),
        entity: transaction
            .entity_id
            .as_deref()
            .map(|id| resolve(entities, id)),
    }
}

// =============================================================================
// Summaries
// =============================================================================

/// Totals over a set of transactions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerSummary {
    pub count: usize,
    pub quantity_in: i64,
    pub quantity_out: i64,
    /// Purchases.
    pub amount_in: Money,
    /// Sales.
    pub amount_out: Money,
}

impl LedgerSummary {
    /// Sales minus purchases.
    pub fn net(&self) -> Money {
        self.amount_out.saturating_sub(self.amount_in)
    }
}

pub fn ledger_summary<'a, I>(transactions: I) -> LedgerSummary
where
    I: IntoIterator<Item = &'a Transaction>,
{
    transactions
        .into_iter()
        .fold(LedgerSummary::default(), |mut acc, tx| {
            acc.count += 1;
            match tx.tx_type {
                TransactionType::In => {
                    acc.quantity_in = acc.quantity_in.saturating_add(tx.quantity);
                    acc.amount_in = acc.amount_in.saturating_add(tx.total);
                }
                TransactionType::Out => {
                    acc.quantity_out = acc.quantity_out.saturating_add(tx.quantity);
                    acc.amount_out = acc.amount_out.saturating_add(tx.total);
                }
            }
            acc
        })
}

/// Transactions dated within `[from, to)`.
pub fn transactions_between(
    transactions: &[Transaction],
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> Vec<&Transaction> {
    transactions
        .iter()
        .filter(|tx| tx.date >= from && tx.date < to)
        .collect()
}

/// One counterparty's dealings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityStatement<'a> {
    pub entity_id: &'a str,
    /// Newest first.
    pub transactions: Vec<&'a Transaction>,
    pub summary: LedgerSummary,
}

pub fn entity_statement<'a>(
    entity_id: &'a str,
    transactions: &'a [Transaction],
) -> EntityStatement<'a> {
    let mut mine: Vec<&Transaction> = transactions
        .iter()
        .filter(|tx| tx.entity_id.as_deref() == Some(entity_id))
        .collect();
    mine.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| b.id.cmp(&a.id)));

    let summary = ledger_summary(mine.iter().copied());
    EntityStatement {
        entity_id,
        transactions: mine,
        summary,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
