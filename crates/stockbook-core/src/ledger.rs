//! # Ledger Rules
//!
//! Effect math and write planning for every engine operation.
//!
//! ## Plan, Then Commit
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  current state (read by the engine)                                     │
//! │        │                                                                │
//! │        ▼                                                                │
//! │  plan_*()  ── validate input, apply policies, compute deltas            │
//! │        │                                                                │
//! │        ▼                                                                │
//! │  WriteBatch [ InsertTransaction, AdjustStock, AdjustBalance ]           │
//! │        │                                                                │
//! │        ▼                                                                │
//! │  LedgerStore::commit  ── atomic, or forward compensation via inverse()  │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Planning is pure. Nothing here knows about stores, clocks or id
//! generation: the engine passes in the current records, the new ids and
//! `now`.
//!
//! ## Effect Table
//! ```text
//! ┌──────┬─────────────────┬──────────────────┐
//! │ type │ stock           │ entity balance   │
//! ├──────┼─────────────────┼──────────────────┤
//! │ in   │ + quantity      │ − total          │
//! │ out  │ − quantity      │ + total          │
//! └──────┴─────────────────┴──────────────────┘
//! ```
//! Reverting a transaction applies the negation of both columns.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::types::{
    BalanceOverride, Entity, EntityPatch, NewEntity, NewProduct, NewTransaction, Product,
    ProductPatch, StockOverride, Transaction, TransactionType,
};
use crate::validation::{
    normalize_optional, validate_amount, validate_count, validate_email, validate_id,
    validate_name, validate_quantity, validate_text,
};

// =============================================================================
// Policies
// =============================================================================

/// What happens when an `out` movement exceeds the stock on hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockPolicy {
    /// Stock goes negative. A back-order is a modeled state.
    #[default]
    AllowNegative,
    /// Fail with `InsufficientStock` before any write.
    Reject,
}

/// How transactions move counterparty balances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BalancePolicy {
    /// Recording applies the balance delta, reverting undoes it.
    #[default]
    Symmetric,
    /// Recording applies the balance delta, reverting leaves the balance.
    /// Matches books kept before reversals touched balances.
    RecordOnly,
    /// Balances are only ever set by hand.
    Disabled,
}

impl BalancePolicy {
    #[inline]
    pub const fn applies_on_record(&self) -> bool {
        !matches!(self, BalancePolicy::Disabled)
    }

    #[inline]
    pub const fn applies_on_revert(&self) -> bool {
        matches!(self, BalancePolicy::Symmetric)
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            BalancePolicy::Symmetric => "symmetric",
            BalancePolicy::RecordOnly => "record_only",
            BalancePolicy::Disabled => "disabled",
        }
    }
}

impl StockPolicy {
    pub const fn as_str(&self) -> &'static str {
        match self {
            StockPolicy::AllowNegative => "allow_negative",
            StockPolicy::Reject => "reject",
        }
    }
}

impl fmt::Display for StockPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for BalancePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StockPolicy {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "allow_negative" => Ok(StockPolicy::AllowNegative),
            "reject" => Ok(StockPolicy::Reject),
            _ => Err(ValidationError::NotAllowed {
                field: "stock policy".to_string(),
                allowed: vec!["allow_negative".to_string(), "reject".to_string()],
            }),
        }
    }
}

impl FromStr for BalancePolicy {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "symmetric" => Ok(BalancePolicy::Symmetric),
            "record_only" => Ok(BalancePolicy::RecordOnly),
            "disabled" => Ok(BalancePolicy::Disabled),
            _ => Err(ValidationError::NotAllowed {
                field: "balance policy".to_string(),
                allowed: vec![
                    "symmetric".to_string(),
                    "record_only".to_string(),
                    "disabled".to_string(),
                ],
            }),
        }
    }
}

/// Both policies, as carried by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerPolicy {
    pub stock: StockPolicy,
    pub balance: BalancePolicy,
}

// =============================================================================
// Effect Math
// =============================================================================

/// Signed stock change of a movement.
#[inline]
pub const fn stock_delta(tx_type: TransactionType, quantity: i64) -> i64 {
    tx_type.stock_sign() * quantity
}

/// Signed balance change of a movement: a sale puts the customer in debt,
/// a purchase puts the business in debt to the supplier.
#[inline]
pub fn balance_delta(tx_type: TransactionType, total: Money) -> Money {
    match tx_type {
        TransactionType::Out => total,
        TransactionType::In => -total,
    }
}

// =============================================================================
// Writes
// =============================================================================

/// One store mutation.
///
/// Stock and balance changes are deltas so the store applies them against
/// its current value. Updates carry the full before and after records so
/// that every write has an exact inverse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerWrite {
    InsertProduct(Product),
    /// Stock is written only when `before.stock != after.stock`.
    UpdateProduct { before: Product, after: Product },
    RemoveProduct(Product),
    InsertEntity(Entity),
    /// Balance is written only when `before.balance != after.balance`.
    UpdateEntity { before: Entity, after: Entity },
    RemoveEntity(Entity),
    InsertTransaction(Transaction),
    RemoveTransaction(Transaction),
    /// No-op when the product no longer exists.
    AdjustStock { product_id: String, delta: i64 },
    /// No-op when the entity no longer exists.
    AdjustBalance { entity_id: String, delta: Money },
}

impl LedgerWrite {
    /// The write that undoes this one.
    pub fn inverse(&self) -> LedgerWrite {
        match self {
            LedgerWrite::InsertProduct(p) => LedgerWrite::RemoveProduct(p.clone()),
            LedgerWrite::UpdateProduct { before, after } => LedgerWrite::UpdateProduct {
                before: after.clone(),
                after: before.clone(),
            },
            LedgerWrite::RemoveProduct(p) => LedgerWrite::InsertProduct(p.clone()),
            LedgerWrite::InsertEntity(e) => LedgerWrite::RemoveEntity(e.clone()),
            LedgerWrite::UpdateEntity { before, after } => LedgerWrite::UpdateEntity {
                before: after.clone(),
                after: before.clone(),
            },
            LedgerWrite::RemoveEntity(e) => LedgerWrite::InsertEntity(e.clone()),
            LedgerWrite::InsertTransaction(t) => LedgerWrite::RemoveTransaction(t.clone()),
            LedgerWrite::RemoveTransaction(t) => LedgerWrite::InsertTransaction(t.clone()),
            LedgerWrite::AdjustStock { product_id, delta } => LedgerWrite::AdjustStock {
                product_id: product_id.clone(),
                delta: -delta,
            },
            LedgerWrite::AdjustBalance { entity_id, delta } => LedgerWrite::AdjustBalance {
                entity_id: entity_id.clone(),
                delta: -*delta,
            },
        }
    }

    /// Short label for logs and error messages.
    pub const fn kind(&self) -> &'static str {
        match self {
            LedgerWrite::InsertProduct(_) => "insert_product",
            LedgerWrite::UpdateProduct { .. } => "update_product",
            LedgerWrite::RemoveProduct(_) => "remove_product",
            LedgerWrite::InsertEntity(_) => "insert_entity",
            LedgerWrite::UpdateEntity { .. } => "update_entity",
            LedgerWrite::RemoveEntity(_) => "remove_entity",
            LedgerWrite::InsertTransaction(_) => "insert_transaction",
            LedgerWrite::RemoveTransaction(_) => "remove_transaction",
            LedgerWrite::AdjustStock { .. } => "adjust_stock",
            LedgerWrite::AdjustBalance { .. } => "adjust_balance",
        }
    }

    /// Id of the record this write touches.
    pub fn target_id(&self) -> &str {
        match self {
            LedgerWrite::InsertProduct(p) | LedgerWrite::RemoveProduct(p) => &p.id,
            LedgerWrite::UpdateProduct { after, .. } => &after.id,
            LedgerWrite::InsertEntity(e) | LedgerWrite::RemoveEntity(e) => &e.id,
            LedgerWrite::UpdateEntity { after, .. } => &after.id,
            LedgerWrite::InsertTransaction(t) | LedgerWrite::RemoveTransaction(t) => &t.id,
            LedgerWrite::AdjustStock { product_id, .. } => product_id,
            LedgerWrite::AdjustBalance { entity_id, .. } => entity_id,
        }
    }
}

impl fmt::Display for LedgerWrite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.kind(), self.target_id())
    }
}

/// The ordered writes of one engine operation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteBatch {
    writes: Vec<LedgerWrite>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, write: LedgerWrite) {
        self.writes.push(write);
    }

    pub fn writes(&self) -> &[LedgerWrite] {
        &self.writes
    }

    pub fn len(&self) -> usize {
        self.writes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, LedgerWrite> {
        self.writes.iter()
    }
}

impl From<Vec<LedgerWrite>> for WriteBatch {
    fn from(writes: Vec<LedgerWrite>) -> Self {
        WriteBatch { writes }
    }
}

impl IntoIterator for WriteBatch {
    type Item = LedgerWrite;
    type IntoIter = std::vec::IntoIter<LedgerWrite>;

    fn into_iter(self) -> Self::IntoIter {
        self.writes.into_iter()
    }
}

impl<'a> IntoIterator for &'a WriteBatch {
    type Item = &'a LedgerWrite;
    type IntoIter = std::slice::Iter<'a, LedgerWrite>;

    fn into_iter(self) -> Self::IntoIter {
        self.writes.iter()
    }
}

// =============================================================================
// Plans
// =============================================================================

/// A planned transaction and the batch that records it.
#[derive(Debug, Clone)]
pub struct PlannedTransaction {
    pub transaction: Transaction,
    pub batch: WriteBatch,
}

/// A planned product, its optional seed transaction, and the batch.
#[derive(Debug, Clone)]
pub struct PlannedProduct {
    pub product: Product,
    pub seed: Option<Transaction>,
    pub batch: WriteBatch,
}

#[derive(Debug, Clone)]
pub struct PlannedProductUpdate {
    pub product: Product,
    pub stock_override: Option<StockOverride>,
    pub batch: WriteBatch,
}

#[derive(Debug, Clone)]
pub struct PlannedEntity {
    pub entity: Entity,
    pub batch: WriteBatch,
}

#[derive(Debug, Clone)]
pub struct PlannedEntityUpdate {
    pub entity: Entity,
    pub balance_override: Option<BalanceOverride>,
    pub batch: WriteBatch,
}

fn checked_total(quantity: i64, price: Money) -> CoreResult<Money> {
    price
        .checked_mul_quantity(quantity)
        .ok_or(CoreError::TotalOverflow {
            quantity,
            price: price.units(),
        })
}

fn normalize_text(field: &str, value: Option<String>) -> CoreResult<Option<String>> {
    let value = normalize_optional(value);
    if let Some(text) = &value {
        validate_text(field, text)?;
    }
    Ok(value)
}

fn normalize_email(value: Option<String>) -> CoreResult<Option<String>> {
    let value = normalize_optional(value);
    if let Some(email) = &value {
        validate_email(email)?;
    }
    Ok(value)
}

/// Appends the stock and balance effects of `transaction` to `batch`.
///
/// `sign` is +1 to apply, -1 to revert. Missing targets contribute nothing.
fn push_effects(
    batch: &mut WriteBatch,
    transaction: &Transaction,
    sign: i64,
    product: Option<&Product>,
    entity: Option<&Entity>,
    apply_balance: bool,
) {
    if let Some(product) = product {
        batch.push(LedgerWrite::AdjustStock {
            product_id: product.id.clone(),
            delta: sign * stock_delta(transaction.tx_type, transaction.quantity),
        });
    }

    if !apply_balance {
        return;
    }

    if let Some(entity) = entity {
        let delta = balance_delta(transaction.tx_type, transaction.total);
        if !delta.is_zero() {
            batch.push(LedgerWrite::AdjustBalance {
                entity_id: entity.id.clone(),
                delta: if sign < 0 { -delta } else { delta },
            });
        }
    }
}

/// Plans recording a stock movement.
///
/// `product` and `entity` are the current records for the input's
/// references, `None` when they do not exist. A missing product means no
/// stock effect and a missing entity means no balance effect; neither is an
/// error. The entity id is kept either way.
///
/// ## Errors
/// - `Validation` for a blank product id, a non-positive or oversized
///   quantity, or a negative price
/// - `TotalOverflow` when `quantity × price` does not fit
/// - `InsufficientStock` under [`StockPolicy::Reject`] when an `out`
///   exceeds the stock on hand
pub fn plan_record(
    input: NewTransaction,
    id: String,
    now: DateTime<Utc>,
    product: Option<&Product>,
    entity: Option<&Entity>,
    policy: LedgerPolicy,
) -> CoreResult<PlannedTransaction> {
    validate_id("product", &input.product_id)?;
    validate_quantity(input.quantity)?;
    validate_amount("price", input.price)?;
    let total = checked_total(input.quantity, input.price)?;
    let notes = normalize_text("notes", input.notes)?;
    let product_id = input.product_id.trim().to_string();
    let entity_id = normalize_optional(input.entity_id);

    // Only a product matching the supplied id counts as present.
    let product = product.filter(|p| p.id == product_id);

    if let (StockPolicy::Reject, TransactionType::Out, Some(product)) =
        (policy.stock, input.tx_type, product)
    {
        if product.stock < input.quantity {
            return Err(CoreError::InsufficientStock {
                product_id: product.id.clone(),
                available: product.stock,
                requested: input.quantity,
            });
        }
    }

    // Only an entity matching the supplied id counts as present.
    let entity = entity.filter(|e| entity_id.as_deref() == Some(e.id.as_str()));

    let transaction = Transaction {
        id,
        product_id,
        tx_type: input.tx_type,
        quantity: input.quantity,
        price: input.price,
        total,
        entity_id,
        entity_type: entity.map(|e| e.entity_type),
        date: now,
        notes,
    };

    let mut batch = WriteBatch::new();
    batch.push(LedgerWrite::InsertTransaction(transaction.clone()));
    push_effects(
        &mut batch,
        &transaction,
        1,
        product,
        entity,
        policy.balance.applies_on_record(),
    );

    Ok(PlannedTransaction { transaction, batch })
}

/// Plans deleting a transaction.
///
/// With `revert`, the stock effect is undone on the product if it still
/// exists, and the balance effect is undone on the entity only under
/// [`BalancePolicy::Symmetric`]. The removal is always the last write.
pub fn plan_delete_transaction(
    transaction: &Transaction,
    revert: bool,
    product: Option<&Product>,
    entity: Option<&Entity>,
    policy: LedgerPolicy,
) -> WriteBatch {
    let mut batch = WriteBatch::new();

    if revert {
        let entity = entity.filter(|e| transaction.entity_id.as_deref() == Some(e.id.as_str()));
        push_effects(
            &mut batch,
            transaction,
            -1,
            product.filter(|p| p.id == transaction.product_id),
            entity,
            policy.balance.applies_on_revert(),
        );
    }

    batch.push(LedgerWrite::RemoveTransaction(transaction.clone()));
    batch
}

/// Plans creating a product.
///
/// When the initial stock is positive, a seed `in` transaction priced at
/// `cost` and attributed to the product's supplier records where that
/// stock came from. The product is inserted with its initial stock already
/// set, so the seed carries no stock write of its own. It does carry the
/// supplier balance effect when the policy applies one on record.
pub fn plan_create_product(
    input: NewProduct,
    product_id: String,
    seed_id: String,
    now: DateTime<Utc>,
    supplier: Option<&Entity>,
    policy: LedgerPolicy,
) -> CoreResult<PlannedProduct> {
    validate_name(&input.name)?;
    validate_amount("price", input.price)?;
    validate_amount("cost", input.cost)?;
    validate_count("stock", input.stock)?;
    validate_count("min_stock", input.min_stock)?;

    let supplier_id = normalize_optional(input.supplier_id);
    let product = Product {
        id: product_id,
        name: input.name.trim().to_string(),
        description: normalize_text("description", input.description)?,
        price: input.price,
        cost: input.cost,
        stock: input.stock,
        min_stock: input.min_stock,
        category: normalize_optional(input.category),
        size: input.size,
        supplier_id,
        created_at: now,
        updated_at: now,
    };

    let mut batch = WriteBatch::new();
    batch.push(LedgerWrite::InsertProduct(product.clone()));

    let seed = if product.stock > 0 {
        validate_quantity(product.stock)?;
        let supplier =
            supplier.filter(|s| product.supplier_id.as_deref() == Some(s.id.as_str()));
        let seed = Transaction {
            id: seed_id,
            product_id: product.id.clone(),
            tx_type: TransactionType::In,
            quantity: product.stock,
            price: product.cost,
            total: checked_total(product.stock, product.cost)?,
            entity_id: product.supplier_id.clone(),
            entity_type: supplier.map(|s| s.entity_type),
            date: now,
            notes: None,
        };
        batch.push(LedgerWrite::InsertTransaction(seed.clone()));
        push_effects(
            &mut batch,
            &seed,
            1,
            None,
            supplier,
            policy.balance.applies_on_record(),
        );
        Some(seed)
    } else {
        None
    };

    Ok(PlannedProduct {
        product,
        seed,
        batch,
    })
}

/// Plans a partial product update.
///
/// A stock value in the patch is a manual correction. It is written as-is
/// and reported back as a [`StockOverride`] when it differs from the
/// current stock.
pub fn plan_update_product(
    current: &Product,
    patch: ProductPatch,
    now: DateTime<Utc>,
    policy: LedgerPolicy,
) -> CoreResult<PlannedProductUpdate> {
    let mut next = current.clone();

    if let Some(name) = patch.name {
        validate_name(&name)?;
        next.name = name.trim().to_string();
    }
    if let Some(description) = patch.description {
        next.description = normalize_text("description", description)?;
    }
    if let Some(price) = patch.price {
        validate_amount("price", price)?;
        next.price = price;
    }
    if let Some(cost) = patch.cost {
        validate_amount("cost", cost)?;
        next.cost = cost;
    }
    if let Some(min_stock) = patch.min_stock {
        validate_count("min_stock", min_stock)?;
        next.min_stock = min_stock;
    }
    if let Some(category) = patch.category {
        next.category = normalize_optional(category);
    }
    if let Some(size) = patch.size {
        next.size = size;
    }
    if let Some(supplier_id) = patch.supplier_id {
        next.supplier_id = normalize_optional(supplier_id);
    }
    if let Some(stock) = patch.stock {
        if policy.stock == StockPolicy::Reject {
            validate_count("stock", stock)?;
        }
        next.stock = stock;
    }
    next.updated_at = now;

    let stock_override = (next.stock != current.stock).then_some(StockOverride {
        previous: current.stock,
        new: next.stock,
    });

    let batch = WriteBatch::from(vec![LedgerWrite::UpdateProduct {
        before: current.clone(),
        after: next.clone(),
    }]);

    Ok(PlannedProductUpdate {
        product: next,
        stock_override,
        batch,
    })
}

/// Plans removing a product. Its transactions are left in place.
pub fn plan_delete_product(current: &Product) -> WriteBatch {
    WriteBatch::from(vec![LedgerWrite::RemoveProduct(current.clone())])
}

/// Plans creating a customer or supplier.
pub fn plan_create_entity(
    input: NewEntity,
    id: String,
    now: DateTime<Utc>,
) -> CoreResult<PlannedEntity> {
    validate_name(&input.name)?;

    let entity = Entity {
        id,
        name: input.name.trim().to_string(),
        phone: normalize_optional(input.phone),
        email: normalize_email(input.email)?,
        address: normalize_text("address", input.address)?,
        entity_type: input.entity_type,
        balance: input.balance,
        created_at: now,
        updated_at: now,
    };

    let batch = WriteBatch::from(vec![LedgerWrite::InsertEntity(entity.clone())]);
    Ok(PlannedEntity { entity, batch })
}

/// Plans a partial entity update. A balance in the patch is reported as a
/// [`BalanceOverride`] when it differs from the current balance.
pub fn plan_update_entity(
    current: &Entity,
    patch: EntityPatch,
    now: DateTime<Utc>,
) -> CoreResult<PlannedEntityUpdate> {
    let mut next = current.clone();

    if let Some(name) = patch.name {
        validate_name(&name)?;
        next.name = name.trim().to_string();
    }
    if let Some(phone) = patch.phone {
        next.phone = normalize_optional(phone);
    }
    if let Some(email) = patch.email {
        next.email = normalize_email(email)?;
    }
    if let Some(address) = patch.address {
        next.address = normalize_text("address", address)?;
    }
    if let Some(balance) = patch.balance {
        next.balance = balance;
    }
    next.updated_at = now;

    let balance_override = (next.balance != current.balance).then_some(BalanceOverride {
        previous: current.balance,
        new: next.balance,
    });

    let batch = WriteBatch::from(vec![LedgerWrite::UpdateEntity {
        before: current.clone(),
        after: next.clone(),
    }]);

    Ok(PlannedEntityUpdate {
        entity: next,
        balance_override,
        batch,
    })
}

/// Plans removing an entity. Transactions that mention it are left in place.
pub fn plan_delete_entity(current: &Entity) -> WriteBatch {
    WriteBatch::from(vec![LedgerWrite::RemoveEntity(current.clone())])
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EntityType;

    fn now() -> DateTime<Utc> {
        DateTime::from_timestamp_millis(1_700_000_000_000).unwrap()
    }

    fn product(stock: i64) -> Product {
        Product {
            id: "p-1".to_string(),
            name: "Shirt".to_string(),
            description: None,
            price: Money::from_units(100),
            cost: Money::from_units(60),
            stock,
            min_stock: 2,
            category: None,
            size: None,
            supplier_id: None,
            created_at: now(),
            updated_at: now(),
        }
    }

    fn customer() -> Entity {
        Entity {
            id: "c-1".to_string(),
            name: "Ali".to_string(),
            phone: None,
            email: None,
            address: None,
            entity_type: EntityType::Customer,
            balance: Money::zero(),
            created_at: now(),
            updated_at: now(),
        }
    }

    fn sale(qty: i64) -> NewTransaction {
        NewTransaction::new("p-1", TransactionType::Out, qty, Money::from_units(100))
            .with_entity("c-1")
    }

    #[test]
    fn test_effect_math() {
        assert_eq!(stock_delta(TransactionType::In, 4), 4);
        assert_eq!(stock_delta(TransactionType::Out, 4), -4);
        let total = Money::from_units(250);
        assert_eq!(balance_delta(TransactionType::Out, total), total);
        assert_eq!(balance_delta(TransactionType::In, total), -total);
    }

    #[test]
    fn test_plan_record_sale() {
        let p = product(5);
        let c = customer();
        let plan = plan_record(
            sale(2),
            "t-1".to_string(),
            now(),
            Some(&p),
            Some(&c),
            LedgerPolicy::default(),
        )
        .unwrap();

        assert_eq!(plan.transaction.total.units(), 200);
        assert_eq!(plan.transaction.entity_type, Some(EntityType::Customer));
        assert_eq!(plan.transaction.date, now());
        assert_eq!(
            plan.batch.writes(),
            &[
                LedgerWrite::InsertTransaction(plan.transaction.clone()),
                LedgerWrite::AdjustStock {
                    product_id: "p-1".to_string(),
                    delta: -2
                },
                LedgerWrite::AdjustBalance {
                    entity_id: "c-1".to_string(),
                    delta: Money::from_units(200)
                },
            ]
        );
    }

    #[test]
    fn test_plan_record_missing_targets_are_not_errors() {
        let plan = plan_record(
            sale(2),
            "t-1".to_string(),
            now(),
            None,
            None,
            LedgerPolicy::default(),
        )
        .unwrap();

        assert_eq!(plan.batch.len(), 1);
        assert_eq!(plan.transaction.entity_id.as_deref(), Some("c-1"));
        assert_eq!(plan.transaction.entity_type, None);
    }

    #[test]
    fn test_plan_record_trims_product_id() {
        let p = product(5);
        let mut input = sale(2);
        input.product_id = "  p-1 ".to_string();

        let plan = plan_record(input, "t-1".to_string(), now(), Some(&p), None, LedgerPolicy::default())
            .unwrap();

        assert_eq!(plan.transaction.product_id, "p-1");
        assert!(plan.batch.iter().any(|w| matches!(
            w,
            LedgerWrite::AdjustStock { product_id, delta: -2 } if product_id == "p-1"
        )));
    }

    #[test]
    fn test_plan_record_rejects_oversized_price() {
        let mut input = sale(1);
        input.price = Money::from_units(crate::MAX_AMOUNT + 1);
        let result = plan_record(input, "t".to_string(), now(), None, None, LedgerPolicy::default());
        assert!(matches!(
            result,
            Err(CoreError::Validation(ValidationError::OutOfRange { .. }))
        ));
    }

    #[test]
    fn test_plan_record_balance_disabled() {
        let p = product(5);
        let c = customer();
        let policy = LedgerPolicy {
            balance: BalancePolicy::Disabled,
            ..LedgerPolicy::default()
        };
        let plan = plan_record(sale(1), "t".to_string(), now(), Some(&p), Some(&c), policy)
            .unwrap();
        assert!(!plan
            .batch
            .iter()
            .any(|w| matches!(w, LedgerWrite::AdjustBalance { .. })));
    }

    #[test]
    fn test_plan_record_rejects_bad_input() {
        let bad_qty = plan_record(
            sale(0),
            "t".to_string(),
            now(),
            None,
            None,
            LedgerPolicy::default(),
        );
        assert!(matches!(bad_qty, Err(CoreError::Validation(_))));

        let mut negative_price = sale(1);
        negative_price.price = Money::from_units(-1);
        assert!(plan_record(
            negative_price,
            "t".to_string(),
            now(),
            None,
            None,
            LedgerPolicy::default()
        )
        .is_err());

        let mut huge = sale(1_000);
        huge.price = Money::from_units(i64::MAX / 10);
        assert!(matches!(
            plan_record(huge, "t".to_string(), now(), None, None, LedgerPolicy::default()),
            Err(CoreError::TotalOverflow { .. })
        ));
    }

    #[test]
    fn test_stock_policy() {
        let p = product(3);
        let allow = plan_record(
            sale(5),
            "t".to_string(),
            now(),
            Some(&p),
            None,
            LedgerPolicy::default(),
        );
        assert!(allow.is_ok());

        let reject = LedgerPolicy {
            stock: StockPolicy::Reject,
            ..LedgerPolicy::default()
        };
        let err = plan_record(sale(5), "t".to_string(), now(), Some(&p), None, reject)
            .unwrap_err();
        assert!(matches!(
            err,
            CoreError::InsufficientStock {
                available: 3,
                requested: 5,
                ..
            }
        ));
        assert!(plan_record(sale(3), "t".to_string(), now(), Some(&p), None, reject).is_ok());
    }

    #[test]
    fn test_plan_delete_reverts_per_policy() {
        let p = product(3);
        let c = customer();
        let tx = plan_record(
            sale(2),
            "t-1".to_string(),
            now(),
            Some(&p),
            Some(&c),
            LedgerPolicy::default(),
        )
        .unwrap()
        .transaction;

        let symmetric =
            plan_delete_transaction(&tx, true, Some(&p), Some(&c), LedgerPolicy::default());
        assert_eq!(symmetric.len(), 3);
        assert_eq!(
            symmetric.writes()[1],
            LedgerWrite::AdjustBalance {
                entity_id: "c-1".to_string(),
                delta: Money::from_units(-200)
            }
        );
        assert_eq!(
            symmetric.writes().last(),
            Some(&LedgerWrite::RemoveTransaction(tx.clone()))
        );

        let record_only = LedgerPolicy {
            balance: BalancePolicy::RecordOnly,
            ..LedgerPolicy::default()
        };
        let legacy = plan_delete_transaction(&tx, true, Some(&p), Some(&c), record_only);
        assert_eq!(
            legacy.writes(),
            &[
                LedgerWrite::AdjustStock {
                    product_id: "p-1".to_string(),
                    delta: 2
                },
                LedgerWrite::RemoveTransaction(tx.clone()),
            ]
        );

        let no_revert =
            plan_delete_transaction(&tx, false, Some(&p), Some(&c), LedgerPolicy::default());
        assert_eq!(no_revert.len(), 1);

        let gone = plan_delete_transaction(&tx, true, None, None, LedgerPolicy::default());
        assert_eq!(gone.len(), 1);
    }

    #[test]
    fn test_plan_create_product_seed() {
        let supplier = Entity {
            id: "s-1".to_string(),
            entity_type: EntityType::Supplier,
            ..customer()
        };
        let input = NewProduct {
            name: "  Shirt ".to_string(),
            price: Money::from_units(100),
            cost: Money::from_units(60),
            stock: 10,
            supplier_id: Some("s-1".to_string()),
            description: Some("   ".to_string()),
            ..NewProduct::default()
        };

        let plan = plan_create_product(
            input,
            "p-1".to_string(),
            "t-1".to_string(),
            now(),
            Some(&supplier),
            LedgerPolicy::default(),
        )
        .unwrap();

        assert_eq!(plan.product.name, "Shirt");
        assert_eq!(plan.product.description, None);
        assert_eq!(plan.product.stock, 10);

        let seed = plan.seed.unwrap();
        assert_eq!(seed.quantity, 10);
        assert_eq!(seed.price.units(), 60);
        assert_eq!(seed.total.units(), 600);
        assert_eq!(seed.entity_type, Some(EntityType::Supplier));

        // The seed never adjusts stock a second time.
        assert!(!plan
            .batch
            .iter()
            .any(|w| matches!(w, LedgerWrite::AdjustStock { .. })));
        assert!(plan.batch.iter().any(|w| *w
            == LedgerWrite::AdjustBalance {
                entity_id: "s-1".to_string(),
                delta: Money::from_units(-600)
            }));
    }

    #[test]
    fn test_plan_create_product_without_stock_has_no_seed() {
        let input = NewProduct {
            name: "Cap".to_string(),
            ..NewProduct::default()
        };
        let plan = plan_create_product(
            input,
            "p".to_string(),
            "t".to_string(),
            now(),
            None,
            LedgerPolicy::default(),
        )
        .unwrap();
        assert!(plan.seed.is_none());
        assert_eq!(plan.batch.len(), 1);
    }

    #[test]
    fn test_plan_update_product_reports_override() {
        let current = product(5);
        let later = now() + chrono::Duration::seconds(1);

        let plan = plan_update_product(
            &current,
            ProductPatch {
                stock: Some(8),
                category: Some(Some(" ".to_string())),
                ..ProductPatch::default()
            },
            later,
            LedgerPolicy::default(),
        )
        .unwrap();

        assert_eq!(
            plan.stock_override,
            Some(StockOverride {
                previous: 5,
                new: 8
            })
        );
        assert_eq!(plan.product.category, None);
        assert_eq!(plan.product.updated_at, later);
        assert_eq!(plan.product.created_at, current.created_at);

        let unchanged = plan_update_product(
            &current,
            ProductPatch {
                price: Some(Money::from_units(120)),
                ..ProductPatch::default()
            },
            later,
            LedgerPolicy::default(),
        )
        .unwrap();
        assert!(unchanged.stock_override.is_none());
    }

    #[test]
    fn test_plan_update_entity_reports_override() {
        let plan = plan_update_entity(
            &customer(),
            EntityPatch {
                balance: Some(Money::from_units(50)),
                email: Some(Some("bad".to_string())),
                ..EntityPatch::default()
            },
            now(),
        );
        assert!(plan.is_err());

        let plan = plan_update_entity(
            &customer(),
            EntityPatch {
                balance: Some(Money::from_units(50)),
                ..EntityPatch::default()
            },
            now(),
        )
        .unwrap();
        assert_eq!(
            plan.balance_override,
            Some(BalanceOverride {
                previous: Money::zero(),
                new: Money::from_units(50)
            })
        );
    }

    #[test]
    fn test_inverse_round_trip() {
        let write = LedgerWrite::AdjustBalance {
            entity_id: "c-1".to_string(),
            delta: Money::from_units(30),
        };
        assert_eq!(write.inverse().inverse(), write);

        let update = LedgerWrite::UpdateProduct {
            before: product(1),
            after: product(2),
        };
        match update.inverse() {
            LedgerWrite::UpdateProduct { before, after } => {
                assert_eq!(before.stock, 2);
                assert_eq!(after.stock, 1);
            }
            other => panic!("unexpected inverse {other}"),
        }
        assert_eq!(update.to_string(), "update_product(p-1)");
    }

    #[test]
    fn test_policy_parsing() {
        assert_eq!("reject".parse::<StockPolicy>().unwrap(), StockPolicy::Reject);
        assert_eq!(
            "record_only".parse::<BalancePolicy>().unwrap(),
            BalancePolicy::RecordOnly
        );
        assert!("sometimes".parse::<BalancePolicy>().is_err());
        assert!(BalancePolicy::Symmetric.applies_on_revert());
        assert!(!BalancePolicy::RecordOnly.applies_on_revert());
        assert!(!BalancePolicy::Disabled.applies_on_record());
    }
}
