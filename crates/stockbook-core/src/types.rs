//! # Domain Types
//!
//! Core domain records and caller inputs used throughout Stockbook.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │   Transaction   │   │     Entity      │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id             │◄──│  product_id     │   │  id             │       │
//! │  │  stock (cache)  │   │  type in/out    │──►│  type           │       │
//! │  │  min_stock      │   │  quantity       │   │  balance        │       │
//! │  │  price / cost   │   │  price (frozen) │   │  contact fields │       │
//! │  └─────────────────┘   │  entity_id?     │   └─────────────────┘       │
//! │                        └─────────────────┘                              │
//! │                                                                         │
//! │  References from a Transaction may dangle: deleting a product or an    │
//! │  entity never deletes the history that mentions it.                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Wire Format
//! Records serialize with camelCase keys and epoch-millisecond timestamps,
//! the layout the presentation layer reads from the live collections.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::Money;

/// Truncates a timestamp to millisecond precision.
///
/// Every persisted timestamp is stored as epoch milliseconds, so the engine
/// truncates `now` once and records compare equal after a round trip.
pub fn truncate_to_millis(at: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(at.timestamp_millis()).unwrap_or(at)
}

// =============================================================================
// Transaction Type
// =============================================================================

/// Direction of a stock movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    /// Stock increase: purchase or receipt from a supplier.
    In,
    /// Stock decrease: sale to a customer.
    Out,
}

impl TransactionType {
    /// +1 for `in`, -1 for `out`.
    #[inline]
    pub const fn stock_sign(&self) -> i64 {
        match self {
            TransactionType::In => 1,
            TransactionType::Out => -1,
        }
    }

    /// The kind of counterparty this direction trades with. Pickers use it
    /// to offer suppliers for `in` and customers for `out`.
    pub const fn counterparty_type(&self) -> EntityType {
        match self {
            TransactionType::In => EntityType::Supplier,
            TransactionType::Out => EntityType::Customer,
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            TransactionType::In => "in",
            TransactionType::Out => "out",
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "in" => Ok(TransactionType::In),
            "out" => Ok(TransactionType::Out),
            _ => Err(ValidationError::NotAllowed {
                field: "type".to_string(),
                allowed: vec!["in".to_string(), "out".to_string()],
            }),
        }
    }
}

// =============================================================================
// Entity Type
// =============================================================================

/// Kind of counterparty. Fixed when the entity is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    Customer,
    Supplier,
}

impl EntityType {
    pub const fn as_str(&self) -> &'static str {
        match self {
            EntityType::Customer => "customer",
            EntityType::Supplier => "supplier",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "customer" => Ok(EntityType::Customer),
            "supplier" => Ok(EntityType::Supplier),
            _ => Err(ValidationError::NotAllowed {
                field: "entity type".to_string(),
                allowed: vec!["customer".to_string(), "supplier".to_string()],
            }),
        }
    }
}

// =============================================================================
// Size
// =============================================================================

/// Garment size label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[ts(export)]
pub enum Size {
    #[cfg_attr(feature = "sqlx", sqlx(rename = "S"))]
    S,
    #[cfg_attr(feature = "sqlx", sqlx(rename = "M"))]
    M,
    #[cfg_attr(feature = "sqlx", sqlx(rename = "L"))]
    L,
    #[serde(rename = "XL")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "XL"))]
    Xl,
    #[serde(rename = "XXL")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "XXL"))]
    Xxl,
}

impl Size {
    pub const ALL: [Size; 5] = [Size::S, Size::M, Size::L, Size::Xl, Size::Xxl];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Size::S => "S",
            Size::M => "M",
            Size::L => "L",
            Size::Xl => "XL",
            Size::Xxl => "XXL",
        }
    }

    /// Parses an optional size where an empty label means "no size".
    pub fn parse_optional(s: &str) -> Result<Option<Size>, ValidationError> {
        if s.trim().is_empty() {
            return Ok(None);
        }
        s.parse().map(Some)
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Size {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_uppercase();
        Size::ALL
            .into_iter()
            .find(|size| size.as_str() == wanted)
            .ok_or_else(|| ValidationError::NotAllowed {
                field: "size".to_string(),
                allowed: Size::ALL.iter().map(|s| s.as_str().to_string()).collect(),
            })
    }
}

// =============================================================================
// Product
// =============================================================================

/// A stock keeping unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Product {
    /// Store-assigned identifier.
    pub id: String,

    /// Display name.
    pub name: String,

    pub description: Option<String>,

    /// Sale unit price.
    pub price: Money,

    /// Purchase unit price.
    pub cost: Money,

    /// On-hand quantity. A cache of the ledger sum; may be negative under
    /// the back-order stock policy.
    pub stock: i64,

    /// Reorder threshold.
    pub min_stock: i64,

    pub category: Option<String>,

    pub size: Option<Size>,

    /// Default supplier; attributed on the seed transaction.
    pub supplier_id: Option<String>,

    #[serde(with = "chrono::serde::ts_milliseconds")]
    #[ts(type = "number")]
    pub created_at: DateTime<Utc>,

    #[serde(with = "chrono::serde::ts_milliseconds")]
    #[ts(type = "number")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// At or below the reorder threshold.
    #[inline]
    pub fn is_low_stock(&self) -> bool {
        self.stock <= self.min_stock
    }

    /// Value of the positive on-hand quantity at purchase cost.
    pub fn stock_value(&self) -> Money {
        self.cost
            .checked_mul_quantity(self.stock.max(0))
            .unwrap_or(Money::from_units(i64::MAX))
    }
}

// =============================================================================
// Entity
// =============================================================================

/// A customer or supplier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Entity {
    pub id: String,
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    #[serde(rename = "type")]
    pub entity_type: EntityType,
    /// Positive: the entity owes the business. Negative: the business owes
    /// the entity.
    pub balance: Money,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    #[ts(type = "number")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    #[ts(type = "number")]
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Transaction
// =============================================================================

/// A ledger entry. Immutable once recorded; the only later mutation is
/// deletion.
///
/// ## Snapshot Pattern
/// `price` and `entity_type` are frozen at record time. Changing the
/// product's price or deleting the entity later never rewrites history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Transaction {
    /// Store-assigned, time-ordered identifier.
    pub id: String,
    /// May dangle after the product is deleted.
    pub product_id: String,
    #[serde(rename = "type")]
    pub tx_type: TransactionType,
    pub quantity: i64,
    /// Unit price at record time.
    pub price: Money,
    /// `quantity × price`, stored for report fidelity.
    pub total: Money,
    pub entity_id: Option<String>,
    pub entity_type: Option<EntityType>,
    /// Set by the engine, never supplied by callers.
    #[serde(with = "chrono::serde::ts_milliseconds")]
    #[ts(type = "number")]
    pub date: DateTime<Utc>,
    pub notes: Option<String>,
}

impl Transaction {
    /// Signed change this entry made to its product's stock.
    #[inline]
    pub fn stock_delta(&self) -> i64 {
        self.tx_type.stock_sign() * self.quantity
    }
}

// =============================================================================
// Inputs
// =============================================================================

/// Caller input for recording a stock movement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct NewTransaction {
    pub product_id: String,
    #[serde(rename = "type")]
    pub tx_type: TransactionType,
    pub quantity: i64,
    pub price: Money,
    #[serde(default)]
    pub entity_id: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl NewTransaction {
    /// A movement with no counterparty and no notes.
    pub fn new(
        product_id: impl Into<String>,
        tx_type: TransactionType,
        quantity: i64,
        price: Money,
    ) -> Self {
        NewTransaction {
            product_id: product_id.into(),
            tx_type,
            quantity,
            price,
            entity_id: None,
            notes: None,
        }
    }

    pub fn with_entity(mut self, entity_id: impl Into<String>) -> Self {
        self.entity_id = Some(entity_id.into());
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

/// Caller input for creating a product.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct NewProduct {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: Money,
    pub cost: Money,
    /// Initial on-hand quantity. Seeds one `in` transaction when positive.
    #[serde(default)]
    pub stock: i64,
    #[serde(default)]
    pub min_stock: i64,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub size: Option<Size>,
    #[serde(default)]
    pub supplier_id: Option<String>,
}

/// Partial product update.
///
/// `None` leaves a field unchanged. For optional fields, `Some(None)` clears
/// the value.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductPatch {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub price: Option<Money>,
    pub cost: Option<Money>,
    /// Manual stock correction. Bypasses the ledger and is reported as a
    /// [`StockOverride`].
    pub stock: Option<i64>,
    pub min_stock: Option<i64>,
    pub category: Option<Option<String>>,
    pub size: Option<Option<Size>>,
    pub supplier_id: Option<Option<String>>,
}

/// Caller input for creating a customer or supplier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct NewEntity {
    pub name: String,
    #[serde(rename = "type")]
    pub entity_type: EntityType,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    /// Opening balance, e.g. a debt carried over from paper books.
    #[serde(default)]
    pub balance: Money,
}

impl NewEntity {
    pub fn new(name: impl Into<String>, entity_type: EntityType) -> Self {
        NewEntity {
            name: name.into(),
            entity_type,
            phone: None,
            email: None,
            address: None,
            balance: Money::zero(),
        }
    }
}

/// Partial entity update. The entity type is immutable and has no field.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityPatch {
    pub name: Option<String>,
    pub phone: Option<Option<String>>,
    pub email: Option<Option<String>>,
    pub address: Option<Option<String>>,
    /// Manual balance correction, reported as a [`BalanceOverride`].
    pub balance: Option<Money>,
}

// =============================================================================
// Overrides
// =============================================================================

/// A stock value written outside the ledger.
///
/// Returned to the caller and logged, so a manual correction is always
/// visible rather than silently breaking the ledger-sum invariant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct StockOverride {
    pub previous: i64,
    pub new: i64,
}

/// A balance value written outside the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct BalanceOverride {
    pub previous: Money,
    pub new: Money,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn at(ms: i64) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(ms).unwrap()
    }

    #[test]
    fn test_transaction_type_parsing() {
        assert_eq!("in".parse::<TransactionType>().unwrap(), TransactionType::In);
        assert_eq!(" OUT ".parse::<TransactionType>().unwrap(), TransactionType::Out);
        assert!("sideways".parse::<TransactionType>().is_err());
    }

    #[test]
    fn test_counterparty_type() {
        assert_eq!(TransactionType::In.counterparty_type(), EntityType::Supplier);
        assert_eq!(TransactionType::Out.counterparty_type(), EntityType::Customer);
    }

    #[test]
    fn test_size_parsing() {
        assert_eq!("xl".parse::<Size>().unwrap(), Size::Xl);
        assert_eq!(Size::parse_optional("").unwrap(), None);
        assert_eq!(Size::parse_optional("XXL").unwrap(), Some(Size::Xxl));
        assert!("XS".parse::<Size>().is_err());
    }

    #[test]
    fn test_truncate_to_millis() {
        let precise = DateTime::from_timestamp(1_700_000_000, 123_456_789).unwrap();
        let truncated = truncate_to_millis(precise);
        assert_eq!(truncated.timestamp_millis(), precise.timestamp_millis());
        assert_eq!(truncated.timestamp_subsec_nanos(), 123_000_000);
    }

    #[test]
    fn test_transaction_wire_format() {
        let tx = Transaction {
            id: "t-1".to_string(),
            product_id: "p-1".to_string(),
            tx_type: TransactionType::Out,
            quantity: 2,
            price: Money::from_units(100),
            total: Money::from_units(200),
            entity_id: Some("e-1".to_string()),
            entity_type: Some(EntityType::Customer),
            date: at(1_700_000_000_000),
            notes: None,
        };

        let json = serde_json::to_value(&tx).unwrap();
        assert_eq!(json["type"], "out");
        assert_eq!(json["productId"], "p-1");
        assert_eq!(json["entityType"], "customer");
        assert_eq!(json["total"], 200);
        assert_eq!(json["date"], 1_700_000_000_000_i64);

        let back: Transaction = serde_json::from_value(json).unwrap();
        assert_eq!(back, tx);
        assert_eq!(back.stock_delta(), -2);
    }

    #[test]
    fn test_size_wire_format() {
        assert_eq!(serde_json::to_string(&Size::Xxl).unwrap(), "\"XXL\"");
        assert_eq!(serde_json::from_str::<Size>("\"M\"").unwrap(), Size::M);
    }

    #[test]
    fn test_low_stock_and_value() {
        let product = Product {
            id: "p".to_string(),
            name: "Shirt".to_string(),
            description: None,
            price: Money::from_units(100),
            cost: Money::from_units(60),
            stock: 3,
            min_stock: 3,
            category: None,
            size: Some(Size::M),
            supplier_id: None,
            created_at: at(0),
            updated_at: at(0),
        };
        assert!(product.is_low_stock());
        assert_eq!(product.stock_value().units(), 180);

        let backordered = Product { stock: -4, ..product };
        assert_eq!(backordered.stock_value(), Money::zero());
    }
}
